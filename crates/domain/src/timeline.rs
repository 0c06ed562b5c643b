//! Timeline resolution
//!
//! Every mapped insight carries a human-readable timeline. The label is
//! resolved through a fallback chain and degrades to `"Unknown date"`; it is
//! never null. Resolved timelines also carry the whole-day UTC range they
//! cover so range filters don't need to re-parse labels.

use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

use crate::dates::{
    UNKNOWN_DATE, day_label, display_date, end_of_day, parse_date_string, resolve_instant,
    start_of_day, utc_date,
};
use crate::fields;
use crate::model::{FilteredInsight, RawInsight};

const RANGE_SEPARATOR: &str = " - ";

/// Inclusive UTC range covering whole calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimelineRange {
    /// Range covering every day from `first` to `last`, in either order
    pub fn days(first: Date, last: Date) -> Self {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        Self {
            start: start_of_day(first),
            end: end_of_day(last),
        }
    }

    /// Range covering the UTC day containing `instant`
    pub fn day(instant: OffsetDateTime) -> Self {
        let date = utc_date(instant);
        Self::days(date, date)
    }

    pub fn first_day(&self) -> Date {
        utc_date(self.start)
    }

    pub fn last_day(&self) -> Date {
        utc_date(self.end)
    }

    /// `YYYY-MM-DD`, or `YYYY-MM-DD - YYYY-MM-DD` when the days differ
    pub fn label(&self) -> String {
        let (first, last) = (self.first_day(), self.last_day());
        if first == last {
            day_label(self.start)
        } else {
            format!("{}{}{}", day_label(self.start), RANGE_SEPARATOR, day_label(self.end))
        }
    }

    /// Same shape as `label` in `MM/DD/YYYY`
    pub fn display_label(&self) -> String {
        let (first, last) = (self.first_day(), self.last_day());
        if first == last {
            display_date(first)
        } else {
            format!("{}{}{}", display_date(first), RANGE_SEPARATOR, display_date(last))
        }
    }

    /// Recover the range from a timeline label. `"Unknown date"` and
    /// anything else unparsable yields `None`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() || label == UNKNOWN_DATE {
            return None;
        }

        match label.split_once(RANGE_SEPARATOR) {
            Some((first, last)) => {
                let first = parse_date_string(first)?;
                let last = parse_date_string(last)?;
                Some(Self::days(utc_date(first), utc_date(last)))
            }
            None => parse_date_string(label).map(Self::day),
        }
    }

    /// Inclusive overlap with `[window_start, window_end]`
    pub fn overlaps(&self, window_start: OffsetDateTime, window_end: OffsetDateTime) -> bool {
        self.start <= window_end && self.end >= window_start
    }
}

/// Resolved timeline of one insight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub label: String,
    pub range: Option<TimelineRange>,
}

impl Timeline {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_DATE.to_string(),
            range: None,
        }
    }

    pub fn from_range(range: TimelineRange) -> Self {
        Self {
            label: range.label(),
            range: Some(range),
        }
    }

    fn from_instant(instant: OffsetDateTime) -> Self {
        Self::from_range(TimelineRange::day(instant))
    }

    pub fn is_known(&self) -> bool {
        self.range.is_some()
    }

    /// `MM/DD/YYYY` form for list views
    pub fn display_label(&self) -> String {
        match &self.range {
            Some(range) => range.display_label(),
            None => UNKNOWN_DATE.to_string(),
        }
    }
}

/// Direct date, then the latest mention, then unknown
pub fn resolve_raw_timeline(insight: &RawInsight) -> Timeline {
    if let Some(date) = insight.date {
        return Timeline::from_instant(date);
    }

    insight
        .mentions
        .iter()
        .filter_map(|mention| mention.date_posted)
        .max()
        .map(Timeline::from_instant)
        .unwrap_or_else(Timeline::unknown)
}

/// Filter date, criteria date range, record stamps, then the raw chain
pub fn resolve_filtered_timeline(insight: &FilteredInsight) -> Timeline {
    if let Some(date) = insight.filter_date {
        return Timeline::from_instant(date);
    }

    if let Some(range) = insight.filter_criteria.as_ref().and_then(criteria_range) {
        return Timeline::from_range(range);
    }

    if let Some(stamp) = insight.insight.updated_at.or(insight.insight.created_at) {
        return Timeline::from_instant(stamp);
    }

    resolve_raw_timeline(&insight.insight)
}

/// `filter_criteria.date_range` as `[start, end]` or `{start|from, end|to}`
fn criteria_range(criteria: &Map<String, Value>) -> Option<TimelineRange> {
    let (start, end) = match criteria.get("date_range")? {
        Value::Array(items) => (
            items.first().and_then(resolve_instant),
            items.get(1).and_then(resolve_instant),
        ),
        Value::Object(bounds) => (
            fields::RANGE_START.lookup(bounds),
            fields::RANGE_END.lookup(bounds),
        ),
        _ => return None,
    };

    match (start, end) {
        (Some(start), Some(end)) => Some(TimelineRange::days(utc_date(start), utc_date(end))),
        (Some(single), None) | (None, Some(single)) => Some(TimelineRange::day(single)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawInsight {
        RawInsight::from_value(&value)
    }

    fn filtered(value: Value) -> FilteredInsight {
        FilteredInsight::from_value(&value)
    }

    #[test]
    fn test_raw_direct_date_wins() {
        let timeline = resolve_raw_timeline(&raw(json!({
            "date": "2024-01-05",
            "mentions": [{"date_posted": "2024-03-01T00:00:00Z"}]
        })));
        assert_eq!(timeline.label, "2024-01-05");
        assert_eq!(timeline.display_label(), "01/05/2024");
    }

    #[test]
    fn test_raw_uses_latest_mention() {
        let timeline = resolve_raw_timeline(&raw(json!({
            "mentions": [
                {"date_posted": "2024-01-03T08:00:00Z"},
                {"data_posted": 1_704_448_800},
                {"date_posted": "garbage"}
            ]
        })));
        assert_eq!(timeline.label, "2024-01-05");
    }

    #[test]
    fn test_raw_ignores_generic_mention_stamps() {
        let timeline = resolve_raw_timeline(&raw(json!({
            "mentions": [
                {"created_at": "2024-02-01T00:00:00Z"},
                {"timestamp": 1_706_745_600},
                {"date": "2024-02-03"}
            ]
        })));
        assert_eq!(timeline, Timeline::unknown());

        let timeline = resolve_raw_timeline(&raw(json!({
            "mentions": [
                {"date_posted": "2024-01-03T08:00:00Z", "created_at": "2024-02-01T00:00:00Z"}
            ]
        })));
        assert_eq!(timeline.label, "2024-01-03");
    }

    #[test]
    fn test_raw_unknown() {
        let timeline = resolve_raw_timeline(&raw(json!({"topic": "Tips", "num_mentions": 3})));
        assert_eq!(timeline, Timeline::unknown());
        assert_eq!(timeline.display_label(), "Unknown date");
        assert!(!timeline.is_known());
    }

    #[test]
    fn test_filtered_date_field_order() {
        let timeline = resolve_filtered_timeline(&filtered(json!({
            "filtered_at": "2024-02-10T00:00:00Z",
            "generated_at": "2024-02-11T00:00:00Z",
            "filter_criteria": {"date_range": ["2024-01-01", "2024-01-31"]}
        })));
        assert_eq!(timeline.label, "2024-02-10");
    }

    #[test]
    fn test_filtered_criteria_array_range() {
        let timeline = resolve_filtered_timeline(&filtered(json!({
            "filter_criteria": {"date_range": ["2024-01-01", "2024-01-31T12:00:00Z"]}
        })));
        assert_eq!(timeline.label, "2024-01-01 - 2024-01-31");
        assert_eq!(timeline.display_label(), "01/01/2024 - 01/31/2024");
    }

    #[test]
    fn test_filtered_criteria_object_range_is_ordered() {
        let timeline = resolve_filtered_timeline(&filtered(json!({
            "filter_criteria": {"date_range": {"from": "2024-01-31", "to": "2024-01-01"}}
        })));
        assert_eq!(timeline.label, "2024-01-01 - 2024-01-31");
    }

    #[test]
    fn test_filtered_criteria_same_day_collapses() {
        let timeline = resolve_filtered_timeline(&filtered(json!({
            "filter_criteria": {"date_range": {"start": "2024-01-05T01:00:00Z", "end": "2024-01-05T23:00:00Z"}}
        })));
        assert_eq!(timeline.label, "2024-01-05");
    }

    #[test]
    fn test_filtered_criteria_single_end() {
        let timeline = resolve_filtered_timeline(&filtered(json!({
            "filter_criteria": {"date_range": ["nope", "2024-01-31"]}
        })));
        assert_eq!(timeline.label, "2024-01-31");
    }

    #[test]
    fn test_filtered_falls_back_to_stamps_then_mentions() {
        let stamped = resolve_filtered_timeline(&filtered(json!({
            "filter_criteria": {"date_range": "last week"},
            "created_at": {"$date": "2024-04-01T00:00:00Z"}
        })));
        assert_eq!(stamped.label, "2024-04-01");

        let from_mentions = resolve_filtered_timeline(&filtered(json!({
            "mentions": [{"date_posted": "2024-05-02T10:00:00Z"}]
        })));
        assert_eq!(from_mentions.label, "2024-05-02");

        assert_eq!(resolve_filtered_timeline(&filtered(json!({}))), Timeline::unknown());
    }

    #[test]
    fn test_range_covers_whole_days() {
        let range = TimelineRange::parse_label("2024-01-05").unwrap();
        assert_eq!(range.start.hour(), 0);
        assert_eq!(range.end.hour(), 23);
        assert_eq!(range.end.minute(), 59);
        assert_eq!(range.label(), "2024-01-05");
    }

    #[test]
    fn test_parse_label_round_trips_resolved_timelines() {
        for label in ["2024-01-05", "2024-01-01 - 2024-01-31"] {
            assert_eq!(TimelineRange::parse_label(label).unwrap().label(), label);
        }
        assert!(TimelineRange::parse_label("Unknown date").is_none());
        assert!(TimelineRange::parse_label("soon").is_none());
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let range = TimelineRange::parse_label("2024-01-05").unwrap();
        assert!(range.overlaps(range.end, range.end + time::Duration::days(1)));
        assert!(range.overlaps(range.start - time::Duration::days(1), range.start));
        assert!(!range.overlaps(
            range.end + time::Duration::NANOSECOND,
            range.end + time::Duration::days(1)
        ));
    }
}
