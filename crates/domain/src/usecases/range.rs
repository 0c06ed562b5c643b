//! Range filtering and topic aggregation over mapped insights
//!
//! Works purely on the uniform output shape: timelines are recovered from
//! their labels, so the same filter applies to raw and filtered views.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime};

use crate::{
    dates::{day_label, end_of_day, parse_date_string, start_of_day, utc_date},
    model::MappedInsight,
    ports::Clock,
    timeline::TimelineRange,
};

/// Error type for window parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("Unknown range '{0}': expected one of 1D, 3D, 7D, 1M, 3M, 6M, 1Y, CUSTOM")]
    UnknownPreset(String),
    #[error("Custom range needs both a start and an end date")]
    MissingCustomBound,
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
}

/// Relative window ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    OneDay,
    ThreeDays,
    SevenDays,
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::OneDay,
        Preset::ThreeDays,
        Preset::SevenDays,
        Preset::OneMonth,
        Preset::ThreeMonths,
        Preset::SixMonths,
        Preset::OneYear,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::ThreeDays => "3D",
            Self::SevenDays => "7D",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
        }
    }

    /// Start of the window ending at `now`
    pub fn cutoff(self, now: OffsetDateTime) -> OffsetDateTime {
        match self {
            Self::OneDay => now - Duration::days(1),
            Self::ThreeDays => now - Duration::days(3),
            Self::SevenDays => now - Duration::days(7),
            Self::OneMonth => months_before(now, 1),
            Self::ThreeMonths => months_before(now, 3),
            Self::SixMonths => months_before(now, 6),
            Self::OneYear => months_before(now, 12),
        }
    }
}

impl FromStr for Preset {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| RangeError::UnknownPreset(s.to_string()))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Calendar month subtraction, clamping to the end of shorter months
fn months_before(now: OffsetDateTime, months: i32) -> OffsetDateTime {
    let index = now.year() * 12 + i32::from(u8::from(now.month())) - 1 - months;
    let year = index.div_euclid(12);
    let month = u8::try_from(index.rem_euclid(12) + 1)
        .ok()
        .and_then(|m| Month::try_from(m).ok());

    let date = month.and_then(|month| {
        (now.day().min(28)..=now.day())
            .rev()
            .find_map(|day| Date::from_calendar_date(year, month, day).ok())
    });

    match date {
        Some(date) => date.with_time(now.time()).assume_offset(now.offset()),
        None => PrimitiveDateTime::MIN.assume_utc(),
    }
}

/// Window over which insights are retained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Preset(Preset),
    Custom {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::Preset(Preset::default())
    }
}

impl DateWindow {
    /// Custom window covering whole UTC days. Not reordered: an inverted
    /// window retains nothing.
    pub fn custom_days(start: Date, end: Date) -> Self {
        Self::Custom {
            start: start_of_day(start),
            end: end_of_day(end),
        }
    }

    /// Parse request parameters: a preset code, or `CUSTOM` with both dates.
    /// Dates alone imply a custom window; nothing at all is the default preset.
    pub fn parse(
        range: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, RangeError> {
        let range = range.map(str::trim).filter(|r| !r.is_empty());
        let has_dates = start.is_some() || end.is_some();

        match range {
            Some(code) if code.eq_ignore_ascii_case("custom") => Self::parse_custom(start, end),
            Some(code) => code.parse().map(Self::Preset),
            None if has_dates => Self::parse_custom(start, end),
            None => Ok(Self::default()),
        }
    }

    fn parse_custom(start: Option<&str>, end: Option<&str>) -> Result<Self, RangeError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(RangeError::MissingCustomBound);
        };
        let day = |raw: &str| {
            parse_date_string(raw)
                .map(utc_date)
                .ok_or_else(|| RangeError::InvalidDate(raw.to_string()))
        };
        Ok(Self::custom_days(day(start)?, day(end)?))
    }

    /// Inclusive bounds at `now`; `None` for an inverted custom window
    pub fn bounds(&self, now: OffsetDateTime) -> Option<(OffsetDateTime, OffsetDateTime)> {
        match *self {
            Self::Preset(preset) => Some((preset.cutoff(now), now)),
            Self::Custom { start, end } if start <= end => Some((start, end)),
            Self::Custom { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Preset(preset) => preset.code().to_string(),
            Self::Custom { start, end } => format!("{} - {}", day_label(*start), day_label(*end)),
        }
    }
}

/// Insights whose timeline overlaps the window. Unknown timelines never match.
pub fn filter_by_window<'a>(
    insights: impl IntoIterator<Item = &'a MappedInsight>,
    window: &DateWindow,
    now: OffsetDateTime,
) -> Vec<&'a MappedInsight> {
    let Some((window_start, window_end)) = window.bounds(now) else {
        return Vec::new();
    };

    insights
        .into_iter()
        .filter(|insight| {
            TimelineRange::parse_label(&insight.timeline)
                .is_some_and(|range| range.overlaps(window_start, window_end))
        })
        .collect()
}

/// Range filter bound to a clock
pub struct RangeFilter<C: Clock + ?Sized> {
    clock: Arc<C>,
}

impl<C: Clock + ?Sized> RangeFilter<C> {
    pub fn new(clock: Arc<C>) -> Self {
        Self { clock }
    }

    pub fn filter<'a>(
        &self,
        insights: &'a [MappedInsight],
        window: &DateWindow,
    ) -> Vec<&'a MappedInsight> {
        filter_by_window(insights, window, self.clock.now())
    }
}

/// Summed mentions for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTotal {
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Mentions")]
    pub mentions: u64,
}

/// Sum mentions per exact topic, highest first. Ties keep first-appearance order.
pub fn aggregate_by_topic<'a>(
    insights: impl IntoIterator<Item = &'a MappedInsight>,
    limit: usize,
) -> Vec<TopicTotal> {
    let mut totals: Vec<TopicTotal> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for insight in insights {
        match index.get(insight.topic.as_str()) {
            Some(&i) => {
                totals[i].mentions = totals[i].mentions.saturating_add(insight.mentions)
            }
            None => {
                index.insert(insight.topic.as_str(), totals.len());
                totals.push(TopicTotal {
                    topic: insight.topic.clone(),
                    mentions: insight.mentions,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    totals.truncate(limit);
    totals
}

/// Word-cloud significance settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudOptions {
    /// Maximum number of terms
    pub limit: usize,
    /// Absolute minimum total
    pub floor: u64,
    /// Minimum total relative to the top term
    pub relative_threshold: f64,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            limit: 30,
            floor: 5,
            relative_threshold: 0.3,
        }
    }
}

/// Significant topics for a word cloud
pub fn cloud_terms<'a>(
    insights: impl IntoIterator<Item = &'a MappedInsight>,
    options: CloudOptions,
) -> Vec<TopicTotal> {
    let totals: Vec<TopicTotal> = aggregate_by_topic(insights, usize::MAX)
        .into_iter()
        .filter_map(|total| {
            let topic = total.topic.trim();
            (!topic.is_empty() && total.mentions > 0).then(|| TopicTotal {
                topic: topic.to_string(),
                mentions: total.mentions,
            })
        })
        .collect();

    let Some(top) = totals.first().map(|t| t.mentions) else {
        return totals;
    };
    let threshold = (options.floor as f64).max(top as f64 * options.relative_threshold);

    totals
        .into_iter()
        .filter(|total| total.mentions as f64 >= threshold)
        .take(options.limit)
        .collect()
}
