//! Insight mapping use case - stored insight shapes to the uniform output shape

use serde_json::Value;

use crate::{
    mentions::{Granularity, bucket_mentions, mention_count},
    model::{FilteredInsight, MappedInsight, RawInsight},
    timeline::{resolve_filtered_timeline, resolve_raw_timeline},
};

/// Topic used when the stored one is missing or blank
pub const UNKNOWN_TOPIC: &str = "Unknown topic";

/// Configuration for the mapper
#[derive(Debug, Clone, Copy)]
pub struct MapperConfig {
    /// Attach `HourlyMentions` to raw insights
    pub hourly_histogram: bool,
    /// Attach `DailyMentions` to raw insights
    pub daily_histogram: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            hourly_histogram: true,
            daily_histogram: false,
        }
    }
}

/// Pure mapper; never consults the wall clock
#[derive(Debug, Clone, Default)]
pub struct InsightMapper {
    config: MapperConfig,
}

impl InsightMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn map_raw(&self, insight: &RawInsight) -> MappedInsight {
        let timeline = resolve_raw_timeline(insight);

        let histogram = |enabled: bool, granularity| {
            enabled.then(|| bucket_mentions(insight, &timeline, granularity))
        };
        let hourly_mentions = histogram(self.config.hourly_histogram, Granularity::Hourly);
        let daily_mentions = histogram(self.config.daily_histogram, Granularity::Daily);

        MappedInsight {
            topic: topic_of(insight),
            timeline: timeline.label,
            mentions: mention_count(insight),
            hourly_mentions,
            daily_mentions,
            filter_type: None,
            filter_criteria: None,
        }
    }

    pub fn map_filtered(&self, insight: &FilteredInsight) -> MappedInsight {
        let timeline = resolve_filtered_timeline(insight);

        MappedInsight {
            topic: topic_of(&insight.insight),
            timeline: timeline.label,
            mentions: mention_count(&insight.insight),
            hourly_mentions: None,
            daily_mentions: None,
            filter_type: insight.filter_type.clone(),
            filter_criteria: insight.filter_criteria.clone(),
        }
    }

    /// Map a stored raw insight value
    pub fn map_raw_value(&self, value: &Value) -> MappedInsight {
        self.map_raw(&RawInsight::from_value(value))
    }

    /// Map a stored filtered insight value
    pub fn map_filtered_value(&self, value: &Value) -> MappedInsight {
        self.map_filtered(&FilteredInsight::from_value(value))
    }
}

fn topic_of(insight: &RawInsight) -> String {
    insight
        .topic
        .clone()
        .unwrap_or_else(|| UNKNOWN_TOPIC.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_surge_pricing_without_dates() {
        let mapped = InsightMapper::default().map_raw_value(&json!({
            "topic": "Surge pricing",
            "num_mentions": 5,
            "mentions": []
        }));

        assert_eq!(
            serde_json::to_value(&mapped).unwrap(),
            json!({
                "Topic": "Surge pricing",
                "Timeline": "Unknown date",
                "Mentions": 5,
                "HourlyMentions": []
            })
        );
    }

    #[test]
    fn test_two_mentions_same_day() {
        let mapped = InsightMapper::default().map_raw_value(&json!({
            "topic": "X",
            "date": "2024-01-05",
            "mentions": [
                {"date_posted": "2024-01-05T10:00:00Z"},
                {"date_posted": "2024-01-05T14:00:00Z"}
            ],
            "num_mentions": 2
        }));

        assert_eq!(mapped.timeline, "2024-01-05");
        assert_eq!(mapped.mentions, 2);
        assert_eq!(
            serde_json::to_value(&mapped.hourly_mentions).unwrap(),
            json!([
                {"date": "2024-01-05T10:00:00Z", "count": 1},
                {"date": "2024-01-05T14:00:00Z", "count": 1}
            ])
        );
    }

    #[test]
    fn test_blank_topic_defaults() {
        let mapper = InsightMapper::default();
        assert_eq!(mapper.map_raw_value(&json!({"topic": "   "})).topic, UNKNOWN_TOPIC);
        assert_eq!(mapper.map_raw_value(&json!({})).topic, UNKNOWN_TOPIC);
        assert_eq!(mapper.map_raw_value(&json!({"insight": "Tips"})).topic, "Tips");
    }

    #[test]
    fn test_histogram_config() {
        let mapper = InsightMapper::new(MapperConfig {
            hourly_histogram: false,
            daily_histogram: true,
        });
        let mapped = mapper.map_raw_value(&json!({
            "topic": "Tips",
            "mentions": [{"date_posted": "2024-01-05T10:00:00Z"}]
        }));

        assert!(mapped.hourly_mentions.is_none());
        assert_eq!(mapped.daily_mentions.unwrap()[0].date, "2024-01-05");
    }

    #[test]
    fn test_filtered_carries_filter_metadata_only() {
        let mapper = InsightMapper::default();
        let mapped = mapper.map_filtered_value(&json!({
            "topic": "Deactivations",
            "num_mentions": 9,
            "filter_type": "high_engagement",
            "filter_criteria": {"min_score": 50, "date_range": ["2024-01-01", "2024-01-07"]},
            "mentions": [{"date_posted": "2024-01-03T00:00:00Z"}]
        }));

        let value = serde_json::to_value(&mapped).unwrap();
        assert_eq!(value["Timeline"], "2024-01-01 - 2024-01-07");
        assert_eq!(value["Mentions"], 9);
        assert_eq!(value["FilterType"], "high_engagement");
        assert_eq!(value["FilterCriteria"]["min_score"], 50);
        assert!(value.get("HourlyMentions").is_none());
    }

    #[test]
    fn test_filtered_drops_mistyped_filter_fields() {
        let mapped = InsightMapper::default().map_filtered_value(&json!({
            "topic": "Tips",
            "filter_type": 3,
            "filter_criteria": "recent"
        }));
        assert!(mapped.filter_type.is_none());
        assert!(mapped.filter_criteria.is_none());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let stored = json!({
            "topic": "Airport queue",
            "mentions": [
                {"date_posted": 1_704_448_800_000_i64},
                {"date_posted": "2024-01-04T22:00:00Z"}
            ]
        });
        let mapper = InsightMapper::new(MapperConfig {
            hourly_histogram: true,
            daily_histogram: true,
        });

        let first = serde_json::to_string(&mapper.map_raw_value(&stored)).unwrap();
        let second = serde_json::to_string(&mapper.map_raw_value(&stored)).unwrap();
        assert_eq!(first, second);
    }
}
