//! Mention counting and histogram bucketing

use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::dates::{day_label, hour_label, start_of_day, start_of_hour, utc_date};
use crate::model::{MentionBucket, RawInsight};
use crate::timeline::Timeline;

/// Histogram resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn truncate(self, instant: OffsetDateTime) -> OffsetDateTime {
        match self {
            Self::Hourly => start_of_hour(instant),
            Self::Daily => start_of_day(utc_date(instant)),
        }
    }

    pub fn label(self, instant: OffsetDateTime) -> String {
        match self {
            Self::Hourly => hour_label(instant),
            Self::Daily => day_label(instant),
        }
    }
}

/// Precomputed count when valid, else the number of mentions
pub fn mention_count(insight: &RawInsight) -> u64 {
    insight
        .num_mentions
        .unwrap_or(insight.mentions.len() as u64)
}

/// Group dated mentions into ascending buckets.
///
/// An insight without mentions gets one synthetic bucket carrying its total
/// count, anchored on the first date it has. Mentions without a resolvable
/// date are skipped.
pub fn bucket_mentions(
    insight: &RawInsight,
    timeline: &Timeline,
    granularity: Granularity,
) -> Vec<MentionBucket> {
    if insight.mentions.is_empty() {
        return synthetic_bucket(insight, timeline, granularity)
            .into_iter()
            .collect();
    }

    let mut counts: BTreeMap<OffsetDateTime, u64> = BTreeMap::new();
    for posted in insight.mentions.iter().filter_map(|m| m.timestamp) {
        *counts.entry(granularity.truncate(posted)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(bucket, count)| MentionBucket {
            date: granularity.label(bucket),
            count,
        })
        .collect()
}

fn synthetic_bucket(
    insight: &RawInsight,
    timeline: &Timeline,
    granularity: Granularity,
) -> Option<MentionBucket> {
    let anchor = insight
        .date
        .or(insight.generated_at)
        .or(insight.updated_at)
        .or(insight.created_at)
        .or_else(|| timeline.range.map(|range| range.start))?;

    Some(MentionBucket {
        date: granularity.label(anchor),
        count: mention_count(insight),
    })
}
