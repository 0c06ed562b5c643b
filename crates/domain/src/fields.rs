//! Field lookup tables for drifting document schemas
//!
//! Documents accumulated over many ingestion runs disagree on field names
//! (`topic` vs `insight`, `date_posted` vs the `data_posted` typo, ...). Each
//! logical attribute gets one ordered table of candidate names plus the
//! normalizer applied to whatever is found. The first candidate that
//! normalizes successfully wins.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::dates::resolve_instant;

/// Ordered candidate field names for one logical attribute
pub struct FieldTable<T> {
    candidates: &'static [&'static str],
    normalize: fn(&Value) -> Option<T>,
}

impl<T> FieldTable<T> {
    pub const fn new(
        candidates: &'static [&'static str],
        normalize: fn(&Value) -> Option<T>,
    ) -> Self {
        Self {
            candidates,
            normalize,
        }
    }

    /// Candidate names in priority order
    pub fn candidates(&self) -> &'static [&'static str] {
        self.candidates
    }

    /// Look the attribute up in a record
    pub fn lookup(&self, record: &Map<String, Value>) -> Option<T> {
        self.candidates
            .iter()
            .filter_map(|name| record.get(*name))
            .find_map(self.normalize)
    }
}

pub const TOPIC: FieldTable<String> = FieldTable::new(&["topic", "insight"], non_blank_text);

pub const INSIGHT_DATE: FieldTable<OffsetDateTime> = FieldTable::new(&["date"], resolve_instant);

pub const FILTER_DATE: FieldTable<OffsetDateTime> = FieldTable::new(
    &["date", "filter_date", "filtered_at", "generated_at"],
    resolve_instant,
);

pub const GENERATED_AT: FieldTable<OffsetDateTime> =
    FieldTable::new(&["generated_at"], resolve_instant);

pub const UPDATED_AT: FieldTable<OffsetDateTime> =
    FieldTable::new(&["updated_at"], resolve_instant);

pub const CREATED_AT: FieldTable<OffsetDateTime> =
    FieldTable::new(&["created_at"], resolve_instant);

/// Post time that dates an insight's timeline
pub const MENTION_POSTED: FieldTable<OffsetDateTime> =
    FieldTable::new(&["date_posted", "data_posted"], resolve_instant);

/// Any usable mention time, for histogram buckets
pub const MENTION_TIMESTAMP: FieldTable<OffsetDateTime> = FieldTable::new(
    &["date_posted", "data_posted", "date", "created_at", "timestamp"],
    resolve_instant,
);

pub const MENTION_COUNT: FieldTable<u64> = FieldTable::new(&["num_mentions"], non_negative_count);

pub const MENTIONS: FieldTable<Vec<Value>> = FieldTable::new(&["mentions"], array);

pub const FILTER_TYPE: FieldTable<String> = FieldTable::new(&["filter_type"], text);

pub const FILTER_CRITERIA: FieldTable<Map<String, Value>> =
    FieldTable::new(&["filter_criteria"], object);

pub const RANGE_START: FieldTable<OffsetDateTime> =
    FieldTable::new(&["start", "from"], resolve_instant);

pub const RANGE_END: FieldTable<OffsetDateTime> = FieldTable::new(&["end", "to"], resolve_instant);

pub const SUBREDDIT: FieldTable<String> = FieldTable::new(&["subreddit"], non_blank_text);

pub const DOCUMENT_ID: FieldTable<String> = FieldTable::new(&["_id", "id"], object_id_text);

pub const RAW_INSIGHTS: FieldTable<Vec<Value>> = FieldTable::new(&["raw_insights"], array);

pub const FILTERED_INSIGHTS: FieldTable<Vec<Value>> =
    FieldTable::new(&["filtered_insights"], array);

pub const POST_ID: FieldTable<String> = FieldTable::new(&["post_id"], text);
pub const POST_TITLE: FieldTable<String> = FieldTable::new(&["post_title"], text);
pub const AUTHOR: FieldTable<String> = FieldTable::new(&["author"], text);
pub const URL: FieldTable<String> = FieldTable::new(&["url"], text);
pub const SCORE: FieldTable<i64> = FieldTable::new(&["score"], integer);
pub const NUM_COMMENTS: FieldTable<i64> = FieldTable::new(&["num_comments"], integer);
pub const SENTIMENT: FieldTable<f64> = FieldTable::new(&["sentiment_score"], number);

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn non_blank_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn non_negative_count(value: &Value) -> Option<u64> {
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.trunc() as u64)
}

fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|n| n.is_finite()).map(|n| n as i64))
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn array(value: &Value) -> Option<Vec<Value>> {
    value.as_array().cloned()
}

fn object(value: &Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

/// Plain string ids or extended JSON `{"$oid": "..."}`
fn object_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
