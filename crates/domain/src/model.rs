//! Domain models and value objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::fields;

/// A single post/comment reference contributing to an insight
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mention {
    /// When the source post was made (`date_posted` / `data_posted`)
    pub date_posted: Option<OffsetDateTime>,
    /// First usable time on the mention, including generic stamps; used for bucketing
    pub timestamp: Option<OffsetDateTime>,
    pub post_id: Option<String>,
    pub post_title: Option<String>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub author: Option<String>,
    pub url: Option<String>,
    /// Sentiment in [-1, 1] when the extractor produced one
    pub sentiment_score: Option<f64>,
}

impl Mention {
    /// Read a stored mention; non-object values yield an empty mention
    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            return Self::default();
        };

        Self {
            date_posted: fields::MENTION_POSTED.lookup(record),
            timestamp: fields::MENTION_TIMESTAMP.lookup(record),
            post_id: fields::POST_ID.lookup(record),
            post_title: fields::POST_TITLE.lookup(record),
            score: fields::SCORE.lookup(record),
            num_comments: fields::NUM_COMMENTS.lookup(record),
            author: fields::AUTHOR.lookup(record),
            url: fields::URL.lookup(record),
            sentiment_score: fields::SENTIMENT.lookup(record),
        }
    }
}

/// A topic extracted from a subreddit's discussion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInsight {
    /// Topic text (`topic`, or the older `insight` field)
    pub topic: Option<String>,
    /// Direct timestamp, when the extractor recorded one
    pub date: Option<OffsetDateTime>,
    /// Contributing mentions in stored order
    pub mentions: Vec<Mention>,
    /// Precomputed count; authoritative when present
    pub num_mentions: Option<u64>,
    pub generated_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub created_at: Option<OffsetDateTime>,
}

impl RawInsight {
    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            return Self::default();
        };

        Self {
            topic: fields::TOPIC.lookup(record),
            date: fields::INSIGHT_DATE.lookup(record),
            mentions: fields::MENTIONS
                .lookup(record)
                .map(|items| items.iter().map(Mention::from_value).collect())
                .unwrap_or_default(),
            num_mentions: fields::MENTION_COUNT.lookup(record),
            generated_at: fields::GENERATED_AT.lookup(record),
            updated_at: fields::UPDATED_AT.lookup(record),
            created_at: fields::CREATED_AT.lookup(record),
        }
    }
}

/// A curated subset of a raw insight produced by a named filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredInsight {
    /// The raw-insight-shaped part of the record
    pub insight: RawInsight,
    /// Filter-specific direct date (`date`, `filter_date`, `filtered_at`, `generated_at`)
    pub filter_date: Option<OffsetDateTime>,
    /// Name of the filter that produced this subset
    pub filter_type: Option<String>,
    /// Free-form criteria; may carry a `date_range`
    pub filter_criteria: Option<Map<String, Value>>,
}

impl FilteredInsight {
    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            return Self::default();
        };

        Self {
            insight: RawInsight::from_value(value),
            filter_date: fields::FILTER_DATE.lookup(record),
            filter_type: fields::FILTER_TYPE.lookup(record),
            filter_criteria: fields::FILTER_CRITERIA.lookup(record),
        }
    }
}

/// 24-hex-digit document identifier, stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid document id '{0}': expected 24 hex digits")]
pub struct InvalidDocumentId(pub String);

impl DocumentId {
    pub const LEN: usize = 24;

    pub fn parse(raw: &str) -> Result<Self, InvalidDocumentId> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(InvalidDocumentId(raw.to_string()))
        }
    }

    /// Generate an id laid out like an ObjectId: 4-byte timestamp then random bytes
    pub fn generate(at: OffsetDateTime) -> Self {
        let seconds = at.unix_timestamp().clamp(0, i64::from(u32::MAX));
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{:08x}{}", seconds, &random[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error reading an exported document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is not a JSON object")]
    NotAnObject,
    #[error("Document has no subreddit")]
    MissingSubreddit,
    #[error(transparent)]
    InvalidId(#[from] InvalidDocumentId),
}

/// Top-level stored unit: all insights for one subreddit from one ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct InsightDocument {
    pub id: DocumentId,
    pub subreddit: String,
    /// Stored raw insights, mapped fresh on every query
    pub raw_insights: Vec<Value>,
    /// Stored filtered insights, mapped fresh on every query
    pub filtered_insights: Vec<Value>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl InsightDocument {
    /// Read a document in mongoexport's extended-JSON shape.
    ///
    /// A document without an `_id` gets a generated one stamped with its
    /// `created_at`, or `fallback_time` when that is missing too.
    pub fn from_export(value: &Value, fallback_time: OffsetDateTime) -> Result<Self, DocumentError> {
        let record = value.as_object().ok_or(DocumentError::NotAnObject)?;
        let subreddit = fields::SUBREDDIT
            .lookup(record)
            .ok_or(DocumentError::MissingSubreddit)?;
        let created_at = fields::CREATED_AT.lookup(record);
        let updated_at = fields::UPDATED_AT.lookup(record);

        let id = match fields::DOCUMENT_ID.lookup(record) {
            Some(raw) => DocumentId::parse(&raw)?,
            None => DocumentId::generate(created_at.unwrap_or(fallback_time)),
        };

        Ok(Self {
            id,
            subreddit,
            raw_insights: fields::RAW_INSIGHTS.lookup(record).unwrap_or_default(),
            filtered_insights: fields::FILTERED_INSIGHTS.lookup(record).unwrap_or_default(),
            created_at,
            updated_at,
        })
    }
}

impl InsightDocument {
    /// Ordering that puts the latest document first: `created_at` descending
    /// with undated documents last, then id descending
    pub fn latest_first(a: &Self, b: &Self) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| b.id.cmp(&a.id))
    }
}

/// One histogram bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionBucket {
    /// Bucket label (`YYYY-MM-DD` or `YYYY-MM-DDTHH:00:00Z`)
    pub date: String,
    pub count: u64,
}

/// Uniform insight shape consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedInsight {
    #[serde(rename = "Topic")]
    pub topic: String,
    /// Resolved timeline label; `"Unknown date"` when nothing resolves
    #[serde(rename = "Timeline")]
    pub timeline: String,
    #[serde(rename = "Mentions")]
    pub mentions: u64,
    #[serde(
        rename = "HourlyMentions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hourly_mentions: Option<Vec<MentionBucket>>,
    #[serde(
        rename = "DailyMentions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub daily_mentions: Option<Vec<MentionBucket>>,
    #[serde(rename = "FilterType", default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(
        rename = "FilterCriteria",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_criteria: Option<Map<String, Value>>,
}

/// Why the served document differs from an exact requested match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// No id was requested
    MissingId,
    /// The requested id is not a well-formed identifier
    InvalidId,
    /// No document exists with the requested id
    NotFound,
    /// The requested id belongs to another subreddit
    SubredditMismatch,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingId => "missing-id",
            Self::InvalidId => "invalid-id",
            Self::NotFound => "not-found",
            Self::SubredditMismatch => "subreddit-mismatch",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotation attached to degraded query matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fallback {
    pub reason: FallbackReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_subreddit: Option<String>,
}

/// Insight query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    #[serde(rename = "Subreddit")]
    pub subreddit: String,
    #[serde(rename = "Raw_insights")]
    pub raw_insights: Vec<MappedInsight>,
    #[serde(rename = "Filtered_Insights")]
    pub filtered_insights: Vec<MappedInsight>,
    #[serde(rename = "Resolved_Id")]
    pub resolved_id: String,
    #[serde(rename = "Fallback", default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
}

/// Chat participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Registered dashboard user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Always stored lowercase
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Registration input; missing fields are reported by validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}
