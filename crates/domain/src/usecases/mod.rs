//! Application use cases / business logic

pub mod chat;
pub mod map;
pub mod query;
pub mod range;
pub mod users;

pub use chat::ChatUseCase;
pub use map::{InsightMapper, MapperConfig, UNKNOWN_TOPIC};
pub use query::{DEFAULT_SUBREDDIT, InsightQuery, QueryConfig, QueryError};
pub use range::{
    CloudOptions, DateWindow, Preset, RangeError, RangeFilter, TopicTotal, aggregate_by_topic,
    cloud_terms, filter_by_window,
};
pub use users::{MAX_NAME_LEN, UserService};
