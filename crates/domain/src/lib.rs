//! subreddit-insights domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Application use cases / business logic
//! - `dates`, `fields`, `timeline`, `mentions`: Normalization of loosely-typed stored insights

pub mod dates;
pub mod fields;
pub mod mentions;
pub mod model;
pub mod ports;
pub mod timeline;
pub mod usecases;

pub use model::*;
pub use ports::*;
