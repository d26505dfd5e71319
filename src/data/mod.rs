//! Data layer module
//!
//! Handles all data persistence and caching:
//! - Store contract used by side-effect processing
//! - SQLite database operations
//! - Timeline cache (volatile)

mod cache;
mod database;
mod models;
mod store;

pub use cache::{CachedStatus, TimelineCache, TimelineSurface};
pub use database::Database;
pub use models::*;
pub use store::Store;

#[cfg(test)]
pub use cache::MockTimelineSurface;
#[cfg(test)]
pub use store::MockStore;
