//! In-memory timeline cache
//!
//! Volatile and cleared on restart.
//! Uses Moka for high-performance concurrent caching.
//!
//! Populating timelines happens elsewhere; side-effect processing only
//! needs the [`TimelineSurface`] hook to drop deleted statuses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Anything that renders statuses into timelines
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimelineSurface: Send + Sync {
    /// Remove a status from every timeline it appears in.
    async fn remove_status(&self, status_id: &str) -> Result<()>;
}

// =============================================================================
// Cached Status (lightweight version for timeline)
// =============================================================================

/// Prepared timeline entry
#[derive(Debug, Clone)]
pub struct CachedStatus {
    pub id: String,
    pub account_id: String,
    /// Set when this entry is a boost
    pub boost_of_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Timeline Cache
// =============================================================================

/// Timeline cache (volatile)
///
/// Stores recently prepared statuses.
/// LRU eviction when capacity is reached.
pub struct TimelineCache {
    /// Status ID -> CachedStatus
    statuses: Cache<String, Arc<CachedStatus>>,
}

impl TimelineCache {
    /// Create new timeline cache
    ///
    /// # Arguments
    /// * `max_items` - Maximum number of statuses to cache
    pub fn new(max_items: usize) -> Self {
        let statuses = Cache::builder()
            .max_capacity(max_items as u64)
            .time_to_live(Duration::from_secs(3600 * 24 * 7)) // 7 days TTL
            .build();

        Self { statuses }
    }

    /// Insert status into cache
    pub async fn insert(&self, status: CachedStatus) {
        let id = status.id.clone();
        self.statuses.insert(id, Arc::new(status)).await;
        self.record_size();
    }

    /// Get status by ID
    pub async fn get(&self, id: &str) -> Option<Arc<CachedStatus>> {
        let result = self.statuses.get(id).await;

        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        if result.is_some() {
            CACHE_HITS_TOTAL.with_label_values(&["timeline"]).inc();
        } else {
            CACHE_MISSES_TOTAL.with_label_values(&["timeline"]).inc();
        }

        result
    }

    /// Remove a single entry
    pub async fn remove(&self, id: &str) {
        self.statuses.invalidate(id).await;
        self.record_size();
    }

    fn record_size(&self) {
        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["timeline"])
            .set(self.statuses.entry_count() as i64);
    }
}

#[async_trait]
impl TimelineSurface for TimelineCache {
    async fn remove_status(&self, status_id: &str) -> Result<()> {
        // Boost wrappers render the boosted status, so they go too.
        let wrappers: Vec<String> = self
            .statuses
            .iter()
            .filter(|entry| entry.1.boost_of_id.as_deref() == Some(status_id))
            .map(|entry| entry.1.id.clone())
            .collect();

        for id in wrappers {
            self.statuses.invalidate(&id).await;
        }
        self.remove(status_id).await;

        tracing::debug!(status_id, "Removed status from timelines");
        Ok(())
    }
}
