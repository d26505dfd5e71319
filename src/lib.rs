//! RustResort workers - side-effect processing for a federated social server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Upstream event handlers                     │
//! │  - Inbox / client API processing (not part of this crate)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Status wipes, follower redirects                         │
//! │  - Account stats counters, interaction approvals            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Timeline cache (moka)                                    │
//! │  - Local media storage, outbox, scheduler                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: Side-effect operations and the relationship processor
//! - `data`: Store contract, SQLite database and timeline cache
//! - `storage`: Local media storage
//! - `federation`: Outbound activity queue
//! - `locks`: Per-account processing locks
//! - `scheduler`: Keyed one-off task scheduler
//! - `uris`: URI generation for local objects
//! - `config`: Configuration management
//! - `logging`: Tracing subscriber setup
//! - `metrics`: Prometheus instruments
//! - `error`: Error types

pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod uris;

use std::sync::Arc;

/// Application state shared across all event handlers
///
/// Cloning is cheap; every resource is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Per-account processing locks
    pub locks: Arc<locks::LockRegistry>,

    /// Scheduled one-off tasks (poll expiry)
    pub scheduler: Arc<scheduler::TaskScheduler>,

    /// Timeline cache (volatile)
    pub timelines: Arc<data::TimelineCache>,

    /// Local media storage
    pub media: Arc<storage::MediaService>,

    /// Follow relationship processor
    pub relationships: Arc<service::RelationshipService>,

    /// Outbound activity queue
    pub outbox: Arc<federation::Outbox>,

    /// Side-effect operations
    pub side_effects: service::SideEffects,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Prepare the media directory
    /// 3. Initialize caches, scheduler and outbox
    /// 4. Wire the side-effect processor
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");
        metrics::init_metrics();

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Prepare the media directory
        tokio::fs::create_dir_all(&config.storage.media.path)
            .await
            .map_err(|e| {
                error::AppError::Storage(format!(
                    "cannot create media directory {}: {}",
                    config.storage.media.path.display(),
                    e
                ))
            })?;

        // 3. Initialize caches, scheduler and outbox
        let timelines = data::TimelineCache::new(config.cache.timeline_max_items);
        tracing::info!("Caches initialized");

        Self::with_parts(
            config,
            Arc::new(db),
            Arc::new(timelines),
            Arc::new(scheduler::TaskScheduler::new()),
            Arc::new(federation::Outbox::new()),
        )
    }

    /// Build application state around caller-supplied resources
    ///
    /// # Errors
    /// Returns `Config` if the instance base URL is invalid
    pub fn with_parts(
        config: config::AppConfig,
        db: Arc<data::Database>,
        timelines: Arc<data::TimelineCache>,
        scheduler: Arc<scheduler::TaskScheduler>,
        outbox: Arc<federation::Outbox>,
    ) -> Result<Self, error::AppError> {
        let uris = uris::UriBuilder::new(&config.instance.base_url())?;
        let store: Arc<dyn data::Store> = db.clone();
        let locks = Arc::new(locks::LockRegistry::new());

        let media = Arc::new(storage::MediaService::new(
            store.clone(),
            config.storage.media.path.clone(),
        ));
        let relationships = Arc::new(service::RelationshipService::new(
            store.clone(),
            outbox.clone(),
            uris.clone(),
        ));

        let side_effects = service::SideEffects::new(
            store,
            locks.clone(),
            media.clone(),
            relationships.clone(),
            timelines.clone(),
            scheduler.clone(),
            uris,
        );

        tracing::info!(base_url = %config.instance.base_url(), "Application state initialized");

        Ok(Self {
            config: Arc::new(config),
            db,
            locks,
            scheduler,
            timelines,
            media,
            relationships,
            outbox,
            side_effects,
        })
    }
}
