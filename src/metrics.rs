//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::{AppError, Result};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Side-effect Metrics
    pub static ref SIDE_EFFECT_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_side_effect_failures_total", "Total number of failed side-effect steps"),
        &["operation", "step"]
    ).expect("metric can be created");
    pub static ref ACCOUNT_STATS_UPDATES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_account_stats_updates_total", "Total number of account stats counter updates"),
        &["counter", "direction"]
    ).expect("metric can be created");
    pub static ref FOLLOWER_REDIRECTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_follower_redirects_total", "Total number of follower redirects after account moves"),
        &["result"]
    ).expect("metric can be created");
    pub static ref INTERACTION_APPROVALS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_interaction_approvals_total", "Total number of approved interactions"),
        &["interaction_type"]
    ).expect("metric can be created");
    pub static ref SCHEDULED_TASKS_CANCELLED_TOTAL: IntCounter = IntCounter::new(
        "rustresort_scheduled_tasks_cancelled_total",
        "Total number of cancelled scheduled tasks"
    ).expect("metric can be created");

    // Federation Metrics
    pub static ref ACTIVITYPUB_ACTIVITIES_QUEUED: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_activitypub_activities_queued_total", "Total number of ActivityPub activities queued for delivery"),
        &["activity_type"]
    ).expect("metric can be created");

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustresort_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("rustresort_cache_size", "Current number of items in cache"),
        &["cache_name"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(SIDE_EFFECT_FAILURES_TOTAL.clone()))
            .expect("SIDE_EFFECT_FAILURES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ACCOUNT_STATS_UPDATES_TOTAL.clone()))
            .expect("ACCOUNT_STATS_UPDATES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(FOLLOWER_REDIRECTS_TOTAL.clone()))
            .expect("FOLLOWER_REDIRECTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(INTERACTION_APPROVALS_TOTAL.clone()))
            .expect("INTERACTION_APPROVALS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(SCHEDULED_TASKS_CANCELLED_TOTAL.clone()))
            .expect("SCHEDULED_TASKS_CANCELLED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ACTIVITYPUB_ACTIVITIES_QUEUED.clone()))
            .expect("ACTIVITYPUB_ACTIVITIES_QUEUED can be registered");
        REGISTRY
            .register(Box::new(CACHE_HITS_TOTAL.clone()))
            .expect("CACHE_HITS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CACHE_MISSES_TOTAL.clone()))
            .expect("CACHE_MISSES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CACHE_SIZE.clone()))
            .expect("CACHE_SIZE can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Render the registry in the Prometheus text exposition format.
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode metrics: {e}")))?;

    String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("metrics are not utf-8: {e}")))
}
