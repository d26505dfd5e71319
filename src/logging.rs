//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Errors
/// Returns `Config` if a global subscriber is already installed
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()
    };

    installed.map_err(|e| AppError::Config(format!("failed to install subscriber: {e}")))
}

fn default_filter(level: &str) -> String {
    format!("rustresort_workers={level},sqlx=warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
        };

        // Another test may have installed a subscriber first.
        let _ = init(&config);
        assert!(matches!(init(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn default_filter_scopes_level_to_crate() {
        assert_eq!(default_filter("warn"), "rustresort_workers=warn,sqlx=warn");
    }
}
