//! Error types for RustResort workers
//!
//! All errors raised by side-effect processing are converted to `AppError`.
//! Independent steps that must all run (status wipes) collect their
//! failures in a [`MultiError`] and combine them at the end.

use std::fmt;

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Access denied
    #[error("Access denied")]
    Forbidden,

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Federation error (outbox closed, malformed activity)
    #[error("Federation error: {0}")]
    Federation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// An error annotated with the step that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AppError>,
    },

    /// Every failure collected while running independent steps
    #[error("{0}")]
    Multi(MultiError),
}

impl AppError {
    /// Wrap this error with a description of the failing step.
    pub fn context(self, context: impl Into<String>) -> Self {
        AppError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it annotates) is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound => true,
            AppError::Database(sqlx::Error::RowNotFound) => true,
            AppError::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Attach step context to fallible results.
pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|error| error.context(context))
    }
}

/// Accumulator for failures of independent steps
///
/// Steps append their failures and keep going; [`MultiError::combine`]
/// turns the collection into `Ok(())` when nothing failed, or a single
/// [`AppError::Multi`] listing every failure in the order it happened.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<AppError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure annotated with the step that produced it.
    pub fn append(&mut self, context: impl Into<String>, error: AppError) {
        self.errors.push(error.context(context));
    }

    /// Record `result`'s error, if any, under `context`.
    pub fn check<T>(&mut self, context: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.append(context, error);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[AppError] {
        &self.errors
    }

    /// Step annotations of the collected failures, in order.
    pub fn contexts(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|error| match error {
                AppError::Context { context, .. } => Some(context.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `Ok(())` if nothing was appended, otherwise the combined error.
    pub fn combine(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Multi(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
