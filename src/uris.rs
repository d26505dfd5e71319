//! ActivityPub URI generation for local objects

use url::Url;

use crate::error::{AppError, Result};

/// Builds URIs under the instance base URL
#[derive(Debug, Clone)]
pub struct UriBuilder {
    base_url: String,
}

impl UriBuilder {
    /// # Errors
    /// Returns `Config` if `base_url` is not an absolute http(s) URL
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid base url {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(AppError::Config(format!(
                "base url must be an absolute http(s) url: {base_url}"
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/users/{username}`
    pub fn account_uri(&self, username: &str) -> String {
        format!("{}/users/{}", self.base_url, username)
    }

    /// `{base}/users/{username}/follow/{id}`
    pub fn follow_uri(&self, username: &str, id: &str) -> String {
        format!("{}/follow/{}", self.account_uri(username), id)
    }

    /// `{base}/users/{username}/accepts/{id}`
    pub fn accept_uri(&self, username: &str, id: &str) -> String {
        format!("{}/accepts/{}", self.account_uri(username), id)
    }
}
