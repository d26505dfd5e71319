//! Local media storage
//!
//! Attachment files live under a single media root; rows live in the store.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::data::{MediaAttachment, Store};
use crate::error::{AppError, Result};

/// Media side of side-effect processing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Remove an attachment's file and row.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Detach an attachment from its status, keeping the media itself.
    async fn unattach(&self, account_id: &str, id: &str) -> Result<MediaAttachment>;
}

/// Media service backed by the local filesystem
pub struct MediaService {
    store: Arc<dyn Store>,
    /// Directory attachment paths are relative to
    media_root: PathBuf,
}

impl MediaService {
    pub fn new(store: Arc<dyn Store>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            media_root: media_root.into(),
        }
    }

    /// Resolve a stored relative path under the media root
    ///
    /// # Errors
    /// Returns `Storage` for absolute paths or paths escaping the root
    fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let relative = Path::new(file_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AppError::Storage(format!(
                "media path outside media root: {file_path}"
            )));
        }

        Ok(self.media_root.join(relative))
    }
}

#[async_trait]
impl MediaProcessor for MediaService {
    async fn delete(&self, id: &str) -> Result<()> {
        let attachment = self.store.get_attachment(id).await?;

        if let Some(file_path) = attachment.file_path.as_deref() {
            let path = self.resolve(file_path)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(attachment_id = %id, path = %path.display(), "Media file already gone");
                }
                Err(e) => {
                    return Err(AppError::Storage(format!(
                        "failed to remove {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        self.store.delete_attachment(id).await?;
        tracing::debug!(attachment_id = %id, "Deleted media attachment");
        Ok(())
    }

    async fn unattach(&self, account_id: &str, id: &str) -> Result<MediaAttachment> {
        let mut attachment = self.store.get_attachment(id).await?;
        if attachment.account_id != account_id {
            return Err(AppError::Forbidden);
        }

        self.store.unattach_attachment(id).await?;
        attachment.status_id = None;

        tracing::debug!(attachment_id = %id, "Unattached media from status");
        Ok(attachment)
    }
}
