//! Status wipe
//!
//! Removes a status together with everything derived from it. Steps are
//! independent: each one runs regardless of earlier failures, and every
//! failure is reported in the combined error.

use crate::data::Status;
use crate::error::{AppError, MultiError, Result};

use super::SideEffects;

/// What to do with a wiped status's attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPolicy {
    /// Delete the media outright
    Delete,
    /// Detach the media but keep it, so the author can reuse it
    /// (delete and redraft)
    Unattach,
}

/// Failure bookkeeping for one wipe
struct WipeErrors<'a> {
    status_id: &'a str,
    errors: MultiError,
}

impl<'a> WipeErrors<'a> {
    fn new(status_id: &'a str) -> Self {
        Self {
            status_id,
            errors: MultiError::new(),
        }
    }

    fn check<T>(&mut self, step: &'static str, context: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.record(step, context, error);
                None
            }
        }
    }

    fn record(&mut self, step: &'static str, context: &str, error: AppError) {
        tracing::warn!(
            status_id = %self.status_id,
            step,
            error = %error,
            "{context}"
        );
        crate::metrics::SIDE_EFFECT_FAILURES_TOTAL
            .with_label_values(&["wipe_status", step])
            .inc();
        self.errors.append(context, error);
    }

    fn combine(self) -> Result<()> {
        self.errors.combine()
    }
}

impl SideEffects {
    /// Delete a status and all of its dependents
    ///
    /// Attachments, mentions, notifications, bookmarks, faves, the poll
    /// and its votes, boosts, timeline entries and conversation entries
    /// all go before the status row itself. A scheduled poll expiry is
    /// cancelled on a best-effort basis and never reported.
    ///
    /// # Errors
    /// Returns `AppError::Multi` listing every step that failed
    pub async fn wipe_status(&self, status: &Status, attachments: AttachmentPolicy) -> Result<()> {
        let mut errs = WipeErrors::new(&status.id);

        for id in &status.attachment_ids {
            match attachments {
                AttachmentPolicy::Delete => {
                    let result = self.media.delete(id).await;
                    errs.check("delete_media", "error deleting media", result);
                }
                AttachmentPolicy::Unattach => {
                    let result = self.media.unattach(&status.account_id, id).await;
                    errs.check("unattach_media", "error unattaching media", result);
                }
            }
        }

        for id in &status.mention_ids {
            let result = self.store.delete_mention_by_id(id).await;
            errs.check("delete_mention", "error deleting status mention", result);
        }

        let result = self.store.delete_notifications_for_status(&status.id).await;
        errs.check(
            "delete_notifications",
            "error deleting status notifications",
            result,
        );

        let result = self.store.delete_status_bookmarks_for_status(&status.id).await;
        errs.check("delete_bookmarks", "error deleting status bookmarks", result);

        let result = self.store.delete_status_faves_for_status(&status.id).await;
        errs.check("delete_faves", "error deleting status faves", result);

        if let Some(poll_id) = status.poll_id.as_deref() {
            let result = self.store.delete_poll_by_id(poll_id).await;
            errs.check("delete_poll", "error deleting status poll", result);

            let result = self.store.delete_poll_votes(poll_id).await;
            errs.check("delete_poll_votes", "error deleting status poll votes", result);

            let _ = self.scheduler.cancel(poll_id);
        }

        // Boosts are read barebones: the boosted status may already be gone.
        let result = self.store.get_status_boosts(&status.id).await;
        let boosts = errs
            .check("fetch_boosts", "error fetching status boosts", result)
            .unwrap_or_default();

        for boost in &boosts {
            let result = self.timelines.remove_status(&boost.id).await;
            errs.check(
                "remove_boost_from_timelines",
                "error deleting boost from timelines",
                result,
            );

            let result = self.store.delete_status_by_id(&boost.id).await;
            errs.check("delete_boost", "error deleting boost", result);
        }

        let result = self.timelines.remove_status(&status.id).await;
        errs.check(
            "remove_from_timelines",
            "error deleting status from timelines",
            result,
        );

        let result = self.store.delete_status_from_conversations(&status.id).await;
        errs.check(
            "remove_from_conversations",
            "error deleting status from conversations",
            result,
        );

        let result = self.store.delete_status_by_id(&status.id).await;
        errs.check("delete_status", "error deleting status", result);

        tracing::debug!(
            status_id = %status.id,
            boosts = boosts.len(),
            failures = errs.errors.len(),
            "Wiped status"
        );

        errs.combine()
    }
}
