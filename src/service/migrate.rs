//! Follower redirection for account moves
//!
//! Unlike status wipes this is fail-fast: the first error stops the
//! redirect. Followers already processed keep their new follow, the rest
//! are picked up when the move is processed again.

use crate::data::Account;
use crate::error::{Result, ResultExt};

use super::SideEffects;
use super::relationship::FollowParams;

impl SideEffects {
    /// Re-point every local follower of `origin` to `target`
    ///
    /// Each follower gets a follow of `target` carrying over its old
    /// reblog and notify preferences, then loses its follow of `origin`.
    /// A follower that is `target` itself only loses the old follow.
    ///
    /// Both accounts must already be resolved and the move validated.
    ///
    /// # Returns
    /// `true` if every follower was redirected
    pub async fn redirect_followers(&self, origin: &Account, target: &Account) -> bool {
        match self.try_redirect_followers(origin, target).await {
            Ok(redirected) => {
                crate::metrics::FOLLOWER_REDIRECTS_TOTAL
                    .with_label_values(&["success"])
                    .inc();
                tracing::info!(
                    origin_account_id = %origin.id,
                    target_account_id = %target.id,
                    redirected,
                    "Redirected followers"
                );
                true
            }
            Err(e) => {
                crate::metrics::FOLLOWER_REDIRECTS_TOTAL
                    .with_label_values(&["failure"])
                    .inc();
                tracing::error!(
                    origin_account_id = %origin.id,
                    target_account_id = %target.id,
                    error = %e,
                    "Failed to redirect followers"
                );
                false
            }
        }
    }

    async fn try_redirect_followers(&self, origin: &Account, target: &Account) -> Result<usize> {
        let followers = match self.store.get_account_local_followers(&origin.id).await {
            Ok(followers) => followers,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.context("db error getting follows targeting origin account")),
        };

        for follow in &followers {
            let follower = self
                .store
                .get_account_by_id(&follow.account_id)
                .await
                .context(&format!("db error getting follow account {}", follow.account_id))?;

            if follower.id != target.id {
                let params = FollowParams {
                    target_account_id: target.id.clone(),
                    show_reblogs: Some(follow.show_reblogs),
                    notify: Some(follow.notify),
                };
                self.relationships
                    .follow_create(&follower, params)
                    .await
                    .context(&format!(
                        "error creating new follow for account {}",
                        follower.id
                    ))?;
            }

            self.relationships
                .follow_remove(&follower, &follow.target_account_id)
                .await
                .context(&format!(
                    "error removing old follow for account {}",
                    follower.id
                ))?;
        }

        Ok(followers.len())
    }
}
