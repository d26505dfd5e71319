//! Persistent store contract
//!
//! Side-effect processing only talks to storage through [`Store`], so the
//! SQLite [`Database`](super::Database) can be swapped for a mock in tests.
//!
//! Reads here are "barebones": they return rows with no relations hydrated
//! (`Status::account`, attachment and mention id lists, ...). Rows touched by
//! a wipe may already be half gone, and joined reads would fail on them.
//!
//! Deletes are idempotent: removing rows that do not exist succeeds.

use async_trait::async_trait;

use super::models::*;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Fetch an account by ID. `NotFound` if absent.
    async fn get_account_by_id(&self, id: &str) -> Result<Account>;

    /// Fill `account.stats` if it is not already present.
    async fn populate_account_stats(&self, account: &mut Account) -> Result<()>;

    /// Write only `columns` of `stats`.
    async fn update_account_stats(&self, stats: &AccountStats, columns: &[StatsColumn])
    -> Result<()>;

    // =========================================================================
    // Statuses
    // =========================================================================

    /// All statuses boosting `status_id`.
    async fn get_status_boosts(&self, status_id: &str) -> Result<Vec<Status>>;

    /// Write only `columns` of `status`.
    async fn update_status(&self, status: &Status, columns: &[StatusColumn]) -> Result<()>;

    async fn delete_status_by_id(&self, id: &str) -> Result<()>;

    /// Unlink a status from every conversation, dropping emptied ones.
    async fn delete_status_from_conversations(&self, status_id: &str) -> Result<()>;

    // =========================================================================
    // Status dependents
    // =========================================================================

    async fn delete_mention_by_id(&self, id: &str) -> Result<()>;

    async fn delete_notifications_for_status(&self, status_id: &str) -> Result<()>;

    async fn delete_status_bookmarks_for_status(&self, status_id: &str) -> Result<()>;

    async fn delete_status_faves_for_status(&self, status_id: &str) -> Result<()>;

    /// Write only `columns` of `fave`.
    async fn update_status_fave(&self, fave: &StatusFave, columns: &[FaveColumn]) -> Result<()>;

    async fn delete_poll_by_id(&self, id: &str) -> Result<()>;

    async fn delete_poll_votes(&self, poll_id: &str) -> Result<()>;

    // =========================================================================
    // Media
    // =========================================================================

    /// Fetch a media attachment by ID. `NotFound` if absent.
    async fn get_attachment(&self, id: &str) -> Result<MediaAttachment>;

    /// Clear the status link of an attachment. `NotFound` if absent.
    async fn unattach_attachment(&self, id: &str) -> Result<()>;

    async fn delete_attachment(&self, id: &str) -> Result<()>;

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Follows targeting `account_id` whose follower is a local account.
    async fn get_account_local_followers(&self, account_id: &str) -> Result<Vec<Follow>>;

    async fn get_follow(&self, account_id: &str, target_account_id: &str)
    -> Result<Option<Follow>>;

    async fn get_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<FollowRequest>>;

    async fn put_follow_request(&self, request: &FollowRequest) -> Result<()>;

    /// Turn a pending follow request into a follow.
    async fn accept_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Follow>;

    /// Write only `columns` of `follow`.
    async fn update_follow(&self, follow: &Follow, columns: &[FollowColumn]) -> Result<()>;

    /// Write only `columns` of `request`.
    async fn update_follow_request(
        &self,
        request: &FollowRequest,
        columns: &[FollowColumn],
    ) -> Result<()>;

    /// Delete the follow between the pair, returning it if one existed.
    async fn delete_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<Follow>>;

    /// Delete the follow request between the pair, returning it if one existed.
    async fn delete_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<FollowRequest>>;

    // =========================================================================
    // Interaction approvals
    // =========================================================================

    async fn put_interaction_approval(&self, approval: &InteractionApproval) -> Result<()>;
}
