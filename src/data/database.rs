//! SQLite database operations
//!
//! All database access goes through this module.
//! Implements [`Store`] for side-effect processing, plus the insert and
//! lookup helpers upstream handlers use to record federated objects.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};

use super::models::*;
use super::store::Store;
use crate::error::{AppError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert or replace an account
    pub async fn put_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, domain, uri, display_name, locked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                domain = excluded.domain,
                uri = excluded.uri,
                display_name = excluded.display_name,
                locked = excluded.locked,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.domain)
        .bind(&account.uri)
        .bind(&account.display_name)
        .bind(account.locked)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the stored stats row of an account, without recounting
    pub async fn get_account_stats(&self, account_id: &str) -> Result<Option<AccountStats>> {
        let stats =
            sqlx::query_as::<_, AccountStats>("SELECT * FROM account_stats WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stats)
    }

    /// Recount an account's stats from the source tables and store them
    ///
    /// A concurrent initial population may win the insert; the stored
    /// row is returned either way.
    async fn initialize_account_stats(&self, account_id: &str) -> Result<AccountStats> {
        let statuses_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM statuses WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        let last_status_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM statuses WHERE account_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        let followers_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE target_account_id = ?",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        let following_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        let follow_requests_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follow_requests WHERE target_account_id = ?",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO account_stats (
                account_id, statuses_count, followers_count,
                following_count, follow_requests_count, last_status_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(statuses_count)
        .bind(followers_count)
        .bind(following_count)
        .bind(follow_requests_count)
        .bind(last_status_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(account_id, "Initialized account stats");

        self.get_account_stats(account_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    /// Insert a new status
    ///
    /// Attachments and mentions are stored separately and linked by status ID.
    pub async fn put_status(&self, status: &Status) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO statuses (
                id, uri, account_id, in_reply_to_id, in_reply_to_account_id,
                boost_of_id, boost_of_account_id, poll_id, pending_approval,
                pre_approved, approved_by_uri, local, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&status.id)
        .bind(&status.uri)
        .bind(&status.account_id)
        .bind(&status.in_reply_to_id)
        .bind(&status.in_reply_to_account_id)
        .bind(&status.boost_of_id)
        .bind(&status.boost_of_account_id)
        .bind(&status.poll_id)
        .bind(status.pending_approval)
        .bind(status.pre_approved)
        .bind(&status.approved_by_uri)
        .bind(status.local)
        .bind(status.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get status by ID with its attachment and mention IDs filled in
    pub async fn get_status_by_id(&self, id: &str) -> Result<Option<Status>> {
        let Some(mut status) = sqlx::query_as::<_, Status>("SELECT * FROM statuses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        status.attachment_ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM media_attachments WHERE status_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        status.mention_ids =
            sqlx::query_scalar::<_, String>("SELECT id FROM mentions WHERE status_id = ? ORDER BY id")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(status))
    }

    // =========================================================================
    // Status dependents
    // =========================================================================

    /// Insert a media attachment
    pub async fn put_attachment(&self, attachment: &MediaAttachment) -> Result<()> {
        sqlx::query(
            "INSERT INTO media_attachments (id, account_id, status_id, file_path, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&attachment.id)
        .bind(&attachment.account_id)
        .bind(&attachment.status_id)
        .bind(&attachment.file_path)
        .bind(attachment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get media attachment by ID
    pub async fn find_attachment(&self, id: &str) -> Result<Option<MediaAttachment>> {
        let attachment =
            sqlx::query_as::<_, MediaAttachment>("SELECT * FROM media_attachments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(attachment)
    }

    /// Insert a mention
    pub async fn put_mention(&self, mention: &Mention) -> Result<()> {
        sqlx::query(
            "INSERT INTO mentions (id, status_id, origin_account_id, target_account_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&mention.id)
        .bind(&mention.status_id)
        .bind(&mention.origin_account_id)
        .bind(&mention.target_account_id)
        .bind(mention.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get mention by ID
    pub async fn get_mention(&self, id: &str) -> Result<Option<Mention>> {
        let mention = sqlx::query_as::<_, Mention>("SELECT * FROM mentions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(mention)
    }

    /// Insert a notification
    pub async fn put_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, notification_type, target_account_id, origin_account_id, status_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.notification_type)
        .bind(&notification.target_account_id)
        .bind(&notification.origin_account_id)
        .bind(&notification.status_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count notifications pointing at a status
    pub async fn count_notifications_for_status(&self, status_id: &str) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE status_id = ?")
                .bind(status_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Insert a bookmark
    pub async fn put_bookmark(&self, bookmark: &StatusBookmark) -> Result<()> {
        sqlx::query(
            "INSERT INTO status_bookmarks (id, account_id, status_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&bookmark.id)
        .bind(&bookmark.account_id)
        .bind(&bookmark.status_id)
        .bind(bookmark.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count bookmarks pointing at a status
    pub async fn count_bookmarks_for_status(&self, status_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM status_bookmarks WHERE status_id = ?",
        )
        .bind(status_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Insert a fave
    pub async fn put_fave(&self, fave: &StatusFave) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO status_faves (
                id, uri, account_id, target_account_id, status_id,
                pending_approval, pre_approved, approved_by_uri, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fave.id)
        .bind(&fave.uri)
        .bind(&fave.account_id)
        .bind(&fave.target_account_id)
        .bind(&fave.status_id)
        .bind(fave.pending_approval)
        .bind(fave.pre_approved)
        .bind(&fave.approved_by_uri)
        .bind(fave.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get fave by ID
    pub async fn get_fave(&self, id: &str) -> Result<Option<StatusFave>> {
        let fave = sqlx::query_as::<_, StatusFave>("SELECT * FROM status_faves WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(fave)
    }

    /// Count faves pointing at a status
    pub async fn count_faves_for_status(&self, status_id: &str) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM status_faves WHERE status_id = ?")
                .bind(status_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Insert a poll
    pub async fn put_poll(&self, poll: &Poll) -> Result<()> {
        sqlx::query("INSERT INTO polls (id, status_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(&poll.id)
            .bind(&poll.status_id)
            .bind(poll.expires_at)
            .bind(poll.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get poll by ID
    pub async fn get_poll(&self, id: &str) -> Result<Option<Poll>> {
        let poll = sqlx::query_as::<_, Poll>("SELECT * FROM polls WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(poll)
    }

    /// Insert a poll vote
    pub async fn put_poll_vote(&self, vote: &PollVote) -> Result<()> {
        sqlx::query(
            "INSERT INTO poll_votes (id, poll_id, account_id, choices, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&vote.id)
        .bind(&vote.poll_id)
        .bind(&vote.account_id)
        .bind(&vote.choices)
        .bind(vote.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count votes in a poll
    pub async fn count_poll_votes(&self, poll_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM poll_votes WHERE poll_id = ?")
            .bind(poll_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Insert a conversation and link it to `status_ids`
    pub async fn put_conversation(
        &self,
        conversation: &Conversation,
        status_ids: &[String],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversations (id, account_id, last_status_id, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.account_id)
        .bind(&conversation.last_status_id)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await?;

        for status_id in status_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conversation_to_statuses (conversation_id, status_id) VALUES (?, ?)",
            )
            .bind(&conversation.id)
            .bind(status_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get conversation by ID
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Insert new follow relationship
    pub async fn put_follow(&self, follow: &Follow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO follows (id, uri, account_id, target_account_id, show_reblogs, notify, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&follow.id)
        .bind(&follow.uri)
        .bind(&follow.account_id)
        .bind(&follow.target_account_id)
        .bind(follow.show_reblogs)
        .bind(follow.notify)
        .bind(follow.created_at)
        .bind(follow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All follows owned by an account
    pub async fn get_account_follows(&self, account_id: &str) -> Result<Vec<Follow>> {
        let follows =
            sqlx::query_as::<_, Follow>("SELECT * FROM follows WHERE account_id = ? ORDER BY id")
                .bind(account_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(follows)
    }

    // =========================================================================
    // Interaction approvals
    // =========================================================================

    /// Approvals issued for an interaction URI, oldest first
    pub async fn get_interaction_approvals_for(
        &self,
        interaction_uri: &str,
    ) -> Result<Vec<InteractionApproval>> {
        let approvals = sqlx::query_as::<_, InteractionApproval>(
            "SELECT * FROM interaction_approvals WHERE interaction_uri = ? ORDER BY id",
        )
        .bind(interaction_uri)
        .fetch_all(&self.pool)
        .await?;

        Ok(approvals)
    }
}

#[async_trait]
impl Store for Database {
    async fn get_account_by_id(&self, id: &str) -> Result<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn populate_account_stats(&self, account: &mut Account) -> Result<()> {
        if account.stats.is_some() {
            return Ok(());
        }

        let stats = match self.get_account_stats(&account.id).await? {
            Some(stats) => stats,
            None => self.initialize_account_stats(&account.id).await?,
        };
        account.stats = Some(stats);

        Ok(())
    }

    async fn update_account_stats(
        &self,
        stats: &AccountStats,
        columns: &[StatsColumn],
    ) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE account_stats SET ");
        {
            let mut separated = builder.separated(", ");
            for column in columns {
                separated.push(format!("{} = ", column.as_str()));
                match column {
                    StatsColumn::StatusesCount => {
                        separated.push_bind_unseparated(stats.statuses_count)
                    }
                    StatsColumn::LastStatusAt => {
                        separated.push_bind_unseparated(stats.last_status_at)
                    }
                    StatsColumn::FollowersCount => {
                        separated.push_bind_unseparated(stats.followers_count)
                    }
                    StatsColumn::FollowingCount => {
                        separated.push_bind_unseparated(stats.following_count)
                    }
                    StatsColumn::FollowRequestsCount => {
                        separated.push_bind_unseparated(stats.follow_requests_count)
                    }
                };
            }
        }
        builder.push(" WHERE account_id = ");
        builder.push_bind(stats.account_id.clone());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn get_status_boosts(&self, status_id: &str) -> Result<Vec<Status>> {
        let boosts =
            sqlx::query_as::<_, Status>("SELECT * FROM statuses WHERE boost_of_id = ? ORDER BY id")
                .bind(status_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(boosts)
    }

    async fn update_status(&self, status: &Status, columns: &[StatusColumn]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE statuses SET ");
        {
            let mut separated = builder.separated(", ");
            for column in columns {
                separated.push(format!("{} = ", column.as_str()));
                match column {
                    StatusColumn::PendingApproval => {
                        separated.push_bind_unseparated(status.pending_approval)
                    }
                    StatusColumn::PreApproved => separated.push_bind_unseparated(status.pre_approved),
                    StatusColumn::ApprovedByUri => {
                        separated.push_bind_unseparated(status.approved_by_uri.clone())
                    }
                };
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(status.id.clone());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn delete_status_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_status_from_conversations(&self, status_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let conversation_ids = sqlx::query_scalar::<_, String>(
            "SELECT conversation_id FROM conversation_to_statuses WHERE status_id = ?",
        )
        .bind(status_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversation_to_statuses WHERE status_id = ?")
            .bind(status_id)
            .execute(&mut *tx)
            .await?;

        for conversation_id in conversation_ids {
            // ULIDs sort by time, so the max remaining ID is the newest status.
            let newest = sqlx::query_scalar::<_, String>(
                "SELECT status_id FROM conversation_to_statuses WHERE conversation_id = ? ORDER BY status_id DESC LIMIT 1",
            )
            .bind(&conversation_id)
            .fetch_optional(&mut *tx)
            .await?;

            match newest {
                Some(newest) => {
                    sqlx::query(
                        "UPDATE conversations SET last_status_id = ?, updated_at = ? WHERE id = ? AND last_status_id = ?",
                    )
                    .bind(&newest)
                    .bind(Utc::now())
                    .bind(&conversation_id)
                    .bind(status_id)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM conversations WHERE id = ?")
                        .bind(&conversation_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_mention_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM mentions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_notifications_for_status(&self, status_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM notifications WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_status_bookmarks_for_status(&self, status_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM status_bookmarks WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_status_faves_for_status(&self, status_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM status_faves WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_status_fave(&self, fave: &StatusFave, columns: &[FaveColumn]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE status_faves SET ");
        {
            let mut separated = builder.separated(", ");
            for column in columns {
                separated.push(format!("{} = ", column.as_str()));
                match column {
                    FaveColumn::PendingApproval => {
                        separated.push_bind_unseparated(fave.pending_approval)
                    }
                    FaveColumn::PreApproved => separated.push_bind_unseparated(fave.pre_approved),
                    FaveColumn::ApprovedByUri => {
                        separated.push_bind_unseparated(fave.approved_by_uri.clone())
                    }
                };
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(fave.id.clone());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn delete_poll_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_poll_votes(&self, poll_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM poll_votes WHERE poll_id = ?")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_attachment(&self, id: &str) -> Result<MediaAttachment> {
        self.find_attachment(id).await?.ok_or(AppError::NotFound)
    }

    async fn unattach_attachment(&self, id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE media_attachments SET status_id = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn delete_attachment(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM media_attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_account_local_followers(&self, account_id: &str) -> Result<Vec<Follow>> {
        let follows = sqlx::query_as::<_, Follow>(
            r#"
            SELECT follows.* FROM follows
            JOIN accounts ON accounts.id = follows.account_id
            WHERE follows.target_account_id = ? AND accounts.domain IS NULL
            ORDER BY follows.id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(follows)
    }

    async fn get_follow(&self, account_id: &str, target_account_id: &str) -> Result<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE account_id = ? AND target_account_id = ?",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    async fn get_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<FollowRequest>> {
        let request = sqlx::query_as::<_, FollowRequest>(
            "SELECT * FROM follow_requests WHERE account_id = ? AND target_account_id = ?",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn put_follow_request(&self, request: &FollowRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO follow_requests (id, uri, account_id, target_account_id, show_reblogs, notify, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.uri)
        .bind(&request.account_id)
        .bind(&request.target_account_id)
        .bind(request.show_reblogs)
        .bind(request.notify)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn accept_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Follow> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, FollowRequest>(
            "DELETE FROM follow_requests WHERE account_id = ? AND target_account_id = ? RETURNING *",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

        let mut follow = Follow::from(request);
        follow.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO follows (id, uri, account_id, target_account_id, show_reblogs, notify, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, target_account_id) DO UPDATE SET
                show_reblogs = excluded.show_reblogs,
                notify = excluded.notify,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&follow.id)
        .bind(&follow.uri)
        .bind(&follow.account_id)
        .bind(&follow.target_account_id)
        .bind(follow.show_reblogs)
        .bind(follow.notify)
        .bind(follow.created_at)
        .bind(follow.updated_at)
        .execute(&mut *tx)
        .await?;

        let follow = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE account_id = ? AND target_account_id = ?",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(follow)
    }

    async fn update_follow(&self, follow: &Follow, columns: &[FollowColumn]) -> Result<()> {
        update_follow_columns(
            &self.pool,
            "follows",
            &follow.id,
            follow.show_reblogs,
            follow.notify,
            follow.updated_at,
            columns,
        )
        .await
    }

    async fn update_follow_request(
        &self,
        request: &FollowRequest,
        columns: &[FollowColumn],
    ) -> Result<()> {
        update_follow_columns(
            &self.pool,
            "follow_requests",
            &request.id,
            request.show_reblogs,
            request.notify,
            request.updated_at,
            columns,
        )
        .await
    }

    async fn delete_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            "DELETE FROM follows WHERE account_id = ? AND target_account_id = ? RETURNING *",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    async fn delete_follow_request(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<Option<FollowRequest>> {
        let request = sqlx::query_as::<_, FollowRequest>(
            "DELETE FROM follow_requests WHERE account_id = ? AND target_account_id = ? RETURNING *",
        )
        .bind(account_id)
        .bind(target_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn put_interaction_approval(&self, approval: &InteractionApproval) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interaction_approvals (
                id, account_id, interacting_account_id, interaction_uri,
                interaction_type, uri, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&approval.id)
        .bind(&approval.account_id)
        .bind(&approval.interacting_account_id)
        .bind(&approval.interaction_uri)
        .bind(approval.interaction_type.as_str())
        .bind(&approval.uri)
        .bind(approval.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Partial update shared by `follows` and `follow_requests`, which have
/// identical preference columns.
async fn update_follow_columns(
    pool: &Pool<Sqlite>,
    table: &'static str,
    id: &str,
    show_reblogs: bool,
    notify: bool,
    updated_at: DateTime<Utc>,
    columns: &[FollowColumn],
) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {table} SET "));
    {
        let mut separated = builder.separated(", ");
        for column in columns {
            separated.push(format!("{} = ", column.as_str()));
            match column {
                FollowColumn::ShowReblogs => separated.push_bind_unseparated(show_reblogs),
                FollowColumn::Notify => separated.push_bind_unseparated(notify),
                FollowColumn::UpdatedAt => separated.push_bind_unseparated(updated_at),
            };
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.to_string());

    let result = builder.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}
