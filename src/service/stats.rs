//! Account stats counters
//!
//! Every counter change is a read-modify-write of the account's stats row,
//! serialized per account by the lock registry (keyed on the account URI).
//! Decrements floor at zero, so duplicate or out-of-order deliveries can
//! never drive a count negative.

use chrono::{DateTime, Utc};

use crate::data::{Account, AccountStats, StatsColumn, Status};
use crate::error::{AppError, Result, ResultExt};

use super::SideEffects;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    Statuses,
    Followers,
    Following,
    FollowRequests,
}

impl Counter {
    fn column(&self) -> StatsColumn {
        match self {
            Counter::Statuses => StatsColumn::StatusesCount,
            Counter::Followers => StatsColumn::FollowersCount,
            Counter::Following => StatsColumn::FollowingCount,
            Counter::FollowRequests => StatsColumn::FollowRequestsCount,
        }
    }

    fn value_mut<'a>(&self, stats: &'a mut AccountStats) -> &'a mut i64 {
        match self {
            Counter::Statuses => &mut stats.statuses_count,
            Counter::Followers => &mut stats.followers_count,
            Counter::Following => &mut stats.following_count,
            Counter::FollowRequests => &mut stats.follow_requests_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Increment => "increment",
            Direction::Decrement => "decrement",
        }
    }
}

impl SideEffects {
    /// Apply ±1 to one counter under the account lock.
    ///
    /// `last_status_at`, when given, is stamped alongside the counter.
    async fn adjust_stat(
        &self,
        account: &mut Account,
        counter: Counter,
        direction: Direction,
        last_status_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.locks.lock(&account.uri).await;

        // Other workers hold their own copies of this account, so the
        // stored row is the only current value.
        account.stats = None;
        self.store
            .populate_account_stats(account)
            .await
            .context("db error getting account stats")?;

        let stats = account.stats.as_mut().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("stats missing after populate"))
                .context("db error getting account stats")
        })?;

        let column = counter.column();
        let current = counter.value_mut(stats);
        *current = match direction {
            Direction::Increment => *current + 1,
            Direction::Decrement => (*current - 1).max(0),
        };
        let value = *current;

        let mut columns = vec![column];
        if let Some(at) = last_status_at {
            stats.last_status_at = Some(at);
            columns.push(StatsColumn::LastStatusAt);
        }

        self.store
            .update_account_stats(stats, &columns)
            .await
            .context("db error updating account stats")?;

        crate::metrics::ACCOUNT_STATS_UPDATES_TOTAL
            .with_label_values(&[column.as_str(), direction.as_str()])
            .inc();
        tracing::debug!(
            account_id = %account.id,
            counter = column.as_str(),
            direction = direction.as_str(),
            value,
            "Updated account stats"
        );

        Ok(())
    }

    /// Count a new status and stamp it as the account's latest.
    pub async fn increment_statuses_count(
        &self,
        account: &mut Account,
        status: &Status,
    ) -> Result<()> {
        self.adjust_stat(
            account,
            Counter::Statuses,
            Direction::Increment,
            Some(status.created_at),
        )
        .await
    }

    pub async fn decrement_statuses_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(account, Counter::Statuses, Direction::Decrement, None)
            .await
    }

    pub async fn increment_followers_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(account, Counter::Followers, Direction::Increment, None)
            .await
    }

    pub async fn decrement_followers_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(account, Counter::Followers, Direction::Decrement, None)
            .await
    }

    pub async fn increment_following_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(account, Counter::Following, Direction::Increment, None)
            .await
    }

    pub async fn decrement_following_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(account, Counter::Following, Direction::Decrement, None)
            .await
    }

    pub async fn increment_follow_requests_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(
            account,
            Counter::FollowRequests,
            Direction::Increment,
            None,
        )
        .await
    }

    pub async fn decrement_follow_requests_count(&self, account: &mut Account) -> Result<()> {
        self.adjust_stat(
            account,
            Counter::FollowRequests,
            Direction::Decrement,
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::data::{MockStore, Store};
    use std::sync::Arc;

    #[tokio::test]
    async fn first_update_populates_stats_from_source_tables() {
        let (_temp_dir, db) = create_test_db().await;
        let alice = account("01ALICE", "alice", None);
        db.put_account(&alice).await.unwrap();
        db.put_status(&status("01EXISTING", "01ALICE")).await.unwrap();

        let side_effects = side_effects(db.clone(), Collaborators::permissive());
        let new_status = status("01NEW", "01ALICE");
        let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
        side_effects
            .increment_statuses_count(&mut alice, &new_status)
            .await
            .unwrap();

        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.statuses_count, 2);
        assert_eq!(
            stats.last_status_at.map(|at| at.timestamp_millis()),
            Some(new_status.created_at.timestamp_millis())
        );
        assert_eq!(alice.stats.unwrap().statuses_count, 2);
    }

    #[tokio::test]
    async fn decrements_clamp_at_zero() {
        let (_temp_dir, db) = create_test_db().await;
        db.put_account(&account("01ALICE", "alice", None)).await.unwrap();
        let side_effects = side_effects(db.clone(), Collaborators::permissive());

        for _ in 0..3 {
            let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
            side_effects.decrement_followers_count(&mut alice).await.unwrap();
            let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
            side_effects
                .decrement_follow_requests_count(&mut alice)
                .await
                .unwrap();
        }

        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.followers_count, 0);
        assert_eq!(stats.follow_requests_count, 0);

        let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
        side_effects.increment_followers_count(&mut alice).await.unwrap();
        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.followers_count, 1);
    }

    #[tokio::test]
    async fn only_the_touched_counter_changes() {
        let (_temp_dir, db) = create_test_db().await;
        db.put_account(&account("01ALICE", "alice", None)).await.unwrap();
        let side_effects = side_effects(db.clone(), Collaborators::permissive());

        let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
        side_effects.increment_following_count(&mut alice).await.unwrap();
        side_effects.increment_following_count(&mut alice).await.unwrap();
        side_effects.decrement_following_count(&mut alice).await.unwrap();
        side_effects.decrement_statuses_count(&mut alice).await.unwrap();

        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.following_count, 1);
        assert_eq!(stats.followers_count, 0);
        assert_eq!(stats.statuses_count, 0);
        assert!(stats.last_status_at.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_lose_no_updates() {
        let (_temp_dir, db) = create_test_db().await;
        for (id, username) in [("01ALICE", "alice"), ("01BOB", "bob")] {
            db.put_account(&account(id, username, None)).await.unwrap();
        }
        let side_effects = side_effects(db.clone(), Collaborators::permissive());

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let db = db.clone();
                let side_effects = side_effects.clone();
                let account_id = if i % 2 == 0 { "01ALICE" } else { "01BOB" };
                tokio::spawn(async move {
                    let mut account = db.get_account_by_id(account_id).await.unwrap();
                    side_effects.increment_followers_count(&mut account).await
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let decrements: Vec<_> = (0..5)
            .map(|_| {
                let db = db.clone();
                let side_effects = side_effects.clone();
                tokio::spawn(async move {
                    let mut account = db.get_account_by_id("01ALICE").await.unwrap();
                    side_effects.decrement_followers_count(&mut account).await
                })
            })
            .collect();

        for result in futures::future::join_all(decrements).await {
            result.unwrap().unwrap();
        }

        let alice = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        let bob = db.get_account_stats("01BOB").await.unwrap().unwrap();
        assert_eq!(alice.followers_count, 15);
        assert_eq!(bob.followers_count, 20);
    }

    #[tokio::test]
    async fn stale_account_copies_do_not_overwrite_each_other() {
        let (_temp_dir, db) = create_test_db().await;
        db.put_account(&account("01ALICE", "alice", None)).await.unwrap();
        let side_effects = side_effects(db.clone(), Collaborators::permissive());

        let mut worker_a = db.get_account_by_id("01ALICE").await.unwrap();
        let mut worker_b = db.get_account_by_id("01ALICE").await.unwrap();

        side_effects.increment_followers_count(&mut worker_a).await.unwrap();
        side_effects.increment_followers_count(&mut worker_b).await.unwrap();
        // worker_a still carries the stats it loaded before worker_b wrote
        side_effects.increment_followers_count(&mut worker_a).await.unwrap();

        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.followers_count, 3);
        assert_eq!(worker_a.stats.unwrap().followers_count, 3);
        assert_eq!(worker_b.stats.unwrap().followers_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_increments_and_decrements_balance() {
        let (_temp_dir, db) = create_test_db().await;
        db.put_account(&account("01ALICE", "alice", None)).await.unwrap();
        let side_effects = side_effects(db.clone(), Collaborators::permissive());

        // Start above the number of decrements so clamping never kicks in
        let mut alice = db.get_account_by_id("01ALICE").await.unwrap();
        for _ in 0..10 {
            side_effects.increment_following_count(&mut alice).await.unwrap();
        }

        let shared = db.get_account_by_id("01ALICE").await.unwrap();
        let tasks: Vec<_> = (0..30)
            .map(|i| {
                let side_effects = side_effects.clone();
                let mut account = shared.clone();
                tokio::spawn(async move {
                    if i % 3 == 0 {
                        side_effects.decrement_following_count(&mut account).await
                    } else {
                        side_effects.increment_following_count(&mut account).await
                    }
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        // 10 seeded + 20 increments - 10 decrements
        let stats = db.get_account_stats("01ALICE").await.unwrap().unwrap();
        assert_eq!(stats.following_count, 20);
    }

    #[tokio::test]
    async fn populate_failure_is_reported_with_context() {
        let mut store = MockStore::new();
        store
            .expect_populate_account_stats()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolClosed)));
        store.expect_update_account_stats().never();

        let store: Arc<dyn Store> = Arc::new(store);
        let side_effects = side_effects(store, Collaborators::permissive());
        let mut alice = account("01ALICE", "alice", None);

        let err = side_effects
            .increment_followers_count(&mut alice)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("db error getting account stats"));
    }

    #[tokio::test]
    async fn update_failure_releases_the_account_lock() {
        let mut store = MockStore::new();
        store.expect_populate_account_stats().returning(|account| {
            account.stats = Some(AccountStats {
                account_id: account.id.clone(),
                statuses_count: 0,
                followers_count: 0,
                following_count: 0,
                follow_requests_count: 0,
                last_status_at: None,
            });
            Ok(())
        });
        store
            .expect_update_account_stats()
            .times(2)
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolClosed)));

        let store: Arc<dyn Store> = Arc::new(store);
        let side_effects = side_effects(store, Collaborators::permissive());

        for _ in 0..2 {
            let mut alice = account("01ALICE", "alice", None);
            let err = tokio::time::timeout(
                std::time::Duration::from_secs(1),
                side_effects.increment_following_count(&mut alice),
            )
            .await
            .expect("lock must be released after a failed update")
            .unwrap_err();
            assert!(err.to_string().starts_with("db error updating account stats"));
        }
    }
}
