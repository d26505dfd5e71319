//! Service layer
//!
//! Side-effect processing that runs after a federated object has been
//! accepted: status wipes, follower redirects on account moves, account
//! stats counters and interaction approvals.
//!
//! [`SideEffects`] holds the collaborators every operation needs. Each
//! operation lives in its own submodule as an `impl SideEffects` block.

mod approval;
mod migrate;
mod relationship;
mod stats;
mod wipe;

use std::sync::Arc;

use crate::data::{Store, TimelineSurface};
use crate::locks::LockRegistry;
use crate::scheduler::Scheduler;
use crate::storage::MediaProcessor;
use crate::uris::UriBuilder;

pub use approval::Interaction;
pub use relationship::{FollowParams, Relationship, RelationshipService, Relationships};
pub use wipe::AttachmentPolicy;

#[cfg(test)]
pub use relationship::MockRelationships;

/// Side-effect processor
#[derive(Clone)]
pub struct SideEffects {
    store: Arc<dyn Store>,
    locks: Arc<LockRegistry>,
    media: Arc<dyn MediaProcessor>,
    relationships: Arc<dyn Relationships>,
    timelines: Arc<dyn TimelineSurface>,
    scheduler: Arc<dyn Scheduler>,
    uris: UriBuilder,
}

impl SideEffects {
    /// Create new side-effect processor
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<LockRegistry>,
        media: Arc<dyn MediaProcessor>,
        relationships: Arc<dyn Relationships>,
        timelines: Arc<dyn TimelineSurface>,
        scheduler: Arc<dyn Scheduler>,
        uris: UriBuilder,
    ) -> Self {
        Self {
            store,
            locks,
            media,
            relationships,
            timelines,
            scheduler,
            uris,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for side-effect processors over a real SQLite store with
    //! mocked collaborators.

    use super::*;
    use crate::data::{
        Account, Database, Follow, MockTimelineSurface, Status, StatusFave,
    };
    use crate::scheduler::MockScheduler;
    use crate::storage::MockMediaProcessor;
    use chrono::Utc;
    use tempfile::TempDir;

    pub const BASE_URL: &str = "https://local.example";

    pub struct Collaborators {
        pub media: MockMediaProcessor,
        pub relationships: MockRelationships,
        pub timelines: MockTimelineSurface,
        pub scheduler: MockScheduler,
    }

    impl Collaborators {
        /// Mocks that accept any call and succeed
        pub fn permissive() -> Self {
            let mut media = MockMediaProcessor::new();
            media.expect_delete().returning(|_| Ok(()));
            media.expect_unattach().returning(|account_id, id| {
                Ok(crate::data::MediaAttachment {
                    id: id.to_string(),
                    account_id: account_id.to_string(),
                    status_id: None,
                    file_path: None,
                    created_at: Utc::now(),
                })
            });

            let mut timelines = MockTimelineSurface::new();
            timelines.expect_remove_status().returning(|_| Ok(()));

            let mut scheduler = MockScheduler::new();
            scheduler.expect_cancel().returning(|_| false);

            Self {
                media,
                relationships: MockRelationships::new(),
                timelines,
                scheduler,
            }
        }
    }

    pub async fn create_test_db() -> (TempDir, Arc<Database>) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (temp_dir, Arc::new(db))
    }

    pub fn side_effects(store: Arc<dyn Store>, collaborators: Collaborators) -> SideEffects {
        SideEffects::new(
            store,
            Arc::new(LockRegistry::new()),
            Arc::new(collaborators.media),
            Arc::new(collaborators.relationships),
            Arc::new(collaborators.timelines),
            Arc::new(collaborators.scheduler),
            UriBuilder::new(BASE_URL).unwrap(),
        )
    }

    pub fn account(id: &str, username: &str, domain: Option<&str>) -> Account {
        let host = domain.unwrap_or("local.example");
        Account {
            id: id.to_string(),
            username: username.to_string(),
            domain: domain.map(str::to_string),
            uri: format!("https://{host}/users/{username}"),
            display_name: None,
            locked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            stats: None,
        }
    }

    pub fn status(id: &str, account_id: &str) -> Status {
        Status {
            id: id.to_string(),
            uri: format!("{BASE_URL}/statuses/{id}"),
            account_id: account_id.to_string(),
            in_reply_to_id: None,
            in_reply_to_account_id: None,
            boost_of_id: None,
            boost_of_account_id: None,
            poll_id: None,
            pending_approval: false,
            pre_approved: false,
            approved_by_uri: None,
            local: true,
            created_at: Utc::now(),
            attachment_ids: Vec::new(),
            mention_ids: Vec::new(),
            account: None,
            in_reply_to_account: None,
            boost_of_account: None,
        }
    }

    pub fn boost(id: &str, account_id: &str, of: &Status) -> Status {
        let mut boost = status(id, account_id);
        boost.boost_of_id = Some(of.id.clone());
        boost.boost_of_account_id = Some(of.account_id.clone());
        boost
    }

    pub fn fave(id: &str, account_id: &str, status: &Status) -> StatusFave {
        StatusFave {
            id: id.to_string(),
            uri: format!("https://remote.example/likes/{id}"),
            account_id: account_id.to_string(),
            target_account_id: status.account_id.clone(),
            status_id: status.id.clone(),
            pending_approval: true,
            pre_approved: false,
            approved_by_uri: None,
            created_at: Utc::now(),
            account: None,
            target_account: None,
        }
    }

    pub fn follow(id: &str, account_id: &str, target_account_id: &str) -> Follow {
        Follow {
            id: id.to_string(),
            uri: format!("{BASE_URL}/follows/{id}"),
            account_id: account_id.to_string(),
            target_account_id: target_account_id.to_string(),
            show_reblogs: true,
            notify: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
