//! Common test utilities for integration tests

#![allow(dead_code)]

use chrono::Utc;
use rustresort_workers::data::{Account, EntityId, Follow, Status, StatusFave};
use rustresort_workers::{AppState, config};
use tempfile::TempDir;

pub const DOMAIN: &str = "test.example.com";

/// Application state over a throwaway database and media directory
pub struct TestContext {
    pub state: AppState,
    pub _temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context
    pub async fn new() -> Self {
        // Create temporary directory for test database and media
        let temp_dir = TempDir::new().unwrap();

        let config = config::AppConfig {
            instance: config::InstanceConfig {
                domain: DOMAIN.to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            storage: config::StorageConfig {
                media: config::MediaStorageConfig {
                    path: temp_dir.path().join("media"),
                },
            },
            cache: config::CacheConfig {
                timeline_max_items: 2000,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        config.validate().unwrap();

        let state = AppState::new(config).await.unwrap();

        Self {
            state,
            _temp_dir: temp_dir,
        }
    }

    pub fn base_url(&self) -> String {
        format!("https://{DOMAIN}")
    }

    /// Create a local account
    pub async fn create_local_account(&self, username: &str) -> Account {
        self.create_account(username, None).await
    }

    /// Create a remote account on `domain`
    pub async fn create_remote_account(&self, username: &str, domain: &str) -> Account {
        self.create_account(username, Some(domain)).await
    }

    async fn create_account(&self, username: &str, domain: Option<&str>) -> Account {
        let now = Utc::now();
        let host = domain.unwrap_or(DOMAIN);
        let account = Account {
            id: EntityId::new().0,
            username: username.to_string(),
            domain: domain.map(str::to_string),
            uri: format!("https://{host}/users/{username}"),
            display_name: None,
            locked: false,
            created_at: now,
            updated_at: now,
            stats: None,
        };

        self.state.db.put_account(&account).await.unwrap();
        account
    }

    /// Create a status authored by `account`
    pub async fn create_status(&self, account: &Account) -> Status {
        let status = build_status(account);
        self.state.db.put_status(&status).await.unwrap();
        status
    }

    /// Create a boost of `original` by `account`
    pub async fn create_boost(&self, account: &Account, original: &Status) -> Status {
        let boost = build_boost(account, original);
        self.state.db.put_status(&boost).await.unwrap();
        boost
    }

    /// Create a pending fave of `status` by `account`
    pub async fn create_pending_fave(&self, account: &Account, status: &Status) -> StatusFave {
        let id = EntityId::new().0;
        let fave = StatusFave {
            uri: format!("{}/likes/{}", account.uri, id),
            id,
            account_id: account.id.clone(),
            target_account_id: status.account_id.clone(),
            status_id: status.id.clone(),
            pending_approval: true,
            pre_approved: false,
            approved_by_uri: None,
            created_at: Utc::now(),
            account: None,
            target_account: None,
        };

        self.state.db.put_fave(&fave).await.unwrap();
        fave
    }

    /// Store an accepted follow
    pub async fn create_follow(
        &self,
        follower: &Account,
        target: &Account,
        show_reblogs: bool,
        notify: bool,
    ) -> Follow {
        let id = EntityId::new().0;
        let follow = Follow {
            uri: format!("{}/follow/{}", follower.uri, id),
            id,
            account_id: follower.id.clone(),
            target_account_id: target.id.clone(),
            show_reblogs,
            notify,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.state.db.put_follow(&follow).await.unwrap();
        follow
    }
}

/// Unsaved status authored by `account`
pub fn build_status(account: &Account) -> Status {
    let id = EntityId::new().0;
    Status {
        uri: format!("{}/statuses/{}", account.uri, id),
        id,
        account_id: account.id.clone(),
        in_reply_to_id: None,
        in_reply_to_account_id: None,
        boost_of_id: None,
        boost_of_account_id: None,
        poll_id: None,
        pending_approval: false,
        pre_approved: false,
        approved_by_uri: None,
        local: account.is_local(),
        created_at: Utc::now(),
        attachment_ids: Vec::new(),
        mention_ids: Vec::new(),
        account: None,
        in_reply_to_account: None,
        boost_of_account: None,
    }
}

/// Unsaved boost of `original` by `account`
pub fn build_boost(account: &Account, original: &Status) -> Status {
    let id = EntityId::new().0;
    let mut boost = Status {
        uri: format!("{}/statuses/{}/activity", account.uri, id),
        id,
        ..original.clone()
    };
    boost.account_id = account.id.clone();
    boost.boost_of_id = Some(original.id.clone());
    boost.boost_of_account_id = Some(original.account_id.clone());
    boost.poll_id = None;
    boost.attachment_ids = Vec::new();
    boost.mention_ids = Vec::new();
    boost.local = account.is_local();
    boost.created_at = Utc::now();
    boost
}
