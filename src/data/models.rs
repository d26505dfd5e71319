//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.
//!
//! Related records are referenced by ID. Fields marked `#[sqlx(skip)]`
//! are hydrated relations: they are never read from a row directly and
//! stay empty in "barebones" reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// ULIDs sort lexicographically by creation time.
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account
// =============================================================================

/// A local or remote actor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// Remote domain, `None` for local accounts
    pub domain: Option<String>,
    /// ActivityPub actor URI, the canonical key for this account
    pub uri: String,
    pub display_name: Option<String>,
    /// Follows must be approved manually
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Aggregate counters, populated lazily
    #[sqlx(skip)]
    #[serde(skip)]
    pub stats: Option<AccountStats>,
}

impl Account {
    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }
}

/// Per-account aggregate counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountStats {
    pub account_id: String,
    pub statuses_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub follow_requests_count: i64,
    pub last_status_at: Option<DateTime<Utc>>,
}

/// Columns of `account_stats` that can be updated individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsColumn {
    StatusesCount,
    LastStatusAt,
    FollowersCount,
    FollowingCount,
    FollowRequestsCount,
}

impl StatsColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusesCount => "statuses_count",
            Self::LastStatusAt => "last_status_at",
            Self::FollowersCount => "followers_count",
            Self::FollowingCount => "following_count",
            Self::FollowRequestsCount => "follow_requests_count",
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// A post/toot, or a boost wrapping another status
///
/// A boost carries `boost_of_id`/`boost_of_account_id` and has no
/// attachments, mentions or poll of its own.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Status {
    pub id: String,
    /// ActivityPub URI (globally unique)
    pub uri: String,
    pub account_id: String,
    pub in_reply_to_id: Option<String>,
    pub in_reply_to_account_id: Option<String>,
    pub boost_of_id: Option<String>,
    pub boost_of_account_id: Option<String>,
    pub poll_id: Option<String>,
    /// Waiting for the interacted-with account to approve it
    pub pending_approval: bool,
    /// Approved up front by interaction policy, Accept not yet sent
    pub pre_approved: bool,
    /// URI of the approval that authorized this status
    pub approved_by_uri: Option<String>,
    /// true if authored on this instance
    pub local: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub attachment_ids: Vec<String>,
    #[sqlx(skip)]
    pub mention_ids: Vec<String>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub account: Option<Account>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub in_reply_to_account: Option<Account>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub boost_of_account: Option<Account>,
}

impl Status {
    pub fn is_boost(&self) -> bool {
        self.boost_of_id.is_some()
    }
}

/// Columns of `statuses` that can be updated individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColumn {
    PendingApproval,
    PreApproved,
    ApprovedByUri,
}

impl StatusColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::PreApproved => "pre_approved",
            Self::ApprovedByUri => "approved_by_uri",
        }
    }
}

// =============================================================================
// Status dependents
// =============================================================================

/// Media attachment, owned by an account and optionally linked to a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaAttachment {
    pub id: String,
    pub account_id: String,
    pub status_id: Option<String>,
    /// Path relative to the media root
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Mention of an account generated by a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mention {
    pub id: String,
    pub status_id: String,
    pub origin_account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Notification, optionally pointing at a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    /// Values: mention, reblog, favourite, follow, follow_request, poll
    pub notification_type: String,
    pub target_account_id: String,
    pub origin_account_id: String,
    pub status_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bookmark of a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusBookmark {
    pub id: String,
    pub account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

/// Favourite (like) of a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusFave {
    pub id: String,
    /// ActivityPub URI of the Like
    pub uri: String,
    /// Account that faved
    pub account_id: String,
    /// Author of the faved status
    pub target_account_id: String,
    pub status_id: String,
    pub pending_approval: bool,
    pub pre_approved: bool,
    pub approved_by_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub account: Option<Account>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub target_account: Option<Account>,
}

/// Columns of `status_faves` that can be updated individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaveColumn {
    PendingApproval,
    PreApproved,
    ApprovedByUri,
}

impl FaveColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::PreApproved => "pre_approved",
            Self::ApprovedByUri => "approved_by_uri",
        }
    }
}

/// Poll attached to a status
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: String,
    pub status_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Vote in a poll
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollVote {
    pub id: String,
    pub poll_id: String,
    pub account_id: String,
    /// Comma separated option indices
    pub choices: String,
    pub created_at: DateTime<Utc>,
}

/// Direct-message thread as seen by one account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub account_id: String,
    pub last_status_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Relationships
// =============================================================================

/// Accepted follow: `account_id` follows `target_account_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: String,
    /// ActivityPub URI of the Follow activity
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    /// Show boosts from the target in home timeline
    pub show_reblogs: bool,
    /// Notify on every new post from the target
    pub notify: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Follow waiting for the target's approval
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowRequest {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub show_reblogs: bool,
    pub notify: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FollowRequest> for Follow {
    fn from(request: FollowRequest) -> Self {
        Self {
            id: request.id,
            uri: request.uri,
            account_id: request.account_id,
            target_account_id: request.target_account_id,
            show_reblogs: request.show_reblogs,
            notify: request.notify,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Columns of `follows` / `follow_requests` that can be updated individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowColumn {
    ShowReblogs,
    Notify,
    UpdatedAt,
}

impl FollowColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowReblogs => "show_reblogs",
            Self::Notify => "notify",
            Self::UpdatedAt => "updated_at",
        }
    }
}

// =============================================================================
// Interaction approvals
// =============================================================================

/// Kind of interaction an approval authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InteractionType {
    Like,
    Reply,
    Announce,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Reply => "reply",
            Self::Announce => "announce",
        }
    }
}

/// Accept artifact for one pending interaction
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InteractionApproval {
    pub id: String,
    /// Account whose status was interacted with (the approver)
    pub account_id: String,
    pub interacting_account_id: String,
    /// URI of the Like / reply / Announce being approved
    pub interaction_uri: String,
    pub interaction_type: InteractionType,
    /// URI of the Accept itself
    pub uri: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub account: Option<Account>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub interacting_account: Option<Account>,
}
