//! Follow relationships
//!
//! Creates and removes follow edges and queues the matching outbound
//! activities. Redirecting a follow is always create-then-remove; an
//! existing follow is never re-targeted in place.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::data::{Account, EntityId, Follow, FollowColumn, FollowRequest, Store};
use crate::error::{AppError, Result};
use crate::federation::{FollowActivity, Outbox, OutboundActivity};
use crate::uris::UriBuilder;

/// Follow request parameters
///
/// `None` preferences keep the stored value (or the default for a new
/// follow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowParams {
    pub target_account_id: String,
    pub show_reblogs: Option<bool>,
    pub notify: Option<bool>,
}

/// Relationship from one account to another after a change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relationship {
    /// Target account ID
    pub id: String,
    pub following: bool,
    pub requested: bool,
    pub showing_reblogs: bool,
    pub notifying: bool,
}

impl Relationship {
    fn none(target_account_id: &str) -> Self {
        Self {
            id: target_account_id.to_string(),
            ..Self::default()
        }
    }

    fn following(follow: &Follow) -> Self {
        Self {
            id: follow.target_account_id.clone(),
            following: true,
            requested: false,
            showing_reblogs: follow.show_reblogs,
            notifying: follow.notify,
        }
    }

    fn requested(request: &FollowRequest) -> Self {
        Self {
            id: request.target_account_id.clone(),
            following: false,
            requested: true,
            showing_reblogs: request.show_reblogs,
            notifying: request.notify,
        }
    }
}

/// Relationship side of side-effect processing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Relationships: Send + Sync {
    /// Follow (or request to follow) an account
    ///
    /// Updates preferences instead if a follow or request already exists.
    async fn follow_create(&self, follower: &Account, params: FollowParams)
    -> Result<Relationship>;

    /// Drop the follow and any pending request, undoing each one
    async fn follow_remove(
        &self,
        follower: &Account,
        target_account_id: &str,
    ) -> Result<Relationship>;
}

/// Store-backed relationship processor
pub struct RelationshipService {
    store: Arc<dyn Store>,
    outbox: Arc<Outbox>,
    uris: UriBuilder,
}

impl RelationshipService {
    pub fn new(store: Arc<dyn Store>, outbox: Arc<Outbox>, uris: UriBuilder) -> Self {
        Self {
            store,
            outbox,
            uris,
        }
    }

    fn edge(&self, id: &str, uri: &str, follower: &Account, target: &Account) -> FollowActivity {
        FollowActivity {
            follow_id: id.to_string(),
            follow_uri: uri.to_string(),
            actor_uri: follower.uri.clone(),
            object_uri: target.uri.clone(),
        }
    }

    /// Queue the Follow for a stored request and accept it right away
    /// when the target is local and unlocked.
    async fn send_request(
        &self,
        follower: &Account,
        target: &Account,
        request: FollowRequest,
    ) -> Result<Relationship> {
        self.outbox.enqueue(OutboundActivity::Follow(self.edge(
            &request.id,
            &request.uri,
            follower,
            target,
        )))?;

        if target.is_local() && !target.locked {
            let follow = self
                .store
                .accept_follow_request(&follower.id, &target.id)
                .await?;
            tracing::info!(
                follower_id = %follower.id,
                target_id = %target.id,
                "Follow accepted automatically"
            );
            return Ok(Relationship::following(&follow));
        }

        tracing::info!(
            follower_id = %follower.id,
            target_id = %target.id,
            "Follow requested"
        );
        Ok(Relationship::requested(&request))
    }
}

/// Apply requested preferences, returning the columns that changed.
fn apply_prefs(
    show_reblogs: &mut bool,
    notify: &mut bool,
    params: &FollowParams,
) -> Vec<FollowColumn> {
    let mut columns = Vec::new();
    match params.show_reblogs {
        Some(value) if *show_reblogs != value => {
            *show_reblogs = value;
            columns.push(FollowColumn::ShowReblogs);
        }
        _ => {}
    }
    match params.notify {
        Some(value) if *notify != value => {
            *notify = value;
            columns.push(FollowColumn::Notify);
        }
        _ => {}
    }
    if !columns.is_empty() {
        columns.push(FollowColumn::UpdatedAt);
    }
    columns
}

#[async_trait]
impl Relationships for RelationshipService {
    async fn follow_create(
        &self,
        follower: &Account,
        params: FollowParams,
    ) -> Result<Relationship> {
        if follower.id == params.target_account_id {
            return Err(AppError::Validation(
                "account cannot follow itself".to_string(),
            ));
        }

        let target = self.store.get_account_by_id(&params.target_account_id).await?;

        if let Some(mut follow) = self.store.get_follow(&follower.id, &target.id).await? {
            let columns = apply_prefs(&mut follow.show_reblogs, &mut follow.notify, &params);
            if !columns.is_empty() {
                follow.updated_at = Utc::now();
                self.store.update_follow(&follow, &columns).await?;
                tracing::debug!(follow_id = %follow.id, "Updated existing follow");
            }
            return Ok(Relationship::following(&follow));
        }

        if let Some(mut request) = self
            .store
            .get_follow_request(&follower.id, &target.id)
            .await?
        {
            let columns = apply_prefs(&mut request.show_reblogs, &mut request.notify, &params);
            if !columns.is_empty() {
                request.updated_at = Utc::now();
                self.store.update_follow_request(&request, &columns).await?;
                tracing::debug!(follow_request_id = %request.id, "Updated pending follow request");
            }
            // A pending request may be left over from a call whose Follow
            // never got queued, so it is sent again.
            return self.send_request(follower, &target, request).await;
        }

        let id = EntityId::new().0;
        let now = Utc::now();
        let request = FollowRequest {
            uri: self.uris.follow_uri(&follower.username, &id),
            id,
            account_id: follower.id.clone(),
            target_account_id: target.id.clone(),
            show_reblogs: params.show_reblogs.unwrap_or(true),
            notify: params.notify.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        self.store.put_follow_request(&request).await?;

        self.send_request(follower, &target, request).await
    }

    async fn follow_remove(
        &self,
        follower: &Account,
        target_account_id: &str,
    ) -> Result<Relationship> {
        let target = self.store.get_account_by_id(target_account_id).await?;

        // Undo is queued before the row goes: a failed call leaves the
        // edge in place for the retry to find.
        if let Some(follow) = self.store.get_follow(&follower.id, &target.id).await? {
            self.outbox.enqueue(OutboundActivity::UndoFollow(self.edge(
                &follow.id,
                &follow.uri,
                follower,
                &target,
            )))?;
            self.store.delete_follow(&follower.id, &target.id).await?;
            tracing::info!(follow_id = %follow.id, "Removed follow");
        }

        if let Some(request) = self
            .store
            .get_follow_request(&follower.id, &target.id)
            .await?
        {
            self.outbox.enqueue(OutboundActivity::UndoFollow(self.edge(
                &request.id,
                &request.uri,
                follower,
                &target,
            )))?;
            self.store
                .delete_follow_request(&follower.id, &target.id)
                .await?;
            tracing::info!(follow_request_id = %request.id, "Removed follow request");
        }

        Ok(Relationship::none(&target.id))
    }
}
