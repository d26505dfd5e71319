//! Outbound activity queue
//!
//! Relationship changes enqueue activities here; a delivery worker drains
//! the receiving end and federates them.

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::error::{AppError, Result};

const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// A follow edge as seen on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowActivity {
    /// Local follow / follow request ID
    pub follow_id: String,
    /// URI of the original Follow activity
    pub follow_uri: String,
    /// Follower actor URI
    pub actor_uri: String,
    /// Followed actor URI
    pub object_uri: String,
}

/// Activity waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundActivity {
    Follow(FollowActivity),
    UndoFollow(FollowActivity),
}

impl OutboundActivity {
    pub fn activity_type(&self) -> &'static str {
        match self {
            OutboundActivity::Follow(_) => "Follow",
            OutboundActivity::UndoFollow(_) => "Undo",
        }
    }

    /// Render as ActivityStreams JSON
    pub fn to_activity_json(&self) -> Value {
        match self {
            OutboundActivity::Follow(follow) => follow_json(follow),
            OutboundActivity::UndoFollow(follow) => {
                let mut object = follow_json(follow);
                if let Some(map) = object.as_object_mut() {
                    map.remove("@context");
                }

                serde_json::json!({
                    "@context": ACTIVITYSTREAMS_CONTEXT,
                    "type": "Undo",
                    "id": format!("{}/undo", follow.follow_uri),
                    "actor": follow.actor_uri,
                    "object": object
                })
            }
        }
    }
}

fn follow_json(follow: &FollowActivity) -> Value {
    serde_json::json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "type": "Follow",
        "id": follow.follow_uri,
        "actor": follow.actor_uri,
        "object": follow.object_uri
    })
}

/// In-process outbox
pub struct Outbox {
    sender: mpsc::UnboundedSender<OutboundActivity>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<OutboundActivity>>>,
}

impl Outbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Queue an activity for delivery
    ///
    /// # Errors
    /// Returns `Federation` if the receiving side has been dropped
    pub fn enqueue(&self, activity: OutboundActivity) -> Result<()> {
        let activity_type = activity.activity_type();
        self.sender
            .send(activity)
            .map_err(|_| AppError::Federation("outbox receiver closed".to_string()))?;

        crate::metrics::ACTIVITYPUB_ACTIVITIES_QUEUED
            .with_label_values(&[activity_type])
            .inc();
        tracing::debug!(activity_type, "Queued outbound activity");
        Ok(())
    }

    /// Hand the receiving end to the delivery worker
    ///
    /// Returns `None` once taken.
    pub async fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<OutboundActivity>> {
        self.receiver.lock().await.take()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> FollowActivity {
        FollowActivity {
            follow_id: "01HFOLLOW".to_string(),
            follow_uri: "https://local.example/users/alice/follow/01HFOLLOW".to_string(),
            actor_uri: "https://local.example/users/alice".to_string(),
            object_uri: "https://remote.example/users/bob".to_string(),
        }
    }

    #[test]
    fn undo_wraps_original_follow() {
        let undo = OutboundActivity::UndoFollow(edge()).to_activity_json();

        assert_eq!(undo["type"], "Undo");
        assert_eq!(undo["actor"], "https://local.example/users/alice");
        assert_eq!(undo["object"]["type"], "Follow");
        assert_eq!(
            undo["object"]["id"],
            "https://local.example/users/alice/follow/01HFOLLOW"
        );
        assert_eq!(undo["object"]["object"], "https://remote.example/users/bob");
        assert!(undo["object"].get("@context").is_none());
    }

    #[tokio::test]
    async fn enqueued_activities_reach_receiver_once() {
        let outbox = Outbox::new();
        let mut receiver = outbox.take_receiver().await.unwrap();
        assert!(outbox.take_receiver().await.is_none());

        outbox.enqueue(OutboundActivity::Follow(edge())).unwrap();
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.activity_type(), "Follow");
        assert_eq!(received.to_activity_json()["id"], edge().follow_uri);
    }

    #[tokio::test]
    async fn enqueue_fails_after_receiver_dropped() {
        let outbox = Outbox::new();
        drop(outbox.take_receiver().await);

        let result = outbox.enqueue(OutboundActivity::UndoFollow(edge()));
        assert!(matches!(result, Err(AppError::Federation(_))));
    }
}
