//! ActivityPub federation module
//!
//! Handles:
//! - Outbound activity queueing (outbox)
//! - ActivityStreams rendering of queued activities

mod outbox;

pub use outbox::{FollowActivity, OutboundActivity, Outbox};
