//! E2E tests for interaction approvals

mod common;

use common::{TestContext, build_boost, build_status};
use rustresort_workers::data::InteractionType;
use rustresort_workers::service::Interaction;

#[tokio::test]
async fn test_approve_like_from_remote_account() {
    let ctx = TestContext::new().await;
    let alice = ctx.create_local_account("alice").await;
    let bob = ctx.create_remote_account("bob", "remote.example").await;
    let status = ctx.create_status(&alice).await;
    let mut fave = ctx.create_pending_fave(&bob, &status).await;

    let approval = ctx
        .state
        .side_effects
        .approve(Interaction::Like(&mut fave))
        .await
        .unwrap();

    assert_eq!(approval.interaction_type, InteractionType::Like);
    assert_eq!(approval.account_id, alice.id);
    assert_eq!(approval.interacting_account_id, bob.id);
    assert!(approval
        .uri
        .starts_with(&format!("{}/users/alice/accepts/", ctx.base_url())));

    let stored = ctx.state.db.get_fave(&fave.id).await.unwrap().unwrap();
    assert!(!stored.pending_approval);
    assert_eq!(stored.approved_by_uri, Some(approval.uri));
}

#[tokio::test]
async fn test_approve_reply_and_boost() {
    let ctx = TestContext::new().await;
    let alice = ctx.create_local_account("alice").await;
    let bob = ctx.create_remote_account("bob", "remote.example").await;
    let status = ctx.create_status(&alice).await;

    let mut reply = build_status(&bob);
    reply.in_reply_to_id = Some(status.id.clone());
    reply.in_reply_to_account_id = Some(alice.id.clone());
    reply.pending_approval = true;
    ctx.state.db.put_status(&reply).await.unwrap();

    let mut wrapper = build_boost(&bob, &status);
    wrapper.pending_approval = true;
    ctx.state.db.put_status(&wrapper).await.unwrap();

    let reply_approval = ctx
        .state
        .side_effects
        .approve(Interaction::Reply(&mut reply))
        .await
        .unwrap();
    let boost_approval = ctx
        .state
        .side_effects
        .approve(Interaction::Boost(&mut wrapper))
        .await
        .unwrap();

    assert_eq!(reply_approval.interaction_type, InteractionType::Reply);
    assert_eq!(boost_approval.interaction_type, InteractionType::Announce);

    let stored_reply = ctx.state.db.get_status_by_id(&reply.id).await.unwrap().unwrap();
    assert!(!stored_reply.pending_approval);
    assert_eq!(stored_reply.approved_by_uri, Some(reply_approval.uri));

    let stored_boost = ctx.state.db.get_status_by_id(&wrapper.id).await.unwrap().unwrap();
    assert!(!stored_boost.pending_approval);
    assert_eq!(stored_boost.approved_by_uri, Some(boost_approval.uri));

    let approvals = ctx
        .state
        .db
        .get_interaction_approvals_for(&wrapper.uri)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
}
