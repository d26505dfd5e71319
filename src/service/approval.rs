//! Interaction approvals
//!
//! Accepting a pending like, reply or boost stores an approval (the
//! Accept artifact) and marks the interaction itself as approved. The two
//! writes are not atomic: if the second fails the approval stays stored.

use chrono::Utc;

use crate::data::{
    Account, EntityId, FaveColumn, InteractionApproval, InteractionType, Status, StatusColumn,
    StatusFave,
};
use crate::error::{AppError, Result, ResultExt};

use super::SideEffects;

const APPROVED_STATUS_COLUMNS: [StatusColumn; 3] = [
    StatusColumn::PendingApproval,
    StatusColumn::PreApproved,
    StatusColumn::ApprovedByUri,
];

const APPROVED_FAVE_COLUMNS: [FaveColumn; 3] = [
    FaveColumn::PendingApproval,
    FaveColumn::PreApproved,
    FaveColumn::ApprovedByUri,
];

/// A pending interaction to approve
#[derive(Debug)]
pub enum Interaction<'a> {
    /// A fave of one of our statuses
    Like(&'a mut StatusFave),
    /// A reply to one of our statuses
    Reply(&'a mut Status),
    /// A boost wrapper of one of our statuses
    Boost(&'a mut Status),
}

impl SideEffects {
    /// Approve any pending interaction
    ///
    /// Calling this twice for the same interaction stores two approvals.
    pub async fn approve(&self, interaction: Interaction<'_>) -> Result<InteractionApproval> {
        match interaction {
            Interaction::Like(fave) => self.approve_fave(fave).await,
            Interaction::Reply(status) => self.approve_reply(status).await,
            Interaction::Boost(boost) => self.approve_announce(boost).await,
        }
    }

    /// Approve a pending fave
    ///
    /// The approver is the faved status's author.
    pub async fn approve_fave(&self, fave: &mut StatusFave) -> Result<InteractionApproval> {
        let approver = self
            .resolve_approver(fave.target_account.as_ref(), Some(&fave.target_account_id))
            .await?;

        let mut approval = self.new_approval(
            &approver,
            &fave.account_id,
            &fave.uri,
            InteractionType::Like,
        );
        approval.interacting_account = fave.account.clone();
        self.store
            .put_interaction_approval(&approval)
            .await
            .context("db error inserting interaction approval")?;

        fave.pending_approval = false;
        fave.pre_approved = false;
        fave.approved_by_uri = Some(approval.uri.clone());
        self.store
            .update_status_fave(fave, &APPROVED_FAVE_COLUMNS)
            .await
            .context("db error updating status fave")?;

        record_approval(&approval);
        Ok(approval)
    }

    /// Approve a pending reply
    ///
    /// The approver is the author of the replied-to status.
    pub async fn approve_reply(&self, status: &mut Status) -> Result<InteractionApproval> {
        let approver = self
            .resolve_approver(
                status.in_reply_to_account.as_ref(),
                status.in_reply_to_account_id.as_ref(),
            )
            .await?;

        let mut approval = self.new_approval(
            &approver,
            &status.account_id,
            &status.uri,
            InteractionType::Reply,
        );
        approval.interacting_account = status.account.clone();
        self.store
            .put_interaction_approval(&approval)
            .await
            .context("db error inserting interaction approval")?;

        mark_status_approved(status, &approval);
        self.store
            .update_status(status, &APPROVED_STATUS_COLUMNS)
            .await
            .context("db error updating status")?;

        record_approval(&approval);
        Ok(approval)
    }

    /// Approve a pending boost
    ///
    /// The approver is the author of the boosted status.
    pub async fn approve_announce(&self, boost: &mut Status) -> Result<InteractionApproval> {
        let approver = self
            .resolve_approver(boost.boost_of_account.as_ref(), boost.boost_of_account_id.as_ref())
            .await?;

        let mut approval = self.new_approval(
            &approver,
            &boost.account_id,
            &boost.uri,
            InteractionType::Announce,
        );
        approval.interacting_account = boost.account.clone();
        self.store
            .put_interaction_approval(&approval)
            .await
            .context("db error inserting interaction approval")?;

        mark_status_approved(boost, &approval);
        self.store
            .update_status(boost, &APPROVED_STATUS_COLUMNS)
            .await
            .context("db error updating boost wrapper status")?;

        record_approval(&approval);
        Ok(approval)
    }

    /// Approving account, from the hydrated relation or the store.
    async fn resolve_approver(
        &self,
        hydrated: Option<&Account>,
        account_id: Option<&String>,
    ) -> Result<Account> {
        let Some(account_id) = account_id else {
            return Err(AppError::Validation(
                "interaction has no target account".to_string(),
            ));
        };

        match hydrated {
            Some(account) if &account.id == account_id => Ok(account.clone()),
            _ => self
                .store
                .get_account_by_id(account_id)
                .await
                .context("db error getting approving account"),
        }
    }

    fn new_approval(
        &self,
        approver: &Account,
        interacting_account_id: &str,
        interaction_uri: &str,
        interaction_type: InteractionType,
    ) -> InteractionApproval {
        let id = EntityId::new().0;
        InteractionApproval {
            uri: self.uris.accept_uri(&approver.username, &id),
            id,
            account_id: approver.id.clone(),
            interacting_account_id: interacting_account_id.to_string(),
            interaction_uri: interaction_uri.to_string(),
            interaction_type,
            created_at: Utc::now(),
            account: Some(approver.clone()),
            interacting_account: None,
        }
    }
}

fn mark_status_approved(status: &mut Status, approval: &InteractionApproval) {
    status.pending_approval = false;
    status.pre_approved = false;
    status.approved_by_uri = Some(approval.uri.clone());
}

fn record_approval(approval: &InteractionApproval) {
    crate::metrics::INTERACTION_APPROVALS_TOTAL
        .with_label_values(&[approval.interaction_type.as_str()])
        .inc();
    tracing::info!(
        approval_id = %approval.id,
        interaction_type = approval.interaction_type.as_str(),
        interaction_uri = %approval.interaction_uri,
        "Approved interaction"
    );
}
