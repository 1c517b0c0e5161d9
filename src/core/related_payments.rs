//! Split payments - Withholding and employer reimbursement payments that move in
//! lockstep with the standard payment they were split from.

use crate::{
    core::{
        lookups::{Flow, PaymentTransactionType, State, WritebackStatus},
        state_log::{self, Associated},
        writeback,
    },
    entities::{
        FineosWritebackDetails, LinkSplitPayment, Payment, fineos_writeback_details,
        link_split_payment, payment,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Outcome of the audit for a payment, applied to it and its split payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditDecision {
    /// Passed review
    Accepted,
    /// Failed review
    Rejected,
    /// Left for a later review
    Skipped,
}

/// Lifecycle states of one kind of split payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPaymentStates {
    /// Created without issues
    pub ready_for_processing: State,
    /// Waiting on the primary payment's audit
    pub pending_audit: State,
    /// No primary payment was found
    pub orphaned_pending_audit: State,
    /// Where an accepted split payment goes
    pub accepted: State,
    /// Rejected along with its primary
    pub error: State,
    /// Failed validation, or skipped along with its primary
    pub error_restartable: State,
}

impl SplitPaymentStates {
    /// States for `transaction_type`, if it is a split payment type.
    #[must_use]
    pub const fn for_type(transaction_type: PaymentTransactionType) -> Option<Self> {
        match transaction_type {
            PaymentTransactionType::StateTaxWithholding => Some(Self {
                ready_for_processing: State::StateWithholdingReadyForProcessing,
                pending_audit: State::StateWithholdingPendingAudit,
                orphaned_pending_audit: State::StateWithholdingOrphanedPendingAudit,
                accepted: State::StateWithholdingSendFunds,
                error: State::StateWithholdingError,
                error_restartable: State::StateWithholdingErrorRestartable,
            }),
            PaymentTransactionType::FederalTaxWithholding => Some(Self {
                ready_for_processing: State::FederalWithholdingReadyForProcessing,
                pending_audit: State::FederalWithholdingPendingAudit,
                orphaned_pending_audit: State::FederalWithholdingOrphanedPendingAudit,
                accepted: State::FederalWithholdingSendFunds,
                error: State::FederalWithholdingError,
                error_restartable: State::FederalWithholdingErrorRestartable,
            }),
            PaymentTransactionType::EmployerReimbursement => Some(Self {
                ready_for_processing: State::EmployerReimbursementReadyForProcessing,
                pending_audit: State::EmployerReimbursementPendingAudit,
                orphaned_pending_audit: State::EmployerReimbursementOrphanedPendingAudit,
                accepted: State::EmployerReimbursementReadyForPayment,
                error: State::EmployerReimbursementError,
                error_restartable: State::EmployerReimbursementErrorRestartable,
            }),
            _ => None,
        }
    }

    /// Target state of a split payment for an audit decision on its primary.
    #[must_use]
    pub const fn for_decision(&self, decision: AuditDecision) -> State {
        match decision {
            AuditDecision::Accepted => self.accepted,
            AuditDecision::Rejected => self.error,
            AuditDecision::Skipped => self.error_restartable,
        }
    }
}

/// Split payments linked to the primary `payment_id`, by ascending id.
pub async fn get_related_payments<C>(db: &C, payment_id: i64) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    let links = LinkSplitPayment::find()
        .filter(link_split_payment::Column::PaymentId.eq(payment_id))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = links.iter().map(|l| l.related_payment_id).collect();
    Payment::find()
        .filter(payment::Column::Id.is_in(ids))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies an audit decision on a primary payment to each of its split payments.
///
/// Rejected split payments are also queued for a writeback.
pub async fn cascade_decision<C>(
    db: &C,
    primary_id: i64,
    decision: AuditDecision,
    message: &str,
    now: DateTime<Utc>,
) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    let related = get_related_payments(db, primary_id).await?;
    for child in &related {
        let Some(states) = SplitPaymentStates::for_type(child.payment_transaction_type) else {
            tracing::warn!(
                payment_id = child.id,
                "Linked payment is not a split payment type, leaving it alone"
            );
            continue;
        };
        state_log::record_state(
            db,
            Associated::Payment(child.id),
            states.for_decision(decision),
            message,
            now,
        )
        .await?;
        if decision == AuditDecision::Rejected {
            writeback::stage_payment_fineos_writeback(
                db,
                child.id,
                WritebackStatus::FailedManualValidation,
                now,
            )
            .await?;
        }
    }
    Ok(related)
}

/// Counts of one linking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Split payments tied to a primary
    pub linked: usize,
    /// Split payments without a primary
    pub orphaned: usize,
    /// Split payments whose primary errored
    pub errored: usize,
}

async fn latest_writeback_status<C>(db: &C, payment_id: i64) -> Result<Option<WritebackStatus>>
where
    C: ConnectionTrait,
{
    Ok(FineosWritebackDetails::find()
        .filter(fineos_writeback_details::Column::PaymentId.eq(payment_id))
        .order_by_desc(fineos_writeback_details::Column::Id)
        .one(db)
        .await?
        .map(|w| w.transaction_status))
}

/// Links the split payments of a batch to their primary payment.
///
/// A split payment belongs to the standard payment of the same batch with the same
/// claim, pay period and payment date. Split payments without one are orphaned;
/// split payments whose primary already failed follow it into their error state.
pub async fn link_split_payments<C>(
    db: &C,
    reference_file_id: i64,
    now: DateTime<Utc>,
) -> Result<LinkSummary>
where
    C: ConnectionTrait,
{
    let batch = Payment::find()
        .filter(payment::Column::ReferenceFileId.eq(reference_file_id))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?;

    let mut summary = LinkSummary::default();
    for child in batch
        .iter()
        .filter(|p| p.payment_transaction_type.is_split_payment())
    {
        let Some(states) = SplitPaymentStates::for_type(child.payment_transaction_type) else {
            continue;
        };
        let child_state =
            state_log::get_current_state(db, Associated::Payment(child.id), Flow::DelegatedPayment)
                .await?;
        if child_state != Some(states.ready_for_processing) {
            continue;
        }

        let primary = batch.iter().find(|p| {
            p.payment_transaction_type == PaymentTransactionType::Standard
                && p.claim_id.is_some()
                && p.claim_id == child.claim_id
                && p.period_start_date == child.period_start_date
                && p.period_end_date == child.period_end_date
                && p.payment_date == child.payment_date
        });

        let Some(primary) = primary else {
            state_log::record_state(
                db,
                Associated::Payment(child.id),
                states.orphaned_pending_audit,
                "Split payment has no primary payment in this batch",
                now,
            )
            .await?;
            summary.orphaned += 1;
            continue;
        };

        link_split_payment::ActiveModel {
            payment_id: Set(primary.id),
            related_payment_id: Set(child.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        summary.linked += 1;

        let primary_state = state_log::get_current_state(
            db,
            Associated::Payment(primary.id),
            Flow::DelegatedPayment,
        )
        .await?;
        if primary_state.is_some_and(State::is_payment_error_report) {
            state_log::record_state(
                db,
                Associated::Payment(child.id),
                states.error_restartable,
                "Primary payment has validation issues",
                now,
            )
            .await?;
            let status = latest_writeback_status(db, primary.id)
                .await?
                .unwrap_or(WritebackStatus::FailedAutomatedValidation);
            writeback::stage_payment_fineos_writeback(db, child.id, status, now).await?;
            summary.errored += 1;
        }
    }

    tracing::info!(
        reference_file_id,
        linked = summary.linked,
        orphaned = summary.orphaned,
        errored = summary.errored,
        "Linked split payments"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_payment_with, setup_test_db, test_now};

    #[test]
    fn test_decision_mapping_differs_per_kind() {
        let federal = SplitPaymentStates::for_type(PaymentTransactionType::FederalTaxWithholding);
        let employer = SplitPaymentStates::for_type(PaymentTransactionType::EmployerReimbursement);
        assert_eq!(
            federal.map(|s| s.for_decision(AuditDecision::Accepted)),
            Some(State::FederalWithholdingSendFunds)
        );
        assert_eq!(
            federal.map(|s| s.for_decision(AuditDecision::Rejected)),
            Some(State::FederalWithholdingError)
        );
        assert_eq!(
            employer.map(|s| s.for_decision(AuditDecision::Accepted)),
            Some(State::EmployerReimbursementReadyForPayment)
        );
        assert_eq!(
            employer.map(|s| s.for_decision(AuditDecision::Skipped)),
            Some(State::EmployerReimbursementErrorRestartable)
        );
        assert!(SplitPaymentStates::for_type(PaymentTransactionType::Standard).is_none());
    }

    #[tokio::test]
    async fn test_link_orphan_and_error_cascade() -> Result<()> {
        let db = setup_test_db().await?;
        let now = test_now();

        let primary =
            create_test_payment_with(&db, "1", "500", PaymentTransactionType::Standard, Some(1))
                .await?;
        let federal = create_test_payment_with(
            &db,
            "1",
            "501",
            PaymentTransactionType::FederalTaxWithholding,
            Some(1),
        )
        .await?;
        let orphan = create_test_payment_with(
            &db,
            "1",
            "502",
            PaymentTransactionType::StateTaxWithholding,
            Some(2),
        )
        .await?;

        state_log::record_state(
            &db,
            Associated::Payment(primary.id),
            State::DelegatedPaymentAddToPaymentErrorReport,
            "Error",
            now,
        )
        .await?;
        writeback::stage_payment_fineos_writeback(
            &db,
            primary.id,
            WritebackStatus::DataIssueInSystem,
            now,
        )
        .await?;
        state_log::record_state(
            &db,
            Associated::Payment(federal.id),
            State::FederalWithholdingReadyForProcessing,
            "Ready",
            now,
        )
        .await?;
        state_log::record_state(
            &db,
            Associated::Payment(orphan.id),
            State::StateWithholdingReadyForProcessing,
            "Ready",
            now,
        )
        .await?;

        let summary = link_split_payments(&db, primary.reference_file_id, now).await?;
        assert_eq!(
            summary,
            LinkSummary {
                linked: 1,
                orphaned: 1,
                errored: 1
            }
        );

        let related = get_related_payments(&db, primary.id).await?;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, federal.id);

        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(federal.id), Flow::DelegatedPayment)
                .await?,
            Some(State::FederalWithholdingErrorRestartable)
        );
        assert_eq!(
            latest_writeback_status(&db, federal.id).await?,
            Some(WritebackStatus::DataIssueInSystem)
        );
        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(orphan.id), Flow::DelegatedPayment)
                .await?,
            Some(State::StateWithholdingOrphanedPendingAudit)
        );
        Ok(())
    }
}
