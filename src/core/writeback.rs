//! Writeback queue - Statuses reported back to the case system.
//!
//! [`resolve_writeback_status`] collapses the validation issues of a payment into
//! the single status the case system is told about; [`stage_payment_fineos_writeback`]
//! queues it.

use crate::{
    core::{
        lookups::{State, WritebackStatus},
        state_log::{self, Associated},
        validation::{ValidationContainer, ValidationReason},
    },
    entities::{FineosWritebackDetails, fineos_writeback_details},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::BTreeSet;

/// Statuses a set of validation issues can resolve to, most severe first.
pub const WRITEBACK_PRECEDENCE: [WritebackStatus; 7] = [
    WritebackStatus::FailedAutomatedValidation,
    WritebackStatus::DataIssueInSystem,
    WritebackStatus::ExemptEmployer,
    WritebackStatus::SelfReportedAdditionalIncome,
    WritebackStatus::LeaveInReview,
    WritebackStatus::PendingPrenote,
    WritebackStatus::PrenoteError,
];

/// Status a single reason maps to when it is the only one present.
#[must_use]
pub const fn writeback_status_for_reason(reason: ValidationReason) -> WritebackStatus {
    match reason {
        ValidationReason::MissingInDb
        | ValidationReason::MissingDataset
        | ValidationReason::ClaimantMismatch
        | ValidationReason::ClaimNotIdProofed
        | ValidationReason::UnexpectedPaymentTransactionType => WritebackStatus::DataIssueInSystem,
        ValidationReason::EmployerExempt => WritebackStatus::ExemptEmployer,
        ValidationReason::OpenOtherIncomeTasks => WritebackStatus::SelfReportedAdditionalIncome,
        ValidationReason::LeaveRequestInReview => WritebackStatus::LeaveInReview,
        ValidationReason::EftPrenotePending => WritebackStatus::PendingPrenote,
        ValidationReason::EftPrenoteRejected => WritebackStatus::PrenoteError,
        _ => WritebackStatus::FailedAutomatedValidation,
    }
}

/// Resolves a set of distinct reasons to exactly one writeback status.
///
/// An empty set means the caller asked for an error status on a payment without
/// issues, which is a programming error.
pub fn get_writeback_status(reasons: &BTreeSet<ValidationReason>) -> Result<WritebackStatus> {
    let present: BTreeSet<usize> = reasons
        .iter()
        .filter_map(|reason| {
            let status = writeback_status_for_reason(*reason);
            WRITEBACK_PRECEDENCE.iter().position(|s| *s == status)
        })
        .collect();

    present
        .first()
        .map(|rank| WRITEBACK_PRECEDENCE[*rank])
        .ok_or_else(|| {
            Error::invariant(format!(
                "Unable to resolve a writeback status for reasons {reasons:?}"
            ))
        })
}

/// Resolves the writeback status for everything recorded in `container`.
pub fn resolve_writeback_status(container: &ValidationContainer) -> Result<WritebackStatus> {
    get_writeback_status(&container.distinct_reasons()).inspect_err(|_| {
        tracing::error!(
            record_key = %container.record_key,
            "Writeback status resolution fell through every rule"
        );
    })
}

/// Queues `status` for `payment_id` and records the writeback state transition.
pub async fn stage_payment_fineos_writeback<C>(
    db: &C,
    payment_id: i64,
    status: WritebackStatus,
    now: DateTime<Utc>,
) -> Result<fineos_writeback_details::Model>
where
    C: ConnectionTrait,
{
    let details = fineos_writeback_details::ActiveModel {
        payment_id: Set(payment_id),
        transaction_status: Set(status),
        created_at: Set(now),
        writeback_sent_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let message = format!(
        "Added to FINEOS writeback with transaction status '{}' ({})",
        status.description(),
        status.period_status().as_str()
    );
    state_log::record_state(
        db,
        Associated::Payment(payment_id),
        State::DelegatedAddToFineosWriteback,
        &message,
        now,
    )
    .await?;

    tracing::info!(payment_id, status = %status, "Staged FINEOS writeback");
    Ok(details)
}

/// Queued writebacks of a payment, oldest first.
pub async fn get_writeback_details_for_payment<C>(
    db: &C,
    payment_id: i64,
) -> Result<Vec<fineos_writeback_details::Model>>
where
    C: ConnectionTrait,
{
    FineosWritebackDetails::find()
        .filter(fineos_writeback_details::Column::PaymentId.eq(payment_id))
        .order_by_asc(fineos_writeback_details::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::lookups::Flow,
        test_utils::{create_test_payment, setup_test_db, test_now},
    };
    use proptest::prelude::*;

    fn reasons(list: &[ValidationReason]) -> BTreeSet<ValidationReason> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_single_reason_mapping() -> Result<()> {
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::MissingField]))?,
            WritebackStatus::FailedAutomatedValidation
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::ClaimNotIdProofed]))?,
            WritebackStatus::DataIssueInSystem
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::EmployerExempt]))?,
            WritebackStatus::ExemptEmployer
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::OpenOtherIncomeTasks]))?,
            WritebackStatus::SelfReportedAdditionalIncome
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::LeaveRequestInReview]))?,
            WritebackStatus::LeaveInReview
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::EftPrenotePending]))?,
            WritebackStatus::PendingPrenote
        );
        assert_eq!(
            get_writeback_status(&reasons(&[ValidationReason::EftPrenoteRejected]))?,
            WritebackStatus::PrenoteError
        );
        Ok(())
    }

    #[test]
    fn test_most_severe_wins() -> Result<()> {
        assert_eq!(
            get_writeback_status(&reasons(&[
                ValidationReason::EftPrenotePending,
                ValidationReason::EmployerExempt,
                ValidationReason::MissingInDb,
            ]))?,
            WritebackStatus::DataIssueInSystem
        );
        assert_eq!(
            get_writeback_status(&reasons(&[
                ValidationReason::ClaimantMismatch,
                ValidationReason::RoutingNumberFailsChecksum,
            ]))?,
            WritebackStatus::FailedAutomatedValidation
        );
        Ok(())
    }

    #[test]
    fn test_empty_reasons_is_invariant_violation() {
        let result = get_writeback_status(&BTreeSet::new());
        assert!(matches!(result, Err(Error::Invariant { .. })));
    }

    proptest! {
        #[test]
        fn prop_resolver_follows_precedence(
            set in proptest::collection::btree_set(
                proptest::sample::select(ValidationReason::ALL.to_vec()),
                1..10,
            )
        ) {
            let resolved = get_writeback_status(&set).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let resolved_rank = WRITEBACK_PRECEDENCE
                .iter()
                .position(|s| *s == resolved)
                .ok_or_else(|| TestCaseError::fail("status outside precedence list"))?;

            // The resolved status comes from one of the reasons present
            prop_assert!(set.iter().any(|r| writeback_status_for_reason(*r) == resolved));

            // and no present reason maps to anything more severe.
            for reason in &set {
                let rank = WRITEBACK_PRECEDENCE
                    .iter()
                    .position(|s| *s == writeback_status_for_reason(*reason))
                    .ok_or_else(|| TestCaseError::fail("status outside precedence list"))?;
                prop_assert!(resolved_rank <= rank);
            }
        }

        #[test]
        fn prop_data_issue_outranks_softer_reasons(
            data_issues in proptest::collection::btree_set(
                proptest::sample::select(vec![
                    ValidationReason::MissingInDb,
                    ValidationReason::MissingDataset,
                    ValidationReason::ClaimantMismatch,
                    ValidationReason::ClaimNotIdProofed,
                    ValidationReason::UnexpectedPaymentTransactionType,
                ]),
                1..5,
            ),
            softer in proptest::collection::btree_set(
                proptest::sample::select(vec![
                    ValidationReason::EmployerExempt,
                    ValidationReason::OpenOtherIncomeTasks,
                    ValidationReason::LeaveRequestInReview,
                    ValidationReason::EftPrenotePending,
                    ValidationReason::EftPrenoteRejected,
                ]),
                0..5,
            )
        ) {
            let set: BTreeSet<ValidationReason> = data_issues.into_iter().chain(softer).collect();
            let resolved = get_writeback_status(&set).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(resolved, WritebackStatus::DataIssueInSystem);
        }
    }

    #[tokio::test]
    async fn test_stage_writeback_records_state() -> Result<()> {
        let db = setup_test_db().await?;
        let payment = create_test_payment(&db, "1", "200").await?;

        let details = stage_payment_fineos_writeback(
            &db,
            payment.id,
            WritebackStatus::PendingPrenote,
            test_now(),
        )
        .await?;
        assert_eq!(details.transaction_status, WritebackStatus::PendingPrenote);
        assert!(details.writeback_sent_at.is_none());

        assert_eq!(
            state_log::get_current_state(
                &db,
                Associated::Payment(payment.id),
                Flow::DelegatedPeiWriteback
            )
            .await?,
            Some(State::DelegatedAddToFineosWriteback)
        );
        assert_eq!(
            get_writeback_details_for_payment(&db, payment.id).await?.len(),
            1
        );
        Ok(())
    }
}
