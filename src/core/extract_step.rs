//! Payment extract step - Turns one loaded extract batch into payments.
//!
//! The whole batch runs in a single database transaction. Any structural error
//! rolls back every payment, state log and writeback created so far, and the
//! batch is retried from scratch on the next run.

use crate::{
    config::settings::PaymentsConfig,
    core::{
        extract::ExtractData,
        lookups::{PaymentTransactionType, State, WritebackStatus},
        payment_data::PaymentData,
        payment_record::{self, PaymentRecord, RecordContext},
        related_payments::{self, LinkSummary, SplitPaymentStates},
        state_log::{self, Associated},
        writeback,
    },
    entities::{Payment, ReferenceFile, payment, reference_file},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;

/// Counts of one extract step run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStepSummary {
    /// Payments created
    pub processed: usize,
    /// Payments already created from this batch by an earlier attempt
    pub skipped: usize,
    /// Payments per end state
    pub end_states: HashMap<State, usize>,
    /// Split payment linking counts
    pub links: LinkSummary,
}

impl ExtractStepSummary {
    /// Payments that ended in `state`.
    #[must_use]
    pub fn count(&self, state: State) -> usize {
        self.end_states.get(&state).copied().unwrap_or_default()
    }
}

/// End state and optional writeback for a freshly created payment.
///
/// Returns an invariant error when a payment with issues cannot be resolved to
/// a writeback status.
pub fn decide_end_state(record: &PaymentRecord) -> Result<(State, Option<WritebackStatus>)> {
    let payment = &record.payment;
    let container = &record.validation_container;
    let transaction_type = payment.payment_transaction_type;

    if container.has_validation_issues() {
        if payment.exclude_from_payment_status {
            return Ok((State::DelegatedPaymentAddToPaymentErrorReport, None));
        }
        let status = writeback::resolve_writeback_status(container)?;
        let state = SplitPaymentStates::for_type(transaction_type).map_or(
            State::DelegatedPaymentAddToPaymentErrorReportRestartable,
            |states| states.error_restartable,
        );
        return Ok((state, Some(status)));
    }

    let decision = match transaction_type {
        PaymentTransactionType::Cancellation => (
            State::DelegatedPaymentProcessedCancellation,
            Some(WritebackStatus::Processed),
        ),
        PaymentTransactionType::ZeroDollar => (
            State::DelegatedPaymentProcessedZeroPayment,
            Some(WritebackStatus::Processed),
        ),
        t if t.is_overpayment() => (
            State::DelegatedPaymentProcessedOverpayment,
            Some(WritebackStatus::Processed),
        ),
        PaymentTransactionType::Standard => (State::PaymentReadyForAddressValidation, None),
        t => match SplitPaymentStates::for_type(t) {
            Some(states) => (states.ready_for_processing, None),
            // Unknown always carries an issue, so reaching here is a bug
            None => {
                return Err(Error::invariant(format!(
                    "Payment {} of type {t} has no validation issues but no end state",
                    payment.record_key()
                )));
            }
        },
    };
    Ok(decision)
}

async fn already_created<C>(db: &C, reference_file_id: i64, c: &str, i: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Payment::find()
        .filter(payment::Column::ReferenceFileId.eq(reference_file_id))
        .filter(payment::Column::FineosPeiCValue.eq(c))
        .filter(payment::Column::FineosPeiIValue.eq(i))
        .one(db)
        .await?
        .is_some())
}

async fn run_extract_step<C>(
    db: &C,
    config: &PaymentsConfig,
    reference_file: reference_file::Model,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ExtractStepSummary>
where
    C: ConnectionTrait,
{
    let extract = ExtractData::load(db, reference_file.id).await?;
    let ctx = RecordContext {
        config,
        reference_file_id: reference_file.id,
        today,
        now,
    };
    let mut summary = ExtractStepSummary::default();

    for key in extract.payment_keys() {
        if already_created(db, reference_file.id, &key.c, &key.i).await? {
            tracing::info!(c_value = %key.c, i_value = %key.i, "Payment already created for this batch");
            summary.skipped += 1;
            continue;
        }

        let rows = extract.aggregate(&key);
        let data = PaymentData::build(&key, &rows, config);
        let record = payment_record::create_payment_record(db, data, &ctx).await?;
        let (end_state, writeback_status) = decide_end_state(&record)?;

        let (message, container) = if record.validation_container.has_validation_issues() {
            ("Error processing payment record", Some(&record.validation_container))
        } else {
            ("Success", None)
        };
        let outcome = state_log::build_outcome(message, container)?;
        state_log::create_finished_state_log(
            db,
            Associated::Payment(record.payment.id),
            end_state,
            outcome,
            now,
        )
        .await?;

        if let Some(status) = writeback_status {
            writeback::stage_payment_fineos_writeback(db, record.payment.id, status, now).await?;
        }

        tracing::debug!(
            c_value = %key.c,
            i_value = %key.i,
            payment_id = record.payment.id,
            end_state = %end_state,
            "Processed payment"
        );
        summary.processed += 1;
        *summary.end_states.entry(end_state).or_default() += 1;
    }

    summary.links = related_payments::link_split_payments(db, reference_file.id, now).await?;

    let mut active: reference_file::ActiveModel = reference_file.into();
    active.processed_at = Set(Some(now));
    active.update(db).await?;

    Ok(summary)
}

/// Processes the extract batch `reference_file_id` in one transaction.
///
/// A batch that was already processed is skipped.
pub async fn process_extract(
    db: &DatabaseConnection,
    config: &PaymentsConfig,
    reference_file_id: i64,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ExtractStepSummary> {
    let txn = db.begin().await?;

    let reference_file = ReferenceFile::find_by_id(reference_file_id)
        .one(&txn)
        .await?
        .ok_or(Error::ReferenceFileNotFound {
            id: reference_file_id,
        })?;
    if reference_file.processed_at.is_some() {
        tracing::warn!(reference_file_id, "Extract batch already processed, skipping");
        txn.commit().await?;
        return Ok(ExtractStepSummary::default());
    }

    match run_extract_step(&txn, config, reference_file, today, now).await {
        Ok(summary) => {
            txn.commit().await?;
            tracing::info!(
                reference_file_id,
                processed = summary.processed,
                skipped = summary.skipped,
                ready = summary.count(State::PaymentReadyForAddressValidation),
                errored = summary.count(State::DelegatedPaymentAddToPaymentErrorReport)
                    + summary.count(State::DelegatedPaymentAddToPaymentErrorReportRestartable),
                "Finished payment extract step"
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(reference_file_id, error = %e, "Payment extract step failed, rolling back");
            txn.rollback().await?;
            Err(e)
        }
    }
}
