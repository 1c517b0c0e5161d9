//! Rejects gate - Applies the reviewers' decisions from the returned audit report.

use crate::{
    core::{
        audit::{PaymentAuditRow, flag_to_bool},
        files::{FileLocation, FileMover},
        lookups::{Flow, ReferenceFileType, State, WritebackStatus},
        related_payments::{self, AuditDecision},
        state_log::{self, Associated},
        writeback,
    },
    entities::{Payment, reference_file},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use std::{collections::HashSet, fs::File, io::Read};

/// Columns whose absence makes a rejects file unusable.
pub const DECISIVE_COLUMNS: [&str; 3] = [
    "pfml_payment_id",
    "rejected_by_program_integrity",
    "skipped_by_program_integrity",
];

/// A parsed rejects file.
#[derive(Debug, Clone, Default)]
pub struct RejectsFile {
    /// Header row as read, trimmed
    pub headers: Vec<String>,
    /// Data rows
    pub rows: Vec<PaymentAuditRow>,
}

/// Counts of one rejects pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectsSummary {
    /// Payments moved to validated
    pub accepted: usize,
    /// Payments moved to the reject report
    pub rejected: usize,
    /// Payments the reviewer skipped
    pub skipped: usize,
    /// Payments sent for audit that the file did not mention
    pub not_in_file: usize,
}

/// Reads a rejects file. Unknown columns are ignored and missing ones read as empty.
pub fn parse_rejects_file<R: Read>(reader: R) -> Result<RejectsFile> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    let rows = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<PaymentAuditRow>, csv::Error>>()?;
    Ok(RejectsFile { headers, rows })
}

fn decision_message(decision: AuditDecision, notes: &str) -> String {
    match decision {
        AuditDecision::Accepted => "Payment accepted".to_string(),
        AuditDecision::Rejected if notes.is_empty() => "Payment rejected".to_string(),
        AuditDecision::Rejected => format!("Payment rejected with notes: {notes}"),
        AuditDecision::Skipped => "Payment skipped".to_string(),
    }
}

async fn apply_decision<C>(
    db: &C,
    payment_id: i64,
    decision: AuditDecision,
    message: &str,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let end_state = match decision {
        AuditDecision::Accepted => State::DelegatedPaymentValidated,
        AuditDecision::Rejected => State::DelegatedPaymentAddToPaymentRejectReport,
        AuditDecision::Skipped => State::DelegatedPaymentAddToPaymentRejectReportRestartable,
    };
    state_log::record_state(db, Associated::Payment(payment_id), end_state, message, now).await?;
    if decision == AuditDecision::Rejected {
        writeback::stage_payment_fineos_writeback(
            db,
            payment_id,
            WritebackStatus::FailedManualValidation,
            now,
        )
        .await?;
    }
    related_payments::cascade_decision(db, payment_id, decision, message, now).await?;
    tracing::debug!(payment_id, ?decision, "Applied audit decision");
    Ok(())
}

/// Applies every decision in `file`.
///
/// Payments sent for audit that the file does not mention are skipped so they
/// return on a later report.
pub async fn process_rejects<C>(
    db: &C,
    file: &RejectsFile,
    now: DateTime<Utc>,
) -> Result<RejectsSummary>
where
    C: ConnectionTrait,
{
    for column in DECISIVE_COLUMNS {
        if !file.headers.iter().any(|h| h == column) {
            return Err(Error::MissingRejectsColumn {
                column: column.to_string(),
            });
        }
    }

    let mut summary = RejectsSummary::default();
    let mut seen = HashSet::new();
    for row in &file.rows {
        let payment_id: i64 = row.pfml_payment_id.parse().map_err(|_| {
            Error::invariant(format!(
                "Rejects file has an invalid payment id '{}'",
                row.pfml_payment_id
            ))
        })?;
        let rejected = flag_to_bool(&row.rejected_by_program_integrity);
        let skipped = flag_to_bool(&row.skipped_by_program_integrity);
        if rejected && skipped {
            return Err(Error::invariant(format!(
                "Payment {payment_id} is both rejected and skipped"
            )));
        }

        let payment = Payment::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::PaymentNotFound {
                id: row.pfml_payment_id.clone(),
            })?;
        let current =
            state_log::get_current_state(db, Associated::Payment(payment.id), Flow::DelegatedPayment)
                .await?;
        if current != Some(State::DelegatedPaymentPaymentAuditReportSent) {
            return Err(Error::invariant(format!(
                "Payment {payment_id} is in {current:?}, not waiting on the audit report"
            )));
        }

        let decision = if rejected {
            summary.rejected += 1;
            AuditDecision::Rejected
        } else if skipped {
            summary.skipped += 1;
            AuditDecision::Skipped
        } else {
            summary.accepted += 1;
            AuditDecision::Accepted
        };
        let message = decision_message(decision, &row.rejected_notes);
        apply_decision(db, payment.id, decision, &message, now).await?;
        seen.insert(payment.id);
    }

    let outstanding =
        state_log::get_payment_ids_in_end_state(db, State::DelegatedPaymentPaymentAuditReportSent)
            .await?;
    for payment_id in outstanding.into_iter().filter(|id| !seen.contains(id)) {
        tracing::warn!(payment_id, "Payment not found in reject file, skipping");
        apply_decision(
            db,
            payment_id,
            AuditDecision::Skipped,
            "Payment not found in reject file",
            now,
        )
        .await?;
        summary.not_in_file += 1;
    }

    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        skipped = summary.skipped,
        not_in_file = summary.not_in_file,
        "Processed payment rejects"
    );
    Ok(summary)
}

/// Processes a rejects file from the received location in one transaction and
/// moves it to `processed`, or to `error` when anything fails.
pub async fn process_rejects_file<M: FileMover>(
    db: &DatabaseConnection,
    mover: &M,
    file_name: &str,
    now: DateTime<Utc>,
) -> Result<RejectsSummary> {
    let path = mover.path(file_name, FileLocation::Received);
    let txn = db.begin().await?;
    let result: Result<RejectsSummary> = async {
        let file = parse_rejects_file(File::open(&path)?)?;
        let summary = process_rejects(&txn, &file, now).await?;
        reference_file::ActiveModel {
            file_location: Set(mover
                .path(file_name, FileLocation::Processed)
                .display()
                .to_string()),
            reference_file_type: Set(ReferenceFileType::PaymentRejects),
            created_at: Set(now),
            processed_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        Ok(summary)
    }
    .await;

    match result {
        Ok(summary) => {
            txn.commit().await?;
            mover.move_file(file_name, FileLocation::Received, FileLocation::Processed)?;
            Ok(summary)
        }
        Err(e) => {
            txn.rollback().await?;
            tracing::error!(file = file_name, error = %e, "Failed to process rejects file");
            if let Err(move_error) =
                mover.move_file(file_name, FileLocation::Received, FileLocation::Error)
            {
                tracing::error!(file = file_name, error = %move_error, "Could not move file to error");
            }
            Err(e)
        }
    }
}
