//! Payment audit gate - Stages payments for manual review and writes the audit report.
//!
//! The report columns are shared with the rejects file the reviewers send back,
//! see [`PaymentAuditRow`].

use crate::{
    core::{
        lookups::{
            AbsencePeriodType, AuditReportType, Flow, PaymentMethod, PaymentTransactionType,
            ReferenceFileType, State, WritebackStatus,
        },
        related_payments::{self, SplitPaymentStates},
        state_log::{self, Associated},
        writeback,
    },
    entities::{
        Address, AuditReportDetail, Claim, Employee, Employer, Payment, StateLog,
        VbiRequestedAbsence, audit_report_detail, payment, reference_file, state_log as log,
        vbi_requested_absence,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{io::Write, path::Path};

/// Column order of the audit report and the rejects file.
pub const AUDIT_REPORT_COLUMNS: [&str; 41] = [
    "pfml_payment_id",
    "leave_type",
    "absence_period_type",
    "first_name",
    "last_name",
    "address_line_1",
    "address_line_2",
    "city",
    "state",
    "zip",
    "payment_preference",
    "scheduled_payment_date",
    "payment_period_start_date",
    "payment_period_end_date",
    "payment_period_weeks",
    "gross_payment_amount",
    "payment_amount",
    "federal_withholding_amount",
    "state_withholding_amount",
    "employer_reimbursement_amount",
    "net_payment_amount",
    "absence_case_number",
    "c_value",
    "i_value",
    "employer_id",
    "leave_request_id",
    "leave_request_decision",
    "check_description",
    "is_first_time_payment",
    "previously_errored_payment_count",
    "previously_rejected_payment_count",
    "previously_skipped_payment_count",
    "dua_additional_income_details",
    "dia_additional_income_details",
    "dor_fineos_name_mismatch_details",
    "max_weekly_benefit_exceeded_details",
    "is_preapproved",
    "preapproval_issues",
    "rejected_by_program_integrity",
    "skipped_by_program_integrity",
    "rejected_notes",
];

/// One row of the audit report. Missing columns read back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentAuditRow {
    /// Payment id, the key reviewers send back
    pub pfml_payment_id: String,
    /// Family or medical leave
    pub leave_type: String,
    /// Continuous, intermittent or reduced schedule
    pub absence_period_type: String,
    /// Claimant given name
    pub first_name: String,
    /// Claimant family name
    pub last_name: String,
    /// Mailing address, check payments only
    pub address_line_1: String,
    /// Second address line
    pub address_line_2: String,
    /// Address city
    pub city: String,
    /// Address state
    pub state: String,
    /// Address zip code
    pub zip: String,
    /// Payment method description
    pub payment_preference: String,
    /// Date the payment is scheduled for
    pub scheduled_payment_date: String,
    /// First day paid for
    pub payment_period_start_date: String,
    /// Last day paid for
    pub payment_period_end_date: String,
    /// Length of the pay period in weeks, rounded up
    pub payment_period_weeks: String,
    /// Payment plus withholdings and reimbursement
    pub gross_payment_amount: String,
    /// Amount of the primary payment
    pub payment_amount: String,
    /// Sum of linked federal withholdings
    pub federal_withholding_amount: String,
    /// Sum of linked state withholdings
    pub state_withholding_amount: String,
    /// Sum of linked employer reimbursements
    pub employer_reimbursement_amount: String,
    /// Amount the claimant receives
    pub net_payment_amount: String,
    /// Absence case of the claim
    pub absence_case_number: String,
    /// Case-system class id
    pub c_value: String,
    /// Case-system index id
    pub i_value: String,
    /// Employer FEIN, when known
    pub employer_id: String,
    /// Leave request the payment is for
    pub leave_request_id: String,
    /// Decision on that leave request
    pub leave_request_decision: String,
    /// Memo printed on checks
    pub check_description: String,
    /// `Y` when no earlier payment on the claim was validated
    pub is_first_time_payment: String,
    /// Error transitions of earlier payments with the same (C,I)
    pub previously_errored_payment_count: String,
    /// Reject transitions of earlier payments with the same (C,I)
    pub previously_rejected_payment_count: String,
    /// Skip transitions of earlier payments with the same (C,I)
    pub previously_skipped_payment_count: String,
    /// Unemployment income found for the claimant
    pub dua_additional_income_details: String,
    /// Industrial accident income found for the claimant
    pub dia_additional_income_details: String,
    /// Name differences between tax records and the case system
    pub dor_fineos_name_mismatch_details: String,
    /// Weekly benefit cap overruns
    pub max_weekly_benefit_exceeded_details: String,
    /// `Y` when the row raised no issue
    pub is_preapproved: String,
    /// Issues that prevent preapproval, `; `-separated
    pub preapproval_issues: String,
    /// Reviewer decision column
    pub rejected_by_program_integrity: String,
    /// Reviewer decision column
    pub skipped_by_program_integrity: String,
    /// Free text from the reviewer
    pub rejected_notes: String,
}

/// `Y`/`N` flag as used in the report.
#[must_use]
pub const fn bool_to_flag(value: bool) -> &'static str {
    if value { "Y" } else { "N" }
}

/// Reads a `Y`/`N` flag; anything but `Y` (case-insensitive) is false.
#[must_use]
pub fn flag_to_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("y")
}

/// Counts of one staging pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStageSummary {
    /// Payments staged for sampling
    pub staged: usize,
    /// Linked split payments now waiting on their primary
    pub split_pending_audit: usize,
    /// Check payments without an address
    pub errored: usize,
}

/// Moves payments that passed the extract step into the audit sampling queue.
pub async fn stage_payments_for_audit<C>(db: &C, now: DateTime<Utc>) -> Result<AuditStageSummary>
where
    C: ConnectionTrait,
{
    let mut summary = AuditStageSummary::default();
    let ready = state_log::get_payment_ids_in_end_state(db, State::PaymentReadyForAddressValidation)
        .await?;

    for payment_id in ready {
        let payment = Payment::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::PaymentNotFound {
                id: payment_id.to_string(),
            })?;

        if payment.disb_method == Some(PaymentMethod::Check) && payment.address_id.is_none() {
            state_log::record_state(
                db,
                Associated::Payment(payment.id),
                State::DelegatedPaymentAddToPaymentErrorReportRestartable,
                "Check payment has no valid mailing address",
                now,
            )
            .await?;
            writeback::stage_payment_fineos_writeback(
                db,
                payment.id,
                WritebackStatus::FailedAutomatedValidation,
                now,
            )
            .await?;
            summary.errored += 1;
            continue;
        }

        state_log::record_state(
            db,
            Associated::Payment(payment.id),
            State::DelegatedPaymentStagedForPaymentAuditReportSampling,
            "Staged for payment audit report sampling",
            now,
        )
        .await?;
        summary.staged += 1;

        for child in related_payments::get_related_payments(db, payment.id).await? {
            let Some(states) = SplitPaymentStates::for_type(child.payment_transaction_type) else {
                continue;
            };
            let current = state_log::get_current_state(
                db,
                Associated::Payment(child.id),
                Flow::DelegatedPayment,
            )
            .await?;
            if current == Some(states.ready_for_processing) {
                state_log::record_state(
                    db,
                    Associated::Payment(child.id),
                    states.pending_audit,
                    "Primary payment staged for audit",
                    now,
                )
                .await?;
                summary.split_pending_audit += 1;
            }
        }
    }

    tracing::info!(
        staged = summary.staged,
        split_pending_audit = summary.split_pending_audit,
        errored = summary.errored,
        "Staged payments for audit"
    );
    Ok(summary)
}

/// Number of payments out of `total` that a `percentage` sample contains.
#[must_use]
pub fn sample_size(total: usize, percentage: u8) -> usize {
    let percentage = usize::from(percentage.min(100));
    (total * percentage).div_ceil(100)
}

/// Picks staged payments for the next audit report.
///
/// Sampling is deterministic: the lowest ids go first. Payments left over stay
/// staged and, being older than anything staged later, are picked first on
/// the next run.
pub async fn sample_payments_for_audit<C>(
    db: &C,
    percentage: u8,
    now: DateTime<Utc>,
) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let staged = state_log::get_payment_ids_in_end_state(
        db,
        State::DelegatedPaymentStagedForPaymentAuditReportSampling,
    )
    .await?;
    let count = sample_size(staged.len(), percentage);
    let sampled: Vec<i64> = staged.into_iter().take(count).collect();

    for payment_id in &sampled {
        state_log::record_state(
            db,
            Associated::Payment(*payment_id),
            State::DelegatedPaymentAddToPaymentAuditReport,
            "Sampled for payment audit report",
            now,
        )
        .await?;
    }
    tracing::info!(sampled = sampled.len(), percentage, "Sampled payments for audit");
    Ok(sampled)
}

/// Attaches an issue to a payment for reviewers to see on the audit report.
pub async fn add_audit_report_detail<C>(
    db: &C,
    payment_id: i64,
    audit_report_type: AuditReportType,
    message: &str,
    now: DateTime<Utc>,
) -> Result<audit_report_detail::Model>
where
    C: ConnectionTrait,
{
    audit_report_detail::ActiveModel {
        payment_id: Set(payment_id),
        audit_report_type: Set(audit_report_type),
        details: Set(json!({ "message": message })),
        created_at: Set(now),
        added_to_audit_report_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Prior outcomes of other payments sharing a (C,I).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorOutcomes {
    /// Payment error report transitions
    pub errored: usize,
    /// Reject transitions
    pub rejected: usize,
    /// Restartable reject transitions
    pub skipped: usize,
}

/// Counts error, reject and skip transitions of every other payment with the
/// same (C,I) as `payment`.
pub async fn get_prior_outcomes<C>(db: &C, payment: &payment::Model) -> Result<PriorOutcomes>
where
    C: ConnectionTrait,
{
    let others: Vec<i64> = Payment::find()
        .filter(payment::Column::FineosPeiCValue.eq(payment.fineos_pei_c_value.as_str()))
        .filter(payment::Column::FineosPeiIValue.eq(payment.fineos_pei_i_value.as_str()))
        .filter(payment::Column::Id.ne(payment.id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if others.is_empty() {
        return Ok(PriorOutcomes::default());
    }

    let history = StateLog::find()
        .filter(log::Column::PaymentId.is_in(others))
        .filter(log::Column::Flow.eq(Flow::DelegatedPayment))
        .all(db)
        .await?;

    let count = |state: State| history.iter().filter(|l| l.end_state == state).count();
    Ok(PriorOutcomes {
        errored: history
            .iter()
            .filter(|l| l.end_state.is_payment_error_report())
            .count(),
        rejected: count(State::DelegatedPaymentAddToPaymentRejectReport),
        skipped: count(State::DelegatedPaymentAddToPaymentRejectReportRestartable),
    })
}

/// Whether no other payment of the claim has been validated before.
async fn is_first_time_payment<C>(db: &C, payment: &payment::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(claim_id) = payment.claim_id else {
        return Ok(true);
    };
    let others: Vec<i64> = Payment::find()
        .filter(payment::Column::ClaimId.eq(claim_id))
        .filter(payment::Column::Id.ne(payment.id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if others.is_empty() {
        return Ok(true);
    }
    let validated = StateLog::find()
        .filter(log::Column::PaymentId.is_in(others))
        .filter(log::Column::EndState.eq(State::DelegatedPaymentValidated))
        .one(db)
        .await?;
    Ok(validated.is_none())
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_amount(amount: Decimal) -> String {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount.to_string()
}

fn detail_message(detail: &audit_report_detail::Model) -> String {
    detail.details["message"]
        .as_str()
        .map_or_else(|| detail.details.to_string(), str::to_string)
}

/// Builds the report row of `payment`.
pub async fn build_audit_row<C>(db: &C, payment: &payment::Model) -> Result<PaymentAuditRow>
where
    C: ConnectionTrait,
{
    let mut row = PaymentAuditRow {
        pfml_payment_id: payment.id.to_string(),
        c_value: payment.fineos_pei_c_value.clone(),
        i_value: payment.fineos_pei_i_value.clone(),
        absence_case_number: payment.absence_case_number.clone().unwrap_or_default(),
        leave_request_id: payment.fineos_leave_request_id.clone().unwrap_or_default(),
        payment_preference: payment
            .disb_method
            .map(|m| m.description().to_string())
            .unwrap_or_default(),
        scheduled_payment_date: format_date(payment.payment_date),
        payment_period_start_date: format_date(payment.period_start_date),
        payment_period_end_date: format_date(payment.period_end_date),
        ..Default::default()
    };

    if let (Some(start), Some(end)) = (payment.period_start_date, payment.period_end_date) {
        let days = (end - start).num_days() + 1;
        row.payment_period_weeks = ((days + 6) / 7).to_string();
    }

    if let Some(employee_id) = payment.employee_id {
        if let Some(employee) = Employee::find_by_id(employee_id).one(db).await? {
            row.first_name = employee.first_name;
            row.last_name = employee.last_name;
        }
    }
    if let Some(address_id) = payment.address_id {
        if let Some(address) = Address::find_by_id(address_id).one(db).await? {
            row.address_line_1 = address.address_line_one;
            row.address_line_2 = address.address_line_two.unwrap_or_default();
            row.city = address.city;
            row.state = address.geo_state;
            row.zip = address.zip_code;
        }
    }
    if let Some(claim_id) = payment.claim_id {
        if let Some(claim) = Claim::find_by_id(claim_id).one(db).await? {
            row.leave_type = claim
                .claim_type
                .map(|t| t.description().to_string())
                .unwrap_or_default();
            if let Some(employer_id) = claim.employer_id {
                if let Some(employer) = Employer::find_by_id(employer_id).one(db).await? {
                    row.employer_id = employer.employer_fein;
                }
            }
        }
    }
    if let Some(leave_request_id) = payment.fineos_leave_request_id.as_deref() {
        let absence = VbiRequestedAbsence::find()
            .filter(vbi_requested_absence::Column::ReferenceFileId.eq(payment.reference_file_id))
            .filter(vbi_requested_absence::Column::LeaverequestId.eq(leave_request_id))
            .one(db)
            .await?;
        if let Some(absence) = absence {
            row.absence_period_type = absence
                .absenceperiod_type
                .as_deref()
                .and_then(AbsencePeriodType::from_case_system)
                .map(|t| t.description().to_string())
                .unwrap_or_default();
            row.leave_request_decision = absence.leaverequest_decision.unwrap_or_default();
        }
    }

    // Amounts, including the split payments
    let amount = payment.amount.unwrap_or_default();
    let (mut federal, mut state, mut employer) = (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    for child in related_payments::get_related_payments(db, payment.id).await? {
        let child_amount = child.amount.unwrap_or_default();
        match child.payment_transaction_type {
            PaymentTransactionType::FederalTaxWithholding => federal += child_amount,
            PaymentTransactionType::StateTaxWithholding => state += child_amount,
            PaymentTransactionType::EmployerReimbursement => employer += child_amount,
            _ => {}
        }
    }
    row.gross_payment_amount = format_amount(amount + federal + state + employer);
    row.payment_amount = format_amount(amount);
    row.federal_withholding_amount = format_amount(federal);
    row.state_withholding_amount = format_amount(state);
    row.employer_reimbursement_amount = format_amount(employer);
    row.net_payment_amount = format_amount(amount);
    row.check_description = format!(
        "PFML Payment {} [{}-{}]",
        row.absence_case_number, row.payment_period_start_date, row.payment_period_end_date
    );

    // Prior outcomes and preapproval
    let first_time = is_first_time_payment(db, payment).await?;
    let prior = get_prior_outcomes(db, payment).await?;
    row.is_first_time_payment = bool_to_flag(first_time).to_string();
    row.previously_errored_payment_count = prior.errored.to_string();
    row.previously_rejected_payment_count = prior.rejected.to_string();
    row.previously_skipped_payment_count = prior.skipped.to_string();

    let mut preapproval_issues = Vec::new();
    if first_time {
        preapproval_issues.push("First time payment".to_string());
    }
    if prior.rejected > 0 {
        preapproval_issues.push("Payment has been rejected previously".to_string());
    }

    let details = AuditReportDetail::find()
        .filter(audit_report_detail::Column::PaymentId.eq(payment.id))
        .filter(audit_report_detail::Column::AddedToAuditReportAt.is_null())
        .order_by_asc(audit_report_detail::Column::Id)
        .all(db)
        .await?;
    for detail in &details {
        let message = detail_message(detail);
        let column = match detail.audit_report_type {
            AuditReportType::DuaAdditionalIncome => &mut row.dua_additional_income_details,
            AuditReportType::DiaAdditionalIncome => &mut row.dia_additional_income_details,
            AuditReportType::DorFineosNameMismatch => &mut row.dor_fineos_name_mismatch_details,
            AuditReportType::MaxWeeklyBenefitExceeded => {
                &mut row.max_weekly_benefit_exceeded_details
            }
        };
        if !column.is_empty() {
            column.push('\n');
        }
        column.push_str(&message);
        preapproval_issues.push(detail.audit_report_type.description().to_string());
    }

    row.is_preapproved = bool_to_flag(preapproval_issues.is_empty()).to_string();
    row.preapproval_issues = preapproval_issues.join("; ");
    Ok(row)
}

/// Writes every payment queued for the audit report and marks them sent.
///
/// Returns the number of rows written.
pub async fn generate_audit_report<C, W>(db: &C, writer: W, now: DateTime<Utc>) -> Result<usize>
where
    C: ConnectionTrait,
    W: Write,
{
    let payment_ids =
        state_log::get_payment_ids_in_end_state(db, State::DelegatedPaymentAddToPaymentAuditReport)
            .await?;

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(AUDIT_REPORT_COLUMNS)?;

    for payment_id in &payment_ids {
        let payment = Payment::find_by_id(*payment_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::PaymentNotFound {
                id: payment_id.to_string(),
            })?;
        let row = build_audit_row(db, &payment).await?;
        csv_writer.serialize(&row)?;

        state_log::record_state(
            db,
            Associated::Payment(payment.id),
            State::DelegatedPaymentPaymentAuditReportSent,
            "Payment added to payment audit report",
            now,
        )
        .await?;

        for detail in AuditReportDetail::find()
            .filter(audit_report_detail::Column::PaymentId.eq(payment.id))
            .filter(audit_report_detail::Column::AddedToAuditReportAt.is_null())
            .all(db)
            .await?
        {
            let mut active: audit_report_detail::ActiveModel = detail.into();
            active.added_to_audit_report_at = Set(Some(now));
            active.update(db).await?;
        }
    }
    csv_writer.flush()?;

    tracing::info!(rows = payment_ids.len(), "Generated payment audit report");
    Ok(payment_ids.len())
}

/// Samples staged payments and writes the audit report to `path`, in one
/// transaction.
pub async fn run_audit_report(
    db: &DatabaseConnection,
    percentage: u8,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<usize> {
    let txn = db.begin().await?;
    let result: Result<usize> = async {
        sample_payments_for_audit(&txn, percentage, now).await?;
        let file = std::fs::File::create(path)?;
        let rows = generate_audit_report(&txn, file, now).await?;
        reference_file::ActiveModel {
            file_location: Set(path.display().to_string()),
            reference_file_type: Set(ReferenceFileType::PaymentAuditReport),
            created_at: Set(now),
            processed_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        Ok(rows)
    }
    .await;

    match result {
        Ok(rows) => {
            txn.commit().await?;
            Ok(rows)
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::extract::read_csv_rows,
        entities::link_split_payment,
        test_utils::{create_test_payment_with, setup_test_db, test_now},
    };

    async fn ready_payment(db: &DatabaseConnection, i: &str) -> Result<payment::Model> {
        let payment =
            create_test_payment_with(db, "1", i, PaymentTransactionType::Standard, Some(1)).await?;
        state_log::record_state(
            db,
            Associated::Payment(payment.id),
            State::PaymentReadyForAddressValidation,
            "Success",
            test_now(),
        )
        .await?;
        Ok(payment)
    }

    #[test]
    fn test_sample_size_rounds_up() {
        assert_eq!(sample_size(0, 50), 0);
        assert_eq!(sample_size(3, 50), 2);
        assert_eq!(sample_size(10, 100), 10);
        assert_eq!(sample_size(10, 0), 0);
        assert_eq!(sample_size(1, 1), 1);
        assert_eq!(sample_size(4, 200), 4);
    }

    #[test]
    fn test_flags() {
        assert_eq!(bool_to_flag(true), "Y");
        assert!(flag_to_bool(" y "));
        assert!(!flag_to_bool(""));
        assert!(!flag_to_bool("N"));
    }

    #[test]
    fn test_columns_match_row_fields() -> Result<()> {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut buffer);
            writer.write_record(AUDIT_REPORT_COLUMNS)?;
            writer.serialize(PaymentAuditRow {
                pfml_payment_id: "7".to_string(),
                rejected_notes: "notes".to_string(),
                ..Default::default()
            })?;
            writer.flush()?;
        }
        let rows: Vec<PaymentAuditRow> = read_csv_rows(buffer.as_slice())?;
        assert_eq!(rows[0].pfml_payment_id, "7");
        assert_eq!(rows[0].rejected_notes, "notes");
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_sample_and_report() -> Result<()> {
        let db = setup_test_db().await?;
        let now = test_now();
        let first = ready_payment(&db, "601").await?;
        let second = ready_payment(&db, "602").await?;
        let federal = create_test_payment_with(
            &db,
            "1",
            "603",
            PaymentTransactionType::FederalTaxWithholding,
            Some(1),
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
        link_split_payment::ActiveModel {
            payment_id: Set(first.id),
            related_payment_id: Set(federal.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        add_audit_report_detail(
            &db,
            first.id,
            AuditReportType::DuaAdditionalIncome,
            "DUA reported income",
            now,
        )
        .await?;

        let staged = stage_payments_for_audit(&db, now).await?;
        assert_eq!(staged.staged, 2);
        assert_eq!(staged.split_pending_audit, 1);
        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(federal.id), Flow::DelegatedPayment)
                .await?,
            Some(State::FederalWithholdingPendingAudit)
        );

        // Half of two staged payments: the lowest id only
        let sampled = sample_payments_for_audit(&db, 50, now).await?;
        assert_eq!(sampled, vec![first.id]);

        let mut buffer = Vec::new();
        let written = generate_audit_report(&db, &mut buffer, now).await?;
        assert_eq!(written, 1);

        let rows: Vec<PaymentAuditRow> = read_csv_rows(buffer.as_slice())?;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.pfml_payment_id, first.id.to_string());
        assert_eq!(row.payment_amount, "500.00");
        assert_eq!(row.federal_withholding_amount, "50.00");
        assert_eq!(row.gross_payment_amount, "550.00");
        assert_eq!(row.dua_additional_income_details, "DUA reported income");
        assert_eq!(row.is_first_time_payment, "Y");
        assert_eq!(row.is_preapproved, "N");
        assert_eq!(
            row.preapproval_issues,
            "First time payment; DUA Additional Income"
        );
        assert_eq!(row.payment_period_weeks, "1");

        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(first.id), Flow::DelegatedPayment)
                .await?,
            Some(State::DelegatedPaymentPaymentAuditReportSent)
        );
        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(second.id), Flow::DelegatedPayment)
                .await?,
            Some(State::DelegatedPaymentStagedForPaymentAuditReportSampling)
        );
        let details = AuditReportDetail::find().all(&db).await?;
        assert!(details[0].added_to_audit_report_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_unsampled_payments_go_first_next_run() -> Result<()> {
        let db = setup_test_db().await?;
        let now = test_now();
        let first = ready_payment(&db, "620").await?;
        let second = ready_payment(&db, "621").await?;
        stage_payments_for_audit(&db, now).await?;
        assert_eq!(sample_payments_for_audit(&db, 50, now).await?, vec![first.id]);

        let third = ready_payment(&db, "622").await?;
        stage_payments_for_audit(&db, now).await?;
        assert_eq!(sample_payments_for_audit(&db, 50, now).await?, vec![second.id]);
        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(third.id), Flow::DelegatedPayment)
                .await?,
            Some(State::DelegatedPaymentStagedForPaymentAuditReportSampling)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_check_payment_without_address_is_error() -> Result<()> {
        let db = setup_test_db().await?;
        let payment = ready_payment(&db, "610").await?;
        let mut active: payment::ActiveModel = payment.clone().into();
        active.disb_method = Set(Some(PaymentMethod::Check));
        active.update(&db).await?;

        let summary = stage_payments_for_audit(&db, test_now()).await?;
        assert_eq!(summary.errored, 1);
        assert_eq!(
            state_log::get_current_state(&db, Associated::Payment(payment.id), Flow::DelegatedPayment)
                .await?,
            Some(State::DelegatedPaymentAddToPaymentErrorReportRestartable)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_prior_outcomes_count_other_payments_only() -> Result<()> {
        let db = setup_test_db().await?;
        let now = test_now();
        let earlier = create_test_payment_with(&db, "9", "1", PaymentTransactionType::Standard, None)
            .await?;
        for state in [
            State::DelegatedPaymentAddToPaymentErrorReport,
            State::DelegatedPaymentAddToPaymentRejectReportRestartable,
            State::DelegatedPaymentAddToPaymentRejectReport,
        ] {
            state_log::record_state(&db, Associated::Payment(earlier.id), state, "x", now).await?;
        }
        let current = create_test_payment_with(&db, "9", "1", PaymentTransactionType::Standard, None)
            .await?;
        state_log::record_state(
            &db,
            Associated::Payment(current.id),
            State::DelegatedPaymentAddToPaymentErrorReport,
            "x",
            now,
        )
        .await?;

        let prior = get_prior_outcomes(&db, &current).await?;
        assert_eq!(
            prior,
            PriorOutcomes {
                errored: 1,
                rejected: 1,
                skipped: 1
            }
        );
        Ok(())
    }
}
