//! Payment record builder - Reconciles a [`PaymentData`] with what we already know
//! about the claimant and persists the payment.
//!
//! Issues found here are added to the payment's validation container like any
//! other data problem. Writes to shared records (bank accounts, addresses) only
//! happen while the payment has no issues at all.

use crate::{
    config::settings::PaymentsConfig,
    core::{
        extract::CiIdentifier,
        lookups::{Flow, PaymentTransactionType, PrenoteState, State},
        payment_data::{AddressData, EftData, PaymentData},
        state_log::{self, Associated},
        validation::{ValidationContainer, ValidationReason},
    },
    entities::{
        Address, Claim, Employee, Employer, ManualReviewTask, Payment, PubEft, address, claim,
        employee, manual_review_task, payment, payment_details, payment_line, pub_eft,
    },
    errors::Result,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::{HashMap, hash_map::Entry};

/// Batch-wide inputs of the record builder.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    /// Pipeline settings
    pub config: &'a PaymentsConfig,
    /// Extract batch being processed
    pub reference_file_id: i64,
    /// Business date of the run
    pub today: NaiveDate,
    /// Timestamp stamped on created rows
    pub now: DateTime<Utc>,
}

/// A persisted payment and everything learned while creating it.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    /// The payment row as inserted
    pub payment: payment::Model,
    /// Payee, when it could be resolved
    pub employee: Option<employee::Model>,
    /// Claim, when it could be resolved
    pub claim: Option<claim::Model>,
    /// Extract issues plus the ones found against the database
    pub validation_container: ValidationContainer,
}

/// Finds the employee and claim of a payment, recording what is missing or
/// inconsistent for payments that move money.
pub async fn resolve_employee_and_claim<C>(
    db: &C,
    data: &mut PaymentData,
) -> Result<(Option<employee::Model>, Option<claim::Model>)>
where
    C: ConnectionTrait,
{
    let transaction_type = data.payment_transaction_type;
    let check_issues = transaction_type.is_disbursable();
    let container = &mut data.validation_container;

    let claim = match data.absence_case_number.as_deref() {
        Some(case_number) => {
            Claim::find()
                .filter(claim::Column::FineosAbsenceId.eq(case_number))
                .one(db)
                .await?
        }
        None => None,
    };

    let employee = if transaction_type.is_split_payment() {
        // Withholdings and reimbursements carry a third-party tax id
        match claim.as_ref().and_then(|c| c.employee_id) {
            Some(employee_id) => Employee::find_by_id(employee_id).one(db).await?,
            None => None,
        }
    } else {
        match data.tax_identifier.as_deref() {
            Some(tin) => {
                Employee::find()
                    .filter(employee::Column::TaxIdentifier.eq(tin))
                    .one(db)
                    .await?
            }
            None => None,
        }
    };

    if check_issues {
        if employee.is_none() {
            container.add_validation_issue(ValidationReason::MissingInDb, "employee");
        }
        match claim.as_ref() {
            None => container.add_validation_issue(ValidationReason::MissingInDb, "claim"),
            Some(claim) => {
                let mismatch = match (&employee, claim.employee_id) {
                    (Some(employee), Some(claim_employee_id)) => employee.id != claim_employee_id,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if mismatch {
                    container.add_validation_issue(
                        ValidationReason::ClaimantMismatch,
                        format!("claim {}", claim.fineos_absence_id),
                    );
                }
                if transaction_type == PaymentTransactionType::Standard && !claim.is_id_proofed {
                    container.add_validation_issue(
                        ValidationReason::ClaimNotIdProofed,
                        format!("claim {}", claim.fineos_absence_id),
                    );
                }
            }
        }
    }

    Ok((employee, claim))
}

async fn check_employer_exemption<C>(
    db: &C,
    data: &mut PaymentData,
    claim: &claim::Model,
    today: NaiveDate,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(employer_id) = claim.employer_id else {
        return Ok(());
    };
    let Some(employer) = Employer::find_by_id(employer_id).one(db).await? else {
        return Ok(());
    };
    let date = data
        .period_start_date
        .or(data.payment_date)
        .unwrap_or(today);
    if employer.is_exempt(claim.claim_type, date) {
        data.validation_container.add_validation_issue(
            ValidationReason::EmployerExempt,
            format!("employer {}", employer.employer_fein),
        );
    }
    Ok(())
}

async fn check_open_income_tasks<C>(db: &C, data: &mut PaymentData, claim: &claim::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    let open_tasks = ManualReviewTask::find()
        .filter(manual_review_task::Column::ClaimId.eq(claim.id))
        .filter(manual_review_task::Column::IsOpen.eq(true))
        .all(db)
        .await?;
    if open_tasks.iter().any(|t| t.task_type.is_income_task()) {
        data.validation_container
            .add_validation_issue(ValidationReason::OpenOtherIncomeTasks, "manual_review_task");
    }
    Ok(())
}

/// Finds or creates the employee's bank account for `eft` and applies the
/// prenote rules. Returns the account when one is linked to the payment.
pub async fn process_eft<C>(
    db: &C,
    container: &mut ValidationContainer,
    employee: &employee::Model,
    eft: &EftData,
    ctx: &RecordContext<'_>,
) -> Result<Option<pub_eft::Model>>
where
    C: ConnectionTrait,
{
    if container.has_validation_issues() {
        tracing::info!(
            record_key = %container.record_key,
            "Skipping EFT update for payment with validation issues"
        );
        return Ok(None);
    }

    let existing = PubEft::find()
        .filter(pub_eft::Column::EmployeeId.eq(employee.id))
        .filter(pub_eft::Column::RoutingNbr.eq(eft.routing_nbr.as_str()))
        .filter(pub_eft::Column::AccountNbr.eq(eft.account_nbr.as_str()))
        .filter(pub_eft::Column::BankAccountType.eq(eft.bank_account_type))
        .order_by_asc(pub_eft::Column::Id)
        .one(db)
        .await?;

    let Some(record) = existing else {
        let created = pub_eft::ActiveModel {
            employee_id: Set(employee.id),
            routing_nbr: Set(eft.routing_nbr.clone()),
            account_nbr: Set(eft.account_nbr.clone()),
            bank_account_type: Set(eft.bank_account_type),
            prenote_state: Set(PrenoteState::PendingPrePub),
            prenote_sent_at: Set(None),
            prenote_approved_at: Set(None),
            created_at: Set(ctx.now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        state_log::record_state(
            db,
            Associated::Employee(employee.id),
            State::DelegatedEftSendPrenote,
            "Initiated DELEGATED_EFT flow for employee",
            ctx.now,
        )
        .await?;
        container.add_validation_issue(ValidationReason::EftPrenotePending, "prenote_state");
        tracing::info!(employee_id = employee.id, pub_eft_id = created.id, "Created new EFT record");
        return Ok(Some(created));
    };

    match record.prenote_state {
        PrenoteState::Approved => Ok(Some(record)),
        PrenoteState::Rejected => {
            container.add_validation_issue(ValidationReason::EftPrenoteRejected, "prenote_state");
            Ok(Some(record))
        }
        PrenoteState::PendingPrePub => {
            container.add_validation_issue(ValidationReason::EftPrenotePending, "prenote_state");
            Ok(Some(record))
        }
        PrenoteState::PendingWithPub => {
            let waiting = Duration::days(ctx.config.prenote_waiting_period_days);
            let ready = record
                .prenote_sent_at
                .is_some_and(|sent| sent.date_naive() + waiting < ctx.today);
            if !ready {
                container
                    .add_validation_issue(ValidationReason::EftPrenotePending, "prenote_state");
                return Ok(Some(record));
            }

            let mut active: pub_eft::ActiveModel = record.into();
            active.prenote_state = Set(PrenoteState::Approved);
            active.prenote_approved_at = Set(Some(ctx.now));
            let approved = active.update(db).await?;
            state_log::record_state(
                db,
                Associated::Employee(employee.id),
                State::DelegatedEftPrenoteApproved,
                "Prenote approved after waiting period",
                ctx.now,
            )
            .await?;
            tracing::info!(pub_eft_id = approved.id, "Auto-approved prenote");
            Ok(Some(approved))
        }
    }
}

fn address_matches(existing: &address::Model, candidate: &AddressData) -> bool {
    existing.address_line_one == candidate.address_line_one
        && existing.address_line_two == candidate.address_line_two
        && existing.city == candidate.city
        && existing.geo_state == candidate.geo_state
        && existing.zip_code == candidate.zip_code
}

/// Links the payment to the employee's address, creating a new one when the
/// candidate differs from both addresses on file.
pub async fn process_address<C>(
    db: &C,
    container: &ValidationContainer,
    employee: &employee::Model,
    candidate: &AddressData,
) -> Result<Option<address::Model>>
where
    C: ConnectionTrait,
{
    if container.has_validation_issues() {
        return Ok(None);
    }

    for existing_id in [employee.experian_address_id, employee.fineos_address_id]
        .into_iter()
        .flatten()
    {
        if let Some(existing) = Address::find_by_id(existing_id).one(db).await? {
            if address_matches(&existing, candidate) {
                return Ok(Some(existing));
            }
        }
    }

    let created = address::ActiveModel {
        address_line_one: Set(candidate.address_line_one.clone()),
        address_line_two: Set(candidate.address_line_two.clone()),
        city: Set(candidate.city.clone()),
        geo_state: Set(candidate.geo_state.clone()),
        zip_code: Set(candidate.zip_code.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut active: employee::ActiveModel = employee.clone().into();
    active.fineos_address_id = Set(Some(created.id));
    active.experian_address_id = Set(None);
    active.update(db).await?;

    tracing::info!(employee_id = employee.id, address_id = created.id, "Recorded new address");
    Ok(Some(created))
}

/// Whether another payment with the same (C,I) is still in a non-restartable state.
pub async fn is_payment_active<C>(db: &C, key: &CiIdentifier) -> Result<bool>
where
    C: ConnectionTrait,
{
    let previous = Payment::find()
        .filter(payment::Column::FineosPeiCValue.eq(key.c.as_str()))
        .filter(payment::Column::FineosPeiIValue.eq(key.i.as_str()))
        .all(db)
        .await?;

    for payment in previous {
        let state =
            state_log::get_current_state(db, Associated::Payment(payment.id), Flow::DelegatedPayment)
                .await?;
        if state.is_some_and(|s| !s.is_restartable()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Creates the persistent payment, with its details and lines, for `data`.
pub async fn create_payment_record<C>(
    db: &C,
    mut data: PaymentData,
    ctx: &RecordContext<'_>,
) -> Result<PaymentRecord>
where
    C: ConnectionTrait,
{
    let (employee, claim) = resolve_employee_and_claim(db, &mut data).await?;
    let is_standard = data.payment_transaction_type == PaymentTransactionType::Standard;

    if is_standard {
        if let Some(claim) = claim.as_ref() {
            check_employer_exemption(db, &mut data, claim, ctx.today).await?;
            check_open_income_tasks(db, &mut data, claim).await?;
        }
    }

    let mut pub_eft_id = None;
    if data.requirements.eft_required {
        if let (Some(employee), Some(eft)) = (employee.as_ref(), data.eft.as_ref()) {
            pub_eft_id = process_eft(db, &mut data.validation_container, employee, eft, ctx)
                .await?
                .map(|e| e.id);
        }
    }

    let mut address_id = None;
    if data.requirements.address_required {
        if let (Some(employee), Some(candidate)) = (employee.as_ref(), data.address.as_ref()) {
            address_id = process_address(db, &data.validation_container, employee, candidate)
                .await?
                .map(|a| a.id);
        }
    }

    let exclude_from_payment_status = is_payment_active(db, &data.key).await?;
    if exclude_from_payment_status {
        tracing::error!(
            c_value = %data.key.c,
            i_value = %data.key.i,
            "Received payment that is already being processed"
        );
        data.validation_container.add_validation_issue(
            ValidationReason::ReceivedPaymentCurrentlyBeingProcessed,
            "A payment with the same C/I value is already being processed",
        );
    }

    let payment = payment::ActiveModel {
        fineos_pei_c_value: Set(data.key.c.clone()),
        fineos_pei_i_value: Set(data.key.i.clone()),
        reference_file_id: Set(ctx.reference_file_id),
        fineos_extraction_date: Set(ctx.today),
        amount: Set(data.amount),
        payment_transaction_type: Set(data.payment_transaction_type),
        payment_relevant_party: Set(data.payment_relevant_party),
        period_start_date: Set(data.period_start_date),
        period_end_date: Set(data.period_end_date),
        payment_date: Set(data.payment_date),
        disb_method: Set(data.payment_method),
        claim_id: Set(claim.as_ref().map(|c| c.id)),
        employee_id: Set(employee.as_ref().map(|e| e.id)),
        pub_eft_id: Set(pub_eft_id),
        address_id: Set(address_id),
        fineos_leave_request_id: Set(data.leave_request_id.clone()),
        absence_case_number: Set(data.absence_case_number.clone()),
        payee_name: Set(data.payee_name.clone()),
        exclude_from_payment_status: Set(exclude_from_payment_status),
        is_adhoc_payment: Set(data.is_adhoc_payment),
        disb_check_eft_number: Set(None),
        disb_check_eft_issue_date: Set(None),
        disb_amount: Set(None),
        created_at: Set(ctx.now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut detail_ids = HashMap::new();
    for detail in &data.details {
        let inserted = payment_details::ActiveModel {
            payment_id: Set(payment.id),
            payment_details_c_value: Set(detail.key.c.clone()),
            payment_details_i_value: Set(detail.key.i.clone()),
            period_start_date: Set(detail.period_start_date),
            period_end_date: Set(detail.period_end_date),
            amount: Set(detail.amount),
            business_net_amount: Set(detail.business_net_amount),
            ..Default::default()
        }
        .insert(db)
        .await?;
        match detail_ids.entry(detail.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(inserted.id);
            }
            Entry::Occupied(_) => {
                tracing::error!(
                    record_key = %data.key,
                    detail = %detail.key,
                    "Multiple payment detail rows share a key, lines match the first"
                );
            }
        }
    }

    for line in &data.lines {
        payment_line::ActiveModel {
            payment_id: Set(payment.id),
            payment_details_id: Set(line
                .payment_detail_key
                .as_ref()
                .and_then(|k| detail_ids.get(k).copied())),
            payment_line_c_value: Set(line.key.c.clone()),
            payment_line_i_value: Set(line.key.i.clone()),
            amount: Set(line.amount),
            line_type: Set(line.line_type.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(PaymentRecord {
        payment,
        employee,
        claim,
        validation_container: data.validation_container,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::lookups::ManualReviewTaskType,
        entities::{PaymentDetails, PaymentLine},
        test_utils::{
            ExtractFixture, create_test_claim, create_test_eft, create_test_employee,
            setup_test_db, test_now, test_today,
        },
    };
    use sea_orm::DatabaseConnection;

    async fn build_record(
        db: &DatabaseConnection,
        fixture: &ExtractFixture,
        config: &PaymentsConfig,
    ) -> Result<PaymentRecord> {
        let data = PaymentData::build(&fixture.key(), &fixture.to_rows(), config);
        let ctx = RecordContext {
            config,
            reference_file_id: 1,
            today: test_today(),
            now: test_now(),
        };
        create_payment_record(db, data, &ctx).await
    }

    #[tokio::test]
    async fn test_standard_payment_with_approved_prenote() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        create_test_eft(&db, &employee, PrenoteState::Approved, None).await?;

        let fixture = ExtractFixture::standard("7326", "401", "123456789");
        let record = build_record(&db, &fixture, &config).await?;

        assert!(
            !record.validation_container.has_validation_issues(),
            "{:?}",
            record.validation_container.get_reasons_with_field_names()
        );
        assert_eq!(record.payment.employee_id, Some(employee.id));
        assert!(record.payment.pub_eft_id.is_some());
        assert!(!record.payment.exclude_from_payment_status);

        let details = PaymentDetails::find().all(&db).await?;
        let lines = PaymentLine::find().all(&db).await?;
        assert_eq!(details.len(), 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].payment_details_id, Some(details[0].id));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_detail_rows_keep_first_for_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        create_test_eft(&db, &employee, PrenoteState::Approved, None).await?;

        let mut fixture = ExtractFixture::standard("7326", "402", "123456789");
        fixture.details.push(fixture.details[0].clone());
        build_record(&db, &fixture, &config).await?;

        let details = PaymentDetails::find()
            .order_by_asc(payment_details::Column::Id)
            .all(&db)
            .await?;
        let lines = PaymentLine::find().all(&db).await?;
        assert_eq!(details.len(), 2);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].payment_details_id, Some(details[0].id));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_employee_and_claim() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let fixture = ExtractFixture::standard("7326", "402", "123456789");
        let record = build_record(&db, &fixture, &config).await?;

        assert_eq!(
            record.validation_container.get_reasons_with_field_names(),
            vec![
                "MissingInDb: employee".to_string(),
                "MissingInDb: claim".to_string()
            ]
        );
        // The payment still exists for inspection
        assert_eq!(Payment::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_claimant_mismatch_and_not_id_proofed() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        create_test_employee(&db, "123456789").await?;
        let other = create_test_employee(&db, "987654321").await?;
        create_test_claim(&db, &other, "NTN-100-ABS-01", false).await?;

        let fixture = ExtractFixture::standard("7326", "403", "123456789");
        let record = build_record(&db, &fixture, &config).await?;
        let reasons = record.validation_container.get_reasons();
        assert!(reasons.contains(&ValidationReason::ClaimantMismatch));
        assert!(reasons.contains(&ValidationReason::ClaimNotIdProofed));
        Ok(())
    }

    #[tokio::test]
    async fn test_new_eft_starts_prenote() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;

        let fixture = ExtractFixture::standard("7326", "404", "123456789");
        let record = build_record(&db, &fixture, &config).await?;

        assert_eq!(
            record.validation_container.get_reasons(),
            vec![ValidationReason::EftPrenotePending]
        );
        let efts = PubEft::find().all(&db).await?;
        assert_eq!(efts.len(), 1);
        assert_eq!(efts[0].prenote_state, PrenoteState::PendingPrePub);
        assert_eq!(
            state_log::get_current_state(&db, Associated::Employee(employee.id), Flow::DelegatedEft)
                .await?,
            Some(State::DelegatedEftSendPrenote)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_prenote_has_distinct_reason() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        create_test_eft(&db, &employee, PrenoteState::Rejected, None).await?;

        let fixture = ExtractFixture::standard("7326", "405", "123456789");
        let record = build_record(&db, &fixture, &config).await?;
        assert_eq!(
            record.validation_container.get_reasons(),
            vec![ValidationReason::EftPrenoteRejected]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_prenote_promotion_boundary() -> Result<()> {
        let config = PaymentsConfig::default();

        // Five days with the bank: still pending
        let db = setup_test_db().await?;
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        let five_days_ago = test_now() - Duration::days(5);
        create_test_eft(&db, &employee, PrenoteState::PendingWithPub, Some(five_days_ago)).await?;
        let record =
            build_record(&db, &ExtractFixture::standard("7326", "406", "123456789"), &config)
                .await?;
        assert_eq!(
            record.validation_container.get_reasons(),
            vec![ValidationReason::EftPrenotePending]
        );
        assert_eq!(
            PubEft::find().all(&db).await?[0].prenote_state,
            PrenoteState::PendingWithPub
        );

        // Six days with the bank: promoted
        let db = setup_test_db().await?;
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        let six_days_ago = test_now() - Duration::days(6);
        create_test_eft(&db, &employee, PrenoteState::PendingWithPub, Some(six_days_ago)).await?;
        let record =
            build_record(&db, &ExtractFixture::standard("7326", "407", "123456789"), &config)
                .await?;
        assert!(!record.validation_container.has_validation_issues());
        let eft = &PubEft::find().all(&db).await?[0];
        assert_eq!(eft.prenote_state, PrenoteState::Approved);
        assert!(eft.prenote_approved_at.is_some());
        assert_eq!(
            state_log::get_current_state(&db, Associated::Employee(employee.id), Flow::DelegatedEft)
                .await?,
            Some(State::DelegatedEftPrenoteApproved)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_exempt_employer_and_open_tasks() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        let claim = create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        create_test_eft(&db, &employee, PrenoteState::Approved, None).await?;

        let employer = crate::entities::employer::ActiveModel {
            employer_fein: Set("111222333".to_string()),
            employer_name: Set("Exempt Co".to_string()),
            family_exemption: Set(true),
            medical_exemption: Set(true),
            exemption_commence_date: Set(NaiveDate::from_ymd_opt(2020, 1, 1)),
            exemption_cease_date: Set(NaiveDate::from_ymd_opt(2022, 1, 1)),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let mut active: claim::ActiveModel = claim.clone().into();
        active.employer_id = Set(Some(employer.id));
        active.update(&db).await?;

        manual_review_task::ActiveModel {
            claim_id: Set(claim.id),
            task_type: Set(ManualReviewTaskType::EmployerReportedOtherIncome),
            is_open: Set(true),
            created_at: Set(test_now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        // Closed and non-income tasks do not block
        manual_review_task::ActiveModel {
            claim_id: Set(claim.id),
            task_type: Set(ManualReviewTaskType::IdentityReview),
            is_open: Set(true),
            created_at: Set(test_now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let fixture = ExtractFixture::standard("7326", "408", "123456789");
        let record = build_record(&db, &fixture, &config).await?;
        assert_eq!(
            record.validation_container.get_reasons(),
            vec![
                ValidationReason::EmployerExempt,
                ValidationReason::OpenOtherIncomeTasks
            ]
        );
        // Issues block the bank account update
        assert!(record.payment.pub_eft_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_check_payment_address_reuse_and_creation() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;

        let mut fixture = ExtractFixture::standard("7326", "409", "123456789");
        fixture.header.paymentmethod = Some("Check".to_string());
        let first = build_record(&db, &fixture, &config).await?;
        assert!(!first.validation_container.has_validation_issues());
        let first_address = first.payment.address_id;
        assert!(first_address.is_some());

        // Same address again is reused
        fixture.header.i = "410".to_string();
        let second = build_record(&db, &fixture, &config).await?;
        assert_eq!(second.payment.address_id, first_address);
        assert_eq!(Address::find().all(&db).await?.len(), 1);

        // A changed address creates a new row and becomes the employee's address
        fixture.header.i = "411".to_string();
        fixture.header.paymentadd1 = Some("9 Elm St".to_string());
        let third = build_record(&db, &fixture, &config).await?;
        assert_ne!(third.payment.address_id, first_address);
        let reloaded = Employee::find_by_id(employee.id).one(&db).await?;
        assert_eq!(
            reloaded.and_then(|e| e.fineos_address_id),
            third.payment.address_id
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_active_payment_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let config = PaymentsConfig::default();
        let employee = create_test_employee(&db, "123456789").await?;
        create_test_claim(&db, &employee, "NTN-100-ABS-01", true).await?;
        create_test_eft(&db, &employee, PrenoteState::Approved, None).await?;

        let fixture = ExtractFixture::standard("7326", "412", "123456789");
        let first = build_record(&db, &fixture, &config).await?;
        state_log::record_state(
            &db,
            Associated::Payment(first.payment.id),
            State::PaymentReadyForAddressValidation,
            "Success",
            test_now(),
        )
        .await?;

        let second = build_record(&db, &fixture, &config).await?;
        assert!(second.payment.exclude_from_payment_status);
        assert!(second
            .validation_container
            .has_reason(ValidationReason::ReceivedPaymentCurrentlyBeingProcessed));

        // A restartable prior state does not conflict
        state_log::record_state(
            &db,
            Associated::Payment(first.payment.id),
            State::DelegatedPaymentAddToPaymentErrorReportRestartable,
            "Error",
            test_now(),
        )
        .await?;
        let third = build_record(&db, &fixture, &config).await?;
        assert!(!third.payment.exclude_from_payment_status);
        Ok(())
    }
}
