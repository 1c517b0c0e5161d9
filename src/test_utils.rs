//! Shared test utilities for the payment processing engine.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults, and building extract rows.

use crate::{
    core::{
        extract::{
            CLAIM_DETAILS_FILE, CiIdentifier, PAYMENT_DETAILS_FILE, PAYMENT_LINE_FILE,
            PaymentExtractRows, REQUESTED_ABSENCE_FILE, VPEI_FILE,
        },
        lookups::{
            BankAccountType, PaymentMethod, PaymentRelevantParty, PaymentTransactionType,
            PrenoteState,
        },
    },
    entities::{
        claim, employee, payment, pub_eft, vbi_requested_absence, vpei, vpei_claim_details,
        vpei_payment_details, vpei_payment_line,
    },
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;
use std::{collections::HashSet, path::Path};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Fixed "now" used by tests: 2021-01-10 12:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 10, 12, 0, 0)
        .single()
        .expect("valid test timestamp")
}

/// The calendar day of [`test_now`].
pub fn test_today() -> NaiveDate {
    test_now().date_naive()
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Creates a test payment with sensible defaults.
///
/// # Defaults
/// * type: standard, relevant party: claimant
/// * amount: 500.00, paid by ACH
/// * reference file 1, no claim
pub async fn create_test_payment(
    db: &DatabaseConnection,
    c: &str,
    i: &str,
) -> Result<payment::Model> {
    create_test_payment_with(db, c, i, PaymentTransactionType::Standard, None).await
}

/// Creates a test payment of a given type, optionally attached to a claim.
///
/// Every test payment shares the same reference file, pay period
/// (2021-01-01 to 2021-01-07) and payment date, so standard and split payments
/// created with the same claim link up. Split payments are 50.00.
pub async fn create_test_payment_with(
    db: &DatabaseConnection,
    c: &str,
    i: &str,
    transaction_type: PaymentTransactionType,
    claim_id: Option<i64>,
) -> Result<payment::Model> {
    let (party, amount, method) = match transaction_type {
        PaymentTransactionType::StateTaxWithholding => {
            (PaymentRelevantParty::StateTax, dec!(50.00), None)
        }
        PaymentTransactionType::FederalTaxWithholding => {
            (PaymentRelevantParty::FederalTax, dec!(50.00), None)
        }
        PaymentTransactionType::EmployerReimbursement => {
            (PaymentRelevantParty::ReimbursedEmployer, dec!(50.00), None)
        }
        _ => (
            PaymentRelevantParty::Claimant,
            dec!(500.00),
            Some(PaymentMethod::Ach),
        ),
    };

    let payment = payment::ActiveModel {
        fineos_pei_c_value: Set(c.to_string()),
        fineos_pei_i_value: Set(i.to_string()),
        reference_file_id: Set(1),
        fineos_extraction_date: Set(test_today()),
        amount: Set(Some(amount)),
        payment_transaction_type: Set(transaction_type),
        payment_relevant_party: Set(party),
        period_start_date: Set(date(2021, 1, 1)),
        period_end_date: Set(date(2021, 1, 7)),
        payment_date: Set(date(2021, 1, 8)),
        disb_method: Set(method),
        claim_id: Set(claim_id),
        employee_id: Set(None),
        pub_eft_id: Set(None),
        address_id: Set(None),
        fineos_leave_request_id: Set(None),
        absence_case_number: Set(None),
        payee_name: Set(None),
        exclude_from_payment_status: Set(false),
        is_adhoc_payment: Set(false),
        disb_check_eft_number: Set(None),
        disb_check_eft_issue_date: Set(None),
        disb_amount: Set(None),
        created_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(payment)
}

/// Creates a test employee named Jane Doe with the given tax identifier.
pub async fn create_test_employee(
    db: &DatabaseConnection,
    tax_identifier: &str,
) -> Result<employee::Model> {
    let employee = employee::ActiveModel {
        tax_identifier: Set(tax_identifier.to_string()),
        first_name: Set("Jane".to_string()),
        last_name: Set("Doe".to_string()),
        fineos_customer_number: Set(Some(format!("C-{tax_identifier}"))),
        ctr_vendor_customer_code: Set(None),
        fineos_address_id: Set(None),
        experian_address_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(employee)
}

/// Creates a family leave claim for `employee` without an employer.
pub async fn create_test_claim(
    db: &DatabaseConnection,
    employee: &employee::Model,
    absence_case_number: &str,
    is_id_proofed: bool,
) -> Result<claim::Model> {
    let claim = claim::ActiveModel {
        fineos_absence_id: Set(absence_case_number.to_string()),
        employee_id: Set(Some(employee.id)),
        employer_id: Set(None),
        claim_type: Set(Some(crate::core::lookups::ClaimType::Family)),
        is_id_proofed: Set(is_id_proofed),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(claim)
}

/// Creates a checking account EFT matching the standard extract fixture.
///
/// # Defaults
/// * routing: 011000015
/// * account: 123456789012
pub async fn create_test_eft(
    db: &DatabaseConnection,
    employee: &employee::Model,
    prenote_state: PrenoteState,
    prenote_sent_at: Option<DateTime<Utc>>,
) -> Result<pub_eft::Model> {
    let eft = pub_eft::ActiveModel {
        employee_id: Set(employee.id),
        routing_nbr: Set("011000015".to_string()),
        account_nbr: Set("123456789012".to_string()),
        bank_account_type: Set(BankAccountType::Checking),
        prenote_state: Set(prenote_state),
        prenote_sent_at: Set(prenote_sent_at),
        prenote_approved_at: Set(None),
        created_at: Set(test_now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(eft)
}

/// The extract rows of one payment, as a test builds them.
#[derive(Debug, Clone)]
pub struct ExtractFixture {
    pub header: vpei::Model,
    pub details: Vec<vpei_payment_details::Model>,
    pub lines: Vec<vpei_payment_line::Model>,
    pub claim_details: Option<vpei_claim_details::Model>,
    pub requested_absence: Option<vbi_requested_absence::Model>,
}

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

impl ExtractFixture {
    /// A valid 500.00 ACH payment to the payee with tax identifier `tin`.
    ///
    /// # Defaults
    /// * one week pay period starting 2021-01-01, paid 2021-01-08
    /// * absence case `NTN-100-ABS-01`, approved continuous leave request `LR-100`
    /// * address 123 Main St, Boston MA 02110
    pub fn standard(c: &str, i: &str, tin: &str) -> Self {
        let detail_c = "7806";
        let detail_i = format!("{i}1");

        let header = vpei::Model {
            id: 0,
            reference_file_id: 0,
            c: c.to_string(),
            i: i.to_string(),
            payeesocnumbe: some(tin),
            paymentadd1: some("123 Main St"),
            paymentadd2: None,
            paymentadd4: some("Boston"),
            paymentadd6: some("MA"),
            paymentpostco: some("02110"),
            paymentmethod: some("Elec Funds Transfer"),
            paymentdate: some("2021-01-08"),
            amount_monamt: some("500.00"),
            payeebanksort: some("011000015"),
            payeeaccountn: some("123456789012"),
            payeeaccountt: some("Checking"),
            eventtype: some("PaymentOut"),
            eventreason: some("Unknown"),
            payeeidentifi: some("Social Security Number"),
            payeefullname: some("Jane Doe"),
            amalgamationc: None,
        };
        let detail = vpei_payment_details::Model {
            id: 0,
            reference_file_id: 0,
            peclassid: c.to_string(),
            peindexid: i.to_string(),
            c: detail_c.to_string(),
            i: detail_i.clone(),
            paymentstartp: some("2021-01-01"),
            paymentendper: some("2021-01-07"),
            balancingamou_monamt: some("500.00"),
            businessnetbe_monamt: some("500.00"),
        };
        let line = vpei_payment_line::Model {
            id: 0,
            reference_file_id: 0,
            c: "7692".to_string(),
            i: format!("{i}2"),
            amount_monamt: some("500.00"),
            linetype: some("Gross"),
            paymentdetailclassid: some(detail_c),
            paymentdetailindexid: Some(detail_i),
            c_pymnteif_paymentlines: some(c),
            i_pymnteif_paymentlines: some(i),
        };
        let claim_details = vpei_claim_details::Model {
            id: 0,
            reference_file_id: 0,
            peclassid: c.to_string(),
            peindexid: i.to_string(),
            absencecasenu: some("NTN-100-ABS-01"),
            leaverequesti: some("LR-100"),
        };
        let requested_absence = vbi_requested_absence::Model {
            id: 0,
            reference_file_id: 0,
            leaverequest_id: some("LR-100"),
            leaverequest_decision: some("Approved"),
            absence_casenumber: some("NTN-100-ABS-01"),
            absencereason_coverage: some("Family"),
            absenceperiod_type: some("Continuous"),
            absenceperiod_start: some("2021-01-01"),
            absenceperiod_end: some("2021-03-01"),
        };

        Self {
            header,
            details: vec![detail],
            lines: vec![line],
            claim_details: Some(claim_details),
            requested_absence: Some(requested_absence),
        }
    }

    /// (C,I) of the payment header.
    pub fn key(&self) -> CiIdentifier {
        CiIdentifier::new(self.header.c.as_str(), self.header.i.as_str())
    }

    /// The rows as the aggregator would hand them over.
    pub fn to_rows(&self) -> PaymentExtractRows {
        PaymentExtractRows {
            header: Some(self.header.clone()),
            details: self.details.clone(),
            lines: self.lines.clone(),
            claim_details: self.claim_details.clone(),
            requested_absence: self.requested_absence.clone(),
        }
    }
}

fn write_csv<'a, T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the extract files for `fixtures` into `dir`.
///
/// Requested absences are shared between payments, so they are written once
/// per leave request id.
pub fn write_extract_dir(dir: &Path, fixtures: &[ExtractFixture]) -> Result<()> {
    write_csv(&dir.join(VPEI_FILE), fixtures.iter().map(|f| &f.header))?;
    write_csv(
        &dir.join(PAYMENT_DETAILS_FILE),
        fixtures.iter().flat_map(|f| &f.details),
    )?;
    write_csv(
        &dir.join(PAYMENT_LINE_FILE),
        fixtures.iter().flat_map(|f| &f.lines),
    )?;
    write_csv(
        &dir.join(CLAIM_DETAILS_FILE),
        fixtures.iter().filter_map(|f| f.claim_details.as_ref()),
    )?;

    let mut seen = HashSet::new();
    let absences = fixtures
        .iter()
        .filter_map(|f| f.requested_absence.as_ref())
        .filter(|a| seen.insert(a.leaverequest_id.clone()));
    write_csv(&dir.join(REQUESTED_ABSENCE_FILE), absences)?;
    Ok(())
}
