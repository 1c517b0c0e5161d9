//! Outbound return processor - Applies the comptroller's returns for documents we sent.
//!
//! Three document shapes share the same wrapper and are told apart by the
//! fields of their first document:
//! - status returns (`DOC_PHASE_CD`) confirm or fail payment and vendor documents
//! - vendor customer returns (`VCUST_DOC_VCUST`) carry the assigned vendor code
//! - payment returns (`PYMT_DOC_INFO`) carry the check or EFT disbursement

use crate::{
    core::{
        files::{FileLocation, FileMover},
        lookups::{DocumentKind, ReferenceFileType, State},
        state_log::{self, Associated},
        validation::{
            FieldRules, ValidationContainer, ValidationReason, amount_validator, date_validator,
            parse_date, validate_field,
        },
    },
    entities::{
        DocumentIdentifier, Employee, Payment, document_identifier, employee, payment,
        reference_file,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;

/// Root element of every return file
pub const EXPORT_FILE_TAG: &str = "AMS_DOC_XML_EXPORT_FILE";
/// Wrapper of each document in a return file
pub const DOCUMENT_TAG: &str = "AMS_DOCUMENT";
/// Department code every returned document must carry
pub const EXPECTED_DEPARTMENT_CODE: &str = "EOL";
/// Unit code every returned document must carry
pub const EXPECTED_UNIT_CODE: &str = "8770";
/// Phase of a document the comptroller has finalized
pub const FINAL_PHASE: &str = "3--Final";
/// Length of a comptroller vendor customer code
pub const VENDOR_CUSTOMER_CODE_LENGTH: usize = 10;

/// Shape of an outbound return file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundDocumentType {
    /// Document status of earlier submissions
    StatusReturn,
    /// Vendor codes assigned to employees
    VendorCustomerReturn,
    /// Checks and EFTs actually issued
    PaymentReturn,
}

impl OutboundDocumentType {
    /// Reference file type the return is recorded under.
    #[must_use]
    pub const fn reference_file_type(self) -> ReferenceFileType {
        match self {
            Self::StatusReturn => ReferenceFileType::OutboundStatusReturn,
            Self::VendorCustomerReturn => ReferenceFileType::OutboundVendorCustomerReturn,
            Self::PaymentReturn => ReferenceFileType::OutboundPaymentReturn,
        }
    }
}

/// Counts of one outbound return file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundSummary {
    /// Classification of the file
    pub document_type: OutboundDocumentType,
    /// Documents that validated and were applied
    pub confirmed: usize,
    /// Documents with validation issues
    pub errored: usize,
    /// Documents that could not be correlated or were repeated
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentOutcome {
    Confirmed,
    Errored,
    Skipped,
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

/// Text of the element at `path` below `node`.
fn field<'a>(node: Node<'a, '_>, path: &[&str]) -> Option<&'a str> {
    let mut current = node;
    for tag in path {
        current = child(current, tag)?;
    }
    current.text()
}

fn documents<'a, 'input>(document: &'a Document<'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    document
        .root_element()
        .children()
        .filter(|c| c.has_tag_name(DOCUMENT_TAG))
}

/// Works out which kind of return `document` is.
pub fn classify_document(document: &Document<'_>) -> Result<OutboundDocumentType> {
    let root = document.root_element();
    let root_name = root.tag_name().name();
    let unknown = || Error::UnknownDocumentType {
        root: root_name.to_string(),
    };
    if root_name != EXPORT_FILE_TAG {
        return Err(unknown());
    }
    let first = documents(document).next().ok_or_else(unknown)?;
    if child(first, "VCUST_DOC_VCUST").is_some() {
        Ok(OutboundDocumentType::VendorCustomerReturn)
    } else if child(first, "PYMT_DOC_INFO").is_some() {
        Ok(OutboundDocumentType::PaymentReturn)
    } else if child(first, "DOC_PHASE_CD").is_some() {
        Ok(OutboundDocumentType::StatusReturn)
    } else {
        Err(unknown())
    }
}

/// Records which payment or employee a document we send is about.
pub async fn register_document_identifier<C>(
    db: &C,
    document_id: &str,
    document_kind: DocumentKind,
    associated: Associated,
    now: DateTime<Utc>,
) -> Result<document_identifier::Model>
where
    C: ConnectionTrait,
{
    document_identifier::ActiveModel {
        document_id: Set(document_id.to_string()),
        document_kind: Set(document_kind),
        payment_id: Set(associated.payment_id()),
        employee_id: Set(associated.employee_id()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

fn document_target(identifier: &document_identifier::Model) -> Result<Associated> {
    let target = match identifier.document_kind {
        DocumentKind::PaymentDocument => identifier.payment_id.map(Associated::Payment),
        DocumentKind::VendorDocument => identifier.employee_id.map(Associated::Employee),
    };
    target.ok_or_else(|| {
        Error::invariant(format!(
            "Document {} is not linked to a {}",
            identifier.document_id,
            match identifier.document_kind {
                DocumentKind::PaymentDocument => "payment",
                DocumentKind::VendorDocument => "employee",
            }
        ))
    })
}

/// Finds the correlated entity of a document, or `None` when the document
/// should be skipped.
async fn correlate<C>(
    db: &C,
    node: Node<'_, '_>,
    expected_kind: Option<DocumentKind>,
    processed: &mut HashSet<Associated>,
) -> Result<Option<(document_identifier::Model, Associated)>>
where
    C: ConnectionTrait,
{
    let Some(document_id) = field(node, &["DOC_ID"]).map(str::trim).filter(|s| !s.is_empty())
    else {
        tracing::warn!("Outbound document without DOC_ID, skipping");
        return Ok(None);
    };
    let Some(identifier) = DocumentIdentifier::find()
        .filter(document_identifier::Column::DocumentId.eq(document_id))
        .one(db)
        .await?
    else {
        tracing::warn!(document_id, "Unknown document id, skipping");
        return Ok(None);
    };
    if expected_kind.is_some_and(|kind| kind != identifier.document_kind) {
        tracing::warn!(
            document_id,
            kind = %identifier.document_kind,
            "Document id belongs to another document kind, skipping"
        );
        return Ok(None);
    }
    let associated = document_target(&identifier)?;
    if !processed.insert(associated) {
        tracing::warn!(document_id, ?associated, "Already processed in this file, skipping");
        return Ok(None);
    }
    Ok(Some((identifier, associated)))
}

fn expect_constant(
    container: &mut ValidationContainer,
    node: Node<'_, '_>,
    tag: &str,
    expected: &str,
) {
    let value = validate_field(container, tag, field(node, &[tag]), true, &FieldRules::default());
    if value.is_some_and(|v| v != expected) {
        container.add_validation_issue(ValidationReason::InvalidValue, tag);
    }
}

async fn finish_document<C>(
    db: &C,
    associated: Associated,
    container: &ValidationContainer,
    (success, failure): (State, State),
    now: DateTime<Utc>,
) -> Result<DocumentOutcome>
where
    C: ConnectionTrait,
{
    if container.has_validation_issues() {
        let outcome = state_log::build_outcome("Outbound return failed validation", Some(container))?;
        state_log::create_finished_state_log(db, associated, failure, outcome, now).await?;
        tracing::info!(
            record = %container.record_key,
            reasons = ?container.get_reasons_with_field_names(),
            "Outbound document has issues"
        );
        Ok(DocumentOutcome::Errored)
    } else {
        state_log::record_state(db, associated, success, "Outbound return processed", now).await?;
        Ok(DocumentOutcome::Confirmed)
    }
}

async fn process_status_document<C>(
    db: &C,
    node: Node<'_, '_>,
    processed: &mut HashSet<Associated>,
    now: DateTime<Utc>,
) -> Result<DocumentOutcome>
where
    C: ConnectionTrait,
{
    let Some((identifier, associated)) = correlate(db, node, None, processed).await? else {
        return Ok(DocumentOutcome::Skipped);
    };

    let mut container = ValidationContainer::new(identifier.document_id.as_str());
    expect_constant(&mut container, node, "DOC_CD", identifier.document_kind.description());
    expect_constant(&mut container, node, "DOC_DEPT_CD", EXPECTED_DEPARTMENT_CODE);
    expect_constant(&mut container, node, "DOC_UNIT_CD", EXPECTED_UNIT_CODE);
    let phase = validate_field(
        &mut container,
        "DOC_PHASE_CD",
        field(node, &["DOC_PHASE_CD"]),
        true,
        &FieldRules::default(),
    );
    if phase.is_some_and(|p| p != FINAL_PHASE) {
        let error_message = field(node, &["ERR_MSG"]).map(str::trim).unwrap_or_default();
        container.add_validation_issue(
            ValidationReason::InvalidValue,
            format!("DOC_PHASE_CD: {error_message}"),
        );
    }

    let states = match identifier.document_kind {
        DocumentKind::PaymentDocument => (State::ConfirmPayment, State::AddToGaxErrorReport),
        DocumentKind::VendorDocument => (State::MmarsStatusConfirmed, State::AddToVccErrorReport),
    };
    finish_document(db, associated, &container, states, now).await
}

async fn process_vendor_customer_document<C>(
    db: &C,
    node: Node<'_, '_>,
    processed: &mut HashSet<Associated>,
    now: DateTime<Utc>,
) -> Result<DocumentOutcome>
where
    C: ConnectionTrait,
{
    let Some((identifier, associated)) =
        correlate(db, node, Some(DocumentKind::VendorDocument), processed).await?
    else {
        return Ok(DocumentOutcome::Skipped);
    };
    let Associated::Employee(employee_id) = associated else {
        return Err(Error::invariant("Vendor document linked to a payment"));
    };
    let employee = Employee::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::invariant(format!("Employee {employee_id} not found")))?;

    let mut container = ValidationContainer::new(identifier.document_id.as_str());
    let vendor_code = validate_field(
        &mut container,
        "VEND_CUST_CD",
        field(node, &["VCUST_DOC_VCUST", "VEND_CUST_CD"]),
        true,
        &FieldRules::length(
            Some(VENDOR_CUSTOMER_CODE_LENGTH),
            Some(VENDOR_CUSTOMER_CODE_LENGTH),
        ),
    );
    let tin = validate_field(
        &mut container,
        "TIN",
        field(node, &["VCUST_DOC_VCUST", "TIN"]),
        true,
        &FieldRules::default(),
    );
    if tin.is_some_and(|tin| tin != employee.tax_identifier) {
        container.add_validation_issue(ValidationReason::ClaimantMismatch, "TIN");
    }

    if let (Some(vendor_code), false) = (vendor_code, container.has_validation_issues()) {
        let mut active: employee::ActiveModel = employee.into();
        active.ctr_vendor_customer_code = Set(Some(vendor_code));
        active.update(db).await?;
    }
    finish_document(
        db,
        associated,
        &container,
        (State::VendorCodeConfirmed, State::AddToVendorReturnErrorReport),
        now,
    )
    .await
}

fn check_eft_type_validator(value: &str) -> Option<ValidationReason> {
    (!matches!(value, "EFT" | "CHK")).then_some(ValidationReason::InvalidLookupValue)
}

async fn process_payment_document<C>(
    db: &C,
    node: Node<'_, '_>,
    processed: &mut HashSet<Associated>,
    now: DateTime<Utc>,
) -> Result<DocumentOutcome>
where
    C: ConnectionTrait,
{
    let Some((identifier, associated)) =
        correlate(db, node, Some(DocumentKind::PaymentDocument), processed).await?
    else {
        return Ok(DocumentOutcome::Skipped);
    };
    let Associated::Payment(payment_id) = associated else {
        return Err(Error::invariant("Payment document linked to an employee"));
    };
    let payment = Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::PaymentNotFound {
            id: payment_id.to_string(),
        })?;

    let mut container = ValidationContainer::new(identifier.document_id.as_str());
    let info = |tag: &str| field(node, &["PYMT_DOC_INFO", tag]);
    let check_number = validate_field(
        &mut container,
        "CHK_NO",
        info("CHK_NO"),
        true,
        &FieldRules::default(),
    );
    let issue_date = validate_field(
        &mut container,
        "CHK_EFT_ISS_DT",
        info("CHK_EFT_ISS_DT"),
        true,
        &FieldRules::custom(date_validator),
    );
    let amount = validate_field(
        &mut container,
        "CHK_AM",
        info("CHK_AM"),
        true,
        &FieldRules::custom(amount_validator),
    );
    validate_field(
        &mut container,
        "CHK_EFT_TYP",
        info("CHK_EFT_TYP"),
        true,
        &FieldRules::custom(check_eft_type_validator),
    );

    if !container.has_validation_issues() {
        let mut active: payment::ActiveModel = payment.into();
        active.disb_check_eft_number = Set(check_number);
        active.disb_check_eft_issue_date = Set(issue_date.as_deref().and_then(parse_date));
        active.disb_amount = Set(amount.and_then(|a| a.parse::<Decimal>().ok()));
        active.update(db).await?;
    }
    finish_document(
        db,
        associated,
        &container,
        (State::PaymentDisbursementSent, State::AddToPaymentReturnErrorReport),
        now,
    )
    .await
}

/// Applies every document of an outbound return file.
pub async fn process_outbound<C>(db: &C, xml: &str, now: DateTime<Utc>) -> Result<OutboundSummary>
where
    C: ConnectionTrait,
{
    let document = Document::parse(xml)?;
    let document_type = classify_document(&document)?;
    let mut summary = OutboundSummary {
        document_type,
        confirmed: 0,
        errored: 0,
        skipped: 0,
    };
    let mut processed = HashSet::new();

    for node in documents(&document) {
        let outcome = match document_type {
            OutboundDocumentType::StatusReturn => {
                process_status_document(db, node, &mut processed, now).await?
            }
            OutboundDocumentType::VendorCustomerReturn => {
                process_vendor_customer_document(db, node, &mut processed, now).await?
            }
            OutboundDocumentType::PaymentReturn => {
                process_payment_document(db, node, &mut processed, now).await?
            }
        };
        match outcome {
            DocumentOutcome::Confirmed => summary.confirmed += 1,
            DocumentOutcome::Errored => summary.errored += 1,
            DocumentOutcome::Skipped => summary.skipped += 1,
        }
    }

    tracing::info!(
        ?document_type,
        confirmed = summary.confirmed,
        errored = summary.errored,
        skipped = summary.skipped,
        "Processed outbound return"
    );
    Ok(summary)
}

/// Processes an outbound return file from the received location in one
/// transaction and moves it to `processed`, or to `error` when anything fails.
pub async fn process_outbound_file<M: FileMover>(
    db: &DatabaseConnection,
    mover: &M,
    file_name: &str,
    now: DateTime<Utc>,
) -> Result<OutboundSummary> {
    let path = mover.path(file_name, FileLocation::Received);
    let txn = db.begin().await?;
    let result: Result<OutboundSummary> = async {
        let xml = std::fs::read_to_string(&path)?;
        let summary = process_outbound(&txn, &xml, now).await?;
        reference_file::ActiveModel {
            file_location: Set(mover
                .path(file_name, FileLocation::Processed)
                .display()
                .to_string()),
            reference_file_type: Set(summary.document_type.reference_file_type()),
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
            tracing::error!(file = file_name, error = %e, "Failed to process outbound return");
            if let Err(move_error) =
                mover.move_file(file_name, FileLocation::Received, FileLocation::Error)
            {
                tracing::error!(file = file_name, error = %move_error, "Could not move file to error");
            }
            Err(e)
        }
    }
}
