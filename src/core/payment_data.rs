//! PaymentData builder - Validates and classifies the extract rows of one payment.
//!
//! Building never fails on bad data. Every field is validated, every problem is
//! recorded in the payment's [`ValidationContainer`], and whatever could be parsed
//! is kept so the resulting [`PaymentData`] can still be persisted and inspected.

use crate::{
    config::settings::PaymentsConfig,
    core::{
        extract::{CiIdentifier, PaymentExtractRows},
        lookups::{
            AbsencePeriodType, BankAccountType, PaymentEventType, PaymentMethod,
            PaymentRelevantParty, PaymentTransactionType,
        },
        validation::{
            FieldRules, ValidationContainer, ValidationReason, account_type_validator,
            amount_validator, date_validator, parse_date, payment_method_validator,
            routing_number_validator, validate_field, zip_code_validator,
        },
    },
    entities::{
        vbi_requested_absence, vpei, vpei_claim_details, vpei_payment_details, vpei_payment_line,
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Event reason the case system uses for payments redirected to an employer.
pub const AUTO_ALT_EVENT_REASON: &str = "Automatic Alternate Payment";
/// Payee identifier type of an employer receiving a reimbursement.
pub const TAX_IDENTIFICATION_NUMBER: &str = "Tax Identification Number";
/// Leave request decision that holds payments.
pub const LEAVE_REQUEST_IN_REVIEW: &str = "In Review";
const ADHOC_MARKER: &str = "Adhoc";

/// A column of an extract row type with a typed accessor.
pub trait ExtractField: Copy {
    /// Staging model the column lives on.
    type Row;

    /// Vendor column name, used as the field name in validation issues.
    fn column(self) -> &'static str;

    /// Raw value of the column in `row`.
    fn read(self, row: &Self::Row) -> Option<&str>;
}

/// Validates `field` of `row` and records any issue under its column name.
pub fn validate_extract_field<F: ExtractField>(
    container: &mut ValidationContainer,
    field: F,
    row: &F::Row,
    required: bool,
    rules: &FieldRules,
) -> Option<String> {
    validate_field(container, field.column(), field.read(row), required, rules)
}

/// Columns of the payment header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpeiField {
    /// `PAYEESOCNUMBE`, payee tax identifier
    PayeeSocNumber,
    /// `PAYMENTADD1`
    AddressLine1,
    /// `PAYMENTADD2`
    AddressLine2,
    /// `PAYMENTADD4`
    City,
    /// `PAYMENTADD6`
    State,
    /// `PAYMENTPOSTCO`
    PostCode,
    /// `PAYMENTMETHOD`
    PaymentMethod,
    /// `PAYMENTDATE`
    PaymentDate,
    /// `AMOUNT_MONAMT`
    Amount,
    /// `PAYEEBANKSORT`
    RoutingNumber,
    /// `PAYEEACCOUNTN`
    AccountNumber,
    /// `PAYEEACCOUNTT`
    AccountType,
    /// `EVENTTYPE`
    EventType,
    /// `EVENTREASON`
    EventReason,
    /// `PAYEEIDENTIFI`
    PayeeIdentifier,
    /// `PAYEEFULLNAME`
    PayeeFullName,
    /// `AMALGAMATIONC`
    Amalgamation,
}

impl VpeiField {
    /// Fields required on every payment regardless of its type.
    pub const ALWAYS_REQUIRED: [Self; 5] = [
        Self::PayeeSocNumber,
        Self::PaymentDate,
        Self::Amount,
        Self::EventType,
        Self::PayeeIdentifier,
    ];

    /// Whether the field is in [`Self::ALWAYS_REQUIRED`].
    #[must_use]
    pub fn is_always_required(self) -> bool {
        Self::ALWAYS_REQUIRED.contains(&self)
    }
}

impl ExtractField for VpeiField {
    type Row = vpei::Model;

    fn column(self) -> &'static str {
        match self {
            Self::PayeeSocNumber => "PAYEESOCNUMBE",
            Self::AddressLine1 => "PAYMENTADD1",
            Self::AddressLine2 => "PAYMENTADD2",
            Self::City => "PAYMENTADD4",
            Self::State => "PAYMENTADD6",
            Self::PostCode => "PAYMENTPOSTCO",
            Self::PaymentMethod => "PAYMENTMETHOD",
            Self::PaymentDate => "PAYMENTDATE",
            Self::Amount => "AMOUNT_MONAMT",
            Self::RoutingNumber => "PAYEEBANKSORT",
            Self::AccountNumber => "PAYEEACCOUNTN",
            Self::AccountType => "PAYEEACCOUNTT",
            Self::EventType => "EVENTTYPE",
            Self::EventReason => "EVENTREASON",
            Self::PayeeIdentifier => "PAYEEIDENTIFI",
            Self::PayeeFullName => "PAYEEFULLNAME",
            Self::Amalgamation => "AMALGAMATIONC",
        }
    }

    fn read(self, row: &vpei::Model) -> Option<&str> {
        match self {
            Self::PayeeSocNumber => row.payeesocnumbe.as_deref(),
            Self::AddressLine1 => row.paymentadd1.as_deref(),
            Self::AddressLine2 => row.paymentadd2.as_deref(),
            Self::City => row.paymentadd4.as_deref(),
            Self::State => row.paymentadd6.as_deref(),
            Self::PostCode => row.paymentpostco.as_deref(),
            Self::PaymentMethod => row.paymentmethod.as_deref(),
            Self::PaymentDate => row.paymentdate.as_deref(),
            Self::Amount => row.amount_monamt.as_deref(),
            Self::RoutingNumber => row.payeebanksort.as_deref(),
            Self::AccountNumber => row.payeeaccountn.as_deref(),
            Self::AccountType => row.payeeaccountt.as_deref(),
            Self::EventType => row.eventtype.as_deref(),
            Self::EventReason => row.eventreason.as_deref(),
            Self::PayeeIdentifier => row.payeeidentifi.as_deref(),
            Self::PayeeFullName => row.payeefullname.as_deref(),
            Self::Amalgamation => row.amalgamationc.as_deref(),
        }
    }
}

/// Columns of a pay-period row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDetailField {
    /// `PAYMENTSTARTP`
    PeriodStart,
    /// `PAYMENTENDPER`
    PeriodEnd,
    /// `BALANCINGAMOU_MONAMT`, post-tax amount
    BalancingAmount,
    /// `BUSINESSNETBE_MONAMT`, pre-tax amount
    BusinessNetAmount,
}

impl ExtractField for PaymentDetailField {
    type Row = vpei_payment_details::Model;

    fn column(self) -> &'static str {
        match self {
            Self::PeriodStart => "PAYMENTSTARTP",
            Self::PeriodEnd => "PAYMENTENDPER",
            Self::BalancingAmount => "BALANCINGAMOU_MONAMT",
            Self::BusinessNetAmount => "BUSINESSNETBE_MONAMT",
        }
    }

    fn read(self, row: &vpei_payment_details::Model) -> Option<&str> {
        match self {
            Self::PeriodStart => row.paymentstartp.as_deref(),
            Self::PeriodEnd => row.paymentendper.as_deref(),
            Self::BalancingAmount => row.balancingamou_monamt.as_deref(),
            Self::BusinessNetAmount => row.businessnetbe_monamt.as_deref(),
        }
    }
}

/// Columns of an amount-breakdown row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentLineField {
    /// `AMOUNT_MONAMT`
    Amount,
    /// `LINETYPE`
    LineType,
}

impl ExtractField for PaymentLineField {
    type Row = vpei_payment_line::Model;

    fn column(self) -> &'static str {
        match self {
            Self::Amount => "AMOUNT_MONAMT",
            Self::LineType => "LINETYPE",
        }
    }

    fn read(self, row: &vpei_payment_line::Model) -> Option<&str> {
        match self {
            Self::Amount => row.amount_monamt.as_deref(),
            Self::LineType => row.linetype.as_deref(),
        }
    }
}

/// Columns of the claim row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDetailField {
    /// `ABSENCECASENU`
    AbsenceCaseNumber,
    /// `LEAVEREQUESTI`
    LeaveRequestId,
}

impl ExtractField for ClaimDetailField {
    type Row = vpei_claim_details::Model;

    fn column(self) -> &'static str {
        match self {
            Self::AbsenceCaseNumber => "ABSENCECASENU",
            Self::LeaveRequestId => "LEAVEREQUESTI",
        }
    }

    fn read(self, row: &vpei_claim_details::Model) -> Option<&str> {
        match self {
            Self::AbsenceCaseNumber => row.absencecasenu.as_deref(),
            Self::LeaveRequestId => row.leaverequesti.as_deref(),
        }
    }
}

/// Columns of the leave request row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedAbsenceField {
    /// `LEAVEREQUEST_DECISION`
    Decision,
    /// `ABSENCEPERIOD_TYPE`
    PeriodType,
    /// `ABSENCEPERIOD_START`
    PeriodStart,
    /// `ABSENCEPERIOD_END`
    PeriodEnd,
}

impl ExtractField for RequestedAbsenceField {
    type Row = vbi_requested_absence::Model;

    fn column(self) -> &'static str {
        match self {
            Self::Decision => "LEAVEREQUEST_DECISION",
            Self::PeriodType => "ABSENCEPERIOD_TYPE",
            Self::PeriodStart => "ABSENCEPERIOD_START",
            Self::PeriodEnd => "ABSENCEPERIOD_END",
        }
    }

    fn read(self, row: &vbi_requested_absence::Model) -> Option<&str> {
        match self {
            Self::Decision => row.leaverequest_decision.as_deref(),
            Self::PeriodType => row.absenceperiod_type.as_deref(),
            Self::PeriodStart => row.absenceperiod_start.as_deref(),
            Self::PeriodEnd => row.absenceperiod_end.as_deref(),
        }
    }
}

/// Leave period the payment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsencePeriod {
    /// Uninterrupted time off
    Continuous {
        /// First day
        start_date: NaiveDate,
        /// Last day
        end_date: NaiveDate,
    },
    /// Episodic leave; the case system may leave the end open.
    Intermittent {
        /// First day
        start_date: NaiveDate,
        /// Last day, when known
        end_date: Option<NaiveDate>,
    },
    /// Fewer hours per week over a period
    ReducedSchedule {
        /// First day
        start_date: NaiveDate,
        /// Last day
        end_date: NaiveDate,
    },
}

impl AbsencePeriod {
    /// Builds the variant for `period_type`, if the dates it needs are present.
    #[must_use]
    pub fn new(
        period_type: AbsencePeriodType,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Option<Self> {
        let start_date = start_date?;
        match period_type {
            AbsencePeriodType::Continuous => Some(Self::Continuous {
                start_date,
                end_date: end_date?,
            }),
            AbsencePeriodType::Intermittent => Some(Self::Intermittent {
                start_date,
                end_date,
            }),
            AbsencePeriodType::ReducedSchedule => Some(Self::ReducedSchedule {
                start_date,
                end_date: end_date?,
            }),
        }
    }

    /// Lookup value of the variant.
    #[must_use]
    pub const fn period_type(&self) -> AbsencePeriodType {
        match self {
            Self::Continuous { .. } => AbsencePeriodType::Continuous,
            Self::Intermittent { .. } => AbsencePeriodType::Intermittent,
            Self::ReducedSchedule { .. } => AbsencePeriodType::ReducedSchedule,
        }
    }

    /// First day of the period.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        match self {
            Self::Continuous { start_date, .. }
            | Self::Intermittent { start_date, .. }
            | Self::ReducedSchedule { start_date, .. } => *start_date,
        }
    }

    /// Last day of the period, open for some intermittent leave.
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Continuous { end_date, .. } | Self::ReducedSchedule { end_date, .. } => {
                Some(*end_date)
            }
            Self::Intermittent { end_date, .. } => *end_date,
        }
    }
}

/// Which groups of fields a payment must carry.
///
/// Computed once per payment; every dependent validation reads from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequirementFlags {
    /// Standard payments carry claim and payment method data
    pub is_standard: bool,
    /// Check payments need a mailing address
    pub address_required: bool,
    /// ACH payments need bank account fields
    pub eft_required: bool,
}

impl RequirementFlags {
    /// Flags for a payment of `transaction_type` paid by `payment_method`.
    #[must_use]
    pub fn new(
        transaction_type: PaymentTransactionType,
        payment_method: Option<PaymentMethod>,
    ) -> Self {
        let is_standard = transaction_type == PaymentTransactionType::Standard;
        Self {
            is_standard,
            address_required: is_standard && payment_method == Some(PaymentMethod::Check),
            eft_required: is_standard && payment_method == Some(PaymentMethod::Ach),
        }
    }
}

/// Mailing address read from the payment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressData {
    /// Street line
    pub address_line_one: String,
    /// Optional second line
    pub address_line_two: Option<String>,
    /// City
    pub city: String,
    /// State code
    pub geo_state: String,
    /// Validated zip code
    pub zip_code: String,
}

/// Bank account read from the payment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EftData {
    /// Checksum-validated routing number
    pub routing_nbr: String,
    /// Account number
    pub account_nbr: String,
    /// Checking or savings
    pub bank_account_type: BankAccountType,
}

/// One validated pay period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetailData {
    /// (C,I) of the period row
    pub key: CiIdentifier,
    /// First day of the period
    pub period_start_date: NaiveDate,
    /// Last day of the period
    pub period_end_date: NaiveDate,
    /// Post-tax amount
    pub amount: Decimal,
    /// Pre-tax amount
    pub business_net_amount: Decimal,
}

/// One validated amount line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLineData {
    /// (C,I) of the line row
    pub key: CiIdentifier,
    /// Pay period the line was matched to
    pub payment_detail_key: Option<CiIdentifier>,
    /// Signed amount
    pub amount: Decimal,
    /// Line type as extracted
    pub line_type: String,
}

/// Typed, possibly partial, view of one payment from the extract.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentData {
    /// (C,I) of the payment
    pub key: CiIdentifier,
    /// Payee tax identifier, or a withholding placeholder
    pub tax_identifier: Option<String>,
    /// Raw event type
    pub event_type: Option<String>,
    /// Raw event reason
    pub event_reason: Option<String>,
    /// Kind of identifier the payee has
    pub payee_identifier: Option<String>,
    /// Payee name
    pub payee_name: Option<String>,
    /// Payment amount, when it parsed
    pub amount: Option<Decimal>,
    /// Scheduled payment date
    pub payment_date: Option<NaiveDate>,
    /// Disbursement method, when it is a known one
    pub payment_method: Option<PaymentMethod>,
    /// Who the payment is for
    pub payment_relevant_party: PaymentRelevantParty,
    /// Classification from the decision table
    pub payment_transaction_type: PaymentTransactionType,
    /// Field groups the payment must carry
    pub requirements: RequirementFlags,
    /// Address, only when required and valid
    pub address: Option<AddressData>,
    /// Bank account, only when required and valid
    pub eft: Option<EftData>,
    /// Earliest start among the pay periods
    pub period_start_date: Option<NaiveDate>,
    /// Latest end among the pay periods
    pub period_end_date: Option<NaiveDate>,
    /// Pay periods
    pub details: Vec<PaymentDetailData>,
    /// Amount lines
    pub lines: Vec<PaymentLineData>,
    /// Absence case the payment is for
    pub absence_case_number: Option<String>,
    /// Leave request the payment is for
    pub leave_request_id: Option<String>,
    /// Decision on the leave request
    pub leave_request_decision: Option<String>,
    /// Requested absence, when its dates parsed
    pub absence_period: Option<AbsencePeriod>,
    /// Payment was issued off schedule
    pub is_adhoc_payment: bool,
    /// Every issue found while building
    pub validation_container: ValidationContainer,
}

/// Decides who a payment is for. Evaluated before the transaction type.
#[must_use]
pub fn resolve_relevant_party(
    tax_identifier: Option<&str>,
    event_type: Option<&str>,
    event_reason: Option<&str>,
    payee_identifier: Option<&str>,
    config: &PaymentsConfig,
) -> PaymentRelevantParty {
    if tax_identifier == Some(config.state_tax_withholding_tin.as_str()) {
        return PaymentRelevantParty::StateTax;
    }
    if tax_identifier == Some(config.federal_tax_withholding_tin.as_str()) {
        return PaymentRelevantParty::FederalTax;
    }
    let known_event = event_type.and_then(PaymentEventType::from_description).is_some();
    if event_reason == Some(AUTO_ALT_EVENT_REASON)
        && payee_identifier == Some(TAX_IDENTIFICATION_NUMBER)
        && known_event
    {
        return PaymentRelevantParty::ReimbursedEmployer;
    }
    PaymentRelevantParty::Claimant
}

/// Classifies a payment; the first matching rule wins.
#[must_use]
pub fn classify_transaction_type(
    event_type: Option<&str>,
    amount: Option<Decimal>,
    relevant_party: PaymentRelevantParty,
) -> PaymentTransactionType {
    let event = event_type.and_then(PaymentEventType::from_description);

    if event == Some(PaymentEventType::PaymentOutCancellation) {
        return PaymentTransactionType::Cancellation;
    }
    if amount.is_some_and(|a| a.is_zero()) {
        return PaymentTransactionType::ZeroDollar;
    }
    if let Some(overpayment) = event.and_then(PaymentEventType::overpayment_transaction_type) {
        return overpayment;
    }
    if event == Some(PaymentEventType::PaymentOut) && amount.is_some_and(|a| a > Decimal::ZERO) {
        return relevant_party.standard_transaction_type();
    }
    PaymentTransactionType::Unknown
}

fn parse_decimal(value: Option<String>) -> Option<Decimal> {
    value.and_then(|v| v.parse().ok())
}

fn parse_opt_date(value: Option<String>) -> Option<NaiveDate> {
    value.as_deref().and_then(parse_date)
}

impl PaymentData {
    /// Validates and classifies the rows of the payment `key`.
    #[must_use]
    pub fn build(key: &CiIdentifier, rows: &PaymentExtractRows, config: &PaymentsConfig) -> Self {
        let mut container = ValidationContainer::new(key.to_string());
        let any = FieldRules::default();

        let Some(header) = rows.header.as_ref() else {
            container.add_validation_issue(ValidationReason::MissingDataset, "vpei");
            return Self::without_header(key, container);
        };

        // Classification inputs
        let tax_identifier = validate_extract_field(
            &mut container,
            VpeiField::PayeeSocNumber,
            header,
            VpeiField::PayeeSocNumber.is_always_required(),
            &any,
        );
        let event_type = validate_extract_field(
            &mut container,
            VpeiField::EventType,
            header,
            VpeiField::EventType.is_always_required(),
            &any,
        );
        let event_reason =
            validate_extract_field(&mut container, VpeiField::EventReason, header, false, &any);
        let payee_identifier = validate_extract_field(
            &mut container,
            VpeiField::PayeeIdentifier,
            header,
            VpeiField::PayeeIdentifier.is_always_required(),
            &any,
        );
        let amount = parse_decimal(validate_extract_field(
            &mut container,
            VpeiField::Amount,
            header,
            VpeiField::Amount.is_always_required(),
            &FieldRules::custom(amount_validator),
        ));

        let payment_relevant_party = resolve_relevant_party(
            tax_identifier.as_deref(),
            event_type.as_deref(),
            event_reason.as_deref(),
            payee_identifier.as_deref(),
            config,
        );
        let payment_transaction_type =
            classify_transaction_type(event_type.as_deref(), amount, payment_relevant_party);
        if payment_transaction_type == PaymentTransactionType::Unknown {
            container.add_validation_issue(
                ValidationReason::UnexpectedPaymentTransactionType,
                format!(
                    "Unknown payment scenario encountered. Payment Amount: {}, Event Type: {}, Event Reason: {}",
                    amount.map_or_else(|| "None".to_string(), |a| a.to_string()),
                    event_type.as_deref().unwrap_or("None"),
                    event_reason.as_deref().unwrap_or("None"),
                ),
            );
        }

        let is_standard = payment_transaction_type == PaymentTransactionType::Standard;
        let payment_method = validate_extract_field(
            &mut container,
            VpeiField::PaymentMethod,
            header,
            is_standard,
            &FieldRules::custom(payment_method_validator),
        )
        .and_then(|m| PaymentMethod::from_description(&m));
        let requirements = RequirementFlags::new(payment_transaction_type, payment_method);

        let payment_date = parse_opt_date(validate_extract_field(
            &mut container,
            VpeiField::PaymentDate,
            header,
            VpeiField::PaymentDate.is_always_required(),
            &FieldRules::custom(date_validator),
        ));

        let address = Self::validate_address(&mut container, header, requirements);
        let eft = Self::validate_eft(&mut container, header, requirements);

        let payee_name =
            validate_extract_field(&mut container, VpeiField::PayeeFullName, header, false, &any);
        let is_adhoc_payment =
            validate_extract_field(&mut container, VpeiField::Amalgamation, header, false, &any)
                .is_some_and(|v| v == ADHOC_MARKER);

        let details = Self::validate_details(&mut container, rows, requirements);
        let period_start_date = details.iter().map(|d| d.period_start_date).min();
        let period_end_date = details.iter().map(|d| d.period_end_date).max();
        let lines = Self::validate_lines(&mut container, rows, &details);

        let (absence_case_number, leave_request_id) =
            Self::validate_claim_details(&mut container, rows, requirements);
        let (leave_request_decision, absence_period) =
            Self::validate_requested_absence(&mut container, rows, requirements);

        Self {
            key: key.clone(),
            tax_identifier,
            event_type,
            event_reason,
            payee_identifier,
            payee_name,
            amount,
            payment_date,
            payment_method,
            payment_relevant_party,
            payment_transaction_type,
            requirements,
            address,
            eft,
            period_start_date,
            period_end_date,
            details,
            lines,
            absence_case_number,
            leave_request_id,
            leave_request_decision,
            absence_period,
            is_adhoc_payment,
            validation_container: container,
        }
    }

    fn without_header(key: &CiIdentifier, container: ValidationContainer) -> Self {
        Self {
            key: key.clone(),
            tax_identifier: None,
            event_type: None,
            event_reason: None,
            payee_identifier: None,
            payee_name: None,
            amount: None,
            payment_date: None,
            payment_method: None,
            payment_relevant_party: PaymentRelevantParty::Claimant,
            payment_transaction_type: PaymentTransactionType::Unknown,
            requirements: RequirementFlags::default(),
            address: None,
            eft: None,
            period_start_date: None,
            period_end_date: None,
            details: Vec::new(),
            lines: Vec::new(),
            absence_case_number: None,
            leave_request_id: None,
            leave_request_decision: None,
            absence_period: None,
            is_adhoc_payment: false,
            validation_container: container,
        }
    }

    fn validate_address(
        container: &mut ValidationContainer,
        header: &vpei::Model,
        requirements: RequirementFlags,
    ) -> Option<AddressData> {
        let required = requirements.address_required;
        let any = FieldRules::default();
        let line_one =
            validate_extract_field(container, VpeiField::AddressLine1, header, required, &any);
        let line_two =
            validate_extract_field(container, VpeiField::AddressLine2, header, false, &any);
        let city = validate_extract_field(container, VpeiField::City, header, required, &any);
        let state = validate_extract_field(container, VpeiField::State, header, required, &any);
        let zip = validate_extract_field(
            container,
            VpeiField::PostCode,
            header,
            required,
            &FieldRules::custom(zip_code_validator),
        );

        Some(AddressData {
            address_line_one: line_one?,
            address_line_two: line_two,
            city: city?,
            geo_state: state?,
            zip_code: zip?,
        })
    }

    fn validate_eft(
        container: &mut ValidationContainer,
        header: &vpei::Model,
        requirements: RequirementFlags,
    ) -> Option<EftData> {
        let required = requirements.eft_required;
        let routing = validate_extract_field(
            container,
            VpeiField::RoutingNumber,
            header,
            required,
            &FieldRules::custom(routing_number_validator),
        );
        let account = validate_extract_field(
            container,
            VpeiField::AccountNumber,
            header,
            required,
            &FieldRules::length(None, Some(17)),
        );
        let account_type = validate_extract_field(
            container,
            VpeiField::AccountType,
            header,
            required,
            &FieldRules::custom(account_type_validator),
        )
        .and_then(|t| BankAccountType::from_description(&t));

        Some(EftData {
            routing_nbr: routing?,
            account_nbr: account?,
            bank_account_type: account_type?,
        })
    }

    fn validate_details(
        container: &mut ValidationContainer,
        rows: &PaymentExtractRows,
        requirements: RequirementFlags,
    ) -> Vec<PaymentDetailData> {
        if rows.details.is_empty() {
            if requirements.is_standard {
                container
                    .add_validation_issue(ValidationReason::MissingDataset, "vpei_payment_details");
            }
            return Vec::new();
        }

        let date = FieldRules::custom(date_validator);
        let amount = FieldRules::custom(amount_validator);
        rows.details
            .iter()
            .filter_map(|row| {
                // Validate every field before deciding, so all issues are recorded
                let start = parse_opt_date(validate_extract_field(
                    container,
                    PaymentDetailField::PeriodStart,
                    row,
                    true,
                    &date,
                ));
                let end = parse_opt_date(validate_extract_field(
                    container,
                    PaymentDetailField::PeriodEnd,
                    row,
                    true,
                    &date,
                ));
                let balancing = parse_decimal(validate_extract_field(
                    container,
                    PaymentDetailField::BalancingAmount,
                    row,
                    true,
                    &amount,
                ));
                let business_net = parse_decimal(validate_extract_field(
                    container,
                    PaymentDetailField::BusinessNetAmount,
                    row,
                    true,
                    &amount,
                ));

                Some(PaymentDetailData {
                    key: CiIdentifier::new(row.c.clone(), row.i.clone()),
                    period_start_date: start?,
                    period_end_date: end?,
                    amount: balancing?,
                    business_net_amount: business_net?,
                })
            })
            .collect()
    }

    fn validate_lines(
        container: &mut ValidationContainer,
        rows: &PaymentExtractRows,
        details: &[PaymentDetailData],
    ) -> Vec<PaymentLineData> {
        let details_expected = !rows.details.is_empty();
        let amount = FieldRules::custom(amount_validator);
        let any = FieldRules::default();

        rows.lines
            .iter()
            .filter_map(|row| {
                let line_key = CiIdentifier::new(row.c.clone(), row.i.clone());
                let line_amount = parse_decimal(validate_extract_field(
                    container,
                    PaymentLineField::Amount,
                    row,
                    true,
                    &amount,
                ));
                let line_type =
                    validate_extract_field(container, PaymentLineField::LineType, row, true, &any);

                let detail_key = match (&row.paymentdetailclassid, &row.paymentdetailindexid) {
                    (Some(c), Some(i)) => Some(CiIdentifier::new(c.trim(), i.trim())),
                    _ => None,
                };
                let payment_detail_key =
                    detail_key.filter(|k| details.iter().any(|d| d.key == *k));
                if details_expected && payment_detail_key.is_none() {
                    container.add_validation_issue(
                        ValidationReason::UnmatchedPaymentLine,
                        format!("payment line {line_key}"),
                    );
                }

                Some(PaymentLineData {
                    key: line_key,
                    payment_detail_key,
                    amount: line_amount?,
                    line_type: line_type?,
                })
            })
            .collect()
    }

    fn validate_claim_details(
        container: &mut ValidationContainer,
        rows: &PaymentExtractRows,
        requirements: RequirementFlags,
    ) -> (Option<String>, Option<String>) {
        let Some(row) = rows.claim_details.as_ref() else {
            if requirements.is_standard {
                container
                    .add_validation_issue(ValidationReason::MissingDataset, "vpei_claim_details");
            }
            return (None, None);
        };

        let any = FieldRules::default();
        let required = requirements.is_standard;
        let absence_case_number = validate_extract_field(
            container,
            ClaimDetailField::AbsenceCaseNumber,
            row,
            required,
            &any,
        );
        let leave_request_id = validate_extract_field(
            container,
            ClaimDetailField::LeaveRequestId,
            row,
            required,
            &any,
        );
        (absence_case_number, leave_request_id)
    }

    fn validate_requested_absence(
        container: &mut ValidationContainer,
        rows: &PaymentExtractRows,
        requirements: RequirementFlags,
    ) -> (Option<String>, Option<AbsencePeriod>) {
        let Some(row) = rows.requested_absence.as_ref() else {
            if requirements.is_standard {
                container.add_validation_issue(
                    ValidationReason::MissingDataset,
                    "vbi_requested_absence",
                );
            }
            return (None, None);
        };

        let any = FieldRules::default();
        let date = FieldRules::custom(date_validator);
        let decision = validate_extract_field(
            container,
            RequestedAbsenceField::Decision,
            row,
            requirements.is_standard,
            &any,
        );
        if requirements.is_standard && decision.as_deref() == Some(LEAVE_REQUEST_IN_REVIEW) {
            container.add_validation_issue(
                ValidationReason::LeaveRequestInReview,
                RequestedAbsenceField::Decision.column(),
            );
        }

        let period_type =
            validate_extract_field(container, RequestedAbsenceField::PeriodType, row, false, &any)
                .and_then(|t| AbsencePeriodType::from_case_system(&t));
        let start = parse_opt_date(validate_extract_field(
            container,
            RequestedAbsenceField::PeriodStart,
            row,
            false,
            &date,
        ));
        let end = parse_opt_date(validate_extract_field(
            container,
            RequestedAbsenceField::PeriodEnd,
            row,
            false,
            &date,
        ));
        let absence_period = period_type.and_then(|t| AbsencePeriod::new(t, start, end));

        (decision, absence_period)
    }
}
