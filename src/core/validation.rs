//! Accumulation of data-quality issues for a single payment.
//!
//! A [`ValidationContainer`] never fails: every field of a payment is checked and
//! every problem recorded, so the full picture is available when deciding which
//! status to report back to the case system.

use serde::Serialize;
use std::collections::BTreeSet;

/// Reason a field or record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValidationReason {
    /// A required field is empty or absent
    MissingField,
    /// A required extract row is absent
    MissingDataset,
    /// An employee or claim the payment refers to is unknown
    MissingInDb,
    /// Below the field's minimum length
    FieldTooShort,
    /// Above the field's maximum length
    FieldTooLong,
    /// Not one of the known descriptions
    InvalidLookupValue,
    /// Does not parse as the expected kind of value
    InvalidValue,
    /// A value of the wrong type for the record
    InvalidType,
    /// Nine digits that fail the ABA checksum
    RoutingNumberFailsChecksum,
    /// An amount line without a matching pay period
    UnmatchedPaymentLine,
    /// The claim belongs to a different employee
    ClaimantMismatch,
    /// The claimant's identity is not verified
    ClaimNotIdProofed,
    /// The leave request has no decision yet
    LeaveRequestInReview,
    /// The extract row matched no known payment kind
    UnexpectedPaymentTransactionType,
    /// The bank account is still in prenote
    EftPrenotePending,
    /// The bank rejected the prenote
    EftPrenoteRejected,
    /// The employer was exempt for the pay period
    EmployerExempt,
    /// Other income on the claim is still under review
    OpenOtherIncomeTasks,
    /// Another payment with the same (C,I) is still in flight
    ReceivedPaymentCurrentlyBeingProcessed,
}

impl ValidationReason {
    /// Every reason, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::MissingField,
        Self::MissingDataset,
        Self::MissingInDb,
        Self::FieldTooShort,
        Self::FieldTooLong,
        Self::InvalidLookupValue,
        Self::InvalidValue,
        Self::InvalidType,
        Self::RoutingNumberFailsChecksum,
        Self::UnmatchedPaymentLine,
        Self::ClaimantMismatch,
        Self::ClaimNotIdProofed,
        Self::LeaveRequestInReview,
        Self::UnexpectedPaymentTransactionType,
        Self::EftPrenotePending,
        Self::EftPrenoteRejected,
        Self::EmployerExempt,
        Self::OpenOtherIncomeTasks,
        Self::ReceivedPaymentCurrentlyBeingProcessed,
    ];
}

/// One recorded problem: the reason and the field (or dataset) it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// What is wrong
    pub reason: ValidationReason,
    /// Column or dataset name
    pub details: String,
}

/// Ordered, append-only list of issues for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationContainer {
    /// `C=..,I=..` of the record
    pub record_key: String,
    /// Issues in the order they were found
    pub validation_issues: Vec<ValidationIssue>,
}

impl ValidationContainer {
    /// Empty container for `record_key`.
    #[must_use]
    pub fn new(record_key: impl Into<String>) -> Self {
        Self {
            record_key: record_key.into(),
            validation_issues: Vec::new(),
        }
    }

    /// Records one issue.
    pub fn add_validation_issue(&mut self, reason: ValidationReason, details: impl Into<String>) {
        self.validation_issues.push(ValidationIssue {
            reason,
            details: details.into(),
        });
    }

    /// Whether anything was recorded.
    #[must_use]
    pub fn has_validation_issues(&self) -> bool {
        !self.validation_issues.is_empty()
    }

    /// All reasons, in the order they were recorded.
    #[must_use]
    pub fn get_reasons(&self) -> Vec<ValidationReason> {
        self.validation_issues.iter().map(|i| i.reason).collect()
    }

    /// Distinct reasons present.
    #[must_use]
    pub fn distinct_reasons(&self) -> BTreeSet<ValidationReason> {
        self.validation_issues.iter().map(|i| i.reason).collect()
    }

    /// Whether `reason` was recorded at least once.
    #[must_use]
    pub fn has_reason(&self, reason: ValidationReason) -> bool {
        self.validation_issues.iter().any(|i| i.reason == reason)
    }

    /// `"Reason: field"` strings, in recorded order.
    #[must_use]
    pub fn get_reasons_with_field_names(&self) -> Vec<String> {
        self.validation_issues
            .iter()
            .map(|i| format!("{:?}: {}", i.reason, i.details))
            .collect()
    }
}

/// Checks applied to a present field value. A failing check yields the reason
/// to record.
pub type CustomValidator = fn(&str) -> Option<ValidationReason>;

/// Length and content rules for a single field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRules {
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    /// Content check run after the length checks
    pub custom: Option<CustomValidator>,
}

impl FieldRules {
    /// Rules with only a content check.
    #[must_use]
    pub const fn custom(validator: CustomValidator) -> Self {
        Self {
            min_length: None,
            max_length: None,
            custom: Some(validator),
        }
    }

    /// Rules with only length bounds.
    #[must_use]
    pub const fn length(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Self {
            min_length,
            max_length,
            custom: None,
        }
    }
}

/// Validates one raw field value.
///
/// Returns the trimmed value when it is present and passes every rule. Any
/// failure is recorded in `container` under `field_name` and yields `None`; an
/// absent optional field yields `None` without recording anything.
pub fn validate_field(
    container: &mut ValidationContainer,
    field_name: &str,
    raw: Option<&str>,
    required: bool,
    rules: &FieldRules,
) -> Option<String> {
    let value = raw.map(str::trim).filter(|v| !v.is_empty());

    let Some(value) = value else {
        if required {
            container.add_validation_issue(ValidationReason::MissingField, field_name);
        }
        return None;
    };

    let length = value.chars().count();
    if rules.min_length.is_some_and(|min| length < min) {
        container.add_validation_issue(ValidationReason::FieldTooShort, field_name);
        return None;
    }
    if rules.max_length.is_some_and(|max| length > max) {
        container.add_validation_issue(ValidationReason::FieldTooLong, field_name);
        return None;
    }
    if let Some(reason) = rules.custom.and_then(|custom| custom(value)) {
        container.add_validation_issue(reason, field_name);
        return None;
    }

    Some(value.to_string())
}

/// Amounts such as `"500.00"` or `"-12.5"`.
pub fn amount_validator(value: &str) -> Option<ValidationReason> {
    value
        .parse::<rust_decimal::Decimal>()
        .err()
        .map(|_| ValidationReason::InvalidType)
}

/// Dates as `YYYY-MM-DD`, optionally followed by a time component.
pub fn date_validator(value: &str) -> Option<ValidationReason> {
    parse_date(value).is_none().then_some(ValidationReason::InvalidType)
}

/// Parses the date formats the case system produces.
#[must_use]
pub fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
    let date_part = value.trim().get(..10)?;
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Nine-digit ABA routing number with a valid checksum.
pub fn routing_number_validator(value: &str) -> Option<ValidationReason> {
    if value.len() != 9 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Some(ValidationReason::InvalidValue);
    }
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    let checksum = 3 * (digits[0] + digits[3] + digits[6])
        + 7 * (digits[1] + digits[4] + digits[7])
        + (digits[2] + digits[5] + digits[8]);
    (checksum % 10 != 0).then_some(ValidationReason::RoutingNumberFailsChecksum)
}

/// `NNNNN` or `NNNNN-NNNN`.
pub fn zip_code_validator(value: &str) -> Option<ValidationReason> {
    let valid = match value.len() {
        5 => value.chars().all(|c| c.is_ascii_digit()),
        10 => value.char_indices().all(|(i, c)| {
            if i == 5 {
                c == '-'
            } else {
                c.is_ascii_digit()
            }
        }),
        _ => false,
    };
    (!valid).then_some(ValidationReason::InvalidValue)
}

/// Accepts the payment method descriptions.
pub fn payment_method_validator(value: &str) -> Option<ValidationReason> {
    crate::core::lookups::PaymentMethod::from_description(value)
        .is_none()
        .then_some(ValidationReason::InvalidLookupValue)
}

/// Accepts `Checking` and `Savings`.
pub fn account_type_validator(value: &str) -> Option<ValidationReason> {
    crate::core::lookups::BankAccountType::from_description(value)
        .is_none()
        .then_some(ValidationReason::InvalidLookupValue)
}
