//! Payment entity - One payment instruction received from the case system.
//!
//! A payment is identified across systems by its (`fineos_pei_c_value`,
//! `fineos_pei_i_value`) pair. The same pair may appear in several extract
//! batches when the case system reissues it; each batch creates a new row.
use crate::core::lookups::{PaymentMethod, PaymentRelevantParty, PaymentTransactionType};
use sea_orm::entity::prelude::*;

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Case-system class id ("C")
    pub fineos_pei_c_value: String,
    /// Case-system index id ("I")
    pub fineos_pei_i_value: String,
    /// Extract batch the payment was created from
    pub reference_file_id: i64,
    /// Business date of the extract run
    pub fineos_extraction_date: Date,
    /// Gross amount; absent when the extract value did not validate
    pub amount: Option<Decimal>,
    /// Classification from the extract
    pub payment_transaction_type: PaymentTransactionType,
    /// Who the money goes to
    pub payment_relevant_party: PaymentRelevantParty,
    /// Earliest pay period start of the payment details
    pub period_start_date: Option<Date>,
    /// Latest pay period end of the payment details
    pub period_end_date: Option<Date>,
    /// Date the case system scheduled the payment for
    pub payment_date: Option<Date>,
    /// ACH, check or debit
    pub disb_method: Option<PaymentMethod>,
    /// Claim the payment is made on, once matched
    pub claim_id: Option<i64>,
    /// Claimant, once matched
    pub employee_id: Option<i64>,
    /// Bank account for ACH payments
    pub pub_eft_id: Option<i64>,
    /// Mailing address for check payments
    pub address_id: Option<i64>,
    /// Leave request the payment is for
    pub fineos_leave_request_id: Option<String>,
    /// Absence case number as extracted
    pub absence_case_number: Option<String>,
    /// Payee name as extracted
    pub payee_name: Option<String>,
    /// Set when another payment with the same (C,I) is still in flight
    pub exclude_from_payment_status: bool,
    /// Payment was issued outside the regular schedule
    pub is_adhoc_payment: bool,
    /// Check or EFT number reported back by the comptroller
    pub disb_check_eft_number: Option<String>,
    /// Date the check or EFT was issued
    pub disb_check_eft_issue_date: Option<Date>,
    /// Amount the comptroller actually disbursed
    pub disb_amount: Option<Decimal>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The `C=..,I=..` key used to label log lines and validation containers.
    #[must_use]
    pub fn record_key(&self) -> String {
        format!("C={},I={}", self.fineos_pei_c_value, self.fineos_pei_i_value)
    }
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One payment has many pay-period details
    #[sea_orm(has_many = "super::payment_details::Entity")]
    PaymentDetails,
    /// One payment has many amount lines
    #[sea_orm(has_many = "super::payment_line::Entity")]
    PaymentLines,
}

impl Related<super::payment_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentDetails.def()
    }
}

impl Related<super::payment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
