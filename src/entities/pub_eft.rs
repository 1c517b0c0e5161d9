//! EFT entity - A claimant's bank account and its prenote lifecycle.
//!
//! Accounts are matched by routing number, account number and account type;
//! a new account must pass a prenote before payments are sent to it.

use crate::core::lookups::{BankAccountType, PrenoteState};
use sea_orm::entity::prelude::*;

/// EFT database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pub_eft")]
pub struct Model {
    /// Unique identifier for the bank account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning employee
    pub employee_id: i64,
    /// Nine-digit ABA routing number
    pub routing_nbr: String,
    /// Account number, at most 17 characters
    pub account_nbr: String,
    /// Checking or savings
    pub bank_account_type: BankAccountType,
    /// Where the account is in prenote verification
    pub prenote_state: PrenoteState,
    /// When the prenote was handed to the bank
    pub prenote_sent_at: Option<DateTimeUtc>,
    /// When the prenote was approved
    pub prenote_approved_at: Option<DateTimeUtc>,
    /// When the account was first seen
    pub created_at: DateTimeUtc,
}

/// Defines relationships between EFT records and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each EFT record belongs to one employee
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
