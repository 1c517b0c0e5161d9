//! Employee entity - Claimants known to the program.
//!
//! The employee's mailing address is tracked as a pair: the address as received
//! from the case system and, once verified, the validated form of it.

use sea_orm::entity::prelude::*;

/// Employee database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    /// Unique identifier for the employee
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Social security or individual taxpayer number
    pub tax_identifier: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Customer number in the case system
    pub fineos_customer_number: Option<String>,
    /// Vendor code assigned by the comptroller
    pub ctr_vendor_customer_code: Option<String>,
    /// Address as received from the case system
    pub fineos_address_id: Option<i64>,
    /// Validated form of `fineos_address_id`
    pub experian_address_id: Option<i64>,
}

/// Defines relationships between Employee and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One employee has many bank accounts
    #[sea_orm(has_many = "super::pub_eft::Entity")]
    PubEfts,
    /// One employee has many claims
    #[sea_orm(has_many = "super::claim::Entity")]
    Claims,
}

impl Related<super::pub_eft::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PubEfts.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
