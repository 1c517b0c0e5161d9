//! Claim entity - An absence case opened in the case system.

use crate::core::lookups::ClaimType;
use sea_orm::entity::prelude::*;

/// Claim database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "claim")]
pub struct Model {
    /// Unique identifier for the claim
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Absence case number, e.g. `NTN-1234-ABS-01`
    pub fineos_absence_id: String,
    /// Claimant, once matched
    pub employee_id: Option<i64>,
    /// Employer the leave is taken from
    pub employer_id: Option<i64>,
    /// Family or medical leave
    pub claim_type: Option<ClaimType>,
    /// Whether the claimant's identity has been verified
    pub is_id_proofed: bool,
}

/// Defines relationships between Claim and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each claim belongs to one employee
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
