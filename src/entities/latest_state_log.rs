//! Latest state log entity - Pointer to the current state log per (entity, flow).
use crate::core::lookups::{AssociatedType, Flow};
use sea_orm::entity::prelude::*;

/// Latest state log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "latest_state_log")]
pub struct Model {
    /// Unique identifier for the pointer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Flow the pointer is kept for
    pub flow: Flow,
    /// Whether the pointer is for a payment or an employee
    pub associated_type: AssociatedType,
    /// Payment, for payment pointers
    pub payment_id: Option<i64>,
    /// Employee, for employee pointers
    pub employee_id: Option<i64>,
    /// Current state log
    pub state_log_id: i64,
}

/// Defines relationships between LatestStateLog and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The state log currently pointed to
    #[sea_orm(
        belongs_to = "super::state_log::Entity",
        from = "Column::StateLogId",
        to = "super::state_log::Column::Id"
    )]
    StateLog,
}

impl Related<super::state_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StateLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
