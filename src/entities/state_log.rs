//! State log entity - Immutable history of state transitions.
//!
//! Rows are only ever inserted. The current state of an entity in a flow is
//! found through [`super::latest_state_log`].
use crate::core::lookups::{AssociatedType, Flow, State};
use sea_orm::entity::prelude::*;

/// State log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "state_log")]
pub struct Model {
    /// Unique identifier for the log
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Flow the transition belongs to
    pub flow: Flow,
    /// State the entity ended in
    pub end_state: State,
    /// Free-form outcome payload, `{"message": ..., "validation_container": ...}`
    pub outcome: Json,
    /// When the transition started
    pub started_at: DateTimeUtc,
    /// When the transition finished
    pub ended_at: DateTimeUtc,
    /// Whether the log is for a payment or an employee
    pub associated_type: AssociatedType,
    /// Payment, for payment logs
    pub payment_id: Option<i64>,
    /// Employee, for employee logs
    pub employee_id: Option<i64>,
    /// Previous state log of the same entity and flow
    pub prev_state_log_id: Option<i64>,
}

/// State logs have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
