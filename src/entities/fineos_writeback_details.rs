//! Writeback details entity - Queue of statuses to report back to the case system.
use crate::core::lookups::WritebackStatus;
use sea_orm::entity::prelude::*;

/// Writeback details database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fineos_writeback_details")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payment the status is reported for
    pub payment_id: i64,
    /// Status to report
    pub transaction_status: WritebackStatus,
    /// When the status was queued
    pub created_at: DateTimeUtc,
    /// Set when the writeback file containing this row has been sent
    pub writeback_sent_at: Option<DateTimeUtc>,
}

/// Writeback rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
