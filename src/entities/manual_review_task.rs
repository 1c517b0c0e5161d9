//! Manual review task entity - Work items opened against a claim in the case system.

use crate::core::lookups::ManualReviewTaskType;
use sea_orm::entity::prelude::*;

/// Manual review task database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "manual_review_task")]
pub struct Model {
    /// Unique identifier for the task
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Claim the task is opened on
    pub claim_id: i64,
    /// What the task asks a reviewer to look at
    pub task_type: ManualReviewTaskType,
    /// False once the task has been closed
    pub is_open: bool,
    /// When the task was opened
    pub created_at: DateTimeUtc,
}

/// Tasks have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
