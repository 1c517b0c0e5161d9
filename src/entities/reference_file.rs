//! Reference file entity - One row per file the engine ingests or produces.
//!
//! Extract rows, rejects files and outbound returns are all scoped to a
//! reference file; `processed_at` marks a batch as fully handled.

use crate::core::lookups::ReferenceFileType;
use sea_orm::entity::prelude::*;

/// Reference file database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reference_file")]
pub struct Model {
    /// Unique identifier for the file
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Logical location (path) of the file
    pub file_location: String,
    /// What kind of file this is
    pub reference_file_type: ReferenceFileType,
    /// When the file was received
    pub created_at: DateTimeUtc,
    /// Set once the batch for this file committed successfully
    pub processed_at: Option<DateTimeUtc>,
}

/// Reference files have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
