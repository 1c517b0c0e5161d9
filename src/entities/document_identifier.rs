//! Document identifier entity - Correlates comptroller document ids with the
//! payment or employee a document was sent for.
use crate::core::lookups::DocumentKind;
use sea_orm::entity::prelude::*;

/// Document identifier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ctr_document_identifier")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Document id sent to the comptroller
    #[sea_orm(unique)]
    pub document_id: String,
    /// Kind of document the id was issued for
    pub document_kind: DocumentKind,
    /// Payment the document was sent for
    pub payment_id: Option<i64>,
    /// Employee the vendor document was sent for
    pub employee_id: Option<i64>,
    /// When the id was issued
    pub created_at: DateTimeUtc,
}

/// Document identifiers have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
