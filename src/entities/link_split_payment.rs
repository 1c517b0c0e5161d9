//! Split payment link entity - Ties a withholding or reimbursement payment to
//! the primary payment it was split from.
use sea_orm::entity::prelude::*;

/// Split payment link database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "link_split_payment")]
pub struct Model {
    /// Unique identifier for the link
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Primary (standard) payment
    pub payment_id: i64,
    /// Secondary payment
    pub related_payment_id: i64,
}

/// Links have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
