//! Address entity - Mailing addresses for check payments.

use sea_orm::entity::prelude::*;

/// Address database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "address")]
pub struct Model {
    /// Unique identifier for the address
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Street line
    pub address_line_one: String,
    /// Apartment, suite or unit
    pub address_line_two: Option<String>,
    /// City name
    pub city: String,
    /// Two-letter state code
    pub geo_state: String,
    /// `NNNNN` or `NNNNN-NNNN`
    pub zip_code: String,
}

/// Addresses have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
