//! Payment line entity - One amount breakdown row (gross, tax, offset, ...).
use sea_orm::entity::prelude::*;

/// Payment line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_line")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning payment
    pub payment_id: i64,
    /// Pay period the line belongs to, when it could be matched
    pub payment_details_id: Option<i64>,
    /// Case-system class id of the line
    pub payment_line_c_value: String,
    /// Case-system index id of the line
    pub payment_line_i_value: String,
    /// Signed line amount
    pub amount: Decimal,
    /// Line type as extracted, e.g. `"Gross"` or `"FIT Amount"`
    pub line_type: String,
}

/// Defines relationships between PaymentLine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
