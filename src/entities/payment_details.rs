//! Payment details entity - One pay period covered by a payment.
use sea_orm::entity::prelude::*;

/// Payment details database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_details")]
pub struct Model {
    /// Unique identifier for the pay period row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning payment
    pub payment_id: i64,
    /// Case-system class id of the period
    pub payment_details_c_value: String,
    /// Case-system index id of the period
    pub payment_details_i_value: String,
    /// First day of the period
    pub period_start_date: Date,
    /// Last day of the period
    pub period_end_date: Date,
    /// Post-tax amount for the period
    pub amount: Decimal,
    /// Pre-tax amount for the period
    pub business_net_amount: Decimal,
}

/// Defines relationships between PaymentDetails and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each detail belongs to one payment
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
