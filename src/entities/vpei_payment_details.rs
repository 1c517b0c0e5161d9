//! Extract pay-period rows (`vpei_paymentdetails.csv`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extract payment details database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fineos_extract_vpei_payment_details")]
#[serde(rename_all = "UPPERCASE")]
pub struct Model {
    /// Staging row id
    #[sea_orm(primary_key)]
    #[serde(default)]
    pub id: i64,
    /// Extract batch the row was loaded from
    #[serde(default)]
    pub reference_file_id: i64,
    /// Class id of the owning payment
    pub peclassid: String,
    /// Index id of the owning payment
    pub peindexid: String,
    /// Pay period class id
    pub c: String,
    /// Pay period index id
    pub i: String,
    /// Period start date
    pub paymentstartp: Option<String>,
    /// Period end date
    pub paymentendper: Option<String>,
    /// Post-tax amount
    pub balancingamou_monamt: Option<String>,
    /// Pre-tax amount
    pub businessnetbe_monamt: Option<String>,
}

/// Staging rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
