//! Extract amount-breakdown rows (`vpei_paymentline.csv`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extract payment line database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fineos_extract_vpei_payment_line")]
#[serde(rename_all = "UPPERCASE")]
pub struct Model {
    /// Staging row id
    #[sea_orm(primary_key)]
    #[serde(default)]
    pub id: i64,
    /// Extract batch the row was loaded from
    #[serde(default)]
    pub reference_file_id: i64,
    /// Line class id
    pub c: String,
    /// Line index id
    pub i: String,
    /// Line amount
    pub amount_monamt: Option<String>,
    /// Line type description
    pub linetype: Option<String>,
    /// Class id of the pay-period row this line belongs to
    pub paymentdetailclassid: Option<String>,
    /// Index id of the pay-period row this line belongs to
    pub paymentdetailindexid: Option<String>,
    /// Class id of the owning payment
    pub c_pymnteif_paymentlines: Option<String>,
    /// Index id of the owning payment
    pub i_pymnteif_paymentlines: Option<String>,
}

/// Staging rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
