//! Extract header rows (`vpei.csv`) - One row per payment instruction.
//!
//! Column names follow the case system's vendor export; every value is kept
//! as raw text and only interpreted by the payment data builder.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extract header database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fineos_extract_vpei")]
#[serde(rename_all = "UPPERCASE")]
pub struct Model {
    /// Staging row id
    #[sea_orm(primary_key)]
    #[serde(default)]
    pub id: i64,
    /// Extract batch the row was loaded from
    #[serde(default)]
    pub reference_file_id: i64,
    /// Payment class id
    pub c: String,
    /// Payment index id
    pub i: String,
    /// Payee tax identifier
    pub payeesocnumbe: Option<String>,
    /// Address line one
    pub paymentadd1: Option<String>,
    /// Address line two
    pub paymentadd2: Option<String>,
    /// City
    pub paymentadd4: Option<String>,
    /// State
    pub paymentadd6: Option<String>,
    /// Zip code
    pub paymentpostco: Option<String>,
    /// Payment method description
    pub paymentmethod: Option<String>,
    /// Scheduled payment date
    pub paymentdate: Option<String>,
    /// Payment amount
    pub amount_monamt: Option<String>,
    /// Routing number
    pub payeebanksort: Option<String>,
    /// Account number
    pub payeeaccountn: Option<String>,
    /// Account type description
    pub payeeaccountt: Option<String>,
    /// Payment event type
    pub eventtype: Option<String>,
    /// Reason for the event
    pub eventreason: Option<String>,
    /// Kind of tax identifier the payee has
    pub payeeidentifi: Option<String>,
    /// Payee name
    pub payeefullname: Option<String>,
    /// `"Adhoc"` for off-schedule payments
    pub amalgamationc: Option<String>,
}

/// Staging rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
