//! Extract claim rows (`vpei_claimdetails.csv`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extract claim details database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fineos_extract_vpei_claim_details")]
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
    /// Absence case number
    pub absencecasenu: Option<String>,
    /// Leave request id
    pub leaverequesti: Option<String>,
}

/// Staging rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
