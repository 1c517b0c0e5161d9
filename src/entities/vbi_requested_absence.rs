//! Extract leave request rows (`vbi_requestedabsence.csv`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extract requested absence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fineos_extract_vbi_requested_absence")]
#[serde(rename_all = "UPPERCASE")]
pub struct Model {
    /// Staging row id
    #[sea_orm(primary_key)]
    #[serde(default)]
    pub id: i64,
    /// Extract batch the row was loaded from
    #[serde(default)]
    pub reference_file_id: i64,
    /// Leave request id
    pub leaverequest_id: Option<String>,
    /// e.g. `"Approved"`, `"In Review"`
    pub leaverequest_decision: Option<String>,
    /// Absence case number
    pub absence_casenumber: Option<String>,
    /// Family or medical coverage
    pub absencereason_coverage: Option<String>,
    /// Continuous, intermittent or reduced schedule
    pub absenceperiod_type: Option<String>,
    /// First day of the absence
    pub absenceperiod_start: Option<String>,
    /// Last day of the absence
    pub absenceperiod_end: Option<String>,
}

/// Staging rows have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
