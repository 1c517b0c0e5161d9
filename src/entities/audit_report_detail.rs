//! Audit report detail entity - Issues attached to a payment for the audit report.
use crate::core::lookups::AuditReportType;
use sea_orm::entity::prelude::*;

/// Audit report detail database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_audit_report_details")]
pub struct Model {
    /// Unique identifier for the detail
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payment the issue was raised on
    pub payment_id: i64,
    /// Which report column the issue fills
    pub audit_report_type: AuditReportType,
    /// `{"message": ...}` shown in the type's report column
    pub details: Json,
    /// When the issue was raised
    pub created_at: DateTimeUtc,
    /// Set once the detail has been written into a sent report
    pub added_to_audit_report_at: Option<DateTimeUtc>,
}

/// Details have no outgoing relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
