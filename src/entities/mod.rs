//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod address;
pub mod audit_report_detail;
pub mod claim;
pub mod document_identifier;
pub mod employee;
pub mod employer;
pub mod fineos_writeback_details;
pub mod latest_state_log;
pub mod link_split_payment;
pub mod manual_review_task;
pub mod payment;
pub mod payment_details;
pub mod payment_line;
pub mod pub_eft;
pub mod reference_file;
pub mod state_log;
pub mod vbi_requested_absence;
pub mod vpei;
pub mod vpei_claim_details;
pub mod vpei_payment_details;
pub mod vpei_payment_line;

// Re-export specific types to avoid conflicts
pub use address::{Entity as Address, Model as AddressModel};
pub use audit_report_detail::{
    Column as AuditReportDetailColumn, Entity as AuditReportDetail,
    Model as AuditReportDetailModel,
};
pub use claim::{Column as ClaimColumn, Entity as Claim, Model as ClaimModel};
pub use document_identifier::{
    Column as DocumentIdentifierColumn, Entity as DocumentIdentifier,
    Model as DocumentIdentifierModel,
};
pub use employee::{Column as EmployeeColumn, Entity as Employee, Model as EmployeeModel};
pub use employer::{Entity as Employer, Model as EmployerModel};
pub use fineos_writeback_details::{
    Column as FineosWritebackDetailsColumn, Entity as FineosWritebackDetails,
    Model as FineosWritebackDetailsModel,
};
pub use latest_state_log::{
    Column as LatestStateLogColumn, Entity as LatestStateLog, Model as LatestStateLogModel,
};
pub use link_split_payment::{
    Column as LinkSplitPaymentColumn, Entity as LinkSplitPayment, Model as LinkSplitPaymentModel,
};
pub use manual_review_task::{
    Column as ManualReviewTaskColumn, Entity as ManualReviewTask, Model as ManualReviewTaskModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use payment_details::{
    Column as PaymentDetailsColumn, Entity as PaymentDetails, Model as PaymentDetailsModel,
};
pub use payment_line::{Column as PaymentLineColumn, Entity as PaymentLine, Model as PaymentLineModel};
pub use pub_eft::{Column as PubEftColumn, Entity as PubEft, Model as PubEftModel};
pub use reference_file::{
    Column as ReferenceFileColumn, Entity as ReferenceFile, Model as ReferenceFileModel,
};
pub use state_log::{Column as StateLogColumn, Entity as StateLog, Model as StateLogModel};
pub use vbi_requested_absence::{Entity as VbiRequestedAbsence, Model as VbiRequestedAbsenceModel};
pub use vpei::{Entity as Vpei, Model as VpeiModel};
pub use vpei_claim_details::{Entity as VpeiClaimDetails, Model as VpeiClaimDetailsModel};
pub use vpei_payment_details::{Entity as VpeiPaymentDetails, Model as VpeiPaymentDetailsModel};
pub use vpei_payment_line::{Entity as VpeiPaymentLine, Model as VpeiPaymentLineModel};
