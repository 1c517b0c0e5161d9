//! Core layer - Framework-agnostic payment processing
//!
//! Every operation takes its database handle from the caller. Batch entry points
//! (`process_extract`, `run_audit_report`, `process_rejects_file`,
//! `process_outbound_file`) own their transaction; everything else runs on
//! whatever connection or transaction it is handed.

/// Audit staging, sampling and the audit report
pub mod audit;
/// Extract file ingestion and per-payment row aggregation
pub mod extract;
/// Extract step orchestration for one reference file
pub mod extract_step;
/// Input file lifecycle between received, processed and error
pub mod files;
/// Closed lookup enumerations with id and description maps
pub mod lookups;
/// Outbound return documents from the comptroller
pub mod outbound;
/// Field validation and classification of one payment's extract rows
pub mod payment_data;
/// Resolution and persistence of a payment and its shared entities
pub mod payment_record;
/// Reviewer decisions from the rejects file
pub mod rejects;
/// Split payments linked to their primary payment
pub mod related_payments;
/// Append-only state log with latest-state pointers
pub mod state_log;
/// Field validation primitives and the validation container
pub mod validation;
/// Writeback status resolution and queueing
pub mod writeback;
