//! One function per subcommand. Each logs a summary of what it did.

use crate::{
    config::settings::PaymentsConfig,
    core::{audit, extract, extract_step, files::LocalFileMover, outbound, rejects},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::path::Path;

/// Loads an extract directory, then runs the extract step over it.
pub async fn import_extract(
    db: &DatabaseConnection,
    config: &PaymentsConfig,
    dir: &Path,
    today: Option<NaiveDate>,
) -> Result<()> {
    let now = Utc::now();
    let today = today.unwrap_or_else(|| now.date_naive());

    let txn = db.begin().await?;
    let reference_file = match extract::load_extract_directory(&txn, dir, now).await {
        Ok(reference_file) => {
            txn.commit().await?;
            reference_file
        }
        Err(e) => {
            txn.rollback().await?;
            return Err(e);
        }
    };

    let summary =
        extract_step::process_extract(db, config, reference_file.id, today, now).await?;
    tracing::info!(
        reference_file_id = reference_file.id,
        processed = summary.processed,
        skipped = summary.skipped,
        linked = summary.links.linked,
        "Extract imported"
    );
    Ok(())
}

/// Moves validated payments into the audit sampling queue.
pub async fn stage_audit(db: &DatabaseConnection) -> Result<()> {
    let txn = db.begin().await?;
    match audit::stage_payments_for_audit(&txn, Utc::now()).await {
        Ok(_) => {
            txn.commit().await?;
            Ok(())
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

/// Samples staged payments and writes the audit report to `out`.
pub async fn audit_report(db: &DatabaseConnection, percentage: u8, out: &Path) -> Result<()> {
    let rows = audit::run_audit_report(db, percentage, out, Utc::now()).await?;
    tracing::info!(rows, file = %out.display(), "Audit report written");
    Ok(())
}

/// Applies a rejects file.
pub async fn process_rejects(
    db: &DatabaseConnection,
    config: &PaymentsConfig,
    file_name: &str,
) -> Result<()> {
    let mover = LocalFileMover::new(&config.file_root);
    rejects::process_rejects_file(db, &mover, file_name, Utc::now()).await?;
    Ok(())
}

/// Applies an outbound return file.
pub async fn process_outbound(
    db: &DatabaseConnection,
    config: &PaymentsConfig,
    file_name: &str,
) -> Result<()> {
    let mover = LocalFileMover::new(&config.file_root);
    outbound::process_outbound_file(db, &mover, file_name, Utc::now()).await?;
    Ok(())
}
