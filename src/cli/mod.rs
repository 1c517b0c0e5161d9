//! Command line layer - Argument parsing and dispatch to the batch steps
//!
//! Each subcommand runs one scheduled step of the payment pipeline against the
//! database named by `DATABASE_URL`.

/// Subcommand implementations
pub mod commands;

use crate::{
    config::{database, settings},
    errors::Result,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Step to run
    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline steps that can be run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create any missing tables
    InitDb,
    /// Load an extract directory and create payments from it
    ImportExtract {
        /// Directory holding the extract CSV files
        dir: PathBuf,
        /// Business date of the run, defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Stage validated payments for audit sampling
    StageAudit,
    /// Sample staged payments and write the payment audit report
    AuditReport {
        /// Where to write the report CSV
        out: PathBuf,
        /// Percentage of staged payments to sample, overriding the configuration
        #[arg(long)]
        sample_percentage: Option<u8>,
    },
    /// Apply a rejects file from the received directory
    ProcessRejects {
        /// File name under `<file_root>/received`
        file: String,
    },
    /// Apply an outbound return file from the received directory
    ProcessOutbound {
        /// File name under `<file_root>/received`
        file: String,
    },
}

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = settings::load_config(&cli.config)?;
    let db = database::create_connection().await?;
    database::create_tables(&db).await?;

    match cli.command {
        Command::InitDb => {
            tracing::info!("Database tables are in place");
            Ok(())
        }
        Command::ImportExtract { dir, today } => {
            commands::import_extract(&db, &config, &dir, today).await
        }
        Command::StageAudit => commands::stage_audit(&db).await,
        Command::AuditReport {
            out,
            sample_percentage,
        } => {
            let percentage = sample_percentage
                .map_or(config.audit_sampling_percentage, |p| p.min(100));
            commands::audit_report(&db, percentage, &out).await
        }
        Command::ProcessRejects { file } => commands::process_rejects(&db, &config, &file).await,
        Command::ProcessOutbound { file } => {
            commands::process_outbound(&db, &config, &file).await
        }
    }
}
