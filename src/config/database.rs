//! Database configuration module for the payment engine.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models
//! without hand-written SQL.

use crate::entities::{
    Address, AuditReportDetail, Claim, DocumentIdentifier, Employee, Employer,
    FineosWritebackDetails, LatestStateLog, LinkSplitPayment, ManualReviewTask, Payment,
    PaymentDetails, PaymentLine, PubEft, ReferenceFile, StateLog, VbiRequestedAbsence, Vpei,
    VpeiClaimDetails, VpeiPaymentDetails, VpeiPaymentLine,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::TableCreateStatement,
};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/delegated_payments.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url())
        .await
        .map_err(Into::into)
}

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

/// Creates every table of the engine, skipping the ones that already exist.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        table(&schema, ReferenceFile),
        table(&schema, Employer),
        table(&schema, Employee),
        table(&schema, Claim),
        table(&schema, Address),
        table(&schema, PubEft),
        table(&schema, ManualReviewTask),
        table(&schema, Payment),
        table(&schema, PaymentDetails),
        table(&schema, PaymentLine),
        table(&schema, LinkSplitPayment),
        table(&schema, StateLog),
        table(&schema, LatestStateLog),
        table(&schema, AuditReportDetail),
        table(&schema, FineosWritebackDetails),
        table(&schema, DocumentIdentifier),
        table(&schema, Vpei),
        table(&schema, VpeiPaymentDetails),
        table(&schema, VpeiPaymentLine),
        table(&schema, VpeiClaimDetails),
        table(&schema, VbiRequestedAbsence),
    ];

    for statement in &statements {
        db.execute(builder.build(statement)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _ = Payment::find().limit(1).all(&db).await?;
        let _ = StateLog::find().limit(1).all(&db).await?;
        let _ = LatestStateLog::find().limit(1).all(&db).await?;
        let _ = Vpei::find().limit(1).all(&db).await?;
        let _ = VbiRequestedAbsence::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
