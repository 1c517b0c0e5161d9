//! Unified error types for the payment processing engine.
//!
//! Only structural and integrity failures are represented here. Data-quality
//! problems found in extract rows are accumulated in a
//! [`ValidationContainer`](crate::core::validation::ValidationContainer) instead
//! and never surface as an [`Error`].

use thiserror::Error;

/// Errors that abort the current batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed XML document
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// JSON serialization failure for state log outcomes
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The reference file a batch refers to does not exist
    #[error("Reference file {id} not found")]
    ReferenceFileNotFound {
        /// Reference file id
        id: i64,
    },

    /// A required input file is absent
    #[error("Required file not found: {path}")]
    MissingFile {
        /// Path that was expected
        path: String,
    },

    /// A payment referenced by an input file does not exist
    #[error("Payment {id} not found")]
    PaymentNotFound {
        /// Payment id as given in the input
        id: String,
    },

    /// The rejects file lacks one of the columns the decision depends on
    #[error("Rejects file is missing required column '{column}'")]
    MissingRejectsColumn {
        /// Missing column name
        column: String,
    },

    /// An outbound return file could not be classified
    #[error("Unrecognized outbound return document (root element '{root}')")]
    UnknownDocumentType {
        /// Root element name of the document
        root: String,
    },

    /// A condition that should never happen; meant to page an operator
    #[error("Invariant violation: {message}")]
    Invariant {
        /// Description of the violated invariant
        message: String,
    },
}

impl Error {
    /// Shorthand for building an [`Error::Invariant`].
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
