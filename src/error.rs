use thiserror::Error;

use crate::store::StoreError;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared by the readers, the schema planner, and the orchestrator.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV reading error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The relational store failed outside of table provisioning or row insertion
    /// (opening a session, checking table existence).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The request itself is unusable (no file, unsupported extension, ...).
    #[error("{message}")]
    Validation { message: String },

    /// The target table exists and overwrite was not requested.
    #[error("Table '{table}' already exists in the database")]
    Conflict { table: String },

    /// No record in the input carries any data.
    #[error("No valid rows with data found in the input file")]
    EmptyInput,

    /// A header cannot be turned into a usable, unique column identifier.
    #[error("invalid column '{header}': {message}")]
    InvalidColumn { header: String, message: String },

    /// Dropping or creating the target table failed.
    #[error("Failed to {action} table '{table}': {message}")]
    Provisioning {
        table: String,
        action: &'static str,
        message: String,
    },

    /// A row could not be inserted.
    #[error("failed to insert row {row} into '{table}': {message}")]
    Insertion {
        table: String,
        row: usize,
        message: String,
    },
}

impl IngestionError {
    /// HTTP status code the boundary answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestionError::Validation { .. } => 400,
            IngestionError::Conflict { .. } => 409,
            _ => 500,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        IngestionError::Validation {
            message: message.into(),
        }
    }
}
