//! Error types for the Runestaves data pipeline.
//!
//! This module defines the hierarchy of fatal errors:
//!
//! - [`TableError`] - Loading and parsing TSV input files
//! - [`ValidationError`] - Strict-mode schema and integrity failures
//! - [`OutputError`] - Writing derived datasets
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Schema violations and orphan references are *not* errors by default: they are
//! collected as [`Violation`] values and logged. Only strict mode turns them
//! into a [`ValidationError`].
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::validation::Violation;

// =============================================================================
// Table Loading Errors
// =============================================================================

/// Errors while loading a TSV table.
#[derive(Debug, Error)]
pub enum TableError {
    /// Failed to read file.
    #[error("Failed to read {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input table does not exist.
    #[error("Required table '{table}' not found: {}", .path.display())]
    MissingFile { table: String, path: PathBuf },

    /// Failed to decode the file content.
    #[error("Failed to decode '{table}': {message}")]
    EncodingError { table: String, message: String },

    /// The content is not valid tab-separated text.
    #[error("Malformed TSV in '{table}' at line {line}: {message}")]
    ParseError {
        table: String,
        line: u64,
        message: String,
    },

    /// Empty file.
    #[error("Table '{0}' is empty")]
    EmptyFile(String),

    /// No headers found.
    #[error("No headers found in '{0}'")]
    NoHeaders(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised by validation in strict mode, or by misconfiguration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema validation failed for a table.
    #[error("Table '{table}' has {} schema violation(s)", .violations.len())]
    SchemaViolation {
        table: String,
        violations: Vec<Violation>,
    },

    /// Foreign-key references that do not resolve.
    #[error("Referential integrity failed: {}", describe_orphans(.orphans))]
    IntegrityViolation {
        /// Check name (e.g. `individual.cal_id -> inventory.id`) to orphan values.
        orphans: BTreeMap<String, BTreeSet<String>>,
    },

    /// Period bucket table is not ascending and disjoint.
    #[error("Invalid period buckets: {0}")]
    InvalidBuckets(String),
}

fn describe_orphans(orphans: &BTreeMap<String, BTreeSet<String>>) -> String {
    orphans
        .iter()
        .map(|(check, values)| format!("{} ({} orphan(s))", check, values.len()))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing derived datasets.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error.
    #[error("Failed to write {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Identifier cannot be used as a file name.
    #[error("Unsafe file name for calendar '{0}'")]
    UnsafeFileName(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::run_pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input loading error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Strict-mode validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Data directory does not exist.
    #[error("Data directory not found: {}", .0.display())]
    MissingDataDir(PathBuf),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for table loading.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for output writing.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let table_err = TableError::EmptyFile("inventory".into());
        let pipeline_err: PipelineError = table_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let validation_err = ValidationError::InvalidBuckets("overlap".into());
        let pipeline_err: PipelineError = validation_err.into();
        assert!(pipeline_err.to_string().contains("overlap"));
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = TableError::ParseError {
            table: "individual".into(),
            line: 12,
            message: "too many fields".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("individual"));
        assert!(msg.contains("line 12"));
    }

    #[test]
    fn test_integrity_error_summarises_checks() {
        let mut orphans = BTreeMap::new();
        orphans.insert(
            "individual.cal_id -> inventory.id".to_string(),
            BTreeSet::from(["X9".to_string()]),
        );
        let err = ValidationError::IntegrityViolation { orphans };
        assert!(err.to_string().contains("individual.cal_id -> inventory.id (1 orphan(s))"));
    }
}
