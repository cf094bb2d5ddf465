//! # Runestaves - catalogue validation and dataset preparation
//!
//! Runestaves validates the tab-separated catalogue of runic calendars
//! (runestaves) and derives the datasets the static site is built from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  TSV tables │────▶│  Validation │────▶│ Denormalize │────▶│  Datasets   │
//! │  (ISO/UTF8) │     │ (schema+FK) │     │ (gazetteer) │     │ (JSON files)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use runestaves::{run_pipeline, PipelineOptions};
//!
//! let report = run_pipeline(&PipelineOptions::default())?;
//! println!("{} search documents", report.manifest.counts.search_docs);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Tables, rows and category flags
//! - [`schema`] - Schema registry, symbol categories, period buckets
//! - [`parser`] - TSV loading with encoding detection
//! - [`validation`] - Schema, integrity and output checks
//! - [`transform`] - Date heuristics, denormalization, pipeline
//! - [`datasets`] - Markers, search documents, statistics, payloads
//! - [`logs`] - Pipeline log helpers

// Core modules
pub mod error;
pub mod logs;
pub mod models;
pub mod schema;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod datasets;
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    OutputError, OutputResult, PipelineError, PipelineResult, TableError, TableResult,
    ValidationError, ValidationResult,
};

// =============================================================================
// Re-exports - Models and schema
// =============================================================================

pub use models::{CategoryFlags, Row, RowExt, Table, TableSet};

pub use schema::{
    Check, FieldSpec, FieldType, PeriodBucket, PeriodBuckets, PeriodLabels, SchemaRegistry,
    SymbolCategory, TableKind, TableSchema,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{decode_content, detect_encoding, load_table, parse_tsv, parse_tsv_file};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    check_integrity, check_output_dir, check_references, validate_table, IntegrityReport,
    OutputCheck, ValidatedTable, Violation, ViolationKind,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    assign_period_bucket, denormalize, parse_year_range, GeoIndex, YearRange,
};

pub use datasets::{
    generate_markers, generate_payloads, generate_search_docs, generate_stats, DatasetContext,
    EmbedPolicy,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    run_pipeline, run_pipeline_with, run_validation, run_validation_with, Manifest,
    PipelineOptions, PipelineReport, RunCounts, ValidatedDataset,
};
