//! High-level pipeline API.
//!
//! This module combines all steps: loading, schema validation, integrity
//! checks, denormalization, dataset generation, writing and output checks.
//!
//! ```text
//! TSV tables ──► validate ──► integrity ──► denormalize ──► generators ──► writer
//!                  (schema)     (orphans)     (gazetteer)    markers        outputs
//!                                                            search         manifest
//!                                                            stats
//!                                                            payloads
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use runestaves::{run_pipeline, PipelineOptions};
//!
//! let report = run_pipeline(&PipelineOptions {
//!     data_dir: "data".into(),
//!     output_dir: "site/data".into(),
//!     ..PipelineOptions::default()
//! })?;
//! println!("{} markers", report.manifest.counts.markers);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datasets::{
    build_index, generate_markers, generate_payloads, generate_search_docs, generate_stats,
    CalendarIndex, DatasetContext, EmbedPolicy,
};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::TableSet;
use crate::parser::load_table;
use crate::schema::{SchemaRegistry, TableKind};
use crate::transform::denormalize::{denormalize, GeoIndex};
use crate::transform::writer::{
    write_json, write_markers, write_payloads, write_search_docs, write_stats, MANIFEST_FILE,
};
use crate::validation::{
    check_integrity, check_output_dir, log_violations, validate_table, IntegrityReport,
    OutputCheck, Violation,
};

/// Options for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Directory holding the input TSV tables
    pub data_dir: PathBuf,

    /// Directory receiving the derived datasets
    pub output_dir: PathBuf,

    /// Turn schema violations and orphan references into errors
    pub strict: bool,

    /// Payloads larger than this are written to side files
    pub embed_threshold_kb: usize,

    /// Validate written outputs against their JSON Schemas
    pub check_outputs: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("site/data"),
            strict: false,
            embed_threshold_kb: crate::datasets::details::DEFAULT_EMBED_THRESHOLD_KB,
            check_outputs: true,
        }
    }
}

impl PipelineOptions {
    pub fn embed_policy(&self) -> EmbedPolicy {
        EmbedPolicy::from_kb(self.embed_threshold_kb)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Loaded and validated input tables.
#[derive(Debug, Clone)]
pub struct ValidatedDataset {
    pub tables: TableSet,
    /// Table name → violations found (lenient runs only)
    pub violations: BTreeMap<String, Vec<Violation>>,
    pub integrity: IntegrityReport,
}

impl ValidatedDataset {
    pub fn violation_count(&self) -> usize {
        self.violations.values().map(Vec::len).sum()
    }

    /// No violations and no orphans.
    pub fn is_clean(&self) -> bool {
        self.violation_count() == 0 && self.integrity.is_valid()
    }
}

/// Load, validate and integrity-check every input table against the
/// standard schema registry.
pub fn run_validation(options: &PipelineOptions) -> PipelineResult<ValidatedDataset> {
    run_validation_with(options, &SchemaRegistry::standard())
}

/// Load, validate and integrity-check every input table.
///
/// # Errors
/// Unreadable or missing required tables, misconfigured period buckets, and
/// in strict mode any schema violation or orphan reference.
pub fn run_validation_with(
    options: &PipelineOptions,
    registry: &SchemaRegistry,
) -> PipelineResult<ValidatedDataset> {
    if !options.data_dir.is_dir() {
        return Err(PipelineError::MissingDataDir(options.data_dir.clone()));
    }
    registry.check()?;

    log_info("Loading TSV files...");
    let mut tables = TableSet::default();
    let mut violations = BTreeMap::new();

    for kind in TableKind::ALL {
        let table = load_table(&options.data_dir, kind)?;
        let checked = validate_table(table, registry.schema(kind), options.strict)?;
        log_violations(&checked.table, &checked.violations);
        violations.insert(kind.name().to_string(), checked.violations);
        tables.set(kind, checked.table);
    }

    let integrity = check_integrity(&tables, options.strict)?;

    Ok(ValidatedDataset {
        tables,
        violations,
        integrity,
    })
}

/// Log gazetteer coordinate coverage.
pub fn log_coordinate_coverage(index: &GeoIndex) {
    if index.is_empty() {
        log_warning("Gazetteer is empty; no calendar can be placed on the map");
        return;
    }
    let with_coords = index.with_coordinates();
    let coverage = with_coords as f64 / index.len() as f64 * 100.0;
    log_info(format!(
        "Locations with coordinates: {}/{} ({:.1}%)",
        with_coords,
        index.len(),
        coverage
    ));
}

// =============================================================================
// Full pipeline
// =============================================================================

/// Row counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunCounts {
    pub calendars: usize,
    pub daily_entries: usize,
    pub symbol_instances: usize,
    pub locations: usize,
    pub locations_with_coordinates: usize,
    pub markers: usize,
    pub search_docs: usize,
    pub payloads: usize,
    pub external_payloads: usize,
}

/// Written to `manifest.json` at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub strict: bool,
    pub embed_threshold_bytes: usize,
    pub counts: RunCounts,
    /// Table name → number of schema violations
    pub violations: BTreeMap<String, usize>,
    /// Reference check → unresolved values
    pub orphans: BTreeMap<String, BTreeSet<String>>,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub manifest: Manifest,
    /// Calendar id → placement of its payload
    pub index: CalendarIndex,
    /// Calendar id → compact JSON of every payload kept inline
    pub inline_payloads: BTreeMap<String, String>,
    /// Empty when output checks were disabled
    pub output_checks: Vec<OutputCheck>,
}

impl PipelineReport {
    /// `false` when an output check failed.
    pub fn is_success(&self) -> bool {
        !self.output_checks.iter().any(OutputCheck::is_failure)
    }
}

/// Run the whole pipeline with the standard schema registry.
pub fn run_pipeline(options: &PipelineOptions) -> PipelineResult<PipelineReport> {
    run_pipeline_with(options, &SchemaRegistry::standard())
}

/// Run the whole pipeline.
///
/// 1. Loads and validates all tables
/// 2. Checks referential integrity
/// 3. Joins the gazetteer into the inventory
/// 4. Generates markers, search documents, statistics and payloads
/// 5. Writes outputs and the run manifest
/// 6. Optionally validates the written files
pub fn run_pipeline_with(
    options: &PipelineOptions,
    registry: &SchemaRegistry,
) -> PipelineResult<PipelineReport> {
    let dataset = run_validation_with(options, registry)?;
    let ValidatedDataset {
        mut tables,
        violations,
        integrity,
    } = dataset;

    log_info("Denormalizing gazetteer...");
    let geo = GeoIndex::build(&tables.gazetteer);
    log_coordinate_coverage(&geo);
    let inventory = std::mem::take(&mut tables.inventory);
    tables.inventory = denormalize(inventory, &geo);

    log_info("Computing symbol categories...");
    let ctx = DatasetContext::build(&tables, registry.buckets());

    let output_dir = options.output_dir.as_path();
    crate::transform::writer::ensure_dir(output_dir)?;

    log_info("Generating map_markers.geojson...");
    let markers = generate_markers(&ctx);
    if markers.is_empty() {
        log_warning("No calendars with valid coordinates!");
    }
    write_markers(output_dir, &markers)?;

    log_info("Generating search_docs.json...");
    let docs = generate_search_docs(&ctx);
    write_search_docs(output_dir, &docs)?;

    log_info("Generating stats.json...");
    let stats = generate_stats(&ctx);
    write_stats(output_dir, &stats)?;

    let policy = options.embed_policy();
    log_info(format!(
        "Generating per-calendar data (embed threshold: {}KB)...",
        options.embed_threshold_kb
    ));
    let payloads = generate_payloads(&ctx, policy)?;
    let index = build_index(&payloads);
    let external_payloads = write_payloads(output_dir, &payloads, &index)?;

    let manifest = Manifest {
        generated_at: Utc::now(),
        strict: options.strict,
        embed_threshold_bytes: policy.threshold_bytes,
        counts: RunCounts {
            calendars: tables.inventory.len(),
            daily_entries: tables.individual.len(),
            symbol_instances: tables.symbol_instances.len(),
            locations: geo.len(),
            locations_with_coordinates: geo.with_coordinates(),
            markers: markers.len(),
            search_docs: docs.len(),
            payloads: payloads.len(),
            external_payloads,
        },
        violations: violations
            .iter()
            .map(|(table, list)| (table.clone(), list.len()))
            .collect(),
        orphans: integrity.orphans(),
    };
    write_manifest(output_dir, &manifest)?;

    let inline_payloads = payloads
        .into_iter()
        .filter(|p| !p.external)
        .map(|p| (p.cal_id, p.json))
        .collect();

    let output_checks = if options.check_outputs {
        check_output_dir(output_dir)
    } else {
        Vec::new()
    };

    log_success("Data preparation complete");

    Ok(PipelineReport {
        manifest,
        index,
        inline_payloads,
        output_checks,
    })
}

fn write_manifest(output_dir: &Path, manifest: &Manifest) -> PipelineResult<()> {
    write_json(&output_dir.join(MANIFEST_FILE), manifest, true)?;
    log_info_indent(format!("Manifest written to {}", MANIFEST_FILE), 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "inventory.tsv", "id\tcal_label\tlocation_id\tyear\nK1\tA\tG1\t1650\n");
        write(dir.path(), "individual.tsv", "cal_id\tmonth\tday\nK1\t1\t6\n");
        write(dir.path(), "gazetteer.tsv", "geoid\tname\tlatitude\tlongitude\nG1\tUppsala\t59.86\t17.64\n");
        write(dir.path(), "generated/symbol_instances.tsv", "symbol_id\tcal_id\tsymbol_type\nS1\tK1\tcrown\n");
        dir
    }

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert!(!options.strict);
        assert!(options.check_outputs);
        assert_eq!(options.embed_policy().threshold_bytes, 30720);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: PipelineOptions =
            serde_json::from_str(r#"{ "data_dir": "in", "strict": true }"#).unwrap();
        assert_eq!(options.data_dir, PathBuf::from("in"));
        assert!(options.strict);
        assert_eq!(options.embed_threshold_kb, 30);
    }

    #[test]
    fn test_missing_data_dir() {
        let options = PipelineOptions {
            data_dir: PathBuf::from("/nonexistent/runestaves"),
            ..PipelineOptions::default()
        };
        let err = run_validation(&options).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDataDir(_)));
    }

    #[test]
    fn test_validation_without_lookups() {
        let dir = data_dir();
        let options = PipelineOptions {
            data_dir: dir.path().to_path_buf(),
            ..PipelineOptions::default()
        };
        let dataset = run_validation(&options).unwrap();
        assert!(dataset.is_clean());
        assert!(dataset.tables.symbol_types.is_empty());
        assert_eq!(dataset.tables.inventory.rows[0]["id"], "K1");
    }

    #[test]
    fn test_pipeline_writes_manifest() {
        let dir = data_dir();
        let out = tempfile::tempdir().unwrap();
        let options = PipelineOptions {
            data_dir: dir.path().to_path_buf(),
            output_dir: out.path().to_path_buf(),
            ..PipelineOptions::default()
        };

        let report = run_pipeline(&options).unwrap();
        assert!(report.is_success());
        assert_eq!(report.manifest.counts.markers, 1);
        assert_eq!(report.manifest.counts.locations_with_coordinates, 1);
        assert!(report.inline_payloads.contains_key("K1"));

        let manifest: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(out.path().join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["embed_threshold_bytes"], 30720);
        assert_eq!(manifest["violations"]["inventory"], 0);
        assert!(manifest["generated_at"].is_string());
    }
}
