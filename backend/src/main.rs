//! Runestaves CLI - validate the catalogue and prepare site datasets
//!
//! # Commands
//!
//! ```bash
//! runestaves validate --data-dir data              # Schema + integrity checks only
//! runestaves prepare --data-dir data --output-dir site/data
//! runestaves check-output --output-dir site/data   # Re-check written files
//! runestaves schema inventory                      # Print registered constraints
//! ```
//!
//! Every option can also be set through `RUNESTAVES_*` environment variables
//! or a `.env` file. Log verbosity follows `RUST_LOG`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use runestaves::datasets::details::DEFAULT_EMBED_THRESHOLD_KB;
use runestaves::logs::{init_tracing, log_error, log_info, log_success, log_warning};
use runestaves::transform::pipeline::log_coordinate_coverage;
use runestaves::{
    check_output_dir, run_pipeline, run_validation, GeoIndex, PipelineOptions, SchemaRegistry,
    TableKind,
};

#[derive(Parser)]
#[command(name = "runestaves")]
#[command(about = "Validate the runestaff catalogue and prepare site datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and integrity-check the input tables
    Validate {
        /// Directory holding the TSV tables
        #[arg(long, env = "RUNESTAVES_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Fail on any schema violation or orphan reference
        #[arg(long, env = "RUNESTAVES_STRICT")]
        strict: bool,
    },

    /// Full pipeline: validate, denormalize, generate and write datasets
    Prepare {
        /// Directory holding the TSV tables
        #[arg(long, env = "RUNESTAVES_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Directory receiving the derived datasets
        #[arg(long, env = "RUNESTAVES_OUTPUT_DIR", default_value = "site/data")]
        output_dir: PathBuf,

        /// Fail on any schema violation or orphan reference
        #[arg(long, env = "RUNESTAVES_STRICT")]
        strict: bool,

        /// Payloads larger than this many KB are written to side files
        #[arg(long, env = "RUNESTAVES_EMBED_THRESHOLD_KB", default_value_t = DEFAULT_EMBED_THRESHOLD_KB)]
        embed_threshold_kb: usize,

        /// Skip the JSON Schema check of written outputs
        #[arg(long)]
        no_check: bool,
    },

    /// Validate previously written output files
    CheckOutput {
        /// Directory holding the derived datasets
        #[arg(long, env = "RUNESTAVES_OUTPUT_DIR", default_value = "site/data")]
        output_dir: PathBuf,
    },

    /// Print the registered table constraints as JSON
    Schema {
        /// Table name (default: whole registry)
        table: Option<String>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { data_dir, strict } => cmd_validate(data_dir, strict),

        Commands::Prepare {
            data_dir,
            output_dir,
            strict,
            embed_threshold_kb,
            no_check,
        } => cmd_prepare(PipelineOptions {
            data_dir,
            output_dir,
            strict,
            embed_threshold_kb,
            check_outputs: !no_check,
        }),

        Commands::CheckOutput { output_dir } => cmd_check_output(&output_dir),

        Commands::Schema { table } => cmd_schema(table.as_deref()),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log_error(format!("Error: {}", e));
            std::process::exit(1);
        }
    }
}

type CmdResult = Result<bool, Box<dyn std::error::Error>>;

fn cmd_validate(data_dir: PathBuf, strict: bool) -> CmdResult {
    let options = PipelineOptions {
        data_dir,
        strict,
        ..PipelineOptions::default()
    };

    let dataset = run_validation(&options)?;
    let tables = &dataset.tables;

    log_info("Summary:");
    log_info(format!("  Calendars: {}", tables.inventory.len()));
    log_info(format!("  Daily entries: {}", tables.individual.len()));
    log_info(format!("  Symbol instances: {}", tables.symbol_instances.len()));
    log_info(format!("  Locations: {}", tables.gazetteer.len()));
    log_coordinate_coverage(&GeoIndex::build(&tables.gazetteer));

    if dataset.is_clean() {
        log_success("All validations passed");
    } else {
        log_warning(format!(
            "{} schema violation(s), {} unresolved reference check(s)",
            dataset.violation_count(),
            dataset.integrity.orphans().len()
        ));
    }
    Ok(true)
}

fn cmd_prepare(options: PipelineOptions) -> CmdResult {
    let report = run_pipeline(&options)?;
    let counts = &report.manifest.counts;

    log_info(format!(
        "{} markers, {} search documents, {} payloads ({} external)",
        counts.markers, counts.search_docs, counts.payloads, counts.external_payloads
    ));

    if !report.is_success() {
        log_error("Output check failed");
    }
    Ok(report.is_success())
}

fn cmd_check_output(output_dir: &Path) -> CmdResult {
    let checks = check_output_dir(output_dir);
    let failures = checks.iter().filter(|c| c.is_failure()).count();

    if failures == 0 {
        log_success("All output files valid");
    } else {
        log_error(format!("{} output file(s) failed", failures));
    }
    Ok(failures == 0)
}

fn cmd_schema(table: Option<&str>) -> CmdResult {
    let registry = SchemaRegistry::standard();

    let json = match table {
        Some(name) => {
            let kind = TableKind::from_name(name).ok_or_else(|| {
                let known: Vec<&str> = TableKind::ALL.iter().map(|k| k.name()).collect();
                format!("Unknown table '{}' (expected one of: {})", name, known.join(", "))
            })?;
            serde_json::to_string_pretty(registry.schema(kind))?
        }
        None => serde_json::to_string_pretty(&registry)?,
    };

    println!("{}", json);
    Ok(true)
}
