//! JSON Schema checks for written output files.
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `map-markers.json` - the marker FeatureCollection
//! - `search-docs.json` - the search document list
//! - `stats.json` - the statistics object
//!
//! Every file is checked in full: all schema errors are collected, not just
//! the first. A missing marker file is a failure; a missing search or
//! statistics file is only a warning.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};

static MARKERS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/map-markers.json"))
        .expect("Invalid embedded schema")
});

static SEARCH_DOCS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/search-docs.json"))
        .expect("Invalid embedded schema")
});

static STATS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/stats.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON Schema (draft 7).
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a marker FeatureCollection.
pub fn validate_markers(data: &Value) -> Result<(), Vec<String>> {
    validate(&MARKERS_SCHEMA, data)
}

/// Validate a search document list.
pub fn validate_search_docs(data: &Value) -> Result<(), Vec<String>> {
    validate(&SEARCH_DOCS_SCHEMA, data)
}

/// Validate a statistics object.
pub fn validate_stats(data: &Value) -> Result<(), Vec<String>> {
    validate(&STATS_SCHEMA, data)
}

// =============================================================================
// Output files
// =============================================================================

/// The derived files covered by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFile {
    Markers,
    SearchDocs,
    Stats,
}

impl OutputFile {
    pub const ALL: [OutputFile; 3] = [OutputFile::Markers, OutputFile::SearchDocs, OutputFile::Stats];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Markers => "map_markers.geojson",
            Self::SearchDocs => "search_docs.json",
            Self::Stats => "stats.json",
        }
    }

    /// A missing required file fails the check.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Markers)
    }

    pub fn validate(&self, data: &Value) -> Result<(), Vec<String>> {
        match self {
            Self::Markers => validate_markers(data),
            Self::SearchDocs => validate_search_docs(data),
            Self::Stats => validate_stats(data),
        }
    }

    /// Short description of a valid document for the summary line.
    fn describe(&self, data: &Value) -> String {
        match self {
            Self::Markers => {
                let n = data["features"].as_array().map(Vec::len).unwrap_or(0);
                format!("{} features", n)
            }
            Self::SearchDocs => {
                let n = data.as_array().map(Vec::len).unwrap_or(0);
                format!("{} documents", n)
            }
            Self::Stats => {
                let n = data["total_calendars"].as_u64().unwrap_or(0);
                format!("{} calendars", n)
            }
        }
    }
}

/// Result of checking one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Valid,
    Invalid,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputCheck {
    pub file: OutputFile,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl OutputCheck {
    /// Invalid files always fail; missing files fail only when required.
    pub fn is_failure(&self) -> bool {
        match self.status {
            CheckStatus::Valid => false,
            CheckStatus::Invalid => true,
            CheckStatus::Missing => self.file.is_required(),
        }
    }
}

/// Check one output file under `dir`.
pub fn check_output_file(dir: &Path, file: OutputFile) -> OutputCheck {
    let path = dir.join(file.file_name());
    let name = file.file_name();

    if !path.exists() {
        if file.is_required() {
            log_error(format!("{}: Not found", name));
        } else {
            log_warning(format!("{}: Not found", name));
        }
        return OutputCheck {
            file,
            status: CheckStatus::Missing,
            errors: Vec::new(),
        };
    }

    let data: Result<Value, String> = std::fs::read_to_string(&path)
        .map_err(|e| format!("read error: {}", e))
        .and_then(|s| serde_json::from_str(&s).map_err(|e| format!("JSON decode error: {}", e)));

    let errors = match data {
        Ok(data) => match file.validate(&data) {
            Ok(()) => {
                log_success(format!("{}: Valid ({})", name, file.describe(&data)));
                return OutputCheck {
                    file,
                    status: CheckStatus::Valid,
                    errors: Vec::new(),
                };
            }
            Err(errors) => errors,
        },
        Err(error) => vec![error],
    };

    log_error(format!("{}: {} error(s)", name, errors.len()));
    for error in errors.iter().take(10) {
        log_info_indent(error.clone(), 1);
    }

    OutputCheck {
        file,
        status: CheckStatus::Invalid,
        errors,
    }
}

/// Check every schema-covered output file under `dir`.
pub fn check_output_dir(dir: &Path) -> Vec<OutputCheck> {
    log_info(format!("Checking output files in {}...", dir.display()));
    OutputFile::ALL
        .iter()
        .map(|file| check_output_file(dir, *file))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marker() -> Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [17.64, 59.86] },
            "properties": {
                "cal_id": "K1",
                "catalog": "Nordiska museet 1",
                "location_precision": "exact",
                "year_min": 1650.0,
                "year_max": 1650.0,
                "period_bucket_en": "17th century",
                "period_bucket_sv": "1600-talet",
                "entry_count": 2,
                "feast_count": 1,
                "detail_url_sv": "/kalendrar/K1.html",
                "detail_url_en": "/en/calendars/K1.html",
                "has_royal": true
            }
        })
    }

    #[test]
    fn test_embedded_schemas_parse() {
        assert!(MARKERS_SCHEMA.is_object());
        assert!(SEARCH_DOCS_SCHEMA.is_object());
        assert!(STATS_SCHEMA.is_object());
    }

    #[test]
    fn test_valid_markers() {
        let data = json!({ "type": "FeatureCollection", "features": [marker()] });
        assert!(validate_markers(&data).is_ok());
    }

    #[test]
    fn test_markers_collect_every_error() {
        let mut bad = marker();
        bad["geometry"]["coordinates"] = json!([200.0, 59.86]);
        bad["properties"]["has_royal"] = json!("yes");
        let data = json!({ "type": "FeatureCollection", "features": [bad] });

        let errors = validate_markers(&data).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_not_a_feature_collection() {
        let data = json!({ "type": "Feature", "features": [] });
        assert!(validate_markers(&data).is_err());
    }

    #[test]
    fn test_search_docs_signal_limit() {
        let doc = json!({
            "cal_id": "K1",
            "catalog": null,
            "year_min": null,
            "year_max": null,
            "period_bucket_en": "Unknown",
            "period_bucket_sv": "Okänt",
            "signals_symbols": ["a", "b", "c", "d", "e", "f"],
            "signals_feasts": []
        });
        assert!(validate_search_docs(&json!([doc])).is_err());
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let checks = check_output_dir(dir.path());

        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.status == CheckStatus::Missing));
        let failures: Vec<OutputFile> =
            checks.iter().filter(|c| c.is_failure()).map(|c| c.file).collect();
        assert_eq!(failures, vec![OutputFile::Markers]);
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stats.json"), "{ not json").unwrap();
        let check = check_output_file(dir.path(), OutputFile::Stats);
        assert_eq!(check.status, CheckStatus::Invalid);
        assert!(check.is_failure());
        assert!(check.errors[0].contains("JSON decode error"));
    }
}
