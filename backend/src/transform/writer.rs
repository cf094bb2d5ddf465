//! Output writer for the derived datasets.
//!
//! Markers, search documents and payloads are written as compact JSON; the
//! statistics, the calendar index and the run manifest are pretty-printed.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::datasets::{CalendarIndex, FeatureCollection, PreparedPayload, SearchDoc, Stats};
use crate::error::{OutputError, OutputResult};
use crate::logs::{log_success, log_warning};
use crate::validation::OutputFile;

/// Marker file size above which a warning is logged.
pub const MARKERS_SIZE_WARNING_KB: f64 = 800.0;

pub const CALENDARS_DIR: &str = "calendars";
pub const INDEX_FILE: &str = "calendar_index.json";
pub const MANIFEST_FILE: &str = "manifest.json";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::IoError {
        path: path.to_path_buf(),
        source,
    }
}

/// Create a directory and its parents.
pub fn ensure_dir(dir: &Path) -> OutputResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))
}

/// Write a string to a file, creating parent directories. Returns bytes written.
pub fn write_text(path: &Path, content: &str) -> OutputResult<usize> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    std::fs::write(path, content).map_err(io_error(path))?;
    Ok(content.len())
}

/// Serialize a value and write it. Returns bytes written.
pub fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> OutputResult<usize> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    write_text(path, &content)
}

/// `true` when `id` can name a file directly inside `calendars/`.
pub fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0'))
}

/// Path of an external payload file.
pub fn payload_path(output_dir: &Path, cal_id: &str) -> OutputResult<PathBuf> {
    if !is_safe_file_stem(cal_id) {
        return Err(OutputError::UnsafeFileName(cal_id.to_string()));
    }
    Ok(output_dir.join(CALENDARS_DIR).join(format!("{}.json", cal_id)))
}

pub fn write_markers(output_dir: &Path, markers: &FeatureCollection) -> OutputResult<()> {
    let path = output_dir.join(OutputFile::Markers.file_name());
    let bytes = write_json(&path, markers, false)?;
    let size_kb = bytes as f64 / 1024.0;

    log_success(format!(
        "Generated {} markers ({:.1} KB)",
        markers.len(),
        size_kb
    ));
    if size_kb > MARKERS_SIZE_WARNING_KB {
        log_warning(format!(
            "File size exceeds {} KB target",
            MARKERS_SIZE_WARNING_KB
        ));
    }
    Ok(())
}

pub fn write_search_docs(output_dir: &Path, docs: &[SearchDoc]) -> OutputResult<()> {
    let path = output_dir.join(OutputFile::SearchDocs.file_name());
    write_json(&path, &docs, false)?;
    log_success(format!("Generated {} search documents", docs.len()));
    Ok(())
}

pub fn write_stats(output_dir: &Path, stats: &Stats) -> OutputResult<()> {
    let path = output_dir.join(OutputFile::Stats.file_name());
    write_json(&path, stats, true)?;
    log_success("Generated statistics");
    Ok(())
}

/// Write external payloads to `calendars/` and the index of all payloads.
pub fn write_payloads(
    output_dir: &Path,
    payloads: &[PreparedPayload],
    index: &CalendarIndex,
) -> OutputResult<usize> {
    let mut external = 0;
    for payload in payloads.iter().filter(|p| p.external) {
        write_text(&payload_path(output_dir, &payload.cal_id)?, &payload.json)?;
        external += 1;
    }
    if external > 0 {
        log_success(format!("Wrote {} large calendars to separate files", external));
    }

    write_json(&output_dir.join(INDEX_FILE), index, true)?;
    log_success(format!("Generated data for {} calendars", payloads.len()));
    Ok(external)
}
