//! TSV table loader with encoding auto-detection.
//!
//! Reads whole files into [`Table`]s. Every cell is loaded as text; empty
//! cells become `null`. Type coercion is the validator's job, not the loader's.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{TableError, TableResult};
use crate::logs::{log_info, log_warning};
use crate::models::{Row, Table};
use crate::schema::TableKind;

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Valid UTF-8 is returned as-is whatever charset was detected.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => {
            // Fallback: UTF-8 with lossy conversion
            String::from_utf8_lossy(bytes).to_string()
        }
    }
}

/// Parse tab-separated text into a table.
///
/// Rows shorter than the header are padded with nulls; rows longer than the
/// header mean the file is not valid tabular text.
pub fn parse_tsv(content: &str, table: &str) -> TableResult<Table> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(TableError::EmptyFile(table.to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(table, &e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TableError::NoHeaders(table.to_string()));
    }

    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| parse_error(table, &e))?;

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        if record.len() > headers.len() {
            return Err(TableError::ParseError {
                table: table.to_string(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
                message: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
        }

        let mut row = Row::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = match record.get(i) {
                Some(value) if !value.is_empty() => Value::String(value.to_string()),
                _ => Value::Null,
            };
            row.insert(header.clone(), cell);
        }
        rows.push(row);
    }

    Ok(Table::new(table, headers, rows))
}

fn parse_error(table: &str, err: &csv::Error) -> TableError {
    TableError::ParseError {
        table: table.to_string(),
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

/// Read and parse one TSV file with encoding auto-detection.
pub fn parse_tsv_file(path: &Path, table: &str) -> TableResult<Table> {
    let bytes = std::fs::read(path).map_err(|source| TableError::IoError {
        path: path.to_path_buf(),
        source,
    })?;

    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding);
    parse_tsv(&content, table)
}

/// Path of a table's TSV file under the data directory.
pub fn table_path(data_dir: &Path, kind: TableKind) -> PathBuf {
    data_dir.join(kind.relative_path())
}

/// Load one input table.
///
/// A missing required table is fatal; a missing lookup table yields an empty
/// table and a warning.
pub fn load_table(data_dir: &Path, kind: TableKind) -> TableResult<Table> {
    let path = table_path(data_dir, kind);

    if !path.exists() {
        if kind.is_required() {
            return Err(TableError::MissingFile {
                table: kind.name().to_string(),
                path,
            });
        }
        log_warning(format!("{} not found: {}", kind.name(), path.display()));
        return Ok(Table::empty(kind.name()));
    }

    let table = parse_tsv_file(&path, kind.name())?;
    log_info(format!(
        "Loaded {}: {} rows, {} columns",
        kind.name(),
        table.len(),
        table.headers.len()
    ));
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_tsv() {
        let tsv = "id\tcal_label\nK1\tFirst\nK2\tSecond";
        let table = parse_tsv(tsv, "inventory").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers, vec!["id", "cal_label"]);
        assert_eq!(table.rows[0]["id"], "K1");
        assert_eq!(table.rows[1]["cal_label"], "Second");
    }

    #[test]
    fn test_empty_cells_are_null() {
        let tsv = "a\tb\tc\n1\t\t3";
        let table = parse_tsv(tsv, "t").unwrap();

        assert_eq!(table.rows[0]["a"], "1");
        assert_eq!(table.rows[0]["b"], json!(null));
        assert_eq!(table.rows[0]["c"], "3");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let tsv = "a\tb\tc\n1\t2";
        let table = parse_tsv(tsv, "t").unwrap();
        assert_eq!(table.rows[0]["c"], json!(null));
    }

    #[test]
    fn test_long_rows_are_malformed() {
        let tsv = "a\tb\n1\t2\n1\t2\t3\t4";
        let err = parse_tsv(tsv, "individual").unwrap_err();
        match err {
            TableError::ParseError { table, line, .. } => {
                assert_eq!(table, "individual");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_lines_skipped() {
        let tsv = "a\tb\n1\t2\n\n3\t4\n";
        let table = parse_tsv(tsv, "t").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cells_trimmed() {
        let tsv = "a\tb\n  x \t y";
        let table = parse_tsv(tsv, "t").unwrap();
        assert_eq!(table.rows[0]["a"], "x");
        assert_eq!(table.rows[0]["b"], "y");
    }

    #[test]
    fn test_empty_tsv_error() {
        let err = parse_tsv("", "inventory").unwrap_err();
        assert!(matches!(err, TableError::EmptyFile(_)));
    }

    #[test]
    fn test_bom_is_stripped() {
        let tsv = "\u{feff}id\tname\nG1\tUppsala";
        let table = parse_tsv(tsv, "gazetteer").unwrap();
        assert!(table.has_column("id"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Växjö" in ISO-8859-1
        let bytes: &[u8] = &[0x56, 0xE4, 0x78, 0x6A, 0xF6];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Växjö");
    }

    #[test]
    fn test_utf8_preferred_over_detection() {
        let decoded = decode_content("Växjö".as_bytes(), "iso-8859-1");
        assert_eq!(decoded, "Växjö");
    }

    #[test]
    fn test_missing_required_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(dir.path(), TableKind::Inventory).unwrap_err();
        assert!(matches!(err, TableError::MissingFile { .. }));
    }

    #[test]
    fn test_missing_lookup_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_table(dir.path(), TableKind::FeastCanonical).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.name, "feast_canonical");
    }

    #[test]
    fn test_load_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("generated")).unwrap();
        std::fs::write(
            dir.path().join("generated/symbol_instances.tsv"),
            "symbol_id\tcal_id\nS1\tK1\n",
        )
        .unwrap();
        let table = load_table(dir.path(), TableKind::SymbolInstances).unwrap();
        assert_eq!(table.len(), 1);
    }
}
