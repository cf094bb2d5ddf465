//! Domain models for the Runestaves data pipeline.
//!
//! This module contains the core data structures shared by every stage:
//!
//! - [`Table`] - A loaded TSV table (name, ordered headers, rows)
//! - [`Row`] - One record, keyed by column header
//! - [`RowExt`] - Typed accessors over a row's loosely-typed cells
//! - [`TableSet`] - The six input tables of one run
//! - [`CategoryFlags`] - One boolean per fixed symbol category
//!
//! Rows stay loosely typed on purpose: schemas are non-exhaustive, so columns
//! the registry does not declare must survive untouched all the way into the
//! per-calendar payloads.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::schema::{SymbolCategory, TableKind};

// =============================================================================
// Tables
// =============================================================================

/// One table record. Cells are `Value::Null` when empty, strings as loaded,
/// or typed values once the validator has coerced them.
pub type Row = Map<String, Value>;

/// A table loaded wholesale into memory.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Table {
    /// Logical table name (`inventory`, `individual`, ...)
    pub name: String,
    /// Column headers in file order
    pub headers: Vec<String>,
    /// Records in file order
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// A table with no columns and no rows (used for absent optional inputs).
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), Vec::new())
    }

    /// Build a table from JSON objects. Headers are collected in first-seen order.
    pub fn from_records(name: impl Into<String>, records: Vec<Value>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            if let Value::Object(obj) = record {
                for key in obj.keys() {
                    if !headers.iter().any(|h| h == key) {
                        headers.push(key.clone());
                    }
                }
                rows.push(obj);
            }
        }

        Self::new(name, headers, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Add a column header if it is not present yet.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.headers.push(column.to_string());
        }
    }

    /// Non-null text values of a column, in row order.
    pub fn texts<'a>(&'a self, column: &'a str) -> impl Iterator<Item = String> + 'a {
        self.rows.iter().filter_map(move |row| row.text(column))
    }
}

/// The input tables of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub inventory: Table,
    pub individual: Table,
    pub gazetteer: Table,
    pub symbol_instances: Table,
    pub symbol_types: Table,
    pub feast_canonical: Table,
}

impl TableSet {
    pub fn get(&self, kind: TableKind) -> &Table {
        match kind {
            TableKind::Inventory => &self.inventory,
            TableKind::Individual => &self.individual,
            TableKind::Gazetteer => &self.gazetteer,
            TableKind::SymbolInstances => &self.symbol_instances,
            TableKind::SymbolTypes => &self.symbol_types,
            TableKind::FeastCanonical => &self.feast_canonical,
        }
    }

    pub fn set(&mut self, kind: TableKind, table: Table) {
        let slot = match kind {
            TableKind::Inventory => &mut self.inventory,
            TableKind::Individual => &mut self.individual,
            TableKind::Gazetteer => &mut self.gazetteer,
            TableKind::SymbolInstances => &mut self.symbol_instances,
            TableKind::SymbolTypes => &mut self.symbol_types,
            TableKind::FeastCanonical => &mut self.feast_canonical,
        };
        *slot = table;
    }
}

// =============================================================================
// Row accessors
// =============================================================================

/// Typed reads over loosely-typed row cells.
///
/// Accessors never fail: a cell that cannot be read as the requested type is
/// treated as missing.
pub trait RowExt {
    /// Cell rendered as text; `None` for null, missing or blank cells.
    fn text(&self, field: &str) -> Option<String>;

    /// Cell as a finite float (numbers, or strings that parse as one).
    fn number(&self, field: &str) -> Option<f64>;

    /// Cell as an integer (integral numbers, or strings that parse as one).
    fn integer(&self, field: &str) -> Option<i64>;

    /// Text cell or the empty string.
    fn text_or_empty(&self, field: &str) -> String {
        self.text(field).unwrap_or_default()
    }
}

impl RowExt for Row {
    fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    fn number(&self, field: &str) -> Option<f64> {
        let n = match self.get(field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

// =============================================================================
// Symbol category flags
// =============================================================================

/// One boolean per fixed [`SymbolCategory`].
///
/// Serializes as a flat map `{"has_religious": true, "has_royal": false, ...}`
/// in registry order, so it can be flattened into marker properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFlags([bool; SymbolCategory::COUNT]);

impl CategoryFlags {
    pub fn set(&mut self, category: SymbolCategory) {
        self.0[category.index()] = true;
    }

    pub fn has(&self, category: SymbolCategory) -> bool {
        self.0[category.index()]
    }

    /// Categories that are set, in registry order.
    pub fn present(&self) -> impl Iterator<Item = SymbolCategory> + '_ {
        SymbolCategory::ALL.iter().copied().filter(move |c| self.has(*c))
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|b| *b)
    }
}

impl Serialize for CategoryFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SymbolCategory::COUNT))?;
        for category in SymbolCategory::ALL {
            map.serialize_entry(&category.flag_name(), &self.has(category))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_text_treats_blank_as_missing() {
        let r = row(json!({ "a": "  ", "b": null, "c": "x", "d": 4 }));
        assert_eq!(r.text("a"), None);
        assert_eq!(r.text("b"), None);
        assert_eq!(r.text("c").as_deref(), Some("x"));
        assert_eq!(r.text("d").as_deref(), Some("4"));
        assert_eq!(r.text("missing"), None);
    }

    #[test]
    fn test_number_accepts_strings_and_rejects_garbage() {
        let r = row(json!({ "lat": "59.85", "lon": 17.6, "bad": "north", "nan": "NaN" }));
        assert_eq!(r.number("lat"), Some(59.85));
        assert_eq!(r.number("lon"), Some(17.6));
        assert_eq!(r.number("bad"), None);
        assert_eq!(r.number("nan"), None);
    }

    #[test]
    fn test_integer_from_number_or_string() {
        let r = row(json!({ "a": 4, "b": "6", "c": 4.0, "d": 4.5 }));
        assert_eq!(r.integer("a"), Some(4));
        assert_eq!(r.integer("b"), Some(6));
        assert_eq!(r.integer("c"), Some(4));
        assert_eq!(r.integer("d"), None);
    }

    #[test]
    fn test_from_records_collects_headers_in_order() {
        let table = Table::from_records(
            "t",
            vec![json!({ "id": "1", "x": "a" }), json!({ "id": "2", "y": "b" })],
        );
        assert_eq!(table.len(), 2);
        assert!(table.has_column("x"));
        assert!(table.has_column("y"));
        assert_eq!(table.texts("id").collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_category_flags_serialize_every_category() {
        let mut flags = CategoryFlags::default();
        flags.set(SymbolCategory::Royal);

        let value = serde_json::to_value(flags).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), SymbolCategory::COUNT);
        assert_eq!(obj["has_royal"], json!(true));
        assert_eq!(obj["has_religious"], json!(false));
        assert_eq!(flags.present().collect::<Vec<_>>(), vec![SymbolCategory::Royal]);
    }
}
