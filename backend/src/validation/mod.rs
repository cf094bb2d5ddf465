//! Schema validation for loaded tables.
//!
//! [`validate_table`] evaluates a [`TableSchema`] against a [`Table`] and
//! collects *every* violation: missing required columns, nulls in
//! non-nullable fields, values that do not coerce to the declared type,
//! values failing a range or set check, and duplicates in unique fields.
//!
//! Lenient by default: the table is returned with best-effort coercion and
//! the violation list, so one bad cell never costs the whole dataset. With
//! `strict = true` any violation becomes a [`ValidationError::SchemaViolation`].
//!
//! # Example
//!
//! ```rust,ignore
//! use runestaves::{validate_table, SchemaRegistry, TableKind};
//!
//! let registry = SchemaRegistry::standard();
//! let checked = validate_table(table, registry.schema(TableKind::Inventory), false)?;
//! for violation in &checked.violations {
//!     eprintln!("{}", violation);
//! }
//! ```

pub mod integrity;
pub mod output;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{ValidationError, ValidationResult};
use crate::logs::{log_success, log_warning, log_warning_indent};
use crate::models::Table;
use crate::schema::{Check, FieldType, TableSchema};

pub use integrity::{check_integrity, check_references, IntegrityReport, ReferenceCheck, ReferenceResult};
pub use output::{check_output_dir, check_output_file, CheckStatus, OutputCheck, OutputFile};

// =============================================================================
// Violations
// =============================================================================

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub table: String,
    pub field: String,
    /// 1-based data row, `None` for column-level violations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub kind: ViolationKind,
}

/// What was wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A non-nullable column is absent from the table
    MissingColumn,
    /// Null in a non-nullable field
    Null,
    /// Value does not coerce to the declared type
    Type { expected: FieldType, value: String },
    /// Value fails a range or set check
    Check { check: Check, value: String },
    /// Value repeated in a unique field (all offending rows, 1-based)
    Duplicate { value: String, rows: Vec<usize> },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} row {}, field '{}': ", self.table, row, self.field)?,
            None => write!(f, "{}, field '{}': ", self.table, self.field)?,
        }
        match &self.kind {
            ViolationKind::MissingColumn => write!(f, "required column is missing"),
            ViolationKind::Null => write!(f, "null value in non-nullable field"),
            ViolationKind::Type { expected, value } => {
                write!(f, "value '{}' is not a valid {}", value, expected)
            }
            ViolationKind::Check { check, value } => {
                write!(f, "value '{}' is not {}", value, check)
            }
            ViolationKind::Duplicate { value, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(f, "duplicate value '{}' in rows {}", value, rows.join(", "))
            }
        }
    }
}

/// A table after validation, with every violation found.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    pub table: Table,
    pub violations: Vec<Violation>,
}

impl ValidatedTable {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

// =============================================================================
// Coercion
// =============================================================================

const TRUE_VALUES: &[&str] = &["true", "t", "yes", "y", "1", "ja"];
const FALSE_VALUES: &[&str] = &["false", "f", "no", "n", "0", "nej"];

fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a non-null cell to the declared type. `None` when ambiguous.
pub fn coerce(field_type: FieldType, value: &Value) -> Option<Value> {
    match (field_type, value) {
        (FieldType::Text, Value::String(_)) => Some(value.clone()),
        (FieldType::Text, Value::Number(_) | Value::Bool(_)) => Some(Value::String(render(value))),

        (FieldType::Int, Value::Number(n)) if n.is_i64() => Some(value.clone()),
        (FieldType::Int, Value::Number(n)) => integral(n.as_f64()?),
        (FieldType::Int, Value::String(s)) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Some(Value::Number(i.into())),
                Err(_) => integral(s.parse::<f64>().ok()?),
            }
        }

        (FieldType::Float, Value::Number(_)) => Some(value.clone()),
        (FieldType::Float, Value::String(s)) => {
            let f = s.trim().parse::<f64>().ok().filter(|f| f.is_finite())?;
            Number::from_f64(f).map(Value::Number)
        }

        (FieldType::Bool, Value::Bool(_)) => Some(value.clone()),
        (FieldType::Bool, Value::String(s)) => {
            let s = s.trim().to_lowercase();
            if TRUE_VALUES.contains(&s.as_str()) {
                Some(Value::Bool(true))
            } else if FALSE_VALUES.contains(&s.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }

        _ => None,
    }
}

fn integral(f: f64) -> Option<Value> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .then(|| Value::Number((f as i64).into()))
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a table against its schema.
///
/// Every declared field present in the table is checked for nullability,
/// type coercibility, value check and uniqueness. Undeclared columns are left
/// untouched. Values that coerce cleanly are replaced by their typed form;
/// values that do not are kept as loaded.
///
/// # Errors
/// [`ValidationError::SchemaViolation`] when `strict` is set and at least one
/// violation was found.
pub fn validate_table(
    mut table: Table,
    schema: &TableSchema,
    strict: bool,
) -> ValidationResult<ValidatedTable> {
    let mut violations = Vec::new();

    for field in &schema.fields {
        if !table.has_column(field.name) {
            if !field.nullable && !table.is_empty() {
                violations.push(Violation {
                    table: table.name.clone(),
                    field: field.name.to_string(),
                    row: None,
                    kind: ViolationKind::MissingColumn,
                });
            }
            continue;
        }

        let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
        let mut seen_order: Vec<String> = Vec::new();

        for (idx, row) in table.rows.iter_mut().enumerate() {
            let row_number = idx + 1;
            let cell = row.entry(field.name).or_insert(Value::Null);

            if is_null(cell) {
                if !field.nullable {
                    violations.push(Violation {
                        table: table.name.clone(),
                        field: field.name.to_string(),
                        row: Some(row_number),
                        kind: ViolationKind::Null,
                    });
                }
                continue;
            }

            match coerce(field.field_type, cell) {
                Some(coerced) => {
                    if let Some(check) = &field.check {
                        if !check.passes(&coerced) {
                            violations.push(Violation {
                                table: table.name.clone(),
                                field: field.name.to_string(),
                                row: Some(row_number),
                                kind: ViolationKind::Check {
                                    check: check.clone(),
                                    value: render(&coerced),
                                },
                            });
                        }
                    }
                    *cell = coerced;
                }
                None => {
                    violations.push(Violation {
                        table: table.name.clone(),
                        field: field.name.to_string(),
                        row: Some(row_number),
                        kind: ViolationKind::Type {
                            expected: field.field_type,
                            value: render(cell),
                        },
                    });
                }
            }

            if field.unique {
                let key = render(cell);
                let rows = seen.entry(key.clone()).or_default();
                if rows.is_empty() {
                    seen_order.push(key);
                }
                rows.push(row_number);
            }
        }

        for value in seen_order {
            if let Some(rows) = seen.remove(&value) {
                if rows.len() > 1 {
                    violations.push(Violation {
                        table: table.name.clone(),
                        field: field.name.to_string(),
                        row: None,
                        kind: ViolationKind::Duplicate { value, rows },
                    });
                }
            }
        }
    }

    if strict && !violations.is_empty() {
        return Err(ValidationError::SchemaViolation {
            table: table.name.clone(),
            violations,
        });
    }

    Ok(ValidatedTable { table, violations })
}

/// Log the outcome of validating one table, one line per violation.
pub fn log_violations(table: &Table, violations: &[Violation]) {
    if violations.is_empty() {
        log_success(format!("{} validated successfully ({} rows)", table.name, table.len()));
        return;
    }

    log_warning(format!(
        "{} has {} validation warning(s):",
        table.name,
        violations.len()
    ));
    for violation in violations {
        log_warning_indent(violation.to_string(), 1);
    }
    log_warning_indent(
        format!("Continuing with {} rows (some may have issues)", table.len()),
        1,
    );
}
