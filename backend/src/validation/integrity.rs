//! Referential integrity between input tables.
//!
//! A reference check compares the distinct non-null values of a child column
//! with the key set of a parent column. Values with no parent are *orphans*.
//! Orphans are reported and the run continues, unless strict mode is on.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{ValidationError, ValidationResult};
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::models::{Table, TableSet};
use crate::schema::TableKind;

/// Orphan values of `child_col` that do not appear in `parent_col`.
///
/// Nulls in the child column are ignored. An empty result means every
/// reference resolves.
pub fn check_references(
    child: &Table,
    child_col: &str,
    parent: &Table,
    parent_col: &str,
) -> BTreeSet<String> {
    let keys: HashSet<String> = parent.texts(parent_col).collect();
    child
        .texts(child_col)
        .filter(|value| !keys.contains(value))
        .collect()
}

/// A foreign-key style reference between two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceCheck {
    pub child: TableKind,
    pub child_column: &'static str,
    pub parent: TableKind,
    pub parent_column: &'static str,
}

impl ReferenceCheck {
    /// The references checked on every run.
    pub const STANDARD: [ReferenceCheck; 3] = [
        ReferenceCheck {
            child: TableKind::Individual,
            child_column: "cal_id",
            parent: TableKind::Inventory,
            parent_column: "id",
        },
        ReferenceCheck {
            child: TableKind::SymbolInstances,
            child_column: "cal_id",
            parent: TableKind::Inventory,
            parent_column: "id",
        },
        ReferenceCheck {
            child: TableKind::Inventory,
            child_column: "location_id",
            parent: TableKind::Gazetteer,
            parent_column: "geoid",
        },
    ];

    /// `child.column -> parent.column`
    pub fn name(&self) -> String {
        format!(
            "{}.{} -> {}.{}",
            self.child.name(),
            self.child_column,
            self.parent.name(),
            self.parent_column
        )
    }
}

/// Outcome of one reference check.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceResult {
    pub check: String,
    /// Skipped because the child or parent table is empty
    pub skipped: bool,
    pub orphans: BTreeSet<String>,
}

/// Outcome of all reference checks of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub results: Vec<ReferenceResult>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.orphans.is_empty())
    }

    /// Check name to orphan values, for failing checks only.
    pub fn orphans(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.results
            .iter()
            .filter(|r| !r.orphans.is_empty())
            .map(|r| (r.check.clone(), r.orphans.clone()))
            .collect()
    }
}

/// Run the standard reference checks over a table set.
///
/// # Errors
/// [`ValidationError::IntegrityViolation`] when `strict` is set and any check
/// found orphans.
pub fn check_integrity(tables: &TableSet, strict: bool) -> ValidationResult<IntegrityReport> {
    log_info("Checking referential integrity...");
    let mut report = IntegrityReport::default();

    for check in ReferenceCheck::STANDARD {
        let child = tables.get(check.child);
        let parent = tables.get(check.parent);

        if child.is_empty() || parent.is_empty() {
            report.results.push(ReferenceResult {
                check: check.name(),
                skipped: true,
                orphans: BTreeSet::new(),
            });
            continue;
        }

        let orphans = check_references(child, check.child_column, parent, check.parent_column);

        if orphans.is_empty() {
            log_success(format!("All {} values resolve", check.name()));
        } else {
            log_warning(format!(
                "Found {} unresolved value(s) for {}",
                orphans.len(),
                check.name()
            ));
            let examples: Vec<&str> = orphans.iter().take(5).map(String::as_str).collect();
            log_warning_indent(format!("Examples: {}", examples.join(", ")), 1);
        }

        report.results.push(ReferenceResult {
            check: check.name(),
            skipped: false,
            orphans,
        });
    }

    if strict && !report.is_valid() {
        return Err(ValidationError::IntegrityViolation {
            orphans: report.orphans(),
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tables() -> TableSet {
        TableSet {
            inventory: Table::from_records(
                "inventory",
                vec![
                    json!({ "id": "K1", "location_id": "G1" }),
                    json!({ "id": "K2", "location_id": null }),
                ],
            ),
            individual: Table::from_records(
                "individual",
                vec![
                    json!({ "cal_id": "K1" }),
                    json!({ "cal_id": "K2" }),
                    json!({ "cal_id": "K404" }),
                    json!({ "cal_id": "K404" }),
                ],
            ),
            gazetteer: Table::from_records("gazetteer", vec![json!({ "geoid": "G1" })]),
            symbol_instances: Table::from_records(
                "symbol_instances",
                vec![json!({ "symbol_id": "S1", "cal_id": "K2" })],
            ),
            ..TableSet::default()
        }
    }

    #[test]
    fn test_check_references_reports_exact_orphans() {
        let t = tables();
        let orphans = check_references(&t.individual, "cal_id", &t.inventory, "id");
        assert_eq!(orphans, BTreeSet::from(["K404".to_string()]));
    }

    #[test]
    fn test_null_child_values_ignored() {
        let t = tables();
        let orphans = check_references(&t.inventory, "location_id", &t.gazetteer, "geoid");
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_lenient_run_reports_and_continues() {
        let report = check_integrity(&tables(), false).unwrap();
        assert!(!report.is_valid());
        let orphans = report.orphans();
        assert_eq!(orphans.len(), 1);
        assert_eq!(
            orphans["individual.cal_id -> inventory.id"],
            BTreeSet::from(["K404".to_string()])
        );
    }

    #[test]
    fn test_strict_run_fails() {
        let err = check_integrity(&tables(), true).unwrap_err();
        assert!(matches!(err, ValidationError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_empty_tables_skip_checks() {
        let mut t = tables();
        t.gazetteer = Table::empty("gazetteer");
        let report = check_integrity(&t, true).err();
        // Only the individual orphan remains; the location check is skipped.
        match report {
            Some(ValidationError::IntegrityViolation { orphans }) => assert_eq!(orphans.len(), 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
