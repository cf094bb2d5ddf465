//! Derived dataset generators.
//!
//! Every generator reads the same [`DatasetContext`]: the denormalized
//! calendar rows plus lookup maps built once per run.
//!
//! - [`markers`] - GeoJSON point per calendar with coordinates
//! - [`search`] - compact search documents
//! - [`stats`] - global counts for the charts
//! - [`details`] - per-calendar payloads with embed/external partitioning

pub mod details;
pub mod markers;
pub mod search;
pub mod stats;

use std::collections::HashMap;

use crate::logs::log_warning;
use crate::models::{CategoryFlags, Row, RowExt, TableSet};
use crate::schema::{PeriodBuckets, PeriodLabels, SymbolCategory};
use crate::transform::dates::{assign_period_bucket, parse_year_range, YearRange};

pub use details::{
    build_index, generate_payloads, prepare_payload, CalendarIndex, CalendarPayload, EmbedPolicy,
    IndexEntry, PreparedPayload,
};
pub use markers::{generate_markers, Feature, FeatureCollection, MarkerProperties};
pub use search::{generate_search_docs, top_counts, SearchDoc};
pub use stats::{generate_stats, Stats};

/// Read-only inputs shared by all generators.
///
/// Sub-records are grouped by `cal_id` in file order. Category flags are
/// derived from each calendar's symbol types through the symbol-type lookup.
#[derive(Debug)]
pub struct DatasetContext<'a> {
    /// Denormalized inventory rows, in file order
    pub calendars: &'a [Row],
    pub buckets: &'a PeriodBuckets,
    category_of: HashMap<String, SymbolCategory>,
    feast_names: HashMap<String, String>,
    entries: HashMap<String, Vec<&'a Row>>,
    symbols: HashMap<String, Vec<&'a Row>>,
    flags: HashMap<String, CategoryFlags>,
}

impl<'a> DatasetContext<'a> {
    /// Build lookups over a table set whose inventory is already denormalized.
    pub fn build(tables: &'a TableSet, buckets: &'a PeriodBuckets) -> Self {
        let category_of = category_lookup(tables);
        let feast_names: HashMap<String, String> = tables
            .feast_canonical
            .rows
            .iter()
            .filter_map(|row| Some((row.text("canonical_id")?, row.text("canonical_name")?)))
            .collect();

        let entries = group_by_calendar(&tables.individual.rows);
        let symbols = group_by_calendar(&tables.symbol_instances.rows);

        let mut flags: HashMap<String, CategoryFlags> = HashMap::new();
        for (cal_id, rows) in &symbols {
            let mut cal_flags = CategoryFlags::default();
            for category in rows
                .iter()
                .filter_map(|row| row.text("symbol_type"))
                .filter_map(|symbol_type| category_of.get(&symbol_type))
            {
                cal_flags.set(*category);
            }
            flags.insert(cal_id.clone(), cal_flags);
        }

        Self {
            calendars: &tables.inventory.rows,
            buckets,
            category_of,
            feast_names,
            entries,
            symbols,
            flags,
        }
    }

    /// Daily entries of a calendar, in file order.
    pub fn entries(&self, cal_id: &str) -> &[&'a Row] {
        self.entries.get(cal_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Symbol instances of a calendar, in file order.
    pub fn symbols(&self, cal_id: &str) -> &[&'a Row] {
        self.symbols.get(cal_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Category flags of a calendar (all false without symbols).
    pub fn flags(&self, cal_id: &str) -> CategoryFlags {
        self.flags.get(cal_id).copied().unwrap_or_default()
    }

    pub fn category_of(&self, symbol_type: &str) -> Option<SymbolCategory> {
        self.category_of.get(symbol_type).copied()
    }

    /// Canonical feast name, falling back to the id itself.
    pub fn feast_name(&self, canonical_id: &str) -> String {
        self.feast_names
            .get(canonical_id)
            .cloned()
            .unwrap_or_else(|| canonical_id.to_string())
    }

    /// Calendars with an id, first occurrence of each id only.
    pub fn identified(&self) -> impl Iterator<Item = (String, &'a Row)> + '_ {
        let mut seen = std::collections::HashSet::new();
        self.calendars.iter().filter_map(move |row| {
            let id = row.text("id")?;
            seen.insert(id.clone()).then_some((id, row))
        })
    }

    /// Year range and period labels of a calendar row.
    pub fn dating(&self, row: &Row) -> (YearRange, &'a PeriodLabels) {
        let range = parse_year_range(row.text("year").as_deref());
        (range, assign_period_bucket(range, self.buckets))
    }
}

fn category_lookup(tables: &TableSet) -> HashMap<String, SymbolCategory> {
    let types = &tables.symbol_types;
    if !types.is_empty() && !types.has_column("category") {
        log_warning("symbol_types has no category column; category flags will be empty");
    }

    types
        .rows
        .iter()
        .filter_map(|row| {
            let symbol_type = row.text("symbol_type")?;
            let category = SymbolCategory::parse(&row.text("category")?)?;
            Some((symbol_type, category))
        })
        .collect()
}

fn group_by_calendar(rows: &[Row]) -> HashMap<String, Vec<&Row>> {
    let mut groups: HashMap<String, Vec<&Row>> = HashMap::new();
    for row in rows {
        if let Some(cal_id) = row.text("cal_id") {
            groups.entry(cal_id).or_default().push(row);
        }
    }
    groups
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small denormalized dataset shared by the generator tests.

    use serde_json::json;

    use crate::models::{Table, TableSet};
    use crate::transform::denormalize::{denormalize, GeoIndex};

    pub fn tables() -> TableSet {
        let gazetteer = Table::from_records(
            "gazetteer",
            vec![
                json!({ "geoid": "G1", "name": "Uppsala", "latitude": 59.86, "longitude": 17.64, "accuracy": "exact" }),
                json!({ "geoid": "D1", "name": "Uppsala stift" }),
                json!({ "geoid": "S1", "name": "Bälinge" }),
            ],
        );
        let inventory = Table::from_records(
            "inventory",
            vec![
                json!({
                    "id": "K1", "cal_label": "NM 1", "institute": "Nordiska museet",
                    "location_id": "G1", "diocese_id": "D1", "socken_id": "S1",
                    "year": "1650", "shape": "stave", "sides": 4,
                    "material_primary": "wood", "material_secondary1": "bone",
                    "row_fest": "1", "solar": "yes", "completed": "yes"
                }),
                json!({
                    "id": "K2", "cal_label": "SHM 2", "institute": "Historiska museet",
                    "location_id": "G404", "diocese_id": "D1",
                    "year": "circa 1600", "shape": "stave", "material_primary": "wood"
                }),
            ],
        );
        let individual = Table::from_records(
            "individual",
            vec![
                json!({ "cal_id": "K1", "month": 1, "day": 6, "fest_canonical_id": "epiphany", "fest": "Trettondagen" }),
                json!({ "cal_id": "K1", "month": 2, "day": 2, "fest_canonical_id": "candlemas" }),
                json!({ "cal_id": "K1", "month": 2, "day": 3, "fest_canonical_id": null }),
                json!({ "cal_id": "K2", "month": 1, "day": 6, "fest_canonical_id": "epiphany" }),
                json!({ "cal_id": "K2", "month": 6, "day": 24, "fest_canonical_id": "midsummer" }),
                json!({ "cal_id": "K2", "month": 6, "day": 25, "fest_canonical_id": "midsummer" }),
            ],
        );
        let symbol_instances = Table::from_records(
            "symbol_instances",
            vec![
                json!({ "symbol_id": "S1", "cal_id": "K1", "symbol_type": "crown", "writing_text": "rex" }),
                json!({ "symbol_id": "S2", "cal_id": "K1", "symbol_type": "cross", "writing_text": null }),
                json!({ "symbol_id": "S3", "cal_id": "K1", "symbol_type": "crown", "writing_text": "rex" }),
                json!({ "symbol_id": "S4", "cal_id": "K1", "symbol_type": "mitten", "writing_text": "ave" }),
            ],
        );
        let symbol_types = Table::from_records(
            "symbol_types",
            vec![
                json!({ "symbol_type": "crown", "category": "royal" }),
                json!({ "symbol_type": "cross", "category": "religious" }),
                json!({ "symbol_type": "mitten", "category": null }),
            ],
        );
        let feast_canonical = Table::from_records(
            "feast_canonical",
            vec![
                json!({ "canonical_id": "epiphany", "canonical_name": "Epiphany" }),
                json!({ "canonical_id": "candlemas", "canonical_name": "Candlemas" }),
            ],
        );

        let index = GeoIndex::build(&gazetteer);
        TableSet {
            inventory: denormalize(inventory, &index),
            individual,
            gazetteer,
            symbol_instances,
            symbol_types,
            feast_canonical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_groups_and_flags() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        assert_eq!(ctx.entries("K1").len(), 3);
        assert_eq!(ctx.symbols("K1").len(), 4);
        assert!(ctx.symbols("K2").is_empty());

        let flags = ctx.flags("K1");
        assert!(flags.has(SymbolCategory::Royal));
        assert!(flags.has(SymbolCategory::Religious));
        assert!(!flags.has(SymbolCategory::Generic));
        assert!(!ctx.flags("K2").any());
    }

    #[test]
    fn test_feast_name_falls_back_to_id() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        assert_eq!(ctx.feast_name("epiphany"), "Epiphany");
        assert_eq!(ctx.feast_name("midsummer"), "midsummer");
    }

    #[test]
    fn test_identified_skips_duplicates() {
        let mut tables = fixtures::tables();
        let duplicate = tables.inventory.rows[0].clone();
        tables.inventory.rows.push(duplicate);
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let ids: Vec<String> = ctx.identified().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["K1", "K2"]);
    }
}
