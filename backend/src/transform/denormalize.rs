//! Attach gazetteer names and coordinates to calendar rows.
//!
//! The gazetteer is normalized: locations, parishes (socken) and dioceses are
//! all `geoid`/`name` pairs. [`GeoIndex`] is built once per run and every
//! lookup goes through it.
//!
//! ```text
//! inventory row                       denormalized row
//! ┌───────────────────────┐          ┌──────────────────────────────┐
//! │ location_id: G12      │          │ + location_name, latitude,   │
//! │ diocese_id:  D3       │   →      │   longitude, precision       │
//! │ socken_id:   S40      │          │ + diocese_name               │
//! └───────────────────────┘          │ + socken                     │
//!                                    └──────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{Row, RowExt, Table};

/// Columns added to every calendar row.
pub const DENORMALIZED_COLUMNS: [&str; 6] = [
    "location_name",
    "latitude",
    "longitude",
    "precision",
    "diocese_name",
    "socken",
];

/// One gazetteer entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<String>,
}

impl Place {
    fn from_row(row: &Row) -> Self {
        Self {
            name: row.text("name"),
            latitude: row.number("latitude"),
            longitude: row.number("longitude"),
            accuracy: row.text("accuracy"),
        }
    }

    /// Both coordinates present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// `geoid` → [`Place`] lookup.
#[derive(Debug, Clone, Default)]
pub struct GeoIndex {
    places: HashMap<String, Place>,
}

impl GeoIndex {
    /// Index a gazetteer table. Rows without a `geoid` are ignored; on
    /// duplicate ids the first row wins.
    pub fn build(gazetteer: &Table) -> Self {
        let mut places = HashMap::with_capacity(gazetteer.len());
        for row in &gazetteer.rows {
            if let Some(geoid) = row.text("geoid") {
                places.entry(geoid).or_insert_with(|| Place::from_row(row));
            }
        }
        Self { places }
    }

    pub fn get(&self, geoid: &str) -> Option<&Place> {
        self.places.get(geoid)
    }

    /// Place referenced by a row's id column.
    pub fn resolve(&self, row: &Row, id_column: &str) -> Option<&Place> {
        row.text(id_column).and_then(|id| self.get(&id))
    }

    /// Name of the place referenced by a row's id column.
    pub fn name_of(&self, row: &Row, id_column: &str) -> Option<String> {
        self.resolve(row, id_column).and_then(|p| p.name.clone())
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Number of places with both coordinates.
    pub fn with_coordinates(&self) -> usize {
        self.places.values().filter(|p| p.coordinates().is_some()).count()
    }
}

/// Add place names and coordinates to one calendar row.
///
/// Absent or unmatched ids give nulls; this never fails.
pub fn denormalize_row(row: &mut Row, index: &GeoIndex) {
    let location = index.resolve(row, "location_id").cloned();
    let diocese_name = index.name_of(row, "diocese_id");
    let socken = index.name_of(row, "socken_id");

    let (name, latitude, longitude, precision) = match location {
        Some(place) => (place.name, place.latitude, place.longitude, place.accuracy),
        None => (None, None, None, None),
    };

    row.insert("location_name".to_string(), json!(name));
    row.insert("latitude".to_string(), json!(latitude));
    row.insert("longitude".to_string(), json!(longitude));
    row.insert("precision".to_string(), json!(precision));
    row.insert("diocese_name".to_string(), json!(diocese_name));
    row.insert("socken".to_string(), json!(socken));
}

/// Denormalize every row of the inventory table.
pub fn denormalize(mut inventory: Table, index: &GeoIndex) -> Table {
    for column in DENORMALIZED_COLUMNS {
        inventory.ensure_column(column);
    }
    for row in &mut inventory.rows {
        denormalize_row(row, index);
    }
    inventory
}

/// Coordinates of a denormalized row, when both are present.
pub fn row_coordinates(row: &Row) -> Option<(f64, f64)> {
    row.number("latitude").zip(row.number("longitude"))
}

/// `true` for a latitude in [-90, 90] and a longitude in [-180, 180].
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// `true` when a denormalized cell carries a value.
pub fn is_resolved(row: &Row, column: &str) -> bool {
    !matches!(row.get(column), None | Some(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gazetteer() -> Table {
        Table::from_records(
            "gazetteer",
            vec![
                json!({ "geoid": "G1", "name": "Uppsala", "latitude": 59.86, "longitude": 17.64, "accuracy": "exact" }),
                json!({ "geoid": "D1", "name": "Uppsala stift", "latitude": null, "longitude": null }),
                json!({ "geoid": "S1", "name": "Bälinge", "latitude": "59.95", "longitude": null }),
            ],
        )
    }

    fn inventory() -> Table {
        Table::from_records(
            "inventory",
            vec![
                json!({ "id": "K1", "location_id": "G1", "diocese_id": "D1", "socken_id": "S1" }),
                json!({ "id": "K2", "location_id": "G404", "diocese_id": null }),
                json!({ "id": "K3" }),
            ],
        )
    }

    #[test]
    fn test_index_counts() {
        let index = GeoIndex::build(&gazetteer());
        assert_eq!(index.len(), 3);
        assert_eq!(index.with_coordinates(), 1);
        assert_eq!(index.get("S1").unwrap().latitude, Some(59.95));
    }

    #[test]
    fn test_resolved_row() {
        let index = GeoIndex::build(&gazetteer());
        let table = denormalize(inventory(), &index);
        let row = &table.rows[0];

        assert_eq!(row["location_name"], json!("Uppsala"));
        assert_eq!(row["latitude"], json!(59.86));
        assert_eq!(row["longitude"], json!(17.64));
        assert_eq!(row["precision"], json!("exact"));
        assert_eq!(row["diocese_name"], json!("Uppsala stift"));
        assert_eq!(row["socken"], json!("Bälinge"));
        assert_eq!(row_coordinates(row), Some((59.86, 17.64)));
    }

    #[test]
    fn test_unmatched_and_absent_ids_give_nulls() {
        let index = GeoIndex::build(&gazetteer());
        let table = denormalize(inventory(), &index);

        for row in &table.rows[1..] {
            for column in DENORMALIZED_COLUMNS {
                assert_eq!(row[column], Value::Null, "{column}");
            }
            assert_eq!(row_coordinates(row), None);
        }
        assert!(table.has_column("socken"));
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(coordinates_in_range(59.86, 17.64));
        assert!(coordinates_in_range(-90.0, 180.0));
        assert!(!coordinates_in_range(95.0, 17.64));
        assert!(!coordinates_in_range(59.86, -180.5));
        assert!(!coordinates_in_range(f64::NAN, 0.0));
    }

    #[test]
    fn test_empty_gazetteer() {
        let index = GeoIndex::build(&Table::empty("gazetteer"));
        assert!(index.is_empty());
        let table = denormalize(inventory(), &index);
        assert!(!is_resolved(&table.rows[0], "location_name"));
    }
}
