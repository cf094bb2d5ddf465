//! GeoJSON map markers.
//!
//! One Point feature per calendar whose location resolves to both
//! coordinates. Calendars without coordinates are skipped silently; those
//! whose coordinates fall outside the valid ranges are skipped with a warning.

use serde::Serialize;

use crate::logs::log_warning;
use crate::models::{CategoryFlags, Row, RowExt};
use crate::transform::dates::YearRange;
use crate::transform::denormalize::{coordinates_in_range, row_coordinates};

use super::DatasetContext;

/// Precision reported when the gazetteer gives no accuracy.
const UNKNOWN_PRECISION: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Point,
    pub properties: MarkerProperties,
}

/// GeoJSON point; coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: "Point",
            coordinates: [longitude, latitude],
        }
    }
}

/// Fixed property set of a marker. Missing text is the empty string.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerProperties {
    pub cal_id: String,
    pub catalog: String,
    pub institute_id: String,
    pub location_id: String,
    pub location_name: String,
    pub socken: String,
    pub diocese_id: String,
    pub diocese_name: String,
    pub location_precision: String,
    pub year: String,
    #[serde(flatten)]
    pub years: YearRange,
    pub period_bucket_en: String,
    pub period_bucket_sv: String,
    pub material_primary: String,
    pub material_secondary: String,
    pub shape: String,
    pub sides: Option<i64>,
    pub row_fest: String,
    pub solar: String,
    pub completed: String,
    /// Daily entries recorded for the calendar
    pub entry_count: usize,
    /// Daily entries that carry a feast
    pub feast_count: usize,
    pub detail_url_sv: String,
    pub detail_url_en: String,
    #[serde(flatten)]
    pub flags: CategoryFlags,
}

fn has_feast(entry: &Row) -> bool {
    entry.text("fest_canonical_id").is_some() || entry.text("fest").is_some()
}

fn marker_properties(ctx: &DatasetContext<'_>, cal_id: &str, row: &Row) -> MarkerProperties {
    let (years, period) = ctx.dating(row);
    let entries = ctx.entries(cal_id);

    MarkerProperties {
        cal_id: cal_id.to_string(),
        catalog: row.text_or_empty("cal_label"),
        institute_id: row.text_or_empty("institute"),
        location_id: row.text_or_empty("location_id"),
        location_name: row.text_or_empty("location_name"),
        socken: row.text_or_empty("socken"),
        diocese_id: row.text_or_empty("diocese_id"),
        diocese_name: row.text_or_empty("diocese_name"),
        location_precision: row
            .text("precision")
            .unwrap_or_else(|| UNKNOWN_PRECISION.to_string()),
        year: row.text_or_empty("year"),
        years,
        period_bucket_en: period.en.clone(),
        period_bucket_sv: period.sv.clone(),
        material_primary: row.text_or_empty("material_primary"),
        material_secondary: row.text_or_empty("material_secondary1"),
        shape: row.text_or_empty("shape"),
        sides: row.integer("sides"),
        row_fest: row.text_or_empty("row_fest"),
        solar: row.text_or_empty("solar"),
        completed: row.text_or_empty("completed"),
        entry_count: entries.len(),
        feast_count: entries.iter().filter(|e| has_feast(e)).count(),
        detail_url_sv: format!("/kalendrar/{}.html", cal_id),
        detail_url_en: format!("/en/calendars/{}.html", cal_id),
        flags: ctx.flags(cal_id),
    }
}

/// Build the marker collection.
pub fn generate_markers(ctx: &DatasetContext<'_>) -> FeatureCollection {
    let features = ctx
        .identified()
        .filter_map(|(cal_id, row)| {
            let (latitude, longitude) = row_coordinates(row)?;
            if !coordinates_in_range(latitude, longitude) {
                log_warning(format!(
                    "{}: coordinates ({}, {}) out of range, no marker",
                    cal_id, latitude, longitude
                ));
                return None;
            }
            Some(Feature {
                kind: "Feature",
                geometry: Point::new(latitude, longitude),
                properties: marker_properties(ctx, &cal_id, row),
            })
        })
        .collect();

    FeatureCollection::new(features)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::schema::PeriodBuckets;
    use crate::validation::output::validate_markers;
    use serde_json::json;

    #[test]
    fn test_only_calendars_with_coordinates() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let markers = generate_markers(&ctx);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers.features[0].properties.cal_id, "K1");
    }

    #[test]
    fn test_out_of_range_coordinates_skipped() {
        let mut tables = fixtures::tables();
        tables.inventory.rows[0].insert("latitude".into(), json!(95.0));
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let markers = generate_markers(&ctx);
        assert!(markers.is_empty());
        assert!(validate_markers(&serde_json::to_value(&markers).unwrap()).is_ok());
    }

    #[test]
    fn test_marker_properties() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let value = serde_json::to_value(generate_markers(&ctx)).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["coordinates"], json!([17.64, 59.86]));

        let props = &feature["properties"];
        assert_eq!(props["catalog"], json!("NM 1"));
        assert_eq!(props["location_name"], json!("Uppsala"));
        assert_eq!(props["socken"], json!("Bälinge"));
        assert_eq!(props["diocese_name"], json!("Uppsala stift"));
        assert_eq!(props["location_precision"], json!("exact"));
        assert_eq!(props["year_min"], json!(1650.0));
        assert_eq!(props["period_bucket_en"], json!("17th century"));
        assert_eq!(props["period_bucket_sv"], json!("1600-talet"));
        assert_eq!(props["material_secondary"], json!("bone"));
        assert_eq!(props["sides"], json!(4));
        assert_eq!(props["entry_count"], json!(3));
        assert_eq!(props["feast_count"], json!(2));
        assert_eq!(props["detail_url_en"], json!("/en/calendars/K1.html"));
        assert_eq!(props["has_royal"], json!(true));
        assert_eq!(props["has_religious"], json!(true));
        assert_eq!(props["has_animals"], json!(false));
    }

    #[test]
    fn test_markers_match_output_schema() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let value = serde_json::to_value(generate_markers(&ctx)).unwrap();
        assert!(validate_markers(&value).is_ok());
    }
}
