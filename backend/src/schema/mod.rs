//! Schema registry for the Runestaves input tables.
//!
//! Every input table is described by a [`TableSchema`]: an ordered list of
//! [`FieldSpec`] constraint descriptors (declared type, nullability, uniqueness,
//! optional value check). One generic routine in [`crate::validation`] evaluates
//! them; no table has hand-written validation logic.
//!
//! The registry also owns the two fixed lookup tables used by the generators:
//!
//! - [`SymbolCategory`] - the closed set of symbol classification categories
//! - [`PeriodBuckets`] - ordered date-range buckets with an "Unknown" catch-all
//!
//! Schemas are intentionally non-exhaustive: columns that are not declared
//! are passed through unchanged.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Tables
// =============================================================================

/// The input tables of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Artifact (calendar) records
    Inventory,
    /// Daily entries
    Individual,
    /// Geographic names and coordinates
    Gazetteer,
    /// Inscribed symbol marks
    SymbolInstances,
    /// Symbol type -> category lookup
    SymbolTypes,
    /// Canonical feast lookup
    FeastCanonical,
}

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Inventory,
        TableKind::Individual,
        TableKind::Gazetteer,
        TableKind::SymbolInstances,
        TableKind::SymbolTypes,
        TableKind::FeastCanonical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Individual => "individual",
            Self::Gazetteer => "gazetteer",
            Self::SymbolInstances => "symbol_instances",
            Self::SymbolTypes => "symbol_types",
            Self::FeastCanonical => "feast_canonical",
        }
    }

    /// Location of the TSV file relative to the data directory.
    pub fn relative_path(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory.tsv",
            Self::Individual => "individual.tsv",
            Self::Gazetteer => "gazetteer.tsv",
            Self::SymbolInstances => "generated/symbol_instances.tsv",
            Self::SymbolTypes => "lookups/symbol_types.tsv",
            Self::FeastCanonical => "lookups/feast_canonical.tsv",
        }
    }

    /// Lookup tables may be absent; the generators then run without them.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::SymbolTypes | Self::FeastCanonical)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

// =============================================================================
// Field constraints
// =============================================================================

/// Declared type of a field. All cells are loaded as text and coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Int,
    Float,
    Bool,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
        };
        f.write_str(name)
    }
}

/// Value check applied to a successfully coerced, non-null cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// Inclusive numeric range
    InRange { min: f64, max: f64 },
    /// Exact membership in a fixed set of strings
    OneOf { values: &'static [&'static str] },
}

impl Check {
    pub fn passes(&self, value: &Value) -> bool {
        match self {
            Check::InRange { min, max } => value
                .as_f64()
                .map(|v| *min <= v && v <= *max)
                .unwrap_or(false),
            Check::OneOf { values } => value
                .as_str()
                .map(|s| values.contains(&s))
                .unwrap_or(false),
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::InRange { min, max } => write!(f, "in range [{}, {}]", min, max),
            Check::OneOf { values } => write!(f, "one of {{{}}}", values.join(", ")),
        }
    }
}

/// Constraint descriptor for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<Check>,
}

impl FieldSpec {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: true,
            unique: false,
            check: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn in_range(mut self, min: f64, max: f64) -> Self {
        self.check = Some(Check::InRange { min, max });
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.check = Some(Check::OneOf { values });
        self
    }
}

/// Ordered field constraints for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub table: TableKind,
    pub fields: Vec<FieldSpec>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Accepted values of the gazetteer `accuracy` column.
pub const ACCURACY_VALUES: &[&str] = &["exact", "estimated", "unknown"];

fn inventory_schema() -> TableSchema {
    TableSchema {
        table: TableKind::Inventory,
        fields: vec![
            FieldSpec::text("id").required().unique(),
            FieldSpec::text("cal_label").required(),
            // Provenance
            FieldSpec::text("institute"),
            FieldSpec::text("location_id"),
            FieldSpec::text("diocese_id"),
            FieldSpec::text("socken_id"),
            FieldSpec::bool("location_estimate"),
            FieldSpec::bool("socken_estimate"),
            FieldSpec::bool("diocese_estimate"),
            // Physical
            FieldSpec::text("shape"),
            FieldSpec::int("sides").in_range(1.0, 8.0),
            FieldSpec::text("material_primary"),
            FieldSpec::text("material_secondary1"),
            FieldSpec::text("material_secondary2"),
            // Dating
            FieldSpec::text("year"),
            FieldSpec::bool("year_estimate"),
            // Notation
            FieldSpec::text("solar"),
            FieldSpec::text("solar_a"),
            FieldSpec::text("solar_b"),
            FieldSpec::text("row_fest"),
            // Data quality
            FieldSpec::text("completed"),
            FieldSpec::text("f_corr"),
            FieldSpec::text("damage"),
        ],
    }
}

fn individual_schema() -> TableSchema {
    TableSchema {
        table: TableKind::Individual,
        fields: vec![
            FieldSpec::text("cal_id").required(),
            FieldSpec::int("month").in_range(1.0, 12.0),
            FieldSpec::int("day").in_range(1.0, 31.0),
            FieldSpec::int("day_of_year").in_range(1.0, 366.0),
            FieldSpec::text("fest"),
            FieldSpec::text("fest_canonical_id"),
            FieldSpec::text("fest_canonical"),
            FieldSpec::text("fest_type"),
            FieldSpec::text("golden_number"),
            FieldSpec::text("sunday_letter"),
            FieldSpec::text("rune"),
            FieldSpec::text("fest_mark"),
            FieldSpec::text("notes"),
        ],
    }
}

fn symbol_instances_schema() -> TableSchema {
    TableSchema {
        table: TableKind::SymbolInstances,
        fields: vec![
            FieldSpec::text("symbol_id").required(),
            FieldSpec::text("cal_id").required(),
            FieldSpec::text("original_index"),
            FieldSpec::text("position"),
            FieldSpec::text("presentation"),
            FieldSpec::text("symbol_type"),
            FieldSpec::text("primary_modifier"),
            FieldSpec::text("secondary_modifier"),
            FieldSpec::text("tertiary_modifier"),
            FieldSpec::text("writing_text"),
        ],
    }
}

fn gazetteer_schema() -> TableSchema {
    TableSchema {
        table: TableKind::Gazetteer,
        fields: vec![
            FieldSpec::text("geoid").required().unique(),
            FieldSpec::text("name").required(),
            FieldSpec::text("level"),
            FieldSpec::float("latitude").in_range(-90.0, 90.0),
            FieldSpec::float("longitude").in_range(-180.0, 180.0),
            FieldSpec::text("coord_source"),
            FieldSpec::text("accuracy").one_of(ACCURACY_VALUES),
        ],
    }
}

fn symbol_types_schema() -> TableSchema {
    TableSchema {
        table: TableKind::SymbolTypes,
        fields: vec![
            FieldSpec::text("symbol_type").required().unique(),
            FieldSpec::text("category").one_of(&SymbolCategory::NAMES),
            FieldSpec::text("description"),
            FieldSpec::text("frequency"),
            FieldSpec::text("status"),
        ],
    }
}

fn feast_canonical_schema() -> TableSchema {
    TableSchema {
        table: TableKind::FeastCanonical,
        fields: vec![
            FieldSpec::text("canonical_id").required().unique(),
            FieldSpec::text("canonical_name").required(),
            FieldSpec::text("primary_saint"),
            FieldSpec::text("alternative_saints"),
            FieldSpec::text("vernacular"),
            FieldSpec::text("latin"),
            FieldSpec::text("feast_type"),
            FieldSpec::text("wikidata_id"),
            FieldSpec::text("num_variants"),
        ],
    }
}

// =============================================================================
// Symbol categories
// =============================================================================

/// Fixed classification of symbol types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    Religious,
    Liturgical,
    Royal,
    Agricultural,
    Tools,
    Occupational,
    Drinking,
    Animals,
    Human,
    Plants,
    Geometric,
    NaturalPhenomena,
    Text,
    Notation,
    Generic,
}

impl SymbolCategory {
    pub const COUNT: usize = 15;

    pub const ALL: [SymbolCategory; Self::COUNT] = [
        Self::Religious,
        Self::Liturgical,
        Self::Royal,
        Self::Agricultural,
        Self::Tools,
        Self::Occupational,
        Self::Drinking,
        Self::Animals,
        Self::Human,
        Self::Plants,
        Self::Geometric,
        Self::NaturalPhenomena,
        Self::Text,
        Self::Notation,
        Self::Generic,
    ];

    pub const NAMES: [&'static str; Self::COUNT] = [
        "religious",
        "liturgical",
        "royal",
        "agricultural",
        "tools",
        "occupational",
        "drinking",
        "animals",
        "human",
        "plants",
        "geometric",
        "natural_phenomena",
        "text",
        "notation",
        "generic",
    ];

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[self.index()]
    }

    /// Property name used in flag maps (`has_<category>`).
    pub fn flag_name(&self) -> String {
        format!("has_{}", self.as_str())
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name.trim())
            .map(|i| Self::ALL[i])
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

// =============================================================================
// Period buckets
// =============================================================================

/// English and Swedish label of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodLabels {
    pub en: String,
    pub sv: String,
}

impl PeriodLabels {
    pub fn new(en: impl Into<String>, sv: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            sv: sv.into(),
        }
    }
}

/// One date-range bucket. `range` is `None` for the catch-all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub labels: PeriodLabels,
    pub range: Option<(f64, f64)>,
}

impl PeriodBucket {
    pub fn new(en: &str, sv: &str, min: f64, max: f64) -> Self {
        Self {
            labels: PeriodLabels::new(en, sv),
            range: Some((min, max)),
        }
    }

    pub fn catch_all(en: &str, sv: &str) -> Self {
        Self {
            labels: PeriodLabels::new(en, sv),
            range: None,
        }
    }

    /// Inclusive on both ends. The catch-all contains nothing.
    pub fn contains(&self, year: f64) -> bool {
        match self.range {
            Some((min, max)) => min <= year && year <= max,
            None => false,
        }
    }
}

/// Ordered bucket list, checked at construction to be ascending and disjoint.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodBuckets {
    buckets: Vec<PeriodBucket>,
    unknown: PeriodLabels,
}

impl PeriodBuckets {
    /// Build a bucket list. Numeric buckets must be ascending and must not
    /// overlap; the catch-all (if any) provides the "Unknown" labels.
    pub fn new(buckets: Vec<PeriodBucket>) -> ValidationResult<Self> {
        let mut previous: Option<(f64, f64)> = None;
        let mut unknown = None;

        for bucket in &buckets {
            let Some((min, max)) = bucket.range else {
                if unknown.is_some() {
                    return Err(ValidationError::InvalidBuckets(
                        "more than one catch-all bucket".to_string(),
                    ));
                }
                unknown = Some(bucket.labels.clone());
                continue;
            };

            if !(min.is_finite() && max.is_finite()) || min > max {
                return Err(ValidationError::InvalidBuckets(format!(
                    "'{}' has an invalid range [{}, {}]",
                    bucket.labels.en, min, max
                )));
            }
            if let Some((_, prev_max)) = previous {
                if min <= prev_max {
                    return Err(ValidationError::InvalidBuckets(format!(
                        "'{}' starts at {} which overlaps or precedes the previous bucket ending at {}",
                        bucket.labels.en, min, prev_max
                    )));
                }
            }
            previous = Some((min, max));
        }

        Ok(Self {
            buckets,
            unknown: unknown.unwrap_or_else(|| PeriodLabels::new("Unknown", "Okänt")),
        })
    }

    /// Medieval through 19th century, plus the Unknown catch-all.
    pub fn standard() -> Self {
        Self {
            buckets: vec![
                PeriodBucket::new("Medieval", "Medeltid", 0.0, 1527.0),
                PeriodBucket::new("16th century", "1500-talet", 1528.0, 1600.0),
                PeriodBucket::new("17th century", "1600-talet", 1601.0, 1700.0),
                PeriodBucket::new("18th century", "1700-talet", 1701.0, 1800.0),
                PeriodBucket::new("19th century", "1800-talet", 1801.0, 1900.0),
                PeriodBucket::catch_all("Unknown", "Okänt"),
            ],
            unknown: PeriodLabels::new("Unknown", "Okänt"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodBucket> {
        self.buckets.iter()
    }

    pub fn unknown(&self) -> &PeriodLabels {
        &self.unknown
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All table schemas plus the fixed categories and period buckets.
///
/// Built once per run and passed by reference.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaRegistry {
    schemas: Vec<TableSchema>,
    categories: &'static [SymbolCategory],
    buckets: PeriodBuckets,
}

impl SchemaRegistry {
    pub fn standard() -> Self {
        Self {
            schemas: TableKind::ALL
                .iter()
                .map(|kind| match kind {
                    TableKind::Inventory => inventory_schema(),
                    TableKind::Individual => individual_schema(),
                    TableKind::Gazetteer => gazetteer_schema(),
                    TableKind::SymbolInstances => symbol_instances_schema(),
                    TableKind::SymbolTypes => symbol_types_schema(),
                    TableKind::FeastCanonical => feast_canonical_schema(),
                })
                .collect(),
            categories: &SymbolCategory::ALL,
            buckets: PeriodBuckets::standard(),
        }
    }

    /// Replace the period buckets (validated).
    pub fn with_buckets(mut self, buckets: Vec<PeriodBucket>) -> ValidationResult<Self> {
        self.buckets = PeriodBuckets::new(buckets)?;
        Ok(self)
    }

    pub fn schema(&self, kind: TableKind) -> &TableSchema {
        &self.schemas[kind.index()]
    }

    pub fn buckets(&self) -> &PeriodBuckets {
        &self.buckets
    }

    pub fn categories(&self) -> &'static [SymbolCategory] {
        self.categories
    }

    /// Re-check the bucket table. Run at pipeline start.
    pub fn check(&self) -> ValidationResult<()> {
        PeriodBuckets::new(self.buckets.buckets.clone()).map(|_| ())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
