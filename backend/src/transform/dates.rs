//! Year-range heuristics for free-text dating fields.
//!
//! Catalogue dates come in a handful of shapes:
//!
//! ```text
//! "1650"       →  (1650, 1650)
//! "1650-1700"  →  (1650, 1700)
//! "ante 1700"  →  (1600, 1700)   100 years before
//! "post 1650"  →  (1650, 1750)   100 years after
//! anything else → (NaN, NaN)     → Unknown period
//! ```
//!
//! Parsing never fails: unparseable text degrades to an unknown range, which
//! the period classifier maps to the Unknown labels.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::schema::{PeriodBuckets, PeriodLabels};

/// Years added or subtracted for `ante` / `post` dates.
pub const OPEN_RANGE_YEARS: f64 = 100.0;

/// A year range. Both bounds are NaN when the date is unknown.
#[derive(Debug, Clone, Copy)]
pub struct YearRange {
    pub min: f64,
    pub max: f64,
}

impl YearRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn unknown() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn is_known(&self) -> bool {
        !(self.min.is_nan() || self.max.is_nan())
    }

    /// Lower bound, `None` when unknown.
    pub fn min_year(&self) -> Option<f64> {
        self.is_known().then_some(self.min)
    }

    /// Upper bound, `None` when unknown.
    pub fn max_year(&self) -> Option<f64> {
        self.is_known().then_some(self.max)
    }

    pub fn midpoint(&self) -> Option<f64> {
        self.is_known().then(|| (self.min + self.max) / 2.0)
    }
}

impl PartialEq for YearRange {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_known(), other.is_known()) {
            (true, true) => self.min == other.min && self.max == other.max,
            (false, false) => true,
            _ => false,
        }
    }
}

/// Serialized as `{"year_min": .., "year_max": ..}` with nulls when unknown.
impl Serialize for YearRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("YearRange", 2)?;
        state.serialize_field("year_min", &self.min_year())?;
        state.serialize_field("year_max", &self.max_year())?;
        state.end()
    }
}

fn parse_year(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|y| y.is_finite())
}

/// Parse a dating string into a year range.
///
/// Input is trimmed and lower-cased first. `None` and blank text give an
/// unknown range, as does any numeral that fails to parse.
pub fn parse_year_range(text: Option<&str>) -> YearRange {
    let Some(text) = text else {
        return YearRange::unknown();
    };
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return YearRange::unknown();
    }

    let parsed = if let Some(rest) = text.strip_prefix("ante") {
        parse_year(rest).map(|y| YearRange::new(y - OPEN_RANGE_YEARS, y))
    } else if let Some(rest) = text.strip_prefix("post") {
        parse_year(rest).map(|y| YearRange::new(y, y + OPEN_RANGE_YEARS))
    } else if let Some((start, end)) = text.split_once('-') {
        parse_year(start).zip(parse_year(end)).map(|(a, b)| YearRange::new(a, b))
    } else {
        parse_year(&text).map(|y| YearRange::new(y, y))
    };

    parsed.unwrap_or_else(YearRange::unknown)
}

/// Classify a year range by its midpoint.
///
/// Unknown ranges and midpoints outside every bucket get the Unknown labels.
/// Buckets are tried in order; the first that contains the midpoint wins.
pub fn assign_period_bucket(range: YearRange, buckets: &PeriodBuckets) -> &PeriodLabels {
    let Some(midpoint) = range.midpoint() else {
        return buckets.unknown();
    };

    buckets
        .iter()
        .find(|bucket| bucket.contains(midpoint))
        .map(|bucket| &bucket.labels)
        .unwrap_or_else(|| buckets.unknown())
}
