//! Transformation module.
//!
//! This module turns validated tables into derived datasets:
//! - Dates: year-range heuristics and period classification
//! - Denormalize: gazetteer join into the inventory
//! - Writer: JSON output files
//! - Pipeline: main end-to-end pipeline

pub mod dates;
pub mod denormalize;
pub mod pipeline;
pub mod writer;

pub use dates::{assign_period_bucket, parse_year_range, YearRange};
pub use denormalize::{denormalize, GeoIndex, Place};
pub use pipeline::*;
