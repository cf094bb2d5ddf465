//! Per-calendar detail payloads and embed/external partitioning.
//!
//! Each payload is serialized compactly and measured in bytes. Payloads
//! larger than the threshold are written to `calendars/<id>.json`; the rest
//! are inlined by the page renderer. The boundary is strictly greater-than:
//! a payload of exactly the threshold size stays inline.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::OutputResult;
use crate::logs::log_warning;
use crate::models::{CategoryFlags, Row, RowExt};
use crate::transform::denormalize::{is_resolved, DENORMALIZED_COLUMNS};
use crate::transform::writer::is_safe_file_stem;

use super::DatasetContext;

/// Distinct inscribed texts kept per calendar.
pub const MAX_WRITING_TEXTS: usize = 25;

/// Default embed threshold in KB.
pub const DEFAULT_EMBED_THRESHOLD_KB: usize = 30;

/// Decides whether a payload is embedded or written to a side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbedPolicy {
    pub threshold_bytes: usize,
}

impl EmbedPolicy {
    pub fn from_kb(kb: usize) -> Self {
        Self {
            threshold_bytes: kb.saturating_mul(1024),
        }
    }

    /// `true` when a payload of `size_bytes` must be written to its own file.
    pub fn is_external(&self, size_bytes: usize) -> bool {
        size_bytes > self.threshold_bytes
    }
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        Self::from_kb(DEFAULT_EMBED_THRESHOLD_KB)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    /// Instance count per symbol type
    pub by_type: BTreeMap<String, usize>,
    pub by_category: CategoryFlags,
    pub writing_texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInfo {
    pub location_name: Option<String>,
    pub diocese_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Everything the detail page shows for one calendar.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarPayload {
    pub inventory: Row,
    pub individual: Vec<Row>,
    pub symbols: SymbolSummary,
    /// `null` when the calendar's location does not resolve
    pub location: Option<LocationInfo>,
}

impl CalendarPayload {
    pub fn build(ctx: &DatasetContext<'_>, cal_id: &str, row: &Row) -> Self {
        let mut inventory = row.clone();
        for column in DENORMALIZED_COLUMNS {
            inventory.remove(column);
        }

        let symbols = ctx.symbols(cal_id);
        let mut by_type = BTreeMap::new();
        for symbol_type in symbols.iter().filter_map(|s| s.text("symbol_type")) {
            *by_type.entry(symbol_type).or_insert(0) += 1;
        }

        let mut seen = HashSet::new();
        let writing_texts = symbols
            .iter()
            .filter_map(|s| s.text("writing_text"))
            .filter(|text| seen.insert(text.clone()))
            .take(MAX_WRITING_TEXTS)
            .collect();

        let location = is_resolved(row, "location_name").then(|| LocationInfo {
            location_name: row.text("location_name"),
            diocese_name: row.text("diocese_name"),
            latitude: row.number("latitude"),
            longitude: row.number("longitude"),
        });

        Self {
            inventory,
            individual: ctx.entries(cal_id).iter().map(|e| (*e).clone()).collect(),
            symbols: SymbolSummary {
                by_type,
                by_category: ctx.flags(cal_id),
                writing_texts,
            },
            location,
        }
    }
}

/// A serialized payload and its placement.
#[derive(Debug, Clone)]
pub struct PreparedPayload {
    pub cal_id: String,
    /// Compact JSON
    pub json: String,
    pub external: bool,
}

impl PreparedPayload {
    pub fn size_bytes(&self) -> usize {
        self.json.len()
    }
}

/// Index entry written to `calendar_index.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub size_bytes: usize,
    pub size_kb: f64,
    pub external: bool,
}

/// Calendar id → placement of its payload.
pub type CalendarIndex = BTreeMap<String, IndexEntry>;

/// Serialize and measure a payload.
pub fn prepare_payload(
    cal_id: &str,
    payload: &CalendarPayload,
    policy: EmbedPolicy,
) -> OutputResult<PreparedPayload> {
    let json = serde_json::to_string(payload)?;
    let external = policy.is_external(json.len());
    Ok(PreparedPayload {
        cal_id: cal_id.to_string(),
        json,
        external,
    })
}

/// Build, serialize and partition every calendar's payload.
///
/// Calendars whose id cannot name a payload file are skipped with a warning.
pub fn generate_payloads(
    ctx: &DatasetContext<'_>,
    policy: EmbedPolicy,
) -> OutputResult<Vec<PreparedPayload>> {
    ctx.identified()
        .filter(|(cal_id, _)| {
            let safe = is_safe_file_stem(cal_id);
            if !safe {
                log_warning(format!("{}: id is not a valid file name, no payload", cal_id));
            }
            safe
        })
        .map(|(cal_id, row)| {
            let payload = CalendarPayload::build(ctx, &cal_id, row);
            prepare_payload(&cal_id, &payload, policy)
        })
        .collect()
}

/// Index of every prepared payload.
pub fn build_index(payloads: &[PreparedPayload]) -> CalendarIndex {
    payloads
        .iter()
        .map(|p| {
            let size_bytes = p.size_bytes();
            let entry = IndexEntry {
                size_bytes,
                size_kb: size_bytes as f64 / 1024.0,
                external: p.external,
            };
            (p.cal_id.clone(), entry)
        })
        .collect()
}
