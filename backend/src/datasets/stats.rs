//! Global statistics for the charts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::RowExt;
use crate::schema::SymbolCategory;

use super::DatasetContext;

pub type Counts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub total_calendars: usize,
    pub by_period_en: Counts,
    pub by_period_sv: Counts,
    pub by_diocese: Counts,
    pub by_material: Counts,
    pub by_shape: Counts,
    /// Calendars with at least one symbol of each category
    pub by_symbol_category: Counts,
}

fn bump(counts: &mut Counts, key: Option<String>) {
    if let Some(key) = key {
        *counts.entry(key).or_insert(0) += 1;
    }
}

/// Count every calendar row, located or not.
pub fn generate_stats(ctx: &DatasetContext<'_>) -> Stats {
    let mut stats = Stats {
        total_calendars: ctx.calendars.len(),
        by_symbol_category: SymbolCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 0))
            .collect(),
        ..Stats::default()
    };

    for row in ctx.calendars {
        let (_, period) = ctx.dating(row);
        bump(&mut stats.by_period_en, Some(period.en.clone()));
        bump(&mut stats.by_period_sv, Some(period.sv.clone()));
        bump(&mut stats.by_diocese, row.text("diocese_name"));
        bump(&mut stats.by_material, row.text("material_primary"));
        bump(&mut stats.by_shape, row.text("shape"));
    }

    for (cal_id, _) in ctx.identified() {
        for category in ctx.flags(&cal_id).present() {
            bump(&mut stats.by_symbol_category, Some(category.as_str().to_string()));
        }
    }

    stats
}
