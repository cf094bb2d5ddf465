//! Compact search documents, one per calendar.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::RowExt;
use crate::transform::dates::YearRange;

use super::DatasetContext;

/// Number of symbol types and feasts kept as search signals.
pub const TOP_SIGNALS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SearchDoc {
    pub cal_id: String,
    pub catalog: Option<String>,
    pub institute_name: Option<String>,
    pub diocese_name: Option<String>,
    pub location_name: Option<String>,
    pub socken: Option<String>,
    #[serde(flatten)]
    pub years: YearRange,
    pub period_bucket_en: String,
    pub period_bucket_sv: String,
    pub signals_symbols: Vec<String>,
    pub signals_feasts: Vec<String>,
}

/// The `n` most frequent values, by descending count.
///
/// Ties keep the order in which values were first encountered.
pub fn top_counts<I>(values: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for value in values {
        match position.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }

    // Stable sort keeps first-encountered order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(n).map(|(value, _)| value).collect()
}

/// Build one document per calendar, including calendars without a location.
pub fn generate_search_docs(ctx: &DatasetContext<'_>) -> Vec<SearchDoc> {
    ctx.identified()
        .map(|(cal_id, row)| {
            let (years, period) = ctx.dating(row);

            let signals_symbols = top_counts(
                ctx.symbols(&cal_id).iter().filter_map(|s| s.text("symbol_type")),
                TOP_SIGNALS,
            );
            let signals_feasts = top_counts(
                ctx.entries(&cal_id)
                    .iter()
                    .filter_map(|e| e.text("fest_canonical_id")),
                TOP_SIGNALS,
            )
            .into_iter()
            .map(|id| ctx.feast_name(&id))
            .collect();

            SearchDoc {
                catalog: row.text("cal_label"),
                institute_name: row.text("institute"),
                diocese_name: row.text("diocese_name"),
                location_name: row.text("location_name"),
                socken: row.text("socken"),
                years,
                period_bucket_en: period.en.clone(),
                period_bucket_sv: period.sv.clone(),
                signals_symbols,
                signals_feasts,
                cal_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::schema::PeriodBuckets;
    use crate::validation::output::validate_search_docs;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_top_counts_orders_by_count_then_first_seen() {
        let values = strings(&["b", "a", "c", "a", "c", "d"]);
        assert_eq!(top_counts(values, 3), strings(&["a", "c", "b"]));
    }

    #[test]
    fn test_top_counts_limit() {
        let values = strings(&["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(top_counts(values, TOP_SIGNALS), strings(&["a", "b", "c", "d", "e"]));
    }

    #[test]
    fn test_every_calendar_gets_a_document() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let docs = generate_search_docs(&ctx);
        assert_eq!(docs.len(), 2);

        let k1 = &docs[0];
        assert_eq!(k1.signals_symbols, strings(&["crown", "cross", "mitten"]));
        assert_eq!(k1.signals_feasts, strings(&["Epiphany", "Candlemas"]));
        assert_eq!(k1.location_name.as_deref(), Some("Uppsala"));

        // Unresolved location and unparseable year still produce a document.
        let k2 = &docs[1];
        assert_eq!(k2.location_name, None);
        assert_eq!(k2.diocese_name.as_deref(), Some("Uppsala stift"));
        assert!(!k2.years.is_known());
        assert_eq!(k2.period_bucket_en, "Unknown");
        assert_eq!(k2.signals_feasts, strings(&["midsummer", "Epiphany"]));
    }

    #[test]
    fn test_search_docs_match_output_schema() {
        let tables = fixtures::tables();
        let buckets = PeriodBuckets::standard();
        let ctx = DatasetContext::build(&tables, &buckets);

        let value = serde_json::to_value(generate_search_docs(&ctx)).unwrap();
        assert!(validate_search_docs(&value).is_ok());
    }
}
