//! Taxonomy drift (`spec.md` §4.C) — keyword coverage gaps and orphaned
//! high-frequency tokens relative to a taxonomy.
//!
//! Coverage analysis needs the per-document (categories, tokens) pairs that
//! the aggregator's running totals don't retain, so it replays the corpus
//! (the same shape of input `process`/`process_batch` take) rather than
//! reading off `Aggregator`'s accumulated maps. Orphan detection, by
//! contrast, only needs the DF/category-histogram snapshot already held by
//! the aggregator.

use super::Aggregator;
use crate::taxonomy::Taxonomy;
use ahash::{AHashMap, AHashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct LowCoverage {
    pub category: String,
    pub keyword: String,
    pub coverage: f64,
    pub cat_docs: u64,
    pub missed_docs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orphan {
    pub token: String,
    pub df_percent: f64,
    pub suggested_category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyDriftReport {
    pub low_coverage: Vec<LowCoverage>,
    pub orphans: Vec<Orphan>,
}

/// Coverage pass: replays `docs` (categories, tokens) once, counting, per
/// (category, keyword), how many category-tagged documents actually contain
/// the keyword as a token.
pub fn coverage(
    taxonomy: &Taxonomy,
    docs: impl IntoIterator<Item = (Vec<String>, Vec<String>)>,
    min_coverage: f64,
) -> Vec<LowCoverage> {
    let mut cat_docs: AHashMap<String, u64> = AHashMap::new();
    let mut cat_kw_docs: AHashMap<(String, String), u64> = AHashMap::new();
    let pairs = taxonomy.keyword_pairs();

    for (categories, tokens) in docs {
        let token_set: AHashSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        for cat in &categories {
            *cat_docs.entry(cat.clone()).or_insert(0) += 1;
        }
        for (cat, kw) in &pairs {
            if categories.contains(cat) && token_set.contains(&kw.to_lowercase()) {
                *cat_kw_docs.entry((cat.clone(), kw.clone())).or_insert(0) += 1;
            }
        }
    }

    let mut out = Vec::new();
    for (cat, kw) in pairs {
        let cat_doc_count = cat_docs.get(&cat).copied().unwrap_or(0);
        if cat_doc_count == 0 {
            continue;
        }
        let kw_doc_count = cat_kw_docs.get(&(cat.clone(), kw.clone())).copied().unwrap_or(0);
        let coverage_ratio = kw_doc_count as f64 / cat_doc_count as f64;
        if coverage_ratio < min_coverage {
            out.push(LowCoverage {
                category: cat,
                keyword: kw,
                coverage: coverage_ratio,
                cat_docs: cat_doc_count,
                missed_docs: cat_doc_count - kw_doc_count,
            });
        }
    }
    out
}

/// Orphan pass: every token whose DF share clears `min_orphan_df_share`, is
/// not a taxonomy keyword, and is not a stopword, suggesting the taxonomy
/// category with the greatest overlap with the token's own category
/// distribution.
pub fn orphans(
    aggregator: &Aggregator,
    taxonomy: &Taxonomy,
    stoplist: &AHashSet<String>,
    min_orphan_df_share: f64,
) -> Vec<Orphan> {
    let total = aggregator.total_docs();
    if total == 0 {
        return Vec::new();
    }
    let taxonomy_keywords = taxonomy.all_keywords_lowercase();
    let threshold_df = (min_orphan_df_share * total as f64).ceil() as u64;

    let mut out = Vec::new();
    for token in aggregator.vocab() {
        let df = aggregator.df(&token);
        if df < threshold_df {
            continue;
        }
        if taxonomy_keywords.contains(&token) || stoplist.contains(&token) {
            continue;
        }
        let suggested = suggest_category(aggregator, taxonomy, &token);
        out.push(Orphan {
            token: token.clone(),
            df_percent: aggregator.df_percent(&token),
            suggested_category: suggested,
        });
    }
    out
}

/// The taxonomy category whose own keyword set has the greatest overlap
/// with the orphan token's category distribution, i.e. the category this
/// token's documents most resemble.
fn suggest_category(aggregator: &Aggregator, taxonomy: &Taxonomy, token: &str) -> Option<String> {
    let hist = aggregator.cat_histogram(token)?;
    hist.iter()
        .filter(|(cat, _)| {
            taxonomy.sectors.contains_key(cat.as_str())
                || taxonomy.events.contains_key(cat.as_str())
                || taxonomy.regions.contains_key(cat.as_str())
        })
        .max_by_key(|(_, &count)| count)
        .map(|(cat, _)| cat.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::PmiParams;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn taxonomy() -> Taxonomy {
        let mut sectors = AHashMap::default();
        sectors.insert(
            "energy".to_string(),
            vec!["solar".to_string(), "battery".to_string()],
        );
        Taxonomy {
            sectors,
            events: AHashMap::default(),
            regions: AHashMap::default(),
            entities: AHashMap::default(),
        }
    }

    #[test]
    fn coverage_reports_missed_docs_below_threshold() {
        let tax = taxonomy();
        let docs = vec![
            (vec!["energy".to_string()], toks("solar panels rising")),
            (vec!["energy".to_string()], toks("battery costs falling")),
            (vec!["energy".to_string()], toks("grid demand rising")),
        ];
        let report = coverage(&tax, docs, 0.9);
        let solar = report.iter().find(|r| r.keyword == "solar").unwrap();
        assert_eq!(solar.cat_docs, 3);
        assert_eq!(solar.missed_docs, 2);
        assert!((solar.coverage - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn coverage_empty_for_empty_corpus() {
        let tax = taxonomy();
        let report = coverage(&tax, Vec::<(Vec<String>, Vec<String>)>::new(), 0.5);
        assert!(report.is_empty());
    }

    #[test]
    fn orphans_excludes_taxonomy_keywords_and_stopwords() {
        let mut agg = Aggregator::new(PmiParams::default());
        for _ in 0..10 {
            agg.process(&toks("solar widget"), &["energy".to_string()]);
        }
        let tax = taxonomy();
        let mut stop = AHashSet::new();
        stop.insert("the".to_string());

        let report = orphans(&agg, &tax, &stop, 0.6);
        assert!(report.iter().any(|o| o.token == "widget"));
        assert!(!report.iter().any(|o| o.token == "solar"));
    }

    #[test]
    fn orphan_suggests_category_with_greatest_overlap() {
        let mut agg = Aggregator::new(PmiParams::default());
        for _ in 0..8 {
            agg.process(&toks("widget"), &["energy".to_string()]);
        }
        agg.process(&toks("widget"), &["unrelated".to_string()]);
        let tax = taxonomy();
        let report = orphans(&agg, &tax, &AHashSet::default(), 0.5);
        let widget = report.iter().find(|o| o.token == "widget").unwrap();
        assert_eq!(widget.suggested_category.as_deref(), Some("energy"));
    }
}
