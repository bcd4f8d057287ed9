//! Card builder (`spec.md` §4.H) — assembles a single explainable [`Card`]
//! from a title, ranked documents, and the parsed query.

use crate::models::{Card, Explain, ScoredDoc, SourceRef};
use ahash::AHashSet;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use ulid::Generator;

/// Shared monotonic ID generator: `ulid::Generator` guarantees
/// strictly-increasing IDs for calls within the same millisecond, and ULIDs
/// are lexicographically sortable by construction across milliseconds too.
static ID_GENERATOR: Lazy<Mutex<Generator>> = Lazy::new(|| Mutex::new(Generator::new()));

fn next_card_id() -> String {
    ID_GENERATOR
        .lock()
        .generate()
        .expect("monotonic ULID generation does not exhaust within a process lifetime")
        .to_string()
}

/// Builds a card from `title`, the ranked `docs`, the original `query_tokens`
/// and their inference-expanded form, and optional top-pair annotations for
/// display.
pub fn build_card(
    title: &str,
    docs: &[ScoredDoc],
    query_tokens: &[String],
    expanded_tokens: &[String],
    top_pairs: Vec<(String, String, f64)>,
) -> Card {
    let bullets: Vec<String> = docs.iter().map(|d| d.doc.title.clone()).collect();
    let sources: Vec<SourceRef> = docs
        .iter()
        .map(|d| SourceRef {
            url: d.doc.url.clone(),
            published_at: d.doc.published_at,
        })
        .collect();

    let score_breakdown = mean_breakdown(docs);

    let doc_token_union: AHashSet<&str> = docs
        .iter()
        .flat_map(|d| d.doc.tokens.iter().map(|t| t.as_str()))
        .collect();
    let matched_tokens: Vec<String> = query_tokens
        .iter()
        .filter(|t| doc_token_union.contains(t.as_str()))
        .cloned()
        .collect();

    let category_overlap = docs
        .first()
        .and_then(|d| d.breakdown.get("cats"))
        .copied()
        .unwrap_or(0.0);

    Card {
        id: next_card_id(),
        title: title.to_string(),
        bullets,
        sources,
        score_breakdown,
        explain: Explain {
            query_tokens: query_tokens.to_vec(),
            expanded_tokens: expanded_tokens.to_vec(),
            matched_tokens,
            category_overlap,
            top_pairs,
        },
    }
}

/// Component-wise mean of each contributing doc's score breakdown.
fn mean_breakdown(docs: &[ScoredDoc]) -> BTreeMap<String, f64> {
    if docs.is_empty() {
        return BTreeMap::new();
    }
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for doc in docs {
        for (key, value) in &doc.breakdown {
            *sums.entry(key.clone()).or_insert(0.0) += value;
        }
    }
    let n = docs.len() as f64;
    sums.into_iter().map(|(k, v)| (k, v / n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn scored(title: &str, tokens: &[&str], pmi: f64, cats: f64) -> ScoredDoc {
        let mut breakdown = BTreeMap::new();
        breakdown.insert("pmi".to_string(), pmi);
        breakdown.insert("cats".to_string(), cats);
        ScoredDoc {
            doc: Document {
                id: 1,
                url: format!("http://{title}"),
                title: title.to_string(),
                outlet: "outlet".to_string(),
                published_at: chrono::Utc::now(),
                links_out: 0,
                categories: vec![],
                entities: vec![],
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
            },
            total: pmi + cats,
            breakdown,
        }
    }

    #[test]
    fn card_ids_are_strictly_increasing() {
        let a = next_card_id();
        let b = next_card_id();
        assert!(b > a);
    }

    #[test]
    fn bullets_and_sources_mirror_docs() {
        let docs = vec![scored("first", &["alpha"], 1.0, 1.0)];
        let card = build_card("Title", &docs, &["alpha".to_string()], &[], vec![]);
        assert_eq!(card.bullets, vec!["first".to_string()]);
        assert_eq!(card.sources.len(), 1);
        assert_eq!(card.sources[0].url, "http://first");
    }

    #[test]
    fn score_breakdown_is_componentwise_mean() {
        let docs = vec![scored("a", &["x"], 1.0, 0.0), scored("b", &["y"], 3.0, 2.0)];
        let card = build_card("T", &docs, &[], &[], vec![]);
        assert_eq!(card.score_breakdown.get("pmi").copied(), Some(2.0));
        assert_eq!(card.score_breakdown.get("cats").copied(), Some(1.0));
    }

    #[test]
    fn matched_tokens_is_intersection_with_doc_token_union() {
        let docs = vec![scored("a", &["alpha", "beta"], 1.0, 1.0)];
        let query = vec!["alpha".to_string(), "gamma".to_string()];
        let card = build_card("T", &docs, &query, &[], vec![]);
        assert_eq!(card.explain.matched_tokens, vec!["alpha".to_string()]);
    }

    #[test]
    fn empty_docs_produce_empty_breakdown_and_bullets() {
        let card = build_card("T", &[], &[], &[], vec![]);
        assert!(card.bullets.is_empty());
        assert!(card.score_breakdown.is_empty());
    }
}
