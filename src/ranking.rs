//! Hybrid ranking & retrieval (`spec.md` §4.G).
//!
//! Retrieval pulls candidates from the store by expanded query tokens;
//! scoring blends PMI affinity, category overlap, recency, authority, and a
//! length penalty, then density-damps the PMI term before combining.

use crate::analytics::DampingConfig;
use crate::error::Result;
use crate::models::{DocId, Document, ScoredDoc};
use crate::store::Store;
use ahash::AHashSet;
use std::collections::BTreeMap;

/// Weights for the five scoring components. Field names match the score
/// breakdown keys exposed on a [`crate::models::Card`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub alpha_pmi: f64,
    pub beta_cats: f64,
    pub gamma_recency: f64,
    pub eta_authority: f64,
    pub delta_len: f64,
    pub half_life_days: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            alpha_pmi: 1.0,
            beta_cats: 0.5,
            gamma_recency: 0.5,
            eta_authority: 0.2,
            delta_len: 0.1,
            half_life_days: 30.0,
        }
    }
}

/// Per-token density damping factor, computed at search time from
/// `TopNeighbors` via the §4.C curve (`spec.md` §4.J). Unknown tokens damp
/// to `1.0` (no damping).
pub fn token_damping_factors(
    store: &dyn Store,
    tokens: &[String],
    damping: &DampingConfig,
    vocab_size: usize,
) -> Result<ahash::AHashMap<String, f64>> {
    let mut out = ahash::AHashMap::new();
    for token in tokens {
        let neighbor_count = store.top_neighbors(token, usize::MAX)?.len();
        out.insert(token.clone(), damping.factor(neighbor_count, vocab_size));
    }
    Ok(out)
}

/// `PMI_part(doc) = mean over query tokens qt of (max over doc tokens dt of
/// PMI(qt, dt) * damping(qt))`.
fn pmi_part(
    store: &dyn Store,
    query_tokens: &[String],
    doc_tokens: &AHashSet<String>,
    damping_factors: &ahash::AHashMap<String, f64>,
) -> Result<f64> {
    if query_tokens.is_empty() {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for qt in query_tokens {
        let mut best = f64::MIN;
        for dt in doc_tokens {
            let (pmi, present) = store.get_pmi(qt, dt)?;
            if present && pmi > best {
                best = pmi;
            }
        }
        if best == f64::MIN {
            best = 0.0;
        }
        let damping = damping_factors.get(qt).copied().unwrap_or(1.0);
        sum += best * damping;
    }
    Ok(sum / query_tokens.len() as f64)
}

/// Jaccard similarity over categories; by convention `Jaccard(∅, ∅) = 1`.
fn category_overlap(query_cats: &[String], doc_cats: &[String]) -> f64 {
    if query_cats.is_empty() && doc_cats.is_empty() {
        return 1.0;
    }
    let a: AHashSet<&str> = query_cats.iter().map(|s| s.as_str()).collect();
    let b: AHashSet<&str> = doc_cats.iter().map(|s| s.as_str()).collect();
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

fn recency(doc: &Document, now: chrono::DateTime<chrono::Utc>, half_life_days: f64) -> f64 {
    (-doc.age_days(now) / half_life_days).exp()
}

fn authority(doc: &Document) -> f64 {
    ((doc.links_out as f64) + 1.0).ln()
}

fn len_penalty(doc: &Document) -> f64 {
    ((doc.tokens.len() as f64) + 1.0).ln()
}

/// Scores one document against the expanded query, returning its component
/// breakdown alongside the weighted total.
pub fn score_document(
    store: &dyn Store,
    doc: &Document,
    query_tokens: &[String],
    query_cats: &[String],
    damping_factors: &ahash::AHashMap<String, f64>,
    weights: &RankingWeights,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<ScoredDoc> {
    let doc_token_set: AHashSet<String> = doc.tokens.iter().cloned().collect();
    let pmi = pmi_part(store, query_tokens, &doc_token_set, damping_factors)?;
    let cats = category_overlap(query_cats, &doc.categories);
    let rec = recency(doc, now, weights.half_life_days);
    let auth = authority(doc);
    let len_pen = len_penalty(doc);

    let total = weights.alpha_pmi * pmi + weights.beta_cats * cats + weights.gamma_recency * rec
        - weights.delta_len * len_pen
        + weights.eta_authority * auth;

    let mut breakdown = BTreeMap::new();
    breakdown.insert("pmi".to_string(), pmi);
    breakdown.insert("cats".to_string(), cats);
    breakdown.insert("recency".to_string(), rec);
    breakdown.insert("authority".to_string(), auth);
    breakdown.insert("len".to_string(), len_pen);

    Ok(ScoredDoc {
        doc: doc.clone(),
        total,
        breakdown,
    })
}

/// Retrieves candidates for `expanded_tokens` (capped at `4 * top_k`,
/// deduplicated by doc ID), scores each, sorts descending, and truncates to
/// `top_k`.
#[allow(clippy::too_many_arguments)]
pub fn retrieve_and_rank(
    store: &dyn Store,
    expanded_tokens: &[String],
    query_tokens: &[String],
    query_cats: &[String],
    damping_factors: &ahash::AHashMap<String, f64>,
    weights: &RankingWeights,
    now: chrono::DateTime<chrono::Utc>,
    top_k: usize,
) -> Result<Vec<ScoredDoc>> {
    let candidates = store.get_docs_by_tokens(expanded_tokens, 4 * top_k.max(1))?;
    let mut seen_ids: AHashSet<DocId> = AHashSet::new();
    let mut scored = Vec::with_capacity(candidates.len());
    for doc in candidates {
        if !seen_ids.insert(doc.id) {
            continue;
        }
        scored.push(score_document(
            store,
            &doc,
            query_tokens,
            query_cats,
            damping_factors,
            weights,
            now,
        )?);
    }
    scored.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    Ok(scored)
}
