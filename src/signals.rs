//! Self-monitoring signals (`spec.md` §4.J), computed at search time only
//! when explicitly enabled: collision detection, prediction-error, and the
//! per-token search-time damping factors consumed by ranking (§4.G).

use crate::analytics::DampingConfig;
use crate::error::Result;
use crate::store::Store;
use ahash::AHashSet;

const DEFAULT_MIN_STRENGTH: f64 = 0.3;
const DEFAULT_MAX_JOINT_PMI: f64 = 0.15;
const DEFAULT_MIN_SURPRISE: f64 = 0.1;
const DEFAULT_PREDICTION_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub min_strength: f64,
    pub max_joint_pmi: f64,
    pub min_surprise: f64,
    pub prediction_k: usize,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            min_strength: DEFAULT_MIN_STRENGTH,
            max_joint_pmi: DEFAULT_MAX_JOINT_PMI,
            min_surprise: DEFAULT_MIN_SURPRISE,
            prediction_k: DEFAULT_PREDICTION_K,
        }
    }
}

/// One detected collision: two query tokens whose individual affinity is
/// strong but whose joint PMI is surprisingly low relative to what
/// independence would predict.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub a: String,
    pub b: String,
    pub strength_a: f64,
    pub strength_b: f64,
    pub joint: f64,
    pub expected: f64,
    pub surprise: f64,
}

/// Result of the prediction-error computation: a Jaccard-distance score plus
/// the set differences, for downstream diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionError {
    pub score: f64,
    pub predicted_only: Vec<String>,
    pub actual_only: Vec<String>,
}

/// A token's single strongest neighbor PMI, used as `PMIMax(token)` here.
fn pmi_max(store: &dyn Store, token: &str) -> Result<f64> {
    let neighbors = store.top_neighbors(token, 1)?;
    Ok(neighbors.first().map(|(_, pmi)| *pmi).unwrap_or(0.0))
}

/// For each pair of query tokens whose individual strengths both clear
/// `thresholds.min_strength`: if their joint PMI exceeds `max_joint_pmi`,
/// skip (that's an expected, non-surprising collision). Otherwise emit a
/// [`Collision`] when `surprise >= min_surprise`. Sorted by surprise
/// descending.
pub fn detect_collisions(
    store: &dyn Store,
    query_tokens: &[String],
    thresholds: &SignalThresholds,
) -> Result<Vec<Collision>> {
    let mut strengths = Vec::with_capacity(query_tokens.len());
    for t in query_tokens {
        strengths.push((t.clone(), pmi_max(store, t)?));
    }

    let mut out = Vec::new();
    for i in 0..strengths.len() {
        for j in (i + 1)..strengths.len() {
            let (a, strength_a) = &strengths[i];
            let (b, strength_b) = &strengths[j];
            if *strength_a < thresholds.min_strength || *strength_b < thresholds.min_strength {
                continue;
            }
            let (joint, _) = store.get_pmi(a, b)?;
            if joint > thresholds.max_joint_pmi {
                continue;
            }
            let expected = (strength_a * strength_b).sqrt() * 0.5;
            let surprise = (expected - joint).max(0.0);
            if surprise >= thresholds.min_surprise {
                out.push(Collision {
                    a: a.clone(),
                    b: b.clone(),
                    strength_a: *strength_a,
                    strength_b: *strength_b,
                    joint,
                    expected,
                    surprise,
                });
            }
        }
    }
    out.sort_by(|x, y| y.surprise.partial_cmp(&x.surprise).unwrap_or(std::cmp::Ordering::Equal));
    Ok(out)
}

/// `predicted` = union of each query token's top-K neighbors (query tokens
/// themselves removed); `actual` = result tokens (union across retrieved
/// docs, query tokens excluded). Score = Jaccard distance between the two.
pub fn prediction_error(
    store: &dyn Store,
    query_tokens: &[String],
    result_tokens: &AHashSet<String>,
    thresholds: &SignalThresholds,
) -> Result<PredictionError> {
    let query_set: AHashSet<&str> = query_tokens.iter().map(|t| t.as_str()).collect();

    let mut predicted: AHashSet<String> = AHashSet::new();
    for t in query_tokens {
        for (neighbor, _) in store.top_neighbors(t, thresholds.prediction_k)? {
            if !query_set.contains(neighbor.as_str()) {
                predicted.insert(neighbor);
            }
        }
    }

    let actual: AHashSet<String> = result_tokens
        .iter()
        .filter(|t| !query_set.contains(t.as_str()))
        .cloned()
        .collect();

    let intersection = predicted.intersection(&actual).count();
    let union = predicted.union(&actual).count();
    let score = if union == 0 {
        0.0
    } else {
        1.0 - (intersection as f64 / union as f64)
    };

    let predicted_only: Vec<String> = predicted.difference(&actual).cloned().collect();
    let actual_only: Vec<String> = actual.difference(&predicted).cloned().collect();

    Ok(PredictionError {
        score,
        predicted_only,
        actual_only,
    })
}

/// Per-query-token damping factor for search-time PMI weighting: neighbor
/// count from `TopNeighbors`, vocab size approximated from the unique
/// tokens across the retrieved candidate set.
pub fn token_damping(
    store: &dyn Store,
    query_tokens: &[String],
    candidate_vocab_size: usize,
    damping: &DampingConfig,
) -> Result<ahash::AHashMap<String, f64>> {
    let mut out = ahash::AHashMap::new();
    for t in query_tokens {
        let neighbor_count = store.top_neighbors(t, usize::MAX)?.len();
        out.insert(t.clone(), damping.factor(neighbor_count, candidate_vocab_size));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn store_with_pairs() -> MemoryStore {
        let store = MemoryStore::default();
        for t in ["a", "b", "c"] {
            store.upsert_token_df(t, 10).unwrap();
        }
        for _ in 0..10 {
            store
                .upsert_doc(crate::models::Document {
                    id: 0,
                    url: format!("u{}", rand_suffix()),
                    title: "t".to_string(),
                    outlet: "o".to_string(),
                    published_at: chrono::Utc::now(),
                    links_out: 0,
                    categories: vec![],
                    entities: vec![],
                    tokens: vec!["a".to_string()],
                })
                .unwrap();
        }
        store.inc_pair("a", "b").unwrap();
        store.inc_pair("a", "c").unwrap();
        store
    }

    // Keeps test doc URLs unique without relying on disallowed time/random
    // sources inside library code; fine for a counter scoped to one test.
    fn rand_suffix() -> u32 {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    #[test]
    fn no_collision_when_joint_pmi_clears_the_cap() {
        let store = store_with_pairs();
        store.inc_pair("b", "c").unwrap();
        // A max_joint_pmi cap below any real PMI value forces every pair to
        // be treated as an expected (non-surprising) co-occurrence.
        let thresholds = SignalThresholds {
            min_strength: -10.0,
            max_joint_pmi: -10.0,
            ..SignalThresholds::default()
        };
        let collisions = detect_collisions(&store, &["b".to_string(), "c".to_string()], &thresholds).unwrap();
        assert!(collisions.is_empty());
    }

    #[test]
    fn collision_emitted_when_joint_pmi_is_surprisingly_low() {
        let store = store_with_pairs();
        // "b" and "c" are each strongly tied to "a" but never co-occur with
        // each other, so their joint PMI is the degenerate 0.0.
        let thresholds = SignalThresholds {
            min_strength: -10.0,
            max_joint_pmi: 0.15,
            min_surprise: -10.0,
            ..SignalThresholds::default()
        };
        let collisions = detect_collisions(&store, &["b".to_string(), "c".to_string()], &thresholds).unwrap();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].joint, 0.0);
    }

    #[test]
    fn prediction_error_zero_when_predicted_equals_actual() {
        let store = store_with_pairs();
        let actual: AHashSet<String> = ["b".to_string(), "c".to_string()].into_iter().collect();
        let thresholds = SignalThresholds::default();
        let result = prediction_error(&store, &["a".to_string()], &actual, &thresholds).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn prediction_error_excludes_query_tokens_from_both_sides() {
        let store = store_with_pairs();
        let actual: AHashSet<String> = ["a".to_string()].into_iter().collect();
        let thresholds = SignalThresholds::default();
        let result = prediction_error(&store, &["a".to_string()], &actual, &thresholds).unwrap();
        // actual, after excluding the query token "a", is empty; predicted
        // (b, c) is nonempty, so they're maximally different.
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn unknown_token_damping_defaults_to_identity() {
        let store = MemoryStore::default();
        let damping = DampingConfig::default();
        let out = token_damping(&store, &["ghost".to_string()], 50, &damping).unwrap();
        assert_eq!(out.get("ghost").copied(), Some(1.0));
    }
}
