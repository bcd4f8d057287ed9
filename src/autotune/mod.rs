//! The autotuner (`spec.md` §4.I): iterative stopword discovery, rule
//! mining, and taxonomy drift, run as one orchestrated pass over a corpus.

pub mod rules;
pub mod stopwords;

use crate::analytics::drift::{self, TaxonomyDriftReport};
use crate::analytics::{Aggregator, DampingConfig, PmiParams};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::inference::InferenceEngine;
use crate::store::Store;
use crate::taxonomy::Taxonomy;
use crate::token::{DictEntry, Tokenizer};
use ahash::AHashMap;
use rules::{RuleSuggestion, RuleThresholds};
use stopwords::{StopwordCandidate, StopwordThresholds};
use tracing::{debug, info};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Collaborator that may veto a stopword candidate before it's admitted. A
/// `Some(Err)` abort propagates and discards the whole round's candidates.
pub trait StopwordReviewer: Send + Sync {
    fn review(&self, candidate: &StopwordCandidate) -> Result<bool>;
}

#[derive(Clone)]
pub struct AutotuneOptions {
    pub max_iterations: usize,
    pub window: usize,
    pub damping: DampingConfig,
    pub pmi: PmiParams,
    pub stopword_thresholds: StopwordThresholds,
    pub rule_thresholds: RuleThresholds,
    pub compute_drift: bool,
    pub min_coverage: f64,
    pub min_orphan_df_share: f64,
}

impl Default for AutotuneOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            window: 5,
            damping: DampingConfig::default(),
            pmi: PmiParams::default(),
            stopword_thresholds: StopwordThresholds::default(),
            rule_thresholds: RuleThresholds::default(),
            compute_drift: true,
            min_coverage: 0.3,
            min_orphan_df_share: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutotuneReport {
    pub stops: Vec<String>,
    pub new_stops: Vec<String>,
    pub rules: Vec<RuleSuggestion>,
    pub drift: Option<TaxonomyDriftReport>,
    pub rounds_run: usize,
    pub converged: bool,
}

/// Runs the iterative loop over `(text, categories)` pairs, then persists
/// the final stoplist and mined rules through `store` and `inference`.
/// `base_stops` seeds round 1; may be empty.
pub fn run_autotune(
    store: &dyn Store,
    inference: &mut InferenceEngine,
    texts: &[(String, Vec<String>)],
    base_stops: Vec<String>,
    taxonomy: &Taxonomy,
    reviewer: Option<&dyn StopwordReviewer>,
    opts: &AutotuneOptions,
    cancel: &CancellationToken,
) -> Result<AutotuneReport> {
    let mut stops: Vec<String> = base_stops;
    let mut discovered: Vec<String> = Vec::new();
    let mut aggregator = Aggregator::new(opts.pmi).with_window(opts.window).with_damping(opts.damping);
    let mut tokenized_docs: Vec<(Vec<String>, Vec<String>)> = Vec::new();
    let mut rounds_run = 0;
    let mut converged = false;

    for round in 1..=opts.max_iterations {
        if cancel.is_cancelled() {
            break;
        }
        rounds_run = round;

        if round == 1 {
            let tokenizer = Tokenizer::with_stopwords(stops.clone());
            tokenized_docs = texts
                .iter()
                .map(|(text, cats)| (tokenizer.tokenize(text), cats.clone()))
                .collect();
            aggregator.process_batch(&tokenized_docs);
        }

        let stats = aggregator.compute_all();
        let vocab = aggregator.vocab();
        let df_percent: AHashMap<String, f64> = vocab
            .iter()
            .map(|t| (t.clone(), aggregator.df_percent(t)))
            .collect();
        let cat_entropy: AHashMap<String, f64> = vocab
            .iter()
            .map(|t| (t.clone(), aggregator.cat_entropy(t)))
            .collect();

        let mut candidates =
            stopwords::stopword_candidates(&stats, &df_percent, &cat_entropy, &opts.stopword_thresholds);
        candidates.retain(|c| !stops.contains(&c.token));

        let mut admitted = Vec::new();
        for candidate in candidates {
            let accepted = match reviewer {
                Some(r) => r.review(&candidate)?,
                None => true,
            };
            if accepted {
                admitted.push(candidate.token);
            }
        }

        if admitted.is_empty() {
            converged = true;
            debug!(round, "stopword discovery converged");
            break;
        }

        aggregator.remove_tokens(&admitted);
        discovered.extend(admitted.iter().cloned());
        stops.extend(admitted);
    }

    let new_stops: Vec<String> = discovered;
    store.upsert_stoplist(&stops)?;

    let final_stats = aggregator.compute_all();
    let candidate_pairs =
        aggregator.pairs_above(&final_stats, opts.rule_thresholds.min_pmi, opts.rule_thresholds.min_support);
    let suggestions = rules::mine_rules(&candidate_pairs, &opts.rule_thresholds);
    for rule in &suggestions {
        store.upsert_dict_entry(DictEntry {
            canonical: format!("{} {}", rule.a, rule.b),
            variants: vec![],
            category: None,
        })?;
        inference.assert_fact(&rule.relation, &rule.a, &rule.b);
    }

    let drift_report = if opts.compute_drift {
        let low_coverage = drift::coverage(taxonomy, tokenized_docs.clone(), opts.min_coverage);
        let stop_set: ahash::AHashSet<String> = stops.iter().cloned().collect();
        let orphans = drift::orphans(&aggregator, taxonomy, &stop_set, opts.min_orphan_df_share);
        Some(TaxonomyDriftReport {
            low_coverage,
            orphans,
        })
    } else {
        None
    };

    info!(
        rounds = rounds_run,
        new_stops = new_stops.len(),
        rules = suggestions.len(),
        "autotune pass complete"
    );

    Ok(AutotuneReport {
        stops,
        new_stops,
        rules: suggestions,
        drift: drift_report,
        rounds_run,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn corpus() -> Vec<(String, Vec<String>)> {
        let mut docs = Vec::new();
        for i in 0..15 {
            docs.push((
                format!("the market report shows signal{} rising steadily", i % 3),
                vec!["finance".to_string()],
            ));
        }
        docs
    }

    #[test]
    fn converges_and_persists_a_stoplist() {
        let store = MemoryStore::default();
        let mut inference = InferenceEngine::new();
        let taxonomy = Taxonomy::new();
        let texts = corpus();
        let cancel = CancellationToken::new();
        let report = run_autotune(
            &store,
            &mut inference,
            &texts,
            vec![],
            &taxonomy,
            None,
            &AutotuneOptions::default(),
            &cancel,
        )
        .unwrap();

        assert!(report.rounds_run >= 1);
        let persisted = store.stoplist().unwrap();
        assert_eq!(persisted, report.stops);
    }

    #[test]
    fn new_stops_excludes_preexisting_base_stopwords() {
        let store = MemoryStore::default();
        let mut inference = InferenceEngine::new();
        let taxonomy = Taxonomy::new();
        let texts = corpus();
        let cancel = CancellationToken::new();
        let base_stops = vec!["the".to_string()];
        let report = run_autotune(
            &store,
            &mut inference,
            &texts,
            base_stops.clone(),
            &taxonomy,
            None,
            &AutotuneOptions::default(),
            &cancel,
        )
        .unwrap();

        assert!(report.stops.contains(&"the".to_string()));
        assert!(!report.new_stops.contains(&"the".to_string()));
        for token in &report.new_stops {
            assert!(report.stops.contains(token));
        }
    }

    struct RejectAll;
    impl StopwordReviewer for RejectAll {
        fn review(&self, _candidate: &StopwordCandidate) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn reviewer_rejection_prevents_admission() {
        let store = MemoryStore::default();
        let mut inference = InferenceEngine::new();
        let taxonomy = Taxonomy::new();
        let texts = corpus();
        let cancel = CancellationToken::new();
        let report = run_autotune(
            &store,
            &mut inference,
            &texts,
            vec![],
            &taxonomy,
            Some(&RejectAll),
            &AutotuneOptions::default(),
            &cancel,
        )
        .unwrap();

        assert!(report.stops.is_empty());
        assert_eq!(report.rounds_run, 1);
        assert!(report.converged);
    }

    struct AlwaysError;
    impl StopwordReviewer for AlwaysError {
        fn review(&self, _candidate: &StopwordCandidate) -> Result<bool> {
            Err(crate::error::KorelError::invalid_input("reviewer refused"))
        }
    }

    #[test]
    fn reviewer_error_aborts_the_round() {
        let store = MemoryStore::default();
        let mut inference = InferenceEngine::new();
        let taxonomy = Taxonomy::new();
        let texts = corpus();
        let cancel = CancellationToken::new();
        let result = run_autotune(
            &store,
            &mut inference,
            &texts,
            vec![],
            &taxonomy,
            Some(&AlwaysError),
            &AutotuneOptions::default(),
            &cancel,
        );
        assert!(result.is_err());
        // Nothing should have been persisted on abort.
        assert!(store.stoplist().unwrap().is_empty());
    }

    #[test]
    fn cancellation_stops_before_max_iterations() {
        let store = MemoryStore::default();
        let mut inference = InferenceEngine::new();
        let taxonomy = Taxonomy::new();
        let texts = corpus();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = run_autotune(
            &store,
            &mut inference,
            &texts,
            vec![],
            &taxonomy,
            None,
            &AutotuneOptions::default(),
            &cancel,
        )
        .unwrap();
        assert_eq!(report.rounds_run, 0);
    }
}
