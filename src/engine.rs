//! The orchestrator facade (`spec.md` §4.K) — sequences ingest, search, and
//! autotune across the Store, the tokenize/parse pipeline, the taxonomy, and
//! the inference engine. The only component that holds all the others.

use crate::analytics::DampingConfig;
use crate::autotune::{self, AutotuneOptions, AutotuneReport, StopwordReviewer};
use crate::cancel::CancellationToken;
use crate::card;
use crate::error::Result;
use crate::inference::InferenceEngine;
use crate::models::{Card, Document, DocumentRecord, SearchRequest};
use crate::ranking::{self, RankingWeights};
use crate::signals::{self, Collision, PredictionError, SignalThresholds};
use crate::store::Store;
use crate::taxonomy::Taxonomy;
use crate::token::{DictEntry, Lexicon, Pipeline, PhraseParser, Tokenizer};
use ahash::AHashSet;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Tunables the orchestrator threads through to ranking and signals at search
/// time. PMI itself is a `Store`-side concern (see `Store::get_pmi`) and has
/// no knob here; the autotuner's own `AutotuneOptions` carries the PMI
/// parameters for its offline aggregator pass.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub damping: DampingConfig,
    pub ranking: RankingWeights,
    pub signals: SignalThresholds,
    pub expand_depth: usize,
    pub expand_cap: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            damping: DampingConfig::default(),
            ranking: RankingWeights::default(),
            signals: SignalThresholds::default(),
            expand_depth: 2,
            expand_cap: 50,
        }
    }
}

/// Bundles the ranked cards from a search with the optional self-monitoring
/// signals (`spec.md` §4.J); a card itself carries no signal fields.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub cards: Vec<Card>,
    pub collisions: Vec<Collision>,
    pub prediction_error: Option<PredictionError>,
}

pub struct Engine {
    store: Arc<dyn Store>,
    inference: RwLock<InferenceEngine>,
    pipeline: RwLock<Pipeline>,
    taxonomy: RwLock<Taxonomy>,
    opts: EngineOptions,
}

impl Engine {
    /// Builds the engine and runs an initial [`Engine::rebuild_pipeline`] so
    /// the tokenizer/parser/taxonomy reflect whatever the store already
    /// holds.
    pub fn new(store: Arc<dyn Store>, opts: EngineOptions) -> Result<Self> {
        let engine = Self {
            store,
            inference: RwLock::new(InferenceEngine::new()),
            pipeline: RwLock::new(Pipeline::default()),
            taxonomy: RwLock::new(Taxonomy::new()),
            opts,
        };
        engine.rebuild_pipeline()?;
        Ok(engine)
    }

    /// Refreshes the tokenizer's stoplist, the phrase parser's dictionary,
    /// and the taxonomy from the current `Store` views. Called at
    /// construction and again after `AutoTune` persists new stopwords/rules.
    pub fn rebuild_pipeline(&self) -> Result<()> {
        let stoplist = self.store.stoplist()?;
        let dict = self.store.dict()?;
        let taxonomy = self.store.taxonomy()?;

        let tokenizer = Tokenizer::with_stopwords(stoplist.clone());
        let parser = PhraseParser::from_dict(&dict);
        *self.pipeline.write() = Pipeline::new(tokenizer, parser);
        *self.taxonomy.write() = taxonomy;

        info!(
            stoplist_size = stoplist.len(),
            dict_size = dict.len(),
            "rebuilt pipeline from store views"
        );
        Ok(())
    }

    /// Attaches a synonym-variant lexicon to the tokenizer without disturbing
    /// the rest of the pipeline.
    pub fn set_lexicon(&self, lexicon: Lexicon) {
        let mut pipeline = self.pipeline.write();
        pipeline.tokenizer.set_lexicon(lexicon);
    }

    /// Loads a symbolic rule file's facts directly into the inference engine.
    pub fn load_rules(&self, facts: &[(String, String, String)]) {
        let mut inference = self.inference.write();
        for (relation, subject, object) in facts {
            inference.assert_fact(relation, subject, object);
        }
    }

    /// `Ingest(doc)`: fetch the prior doc by URL, run the pipeline, upsert the
    /// new doc, and emit the decrement+increment statistics sequence so a
    /// re-ingested URL's old contribution is fully retracted first.
    pub fn ingest(&self, record: DocumentRecord) -> Result<Document> {
        record.validate()?;

        let prior = self.store.get_doc_by_url(&record.url)?;
        let pipeline = self.pipeline.read();
        let taxonomy = self.taxonomy.read();
        let tokens = pipeline.process(&record.body_text);

        let mut categories: Vec<String> = record.source_cats.clone();
        for cat in taxonomy.assign_categories(&tokens) {
            if !categories.contains(&cat) {
                categories.push(cat);
            }
        }
        let entities = taxonomy
            .extract_entities(&record.body_text)
            .into_iter()
            .map(|(entity_type, value)| crate::models::Entity { entity_type, value })
            .collect();

        let doc = Document {
            id: prior.as_ref().map(|d| d.id).unwrap_or(0),
            url: record.url.clone(),
            title: record.title,
            outlet: record.outlet,
            published_at: record.published_at,
            links_out: prior.as_ref().map(|d| d.links_out).unwrap_or(0),
            categories,
            entities,
            tokens,
        };

        let id = self.store.upsert_doc(doc.clone())?;

        if let Some(prior) = &prior {
            self.retract_stats(&prior.tokens)?;
        }
        self.apply_stats(&doc.tokens)?;

        Ok(Document { id, ..doc })
    }

    /// Decrements DF and pair counts for every token `tokens` would have
    /// contributed, mirroring `Aggregator::unprocess`'s per-document logic
    /// but against the `Store` rather than an in-process aggregator.
    fn retract_stats(&self, tokens: &[String]) -> Result<()> {
        let unique = dedup_tokens(tokens);
        for t in &unique {
            let df = self.store.get_token_df(t)?;
            self.store.upsert_token_df(t, df.saturating_sub(1))?;
        }
        let pairs = sorted_pairs(&unique);
        self.store.batch_dec_pairs(&pairs)
    }

    fn apply_stats(&self, tokens: &[String]) -> Result<()> {
        let unique = dedup_tokens(tokens);
        for t in &unique {
            let df = self.store.get_token_df(t)?;
            self.store.upsert_token_df(t, df.saturating_add(1))?;
        }
        let pairs = sorted_pairs(&unique);
        self.store.batch_inc_pairs(&pairs)
    }

    /// `Search(req)`: process the query, expand it through inference, rank
    /// candidates with damping, build one card, and optionally compute the
    /// self-monitoring signals against the same candidate set.
    pub fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let pipeline = self.pipeline.read();
        let query_tokens = pipeline.process(&req.query);
        drop(pipeline);

        let expanded = self
            .inference
            .read()
            .expand_with_depth(&query_tokens, self.opts.expand_depth, self.opts.expand_cap);
        let mut expanded_tokens = query_tokens.clone();
        for (token, _) in &expanded {
            if !expanded_tokens.contains(token) {
                expanded_tokens.push(token.clone());
            }
        }

        let candidates = self
            .store
            .get_docs_by_tokens(&expanded_tokens, 4 * req.top_k.max(1))?;
        let candidate_vocab_size: usize = candidates
            .iter()
            .flat_map(|d| d.tokens.iter())
            .collect::<AHashSet<_>>()
            .len();

        let damping_factors = ranking::token_damping_factors(
            &*self.store,
            &query_tokens,
            &self.opts.damping,
            candidate_vocab_size,
        )?;

        let scored = ranking::retrieve_and_rank(
            &*self.store,
            &expanded_tokens,
            &query_tokens,
            &req.cats,
            &damping_factors,
            &self.opts.ranking,
            req.now,
            req.top_k,
        )?;

        // No candidates retrieved: an empty result set is a normal response,
        // not an error, and must not mint a card (or its monotonic ID) for
        // nothing.
        let cards = if scored.is_empty() {
            Vec::new()
        } else {
            let top_pairs = self.top_query_pairs(&query_tokens)?;
            vec![card::build_card(
                &req.query,
                &scored,
                &query_tokens,
                &expanded_tokens,
                top_pairs,
            )]
        };

        let (collisions, prediction_error) = if req.enable_signals {
            let result_tokens: AHashSet<String> = scored
                .iter()
                .flat_map(|d| d.doc.tokens.iter().cloned())
                .collect();
            let collisions =
                signals::detect_collisions(&*self.store, &query_tokens, &self.opts.signals)?;
            let pred = signals::prediction_error(
                &*self.store,
                &query_tokens,
                &result_tokens,
                &self.opts.signals,
            )?;
            (collisions, Some(pred))
        } else {
            (Vec::new(), None)
        };

        Ok(SearchResponse {
            cards,
            collisions,
            prediction_error,
        })
    }

    /// Top neighbor pairs for each query token, for the card's `top_pairs`
    /// display field.
    fn top_query_pairs(&self, query_tokens: &[String]) -> Result<Vec<(String, String, f64)>> {
        let mut out = Vec::new();
        for token in query_tokens {
            for (neighbor, pmi) in self.store.top_neighbors(token, 3)? {
                out.push((token.clone(), neighbor, pmi));
            }
        }
        Ok(out)
    }

    /// `AutoTune(texts, opts)`: runs the iterative stopword/rule-mining loop,
    /// then refreshes the pipeline from what it persisted.
    pub fn autotune(
        &self,
        texts: &[(String, Vec<String>)],
        opts: &AutotuneOptions,
        reviewer: Option<&dyn StopwordReviewer>,
        cancel: &CancellationToken,
    ) -> Result<AutotuneReport> {
        let base_stops = self.store.stoplist()?;
        let taxonomy = self.taxonomy.read().clone();
        let mut inference = self.inference.write();
        let report = autotune::run_autotune(
            &*self.store,
            &mut inference,
            texts,
            base_stops,
            &taxonomy,
            reviewer,
            opts,
            cancel,
        )?;
        drop(inference);
        self.rebuild_pipeline()?;
        Ok(report)
    }

    /// Seeds the dictionary-backed phrase parser with additional entries,
    /// persisting them through the store so they survive a pipeline rebuild.
    pub fn add_dict_entries(&self, entries: &[DictEntry]) -> Result<()> {
        for entry in entries {
            self.store.upsert_dict_entry(entry.clone())?;
        }
        self.rebuild_pipeline()
    }
}

fn dedup_tokens(tokens: &[String]) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    for t in tokens {
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t.clone());
        }
    }
    out
}

fn sorted_pairs(unique_sorted_source: &[String]) -> Vec<(String, String)> {
    let mut tokens = unique_sorted_source.to_vec();
    tokens.sort_unstable();
    let mut out = Vec::new();
    for i in 0..tokens.len() {
        for j in (i + 1)..tokens.len() {
            out.push((tokens[i].clone(), tokens[j].clone()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    fn record(url: &str, body: &str) -> DocumentRecord {
        DocumentRecord {
            url: url.to_string(),
            title: "Title".to_string(),
            outlet: "Outlet".to_string(),
            published_at: Utc::now(),
            body_text: body.to_string(),
            source_cats: vec![],
        }
    }

    #[test]
    fn ingest_mints_an_id_and_upserts_the_document() {
        let store = Arc::new(MemoryStore::default());
        let engine = Engine::new(store.clone(), EngineOptions::default()).unwrap();
        let doc = engine
            .ingest(record("http://a", "fresh market signal rising"))
            .unwrap();
        assert!(!doc.tokens.is_empty());
        assert_eq!(store.get_doc(doc.id).unwrap().unwrap().url, "http://a");
    }

    #[test]
    fn reingesting_the_same_url_retains_the_same_id() {
        let store = Arc::new(MemoryStore::default());
        let engine = Engine::new(store, EngineOptions::default()).unwrap();
        let first = engine.ingest(record("http://a", "market report")).unwrap();
        let second = engine
            .ingest(record("http://a", "market report updated"))
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn ingest_rejects_a_blank_title() {
        let store = Arc::new(MemoryStore::default());
        let engine = Engine::new(store, EngineOptions::default()).unwrap();
        let mut bad = record("http://a", "body");
        bad.title = "  ".to_string();
        assert!(engine.ingest(bad).is_err());
    }

    #[test]
    fn search_on_an_empty_store_returns_zero_cards_gracefully() {
        let store = Arc::new(MemoryStore::default());
        let engine = Engine::new(store, EngineOptions::default()).unwrap();
        let req = SearchRequest {
            query: "anything".to_string(),
            cats: vec![],
            top_k: 5,
            now: Utc::now(),
            enable_signals: false,
        };
        let response = engine.search(&req).unwrap();
        assert!(response.cards.is_empty());
    }

    #[test]
    fn search_with_signals_enabled_populates_prediction_error() {
        let store = Arc::new(MemoryStore::default());
        let engine = Engine::new(store, EngineOptions::default()).unwrap();
        engine
            .ingest(record("http://a", "market signal rising steadily"))
            .unwrap();
        let req = SearchRequest {
            query: "market".to_string(),
            cats: vec![],
            top_k: 5,
            now: Utc::now(),
            enable_signals: true,
        };
        let response = engine.search(&req).unwrap();
        assert!(response.prediction_error.is_some());
    }
}
