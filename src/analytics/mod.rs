//! The co-occurrence analytics aggregator (`spec.md` §4.C) — the hardest
//! subsystem in the engine. Streams tokenized documents in, maintains three
//! distinct pair-count maps plus per-token DF and category histograms, and
//! derives PMI/NPMI and density-damped variants on demand.
//!
//! The aggregator is single-writer: one `process` or `process_batch` call
//! runs at a time against `&mut self`. Readers consume either a zero-copy
//! borrowed view (`snapshot_view`) or a detached owned clone (`snapshot`).

pub mod damping;
pub mod drift;
pub mod pairs;
pub mod pmi;

use crate::models::TokenId;
use ahash::AHashMap;
use pairs::{sorted_pair, Interner, OrderedPair, PairCounter, SortedPair};
use rayon::prelude::*;

pub use damping::DampingConfig;
pub use pmi::PmiParams;

const DEFAULT_WINDOW: usize = 5;
const MIN_WINDOW: usize = 2;

/// A single resolved pair statistic produced by [`Aggregator::compute_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct PairStat {
    pub a: String,
    pub b: String,
    pub raw_pmi: f64,
    pub damped_pmi: f64,
    pub support: u64,
}

/// Output of the fused `ComputeAll` pass: each token's max damped PMI across
/// its pairs, plus the full list of scored document-level pairs.
#[derive(Debug, Clone, Default)]
pub struct ComputedStats {
    pub pmi_max: AHashMap<String, f64>,
    pub pairs: Vec<PairStat>,
}

impl ComputedStats {
    /// Builds a `{a,b} -> damped_pmi` lookup for callers (e.g. `top_pairs`)
    /// that need the document-pair PMI for a specific token pair.
    pub fn damped_lookup(&self) -> AHashMap<(String, String), f64> {
        self.pairs
            .iter()
            .map(|p| ((p.a.clone(), p.b.clone()), p.damped_pmi))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    interner: Interner,
    total_docs: u64,
    token_df: AHashMap<TokenId, u64>,
    token_cats: AHashMap<TokenId, AHashMap<String, u64>>,
    doc_pairs: PairCounter<SortedPair>,
    bigrams: PairCounter<OrderedPair>,
    skipgrams: PairCounter<SortedPair>,
    window: usize,
    pmi: PmiParams,
    damping: Option<DampingConfig>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(PmiParams::default())
    }
}

impl Aggregator {
    pub fn new(pmi: PmiParams) -> Self {
        Self {
            interner: Interner::new(),
            total_docs: 0,
            token_df: AHashMap::new(),
            token_cats: AHashMap::new(),
            doc_pairs: PairCounter::new(),
            bigrams: PairCounter::new(),
            skipgrams: PairCounter::new(),
            window: DEFAULT_WINDOW,
            pmi,
            damping: None,
        }
    }

    /// Skip-gram window size; clamped to >= 2.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(MIN_WINDOW);
        self
    }

    pub fn with_damping(mut self, cfg: DampingConfig) -> Self {
        self.damping = Some(cfg);
        self
    }

    pub fn damping(&self) -> Option<DampingConfig> {
        self.damping
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    pub fn df(&self, token: &str) -> u64 {
        self.interner
            .get(token)
            .map(|id| self.token_df.get(&id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn df_percent(&self, token: &str) -> f64 {
        if self.total_docs == 0 {
            return 0.0;
        }
        100.0 * self.df(token) as f64 / self.total_docs as f64
    }

    pub fn cat_histogram(&self, token: &str) -> Option<&AHashMap<String, u64>> {
        let id = self.interner.get(token)?;
        self.token_cats.get(&id)
    }

    /// Shannon entropy of a token's category distribution, normalized to
    /// `[0, 1]` by the log of the number of distinct categories the token has
    /// appeared under. A token with 0 or 1 distinct categories has entropy 0.
    pub fn cat_entropy(&self, token: &str) -> f64 {
        let Some(hist) = self.cat_histogram(token) else {
            return 0.0;
        };
        let total: u64 = hist.values().sum();
        if total == 0 || hist.len() <= 1 {
            return 0.0;
        }
        let total = total as f64;
        let raw_entropy: f64 = hist
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                if p > 0.0 {
                    -p * p.log2()
                } else {
                    0.0
                }
            })
            .sum();
        let max_entropy = (hist.len() as f64).log2();
        if max_entropy == 0.0 {
            0.0
        } else {
            raw_entropy / max_entropy
        }
    }

    /// Every token with DF > 0, in arbitrary order.
    pub fn vocab(&self) -> Vec<String> {
        self.token_df
            .iter()
            .filter(|(_, &df)| df > 0)
            .filter_map(|(&id, _)| self.interner.resolve(id).map(str::to_string))
            .collect()
    }

    pub fn vocab_size(&self) -> usize {
        self.token_df.values().filter(|&&df| df > 0).count()
    }

    /// Zero-copy read-only view. Because this borrows `&self`, it also
    /// enforces the single-writer rule at compile time: no further `process`
    /// call can run while a view is alive.
    pub fn snapshot_view(&self) -> &Aggregator {
        self
    }

    /// A detached, owned copy of the current state, safe to hold across
    /// further mutation of the live aggregator (e.g. across autotune rounds).
    pub fn snapshot(&self) -> Aggregator {
        self.clone()
    }

    /// Interns `token`, returning its ID whether or not it already existed.
    fn intern(&mut self, token: &str) -> TokenId {
        self.interner.intern(token)
    }

    /// Processes a single document: updates DF, category histograms, and all
    /// three pair maps. See `spec.md` §4.C algorithm.
    pub fn process(&mut self, tokens: &[String], categories: &[String]) {
        self.total_docs += 1;

        // Step 2: DF + category histogram over the deduplicated token set.
        let mut seen: AHashMap<&str, TokenId> = AHashMap::new();
        for t in tokens {
            if t.is_empty() || seen.contains_key(t.as_str()) {
                continue;
            }
            let id = self.intern(t);
            seen.insert(t.as_str(), id);
            *self.token_df.entry(id).or_insert(0) += 1;
            let hist = self.token_cats.entry(id).or_default();
            for c in categories {
                *hist.entry(c.clone()).or_insert(0) += 1;
            }
        }

        // Step 3: doc-level pairs over the sorted, deduplicated ID set.
        let mut ids: Vec<TokenId> = seen.values().copied().collect();
        ids.sort_unstable();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                self.doc_pairs.increment(sorted_pair(ids[i], ids[j]));
            }
        }

        // Step 4: adjacent bigrams, in positional order.
        for w in tokens.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if a.is_empty() || b.is_empty() {
                continue;
            }
            let ida = self.intern(a);
            let idb = self.intern(b);
            self.bigrams.increment((ida, idb));
        }

        // Step 5: skip-grams within the configured window, deduplicated per
        // document.
        let mut doc_skipgrams: std::collections::HashSet<SortedPair> =
            std::collections::HashSet::new();
        for i in 0..tokens.len() {
            if tokens[i].is_empty() {
                continue;
            }
            let upper = (i + self.window).min(tokens.len());
            for j in (i + 1)..upper {
                if tokens[j].is_empty() || tokens[j] == tokens[i] {
                    continue;
                }
                let ida = self.intern(&tokens[i]);
                let idb = self.intern(&tokens[j]);
                doc_skipgrams.insert(sorted_pair(ida, idb));
            }
        }
        for pair in doc_skipgrams {
            self.skipgrams.increment(pair);
        }
    }

    /// The exact inverse of `process`: decrements every count `process`
    /// would have incremented for this token/category set, saturating at
    /// zero. Used by the engine facade to retract a document's prior
    /// contribution on re-ingestion (`spec.md` §4.K), since the aggregator's
    /// public surface otherwise only grows via `process`.
    pub fn unprocess(&mut self, tokens: &[String], categories: &[String]) {
        self.total_docs = self.total_docs.saturating_sub(1);

        let mut seen: AHashMap<&str, TokenId> = AHashMap::new();
        for t in tokens {
            if t.is_empty() || seen.contains_key(t.as_str()) {
                continue;
            }
            let Some(id) = self.interner.get(t) else {
                continue;
            };
            seen.insert(t.as_str(), id);
            if let Some(df) = self.token_df.get_mut(&id) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.token_df.remove(&id);
                }
            }
            if let Some(hist) = self.token_cats.get_mut(&id) {
                for c in categories {
                    if let Some(count) = hist.get_mut(c) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            hist.remove(c);
                        }
                    }
                }
                if hist.is_empty() {
                    self.token_cats.remove(&id);
                }
            }
        }

        let mut ids: Vec<TokenId> = seen.values().copied().collect();
        ids.sort_unstable();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                self.doc_pairs.decrement(sorted_pair(ids[i], ids[j]));
            }
        }

        for w in tokens.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if a.is_empty() || b.is_empty() {
                continue;
            }
            if let (Some(ida), Some(idb)) = (self.interner.get(a), self.interner.get(b)) {
                self.bigrams.decrement((ida, idb));
            }
        }

        let mut doc_skipgrams: std::collections::HashSet<SortedPair> =
            std::collections::HashSet::new();
        for i in 0..tokens.len() {
            if tokens[i].is_empty() {
                continue;
            }
            let upper = (i + self.window).min(tokens.len());
            for j in (i + 1)..upper {
                if tokens[j].is_empty() || tokens[j] == tokens[i] {
                    continue;
                }
                if let (Some(ida), Some(idb)) =
                    (self.interner.get(&tokens[i]), self.interner.get(&tokens[j]))
                {
                    doc_skipgrams.insert(sorted_pair(ida, idb));
                }
            }
        }
        for pair in doc_skipgrams {
            self.skipgrams.decrement(pair);
        }
    }

    /// Parallel batch ingestion. Partitions documents evenly across up to
    /// `min(available_parallelism, docs.len())` workers, each with its own
    /// local intern table, and merges results by remapping local IDs through
    /// the (single) global intern table. Falls back to sequential processing
    /// when only one worker would run.
    pub fn process_batch(&mut self, docs: &[(Vec<String>, Vec<String>)]) {
        if docs.is_empty() {
            return;
        }
        let workers = rayon::current_num_threads().min(docs.len()).max(1);
        if workers <= 1 {
            for (tokens, cats) in docs {
                self.process(tokens, cats);
            }
            return;
        }

        let chunk_size = docs.len().div_ceil(workers);
        let partials: Vec<Aggregator> = docs
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut local = Aggregator::new(self.pmi).with_window(self.window);
                for (tokens, cats) in chunk {
                    local.process(tokens, cats);
                }
                local
            })
            .collect();

        for partial in partials {
            self.merge(partial);
        }
    }

    /// Folds a worker's local results into `self`, remapping local token IDs
    /// through the global intern table. Counts are commutative sums, so the
    /// merged result is identical to sequential processing.
    fn merge(&mut self, other: Aggregator) {
        self.total_docs += other.total_docs;

        let remap: AHashMap<TokenId, TokenId> = other
            .interner
            .iter_tokens()
            .map(|(token, local_id)| (local_id, self.intern(token)))
            .collect();

        for (local_id, &df) in &other.token_df {
            let global_id = remap[local_id];
            *self.token_df.entry(global_id).or_insert(0) += df;
        }
        for (local_id, hist) in &other.token_cats {
            let global_id = remap[local_id];
            let entry = self.token_cats.entry(global_id).or_default();
            for (cat, &c) in hist {
                *entry.entry(cat.clone()).or_insert(0) += c;
            }
        }
        for ([a, b], &count) in other.doc_pairs.iter() {
            self.doc_pairs
                .add(sorted_pair(remap[a], remap[b]), count);
        }
        for ((a, b), &count) in other.bigrams.iter() {
            self.bigrams.add((remap[a], remap[b]), count);
        }
        for ([a, b], &count) in other.skipgrams.iter() {
            self.skipgrams
                .add(sorted_pair(remap[a], remap[b]), count);
        }
    }

    /// Prunes every count touching `tokens` in place, without
    /// re-tokenizing the corpus. Used by the stopword autotuner (§4.I) after
    /// a round admits new stopword candidates.
    pub fn remove_tokens(&mut self, tokens: &[String]) {
        for t in tokens {
            let Some(id) = self.interner.get(t) else {
                continue;
            };
            self.token_df.remove(&id);
            self.token_cats.remove(&id);
            self.doc_pairs.retain(|[a, b]| *a != id && *b != id);
            self.bigrams.retain(|(a, b)| *a != id && *b != id);
            self.skipgrams.retain(|[a, b]| *a != id && *b != id);
        }
    }

    /// The fused derivation: a single pass over `doc_pairs` computing raw
    /// PMI and neighbor counts, then a second pass applying damping and
    /// tracking each token's max damped score.
    pub fn compute_all(&self) -> ComputedStats {
        let total = self.total_docs;
        let vocab_size = self.vocab_size();

        // Pass 1: raw scores + neighbor counts.
        let mut raw_scores: Vec<(SortedPair, u64, f64)> = Vec::with_capacity(self.doc_pairs.len());
        let mut neighbor_count: AHashMap<TokenId, usize> = AHashMap::new();
        let threshold = self.damping.map(|d| d.neighbor_threshold).unwrap_or(0.05);
        for (&pair, &count) in self.doc_pairs.iter() {
            let [a, b] = pair;
            let df_a = self.token_df.get(&a).copied().unwrap_or(0);
            let df_b = self.token_df.get(&b).copied().unwrap_or(0);
            let raw = self.pmi.score(count, df_a, df_b, total);
            if raw >= threshold {
                *neighbor_count.entry(a).or_insert(0) += 1;
                *neighbor_count.entry(b).or_insert(0) += 1;
            }
            raw_scores.push((pair, count, raw));
        }

        // Pass 2: damping + PMIMax + resolved pair list.
        let mut pmi_max: AHashMap<TokenId, f64> = AHashMap::new();
        let mut pairs = Vec::with_capacity(raw_scores.len());
        for ([a, b], count, raw) in raw_scores {
            let damped = match self.damping {
                Some(cfg) => {
                    let d_a = cfg.factor(neighbor_count.get(&a).copied().unwrap_or(0), vocab_size);
                    let d_b = cfg.factor(neighbor_count.get(&b).copied().unwrap_or(0), vocab_size);
                    cfg.damp_pair(raw, d_a, d_b)
                }
                None => raw,
            };
            let entry_a = pmi_max.entry(a).or_insert(f64::MIN);
            if damped > *entry_a {
                *entry_a = damped;
            }
            let entry_b = pmi_max.entry(b).or_insert(f64::MIN);
            if damped > *entry_b {
                *entry_b = damped;
            }
            if let (Some(sa), Some(sb)) = (self.interner.resolve(a), self.interner.resolve(b)) {
                pairs.push(PairStat {
                    a: sa.to_string(),
                    b: sb.to_string(),
                    raw_pmi: raw,
                    damped_pmi: damped,
                    support: count,
                });
            }
        }

        let pmi_max = pmi_max
            .into_iter()
            .filter_map(|(id, v)| self.interner.resolve(id).map(|s| (s.to_string(), v)))
            .collect();

        ComputedStats { pmi_max, pairs }
    }

    /// `damping(token, vocab_size)` given a precomputed neighbor count; used
    /// by components outside the aggregator (e.g. search-time signals) that
    /// already know a token's neighbor count via `TopNeighbors`.
    pub fn damping_factor(&self, neighbor_count: usize, vocab_size: usize) -> f64 {
        self.damping
            .unwrap_or_default()
            .factor(neighbor_count, vocab_size)
    }

    /// `PhraseScore(a, b) = BigramCount(a -> b) * damped_pmi_doc({a, b})`.
    pub fn phrase_score(&self, stats: &ComputedStats, a: &str, b: &str) -> f64 {
        let Some(ida) = self.interner.get(a) else {
            return 0.0;
        };
        let Some(idb) = self.interner.get(b) else {
            return 0.0;
        };
        let bigram_count = self.bigrams.get(&(ida, idb));
        if bigram_count == 0 {
            return 0.0;
        }
        let lookup = stats.damped_lookup();
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        let damped = lookup.get(&key).copied().unwrap_or(0.0);
        bigram_count as f64 * damped
    }

    /// Iterates `BigramCounts`, joins with the doc-pair damped PMI, and
    /// returns the top `limit` by phrase score (ties broken by higher
    /// bigram frequency).
    pub fn top_pairs(
        &self,
        stats: &ComputedStats,
        limit: usize,
        min_pmi: f64,
    ) -> Vec<(String, String, f64, u64)> {
        let lookup = stats.damped_lookup();
        let mut scored: Vec<(String, String, f64, u64)> = Vec::new();
        for (&(ida, idb), &bigram_count) in self.bigrams.iter() {
            let (Some(sa), Some(sb)) = (self.interner.resolve(ida), self.interner.resolve(idb))
            else {
                continue;
            };
            let key = if sa <= sb {
                (sa.to_string(), sb.to_string())
            } else {
                (sb.to_string(), sa.to_string())
            };
            let damped = lookup.get(&key).copied().unwrap_or(0.0);
            if damped < min_pmi {
                continue;
            }
            let phrase_score = bigram_count as f64 * damped;
            scored.push((sa.to_string(), sb.to_string(), phrase_score, bigram_count));
        }
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.3.cmp(&a.3))
        });
        scored.truncate(limit);
        scored
    }

    /// Skip-gram pairs with support >= `min_support`, scored with their own
    /// damped PMI (computed from skip-gram counts, not doc-pairs), sorted
    /// descending.
    pub fn c_token_pairs(&self, min_support: u64) -> Vec<(String, String, f64, u64)> {
        let total = self.total_docs;
        let vocab_size = self.vocab_size();
        let threshold = self.damping.map(|d| d.neighbor_threshold).unwrap_or(0.05);

        let mut neighbor_count: AHashMap<TokenId, usize> = AHashMap::new();
        let mut raw: Vec<(SortedPair, u64, f64)> = Vec::new();
        for (&pair, &count) in self.skipgrams.iter() {
            if count < min_support {
                continue;
            }
            let [a, b] = pair;
            let df_a = self.token_df.get(&a).copied().unwrap_or(0);
            let df_b = self.token_df.get(&b).copied().unwrap_or(0);
            let score = self.pmi.score(count, df_a, df_b, total);
            if score >= threshold {
                *neighbor_count.entry(a).or_insert(0) += 1;
                *neighbor_count.entry(b).or_insert(0) += 1;
            }
            raw.push((pair, count, score));
        }

        let mut out = Vec::with_capacity(raw.len());
        for ([a, b], count, score) in raw {
            let damped = match self.damping {
                Some(cfg) => {
                    let d_a = cfg.factor(neighbor_count.get(&a).copied().unwrap_or(0), vocab_size);
                    let d_b = cfg.factor(neighbor_count.get(&b).copied().unwrap_or(0), vocab_size);
                    cfg.damp_pair(score, d_a, d_b)
                }
                None => score,
            };
            if let (Some(sa), Some(sb)) = (self.interner.resolve(a), self.interner.resolve(b)) {
                out.push((sa.to_string(), sb.to_string(), damped, count));
            }
        }
        out.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        out
    }

    /// Pairs from `stats` at or above `min_pmi` with support >= `min_support`
    /// — the candidate feed for the rule miner (§4.I).
    pub fn pairs_above(&self, stats: &ComputedStats, min_pmi: f64, min_support: u64) -> Vec<PairStat> {
        stats
            .pairs
            .iter()
            .filter(|p| p.damped_pmi >= min_pmi && p.support >= min_support)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
