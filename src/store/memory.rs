//! In-process reference [`Store`] implementation, backed by `parking_lot`
//! locks over plain hash maps. Used by engine tests and by callers with no
//! external persistence layer.

use super::{Dict, PmiLookup, Store};
use crate::analytics::pmi::PmiParams;
use crate::error::Result;
use crate::models::{DocId, Document};
use crate::taxonomy::Taxonomy;
use crate::token::phrase::DictEntry;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// The lazily-rebuilt neighbor index: `token -> neighbors sorted by
/// descending PMI`. Any pair or DF mutation invalidates it by clearing the
/// `Option`; the next `top_neighbors` call rebuilds it from the current pair
/// counts.
type NeighborIndex = AHashMap<String, Vec<(String, f64)>>;

pub struct MemoryStore {
    pmi: PmiParams,
    next_id: AtomicU32,
    docs: RwLock<AHashMap<DocId, Document>>,
    url_to_id: RwLock<AHashMap<String, DocId>>,
    token_df: RwLock<AHashMap<String, u64>>,
    pair_counts: RwLock<AHashMap<(String, String), u64>>,
    stoplist: RwLock<Vec<String>>,
    dict: RwLock<Vec<DictEntry>>,
    taxonomy: RwLock<Taxonomy>,
    neighbor_index: RwLock<Option<NeighborIndex>>,
}

impl MemoryStore {
    pub fn new(pmi: PmiParams) -> Self {
        Self {
            pmi,
            next_id: AtomicU32::new(1),
            docs: RwLock::new(AHashMap::new()),
            url_to_id: RwLock::new(AHashMap::new()),
            token_df: RwLock::new(AHashMap::new()),
            pair_counts: RwLock::new(AHashMap::new()),
            stoplist: RwLock::new(Vec::new()),
            dict: RwLock::new(Vec::new()),
            taxonomy: RwLock::new(Taxonomy::new()),
            neighbor_index: RwLock::new(None),
        }
    }

    fn mark_dirty(&self) {
        *self.neighbor_index.write() = None;
    }

    fn total_docs(&self) -> u64 {
        self.docs.read().len() as u64
    }

    fn rebuild_neighbor_index(&self) -> NeighborIndex {
        let pairs = self.pair_counts.read();
        let dfs = self.token_df.read();
        let total = self.total_docs();
        let mut adjacency: NeighborIndex = AHashMap::new();
        for ((a, b), &count) in pairs.iter() {
            let df_a = dfs.get(a).copied().unwrap_or(0);
            let df_b = dfs.get(b).copied().unwrap_or(0);
            let score = self.pmi.score(count, df_a, df_b, total);
            adjacency.entry(a.clone()).or_default().push((b.clone(), score));
            adjacency.entry(b.clone()).or_default().push((a.clone(), score));
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort_by(|x, y| y.1.partial_cmp(&x.1).unwrap_or(std::cmp::Ordering::Equal));
        }
        adjacency
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(PmiParams::default())
    }
}

impl Store for MemoryStore {
    fn upsert_doc(&self, mut doc: Document) -> Result<DocId> {
        let existing_id = self.url_to_id.read().get(&doc.url).copied();
        let id = match existing_id {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        doc.id = id;
        self.url_to_id.write().insert(doc.url.clone(), id);
        self.docs.write().insert(id, doc);
        Ok(id)
    }

    fn get_doc(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.docs.read().get(&id).cloned())
    }

    fn get_doc_by_url(&self, url: &str) -> Result<Option<Document>> {
        let id = self.url_to_id.read().get(url).copied();
        Ok(id.and_then(|id| self.docs.read().get(&id).cloned()))
    }

    fn get_docs_by_tokens(&self, tokens: &[String], limit: usize) -> Result<Vec<Document>> {
        let wanted: ahash::AHashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
        let docs = self.docs.read();
        let mut matches: Vec<Document> = docs
            .values()
            .filter(|d| d.tokens.iter().any(|t| wanted.contains(t.as_str())))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        matches.truncate(limit);
        Ok(matches)
    }

    fn upsert_token_df(&self, token: &str, df: u64) -> Result<()> {
        self.token_df.write().insert(token.to_string(), df);
        self.mark_dirty();
        Ok(())
    }

    fn get_token_df(&self, token: &str) -> Result<u64> {
        Ok(self.token_df.read().get(token).copied().unwrap_or(0))
    }

    fn inc_pair(&self, a: &str, b: &str) -> Result<()> {
        *self.pair_counts.write().entry(pair_key(a, b)).or_insert(0) += 1;
        self.mark_dirty();
        Ok(())
    }

    fn dec_pair(&self, a: &str, b: &str) -> Result<()> {
        let key = pair_key(a, b);
        let mut pairs = self.pair_counts.write();
        if let Some(count) = pairs.get_mut(&key) {
            if *count <= 1 {
                pairs.remove(&key);
            } else {
                *count -= 1;
            }
        }
        drop(pairs);
        self.mark_dirty();
        Ok(())
    }

    fn get_pmi(&self, a: &str, b: &str) -> Result<PmiLookup> {
        let key = pair_key(a, b);
        let pairs = self.pair_counts.read();
        let Some(&count) = pairs.get(&key) else {
            return Ok((0.0, false));
        };
        let dfs = self.token_df.read();
        let df_a = dfs.get(a).copied().unwrap_or(0);
        let df_b = dfs.get(b).copied().unwrap_or(0);
        let score = self.pmi.score(count, df_a, df_b, self.total_docs());
        Ok((score, true))
    }

    fn top_neighbors(&self, token: &str, k: usize) -> Result<Vec<(String, f64)>> {
        {
            let index = self.neighbor_index.read();
            if let Some(map) = index.as_ref() {
                let mut out = map.get(token).cloned().unwrap_or_default();
                out.truncate(k);
                return Ok(out);
            }
        }
        let rebuilt = self.rebuild_neighbor_index();
        let mut out = rebuilt.get(token).cloned().unwrap_or_default();
        out.truncate(k);
        *self.neighbor_index.write() = Some(rebuilt);
        Ok(out)
    }

    fn stoplist(&self) -> Result<Vec<String>> {
        Ok(self.stoplist.read().clone())
    }

    fn dict(&self) -> Result<Dict> {
        Ok(self.dict.read().clone())
    }

    fn taxonomy(&self) -> Result<Taxonomy> {
        Ok(self.taxonomy.read().clone())
    }

    fn upsert_stoplist(&self, tokens: &[String]) -> Result<()> {
        let mut stop = self.stoplist.write();
        for t in tokens {
            if !stop.contains(t) {
                stop.push(t.clone());
            }
        }
        Ok(())
    }

    fn upsert_dict_entry(&self, entry: DictEntry) -> Result<()> {
        let mut dict = self.dict.write();
        if let Some(existing) = dict.iter_mut().find(|e| e.canonical == entry.canonical) {
            *existing = entry;
        } else {
            dict.push(entry);
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Replaces the stored taxonomy wholesale, used by setup/tests rather
    /// than the incremental `Store` contract (the spec names no taxonomy
    /// writer beyond external file loading, see `spec.md` §6).
    pub fn set_taxonomy(&self, taxonomy: Taxonomy) {
        *self.taxonomy.write() = taxonomy;
    }
}
