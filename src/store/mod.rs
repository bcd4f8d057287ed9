//! The abstract persistence contract (`spec.md` §4.E) — documents, token
//! document-frequencies, pair counts, and the three read-only reference
//! views (stoplist, dictionary, taxonomy).
//!
//! The engine never touches a concrete store; it only ever holds a
//! `dyn Store`, so persistence, network I/O, and storage format are entirely
//! a collaborator's concern. [`memory`] provides a reference in-process
//! implementation used by tests and by callers with no external store.

pub mod memory;

use crate::error::Result;
use crate::models::{DocId, Document};
use crate::token::phrase::DictEntry;

/// `(score, present)` — `present` distinguishes "PMI is genuinely zero" from
/// "no stored pair for this token combination".
pub type PmiLookup = (f64, bool);

/// Read-only dictionary view: `canonical phrase -> DictEntry`.
pub type Dict = Vec<DictEntry>;

/// The persistence contract every engine collaborator implements.
///
/// Decrementing a missing or zero-count pair is a no-op (counts saturate at
/// zero); `DF == 0` implies no pair entries remain for that token. A "lazy
/// neighbor index" is permitted: implementations may defer rebuilding
/// `TopNeighbors` until first read after a mutation.
pub trait Store: Send + Sync {
    /// Creates on a new URL, replaces on a known one. Returns the doc's
    /// (possibly newly minted) ID.
    fn upsert_doc(&self, doc: Document) -> Result<DocId>;

    fn get_doc(&self, id: DocId) -> Result<Option<Document>>;

    fn get_doc_by_url(&self, url: &str) -> Result<Option<Document>>;

    /// Documents containing any of `tokens`, newest-first by publish time,
    /// truncated to `limit`.
    fn get_docs_by_tokens(&self, tokens: &[String], limit: usize) -> Result<Vec<Document>>;

    fn upsert_token_df(&self, token: &str, df: u64) -> Result<()>;

    fn get_token_df(&self, token: &str) -> Result<u64>;

    fn inc_pair(&self, a: &str, b: &str) -> Result<()>;

    /// Saturates at zero; decrementing an absent or zero-count pair is a
    /// no-op.
    fn dec_pair(&self, a: &str, b: &str) -> Result<()>;

    /// Default sequential fallback; store implementations with a bulk path
    /// should override for throughput.
    fn batch_inc_pairs(&self, pairs: &[(String, String)]) -> Result<()> {
        for (a, b) in pairs {
            self.inc_pair(a, b)?;
        }
        Ok(())
    }

    fn batch_dec_pairs(&self, pairs: &[(String, String)]) -> Result<()> {
        for (a, b) in pairs {
            self.dec_pair(a, b)?;
        }
        Ok(())
    }

    /// PMI of the stored pair using the configured §4.D formula.
    fn get_pmi(&self, a: &str, b: &str) -> Result<PmiLookup>;

    /// Top `k` neighbors of `token` by descending PMI.
    fn top_neighbors(&self, token: &str, k: usize) -> Result<Vec<(String, f64)>>;

    fn stoplist(&self) -> Result<Vec<String>>;

    fn dict(&self) -> Result<Dict>;

    fn taxonomy(&self) -> Result<crate::taxonomy::Taxonomy>;

    fn upsert_stoplist(&self, tokens: &[String]) -> Result<()>;

    fn upsert_dict_entry(&self, entry: DictEntry) -> Result<()>;
}
