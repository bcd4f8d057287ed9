//! Shared data types that flow between components: documents, cards, and the
//! search request/response shapes. See `spec.md` §3 and §6.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Internal integer document ID, minted on first upsert and stable across
/// re-ingestion of the same URL.
pub type DocId = u32;

/// Compact interned token ID, stable for the lifetime of the aggregator that
/// minted it.
pub type TokenId = u32;

/// A typed named entity extracted from a document's raw text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub value: String,
}

/// A fully processed document as stored by the engine.
///
/// Identity is the URL; `id` is minted once per URL and preserved across
/// re-ingestion (`url -> id` is total and injective over the live set).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub outlet: String,
    pub published_at: DateTime<Utc>,
    pub links_out: u32,
    pub categories: Vec<String>,
    pub entities: Vec<Entity>,
    /// Token sequence after the tokenize -> parse pipeline, in document order.
    pub tokens: Vec<String>,
}

impl Document {
    /// Age of the document relative to `now`, in whole days (never negative).
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let delta = now.signed_duration_since(self.published_at);
        (delta.num_seconds() as f64 / 86_400.0).max(0.0)
    }
}

/// The raw record handed to `Engine::ingest`, before tokenization.
/// See `spec.md` §6 "Document ingest record".
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    pub title: String,
    pub outlet: String,
    pub published_at: DateTime<Utc>,
    pub body_text: String,
    pub source_cats: Vec<String>,
}

impl DocumentRecord {
    /// Rejects the record if any of url/title/published_at/body_text is
    /// blank. `published_at` has no "blank" concept beyond being present, so
    /// only the string fields are checked for emptiness here.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.url.trim().is_empty() {
            return Err(crate::error::KorelError::invalid_input("url is blank"));
        }
        if self.title.trim().is_empty() {
            return Err(crate::error::KorelError::invalid_input("title is blank"));
        }
        if self.body_text.trim().is_empty() {
            return Err(crate::error::KorelError::invalid_input(
                "body_text is blank",
            ));
        }
        Ok(())
    }
}

/// A source citation on a card: the document's URL and its publish time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub published_at: DateTime<Utc>,
}

/// The explain structure attached to a card: what was searched for, what it
/// expanded to, what actually matched, and supporting evidence.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Explain {
    pub query_tokens: Vec<String>,
    pub expanded_tokens: Vec<String>,
    /// Intersection of query tokens with the union of the contributing docs'
    /// tokens. Always a subset of `query_tokens`.
    pub matched_tokens: Vec<String>,
    pub category_overlap: f64,
    /// Top scoring (token_a, token_b, pmi) triples drawn from the candidate
    /// set, for display.
    pub top_pairs: Vec<(String, String, f64)>,
}

/// An immutable, explainable search result card.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Card {
    /// Monotonic, lexicographically sortable 26-character ID (ULID).
    pub id: String,
    pub title: String,
    pub bullets: Vec<String>,
    pub sources: Vec<SourceRef>,
    /// Named signal -> scalar, e.g. `{pmi, cats, recency, authority, len}`.
    pub score_breakdown: BTreeMap<String, f64>,
    pub explain: Explain,
}

/// A single document paired with its total score and score breakdown,
/// produced by the ranking stage and consumed by the card builder.
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub doc: Document,
    pub total: f64,
    pub breakdown: BTreeMap<String, f64>,
}

/// Incoming search request. See `spec.md` §6.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub cats: Vec<String>,
    pub top_k: usize,
    pub now: DateTime<Utc>,
    pub enable_signals: bool,
}
