//! # Korel
//!
//! Korel is a corpus-analysis and retrieval engine built on streaming
//! co-occurrence analytics, PMI-ranked retrieval, symbolic inference-based
//! query expansion, and an iterative autotuner. It deliberately uses no
//! learned embeddings or neural ranking — every score is traceable back to a
//! co-occurrence count, a category overlap, or a symbolic fact.
//!
//! The crate owns none of network I/O, persistence, CLI parsing, or
//! config-file loading: callers provide a [`Store`] implementation (or use
//! [`store::memory::MemoryStore`] for a reference in-process one) and drive
//! the [`Engine`] facade directly.
//!
//! ## Example
//!
//! ```no_run
//! use korel::{Engine, EngineOptions, MemoryStore};
//! use korel::models::{DocumentRecord, SearchRequest};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::default());
//! let engine = Engine::new(store, EngineOptions::default()).unwrap();
//!
//! engine.ingest(DocumentRecord {
//!     url: "https://example.com/a".to_string(),
//!     title: "Central bank raises rates".to_string(),
//!     outlet: "Example Wire".to_string(),
//!     published_at: chrono::Utc::now(),
//!     body_text: "The central bank raised interest rates again today.".to_string(),
//!     source_cats: vec!["finance".to_string()],
//! }).unwrap();
//!
//! let response = engine.search(&SearchRequest {
//!     query: "interest rates".to_string(),
//!     cats: vec![],
//!     top_k: 5,
//!     now: chrono::Utc::now(),
//!     enable_signals: false,
//! }).unwrap();
//! println!("{} cards", response.cards.len());
//! ```

pub mod analytics;
pub mod autotune;
pub mod cancel;
pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod formats;
pub mod inference;
pub mod models;
pub mod ranking;
pub mod signals;
pub mod store;
pub mod taxonomy;
pub mod token;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use engine::{Engine, EngineOptions, SearchResponse};
pub use error::{KorelError, Result};
pub use models::{Card, Document, DocumentRecord, SearchRequest};
pub use store::memory::MemoryStore;
pub use store::Store;

/// Initializes a `tracing` subscriber reading filter directives from the
/// `RUST_LOG` environment variable. Callers embedding the engine in a larger
/// binary that already configures `tracing` should skip this and init their
/// own subscriber instead.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
