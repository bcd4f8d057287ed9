//! Tokenizer + Lexicon (§4.A) and multi-token parser (§4.B, minus taxonomy
//! tagging, which lives in [`crate::taxonomy`]).

pub mod lexicon;
pub mod phrase;
pub mod tokenizer;

pub use lexicon::{Lexicon, SynonymFile, SynonymGroup};
pub use phrase::{DictEntry, PhraseParser};
pub use tokenizer::Tokenizer;

/// Runs text through tokenize -> phrase-parse in one call, the shape every
/// ingest/query path actually uses.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub tokenizer: Tokenizer,
    pub parser: PhraseParser,
}

impl Pipeline {
    pub fn new(tokenizer: Tokenizer, parser: PhraseParser) -> Self {
        Self { tokenizer, parser }
    }

    pub fn process(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenizer.tokenize(text);
        self.parser.parse(&tokens)
    }
}
