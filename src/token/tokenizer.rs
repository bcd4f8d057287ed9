//! Tokenizer + Lexicon (`spec.md` §4.A).
//!
//! Walks input left-to-right, accumulating contiguous runs of Unicode
//! letters/numbers/hyphens and emitting a token on any other boundary.
//! Tokenization is a pure, deterministic function of the input text and the
//! tokenizer's currently attached stoplist/lexicon.

use crate::token::lexicon::Lexicon;
use ahash::AHashSet;

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stopwords: AHashSet<String>,
    lexicon: Option<Lexicon>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stopwords(stopwords: impl IntoIterator<Item = String>) -> Self {
        let mut t = Self::new();
        t.set_stopwords(stopwords);
        t
    }

    /// Replaces the stopword set. Membership is case-insensitive, so every
    /// entry is lowercased on insertion.
    pub fn set_stopwords(&mut self, stopwords: impl IntoIterator<Item = String>) {
        self.stopwords = stopwords.into_iter().map(|s| s.to_lowercase()).collect();
    }

    pub fn add_stopwords(&mut self, stopwords: impl IntoIterator<Item = String>) {
        self.stopwords
            .extend(stopwords.into_iter().map(|s| s.to_lowercase()));
    }

    pub fn stopwords(&self) -> &AHashSet<String> {
        &self.stopwords
    }

    pub fn set_lexicon(&mut self, lexicon: Lexicon) {
        self.lexicon = Some(lexicon);
    }

    pub fn lexicon(&self) -> Option<&Lexicon> {
        self.lexicon.as_ref()
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Tokenizes `text` into an ordered sequence of normalized tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c.is_alphanumeric() || c == '-' {
                current.push(c);
            } else if !current.is_empty() {
                self.emit(&current, &mut tokens);
                current.clear();
            }
        }
        if !current.is_empty() {
            self.emit(&current, &mut tokens);
        }
        tokens
    }

    fn emit(&self, raw: &str, out: &mut Vec<String>) {
        let collapsed = collapse_hyphen_runs(raw.trim_matches('-'));
        if collapsed.is_empty() {
            return;
        }
        let lower = collapsed.to_lowercase();

        if lower.chars().count() <= 1 {
            return;
        }
        if is_purely_numeric(&lower) {
            return;
        }

        let normalized = match &self.lexicon {
            Some(lex) => lex.normalize(&lower).to_string(),
            None => lower,
        };

        if self.is_stopword(&normalized) {
            return;
        }

        out.push(normalized);
    }
}

/// Collapses runs of 2+ hyphens into a single hyphen.
fn collapse_hyphen_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_hyphen = false;
    for c in s.chars() {
        if c == '-' {
            if prev_hyphen {
                continue;
            }
            prev_hyphen = true;
        } else {
            prev_hyphen = false;
        }
        out.push(c);
    }
    out
}

/// True if every character is a digit or hyphen (so the candidate carries no
/// alphabetic content at all).
fn is_purely_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> Tokenizer {
        Tokenizer::with_stopwords(
            ["the", "a", "an", "over"]
                .iter()
                .map(|s| s.to_string()),
        )
    }

    #[test]
    fn splits_on_non_word_boundaries() {
        let t = basic();
        assert_eq!(
            t.tokenize("The Fox, jumped over the Fence!"),
            vec!["fox", "jumped", "fence"]
        );
    }

    #[test]
    fn drops_purely_numeric_and_single_char_tokens() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("a 42 1999 io9 x"), vec!["io9"]);
    }

    #[test]
    fn trims_and_collapses_hyphens() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("--co---op-- well---known"), vec!["co-op", "well-known"]);
    }

    #[test]
    fn stopword_membership_is_case_insensitive() {
        let t = basic();
        assert_eq!(t.tokenize("THE Fox OVER Fence"), vec!["fox", "fence"]);
    }

    #[test]
    fn lexicon_normalization_runs_before_stopword_check() {
        let mut t = Tokenizer::with_stopwords(["the".to_string()]);
        let mut lex = crate::token::lexicon::Lexicon::new();
        lex.add_synonym_group("the", &["teh".to_string()]);
        t.set_lexicon(lex);
        // "teh" normalizes to "the", which is a stopword, so it must be dropped.
        assert_eq!(t.tokenize("teh fox"), vec!["fox"]);
    }

    #[test]
    fn is_deterministic() {
        let t = basic();
        let text = "Deep learning models use deep neural networks";
        assert_eq!(t.tokenize(text), t.tokenize(text));
    }

    #[test]
    fn unicode_letters_are_accumulated() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("café naïve"), vec!["café", "naïve"]);
    }
}
