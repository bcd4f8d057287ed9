//! Multi-token parser (`spec.md` §4.B): greedy longest-match phrase
//! recognition over an already-tokenized sequence, driven by a dictionary of
//! canonical <-> variant phrases.

use ahash::AHashMap;

/// One entry of the persisted dictionary: a canonical form plus its known
/// variants and an optional category tag. See `spec.md` §6.
#[derive(Debug, Clone)]
pub struct DictEntry {
    pub canonical: String,
    pub variants: Vec<String>,
    pub category: Option<String>,
}

/// Greedy-longest-match phrase parser built from a dictionary.
///
/// At construction, every canonical and every variant (lowercased, split on
/// whitespace/hyphen into its constituent tokens) is indexed by its word
/// count, so `parse` can try the longest window first at each position.
#[derive(Debug, Clone, Default)]
pub struct PhraseParser {
    /// phrase (space-joined lowercase tokens) -> canonical
    phrase_to_canonical: AHashMap<String, String>,
    max_phrase_len: usize,
}

fn phrase_key(tokens: &[&str]) -> String {
    tokens.join(" ")
}

fn split_phrase(phrase: &str) -> Vec<String> {
    phrase
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

impl PhraseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dict(entries: &[DictEntry]) -> Self {
        let mut parser = Self::new();
        for entry in entries {
            parser.add_entry(entry);
        }
        parser
    }

    pub fn add_entry(&mut self, entry: &DictEntry) {
        let canonical_words = split_phrase(&entry.canonical);
        if !canonical_words.is_empty() {
            self.insert(&canonical_words, &entry.canonical.to_lowercase());
        }
        for variant in &entry.variants {
            let variant_words = split_phrase(variant);
            if !variant_words.is_empty() {
                self.insert(&variant_words, &entry.canonical.to_lowercase());
            }
        }
    }

    fn insert(&mut self, words: &[String], canonical: &str) {
        let refs: Vec<&str> = words.iter().map(|s| s.as_str()).collect();
        self.phrase_to_canonical
            .insert(phrase_key(&refs), canonical.to_string());
        self.max_phrase_len = self.max_phrase_len.max(words.len());
    }

    /// Parses a token sequence, merging recognized multi-token phrases into
    /// their canonical single-token form. Falls back to single-token variant
    /// lookup, then passes the token through unchanged.
    pub fn parse(&self, tokens: &[String]) -> Vec<String> {
        if self.phrase_to_canonical.is_empty() || tokens.is_empty() {
            return tokens.to_vec();
        }

        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let mut matched = false;
            let max_window = self.max_phrase_len.min(tokens.len() - i);
            for window in (2..=max_window).rev() {
                let candidate: Vec<&str> = tokens[i..i + window]
                    .iter()
                    .map(|s| s.as_str())
                    .collect();
                let key = phrase_key(&candidate);
                if let Some(canonical) = self.phrase_to_canonical.get(&key) {
                    out.push(canonical.clone());
                    i += window;
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }
            if let Some(canonical) = self.phrase_to_canonical.get(tokens[i].as_str()) {
                out.push(canonical.clone());
            } else {
                out.push(tokens[i].clone());
            }
            i += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PhraseParser {
        PhraseParser::from_dict(&[
            DictEntry {
                canonical: "united states".to_string(),
                variants: vec!["u s a".to_string(), "america".to_string()],
                category: Some("region".to_string()),
            },
            DictEntry {
                canonical: "central bank".to_string(),
                variants: vec![],
                category: None,
            },
        ])
    }

    #[test]
    fn greedy_longest_match_prefers_longer_window() {
        let p = parser();
        let tokens = vec!["u", "s", "a", "central", "bank"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(
            p.parse(&tokens),
            vec!["united states".to_string(), "central bank".to_string()]
        );
    }

    #[test]
    fn single_token_variant_passthrough() {
        let p = parser();
        let tokens = vec!["america".to_string(), "grows".to_string()];
        assert_eq!(p.parse(&tokens), vec!["united states", "grows"]);
    }

    #[test]
    fn unmatched_tokens_pass_through_unchanged() {
        let p = parser();
        let tokens = vec!["fox".to_string(), "jumped".to_string()];
        assert_eq!(p.parse(&tokens), tokens);
    }

    #[test]
    fn empty_dictionary_is_identity() {
        let p = PhraseParser::new();
        let tokens = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(p.parse(&tokens), tokens);
    }
}
