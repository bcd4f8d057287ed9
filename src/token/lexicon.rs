//! Optional variant -> canonical normalization layer attached to the
//! tokenizer, plus the synonym file format in `spec.md` §6.

use ahash::AHashMap;

/// A normalization table mapping lowercase surface variants to a canonical
/// token. Applied by the tokenizer before the stopword check, so a variant
/// that canonicalizes to a stopword is still dropped.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    variant_to_canonical: AHashMap<String, String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `canonical` as its own variant and each of `variants` as an
    /// alternate spelling that normalizes to it. Mirrors the synonym file
    /// format: canonical is automatically included in its own variant set.
    pub fn add_synonym_group(&mut self, canonical: &str, variants: &[String]) {
        let canonical = canonical.to_lowercase();
        self.variant_to_canonical
            .insert(canonical.clone(), canonical.clone());
        for v in variants {
            self.variant_to_canonical
                .insert(v.to_lowercase(), canonical.clone());
        }
    }

    /// Returns the canonical form for `token`, or `token` unchanged if it has
    /// no registered variant.
    pub fn normalize<'a>(&'a self, token: &'a str) -> &'a str {
        self.variant_to_canonical
            .get(token)
            .map(|s| s.as_str())
            .unwrap_or(token)
    }

    pub fn is_empty(&self) -> bool {
        self.variant_to_canonical.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variant_to_canonical.len()
    }
}

/// One entry of the persisted synonyms file: `{ synonyms: [ { canonical,
/// variants }, ... ] }`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SynonymGroup {
    pub canonical: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SynonymFile {
    #[serde(default)]
    pub synonyms: Vec<SynonymGroup>,
}

impl Lexicon {
    /// Builds a lexicon from a parsed synonym file, deduplicating variants
    /// (including the canonical, which is implicitly its own variant).
    pub fn from_synonym_file(file: &SynonymFile) -> Self {
        let mut lex = Lexicon::new();
        for group in &file.synonyms {
            let mut variants = group.variants.clone();
            variants.push(group.canonical.clone());
            variants.sort();
            variants.dedup_by_key(|v| v.to_lowercase());
            lex.add_synonym_group(&group.canonical, &variants);
        }
        lex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_returns_canonical_for_variant() {
        let mut lex = Lexicon::new();
        lex.add_synonym_group("united states", &["usa".to_string(), "u.s.".to_string()]);
        assert_eq!(lex.normalize("usa"), "united states");
        assert_eq!(lex.normalize("united states"), "united states");
        assert_eq!(lex.normalize("unrelated"), "unrelated");
    }

    #[test]
    fn from_synonym_file_dedupes_canonical_as_variant() {
        let file = SynonymFile {
            synonyms: vec![SynonymGroup {
                canonical: "usd".to_string(),
                variants: vec!["dollar".to_string(), "usd".to_string()],
            }],
        };
        let lex = Lexicon::from_synonym_file(&file);
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.normalize("dollar"), "usd");
    }
}
