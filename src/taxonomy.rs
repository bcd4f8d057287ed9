//! Taxonomy tagger (`spec.md` §4.B) — category assignment and entity
//! extraction over a four-bucket keyword taxonomy (sectors, events, regions,
//! typed entity buckets).

use ahash::{AHashMap, AHashSet};

/// `category name -> lowercase keyword list`, one such map per bucket.
pub type CategoryMap = AHashMap<String, Vec<String>>;

/// The four keyword collections described in `spec.md` §3. Entities are
/// themselves typed: `entity type -> (category name -> keywords)`.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    pub sectors: CategoryMap,
    pub events: CategoryMap,
    pub regions: CategoryMap,
    pub entities: AHashMap<String, CategoryMap>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every (category, keyword) pair across sectors/events/regions, used by
    /// category assignment and by taxonomy-drift analysis.
    fn category_keyword_buckets(&self) -> Vec<(&str, &[String])> {
        self.sectors
            .iter()
            .chain(self.events.iter())
            .chain(self.regions.iter())
            .map(|(name, kws)| (name.as_str(), kws.as_slice()))
            .collect()
    }

    /// Set-union over sector/event/region buckets: a category is present iff
    /// any of its (lowercased) keywords equals any (lowercased) token.
    pub fn assign_categories(&self, tokens: &[String]) -> AHashSet<String> {
        let token_set: AHashSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut categories = AHashSet::new();
        for (name, keywords) in self.category_keyword_buckets() {
            if keywords
                .iter()
                .any(|kw| token_set.contains(&kw.to_lowercase()))
            {
                categories.insert(name.to_string());
            }
        }
        categories
    }

    /// Scans the raw, lowercased text for the presence of any keyword
    /// belonging to a named entity bucket. Unlike category assignment this
    /// operates on the raw text (substring match), not the token set, since
    /// entity surface forms may span punctuation the tokenizer strips.
    pub fn extract_entities(&self, text: &str) -> Vec<(String, String)> {
        let lower = text.to_lowercase();
        let mut found = Vec::new();
        for (entity_type, buckets) in &self.entities {
            for (name, keywords) in buckets {
                for kw in keywords {
                    if lower.contains(&kw.to_lowercase()) {
                        found.push((entity_type.clone(), name.clone()));
                        break;
                    }
                }
            }
        }
        found
    }

    /// Every (category, keyword) the drift computation iterates over.
    pub fn keyword_pairs(&self) -> Vec<(String, String)> {
        self.category_keyword_buckets()
            .into_iter()
            .flat_map(|(cat, kws)| kws.iter().map(move |kw| (cat.to_string(), kw.clone())))
            .collect()
    }

    /// All keywords across sectors/events/regions, lowercased, for orphan
    /// detection (a token is an orphan only if it matches none of these).
    pub fn all_keywords_lowercase(&self) -> AHashSet<String> {
        self.category_keyword_buckets()
            .into_iter()
            .flat_map(|(_, kws)| kws.iter().map(|k| k.to_lowercase()))
            .collect()
    }
}

/// Persisted taxonomy shape: `{ sectors: {...}, events: {...}, regions:
/// {...}, entities: { type: { name: [kw...] } } }`. See `spec.md` §6.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TaxonomyFile {
    #[serde(default)]
    pub sectors: CategoryMap,
    #[serde(default)]
    pub events: CategoryMap,
    #[serde(default)]
    pub regions: CategoryMap,
    #[serde(default)]
    pub entities: AHashMap<String, CategoryMap>,
}

impl From<TaxonomyFile> for Taxonomy {
    fn from(f: TaxonomyFile) -> Self {
        Taxonomy {
            sectors: f.sectors,
            events: f.events,
            regions: f.regions,
            entities: f.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        let mut sectors = CategoryMap::default();
        sectors.insert(
            "energy".to_string(),
            vec!["solar".to_string(), "battery".to_string()],
        );
        let mut regions = CategoryMap::default();
        regions.insert("apac".to_string(), vec!["japan".to_string()]);
        let mut entities = AHashMap::default();
        let mut companies = CategoryMap::default();
        companies.insert("acme corp".to_string(), vec!["acme".to_string()]);
        entities.insert("company".to_string(), companies);

        Taxonomy {
            sectors,
            events: CategoryMap::default(),
            regions,
            entities,
        }
    }

    #[test]
    fn assign_categories_is_a_union_over_buckets() {
        let tax = taxonomy();
        let tokens = vec!["solar".to_string(), "japan".to_string()];
        let cats = tax.assign_categories(&tokens);
        assert!(cats.contains("energy"));
        assert!(cats.contains("apac"));
        assert_eq!(cats.len(), 2);
    }

    #[test]
    fn assign_categories_empty_when_no_overlap() {
        let tax = taxonomy();
        let tokens = vec!["unrelated".to_string()];
        assert!(tax.assign_categories(&tokens).is_empty());
    }

    #[test]
    fn extract_entities_scans_raw_text() {
        let tax = taxonomy();
        let found = tax.extract_entities("Acme announced record profits");
        assert_eq!(
            found,
            vec![("company".to_string(), "acme corp".to_string())]
        );
    }
}
