//! Parsers for the persisted file formats named in `spec.md` §6: stoplist,
//! dictionary, taxonomy, synonyms, and symbolic rule files. Reading these
//! files from a concrete path is an ambient convenience; *where* the path
//! comes from (config, CLI, network fetch) is a collaborator's concern.

use crate::error::{KorelError, Result};
use crate::taxonomy::{Taxonomy, TaxonomyFile};
use crate::token::lexicon::{Lexicon, SynonymFile};
use crate::token::phrase::DictEntry;
use std::path::Path;

/// Persisted stoplist: `{ terms: ["the", "a", ...] }`. Terms are lowercased
/// on load so membership matches the tokenizer's case-insensitive stopword
/// check.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct StoplistFile {
    #[serde(default)]
    terms: Vec<String>,
}

pub fn parse_stoplist(yaml: &str) -> Result<Vec<String>> {
    let file: StoplistFile = serde_yaml::from_str(yaml).map_err(|e| {
        KorelError::invalid_input(format!("malformed stoplist yaml: {e}"))
    })?;
    Ok(file.terms.into_iter().map(|t| t.to_lowercase()).collect())
}

pub fn load_stoplist_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KorelError::invalid_input(format!("reading {path:?}: {e}")))?;
    parse_stoplist(&text)
}

/// Persisted dictionary: one entry per line, `canonical|variant1|...|category`.
/// `#`-comments and blank lines are skipped; a line with fewer than two
/// `|`-separated fields is silently ignored rather than failing the load
/// (unlike the rule file below, which is strict).
pub fn parse_dictionary(text: &str) -> Vec<DictEntry> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 2 {
            continue;
        }
        let canonical = fields[0].to_string();
        // With exactly two fields there's no way to tell a lone variant from
        // a category, so the second field is taken as a variant; a category
        // only appears once there's a variant field ahead of it.
        let (variant_fields, category): (&[&str], Option<String>) = if fields.len() == 2 {
            (&fields[1..2], None)
        } else {
            let last = fields.len() - 1;
            (&fields[1..last], fields[last].to_string().into())
        };
        let category = category.filter(|s| !s.is_empty());
        let variants = variant_fields
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        out.push(DictEntry {
            canonical,
            variants,
            category,
        });
    }
    out
}

pub fn load_dictionary_file(path: &Path) -> Result<Vec<DictEntry>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KorelError::invalid_input(format!("reading {path:?}: {e}")))?;
    Ok(parse_dictionary(&text))
}

/// Persisted taxonomy: `{ sectors: {...}, events: {...}, regions: {...},
/// entities: {type: {name: [kw...]}} }`.
pub fn parse_taxonomy(yaml: &str) -> Result<Taxonomy> {
    let file: TaxonomyFile = serde_yaml::from_str(yaml)
        .map_err(|e| KorelError::invalid_input(format!("malformed taxonomy yaml: {e}")))?;
    Ok(file.into())
}

pub fn load_taxonomy_file(path: &Path) -> Result<Taxonomy> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KorelError::invalid_input(format!("reading {path:?}: {e}")))?;
    parse_taxonomy(&text)
}

/// Persisted synonyms: `{ synonyms: [ { canonical, variants }, ... ] }`.
pub fn parse_synonyms(yaml: &str) -> Result<Lexicon> {
    let file: SynonymFile = serde_yaml::from_str(yaml)
        .map_err(|e| KorelError::invalid_input(format!("malformed synonyms yaml: {e}")))?;
    Ok(Lexicon::from_synonym_file(&file))
}

pub fn load_synonyms_file(path: &Path) -> Result<Lexicon> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KorelError::invalid_input(format!("reading {path:?}: {e}")))?;
    parse_synonyms(&text)
}

/// Persisted symbolic rule file: one fact per line, `relation(subject,
/// object)`; `#` comments and blank lines are skipped. Unlike the dictionary
/// format, a malformed non-comment line fails the *whole* load — this is the
/// strict external-facing loader; [`crate::inference::InferenceEngine::load_rules`]
/// remains a lenient internal convenience for callers (tests, the autotuner)
/// that assert facts incrementally and don't need file-level validation.
pub fn parse_rule_file(text: &str) -> Result<Vec<(String, String, String)>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fact = parse_one_rule(trimmed).ok_or_else(|| {
            KorelError::invalid_input(format!(
                "malformed rule at line {}: {trimmed:?}",
                lineno + 1
            ))
        })?;
        out.push(fact);
    }
    Ok(out)
}

fn parse_one_rule(line: &str) -> Option<(String, String, String)> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    if close < open {
        return None;
    }
    if !line[close + 1..].trim().is_empty() {
        return None;
    }
    let relation = line[..open].trim().to_string();
    let args = &line[open + 1..close];
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let subject = parts[0].to_string();
    let object = parts[1].to_string();
    if relation.is_empty() || subject.is_empty() || object.is_empty() {
        return None;
    }
    Some((relation, subject, object))
}

pub fn load_rule_file(path: &Path) -> Result<Vec<(String, String, String)>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KorelError::invalid_input(format!("reading {path:?}: {e}")))?;
    parse_rule_file(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tmpfile(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn stoplist_lowercases_terms() {
        let terms = parse_stoplist("terms: [\"THE\", \"A\"]\n").unwrap();
        assert_eq!(terms, vec!["the".to_string(), "a".to_string()]);
    }

    #[test]
    fn stoplist_file_roundtrips_through_a_real_path() {
        let f = tmpfile("terms: [\"The\"]\n");
        let terms = load_stoplist_file(f.path()).unwrap();
        assert_eq!(terms, vec!["the".to_string()]);
    }

    #[test]
    fn dictionary_skips_comments_blanks_and_single_field_lines() {
        let text = "# a comment\n\ncentral bank|fed|ecb|institution\nsolo\n";
        let entries = parse_dictionary(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].canonical, "central bank");
        assert_eq!(entries[0].variants, vec!["fed".to_string(), "ecb".to_string()]);
        assert_eq!(entries[0].category.as_deref(), Some("institution"));
    }

    #[test]
    fn dictionary_two_field_line_with_blank_second_field_is_still_an_entry() {
        let entries = parse_dictionary("bare|\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].canonical, "bare");
        assert!(entries[0].variants.is_empty());
        assert_eq!(entries[0].category, None);
    }

    #[test]
    fn dictionary_entry_without_category_has_no_trailing_field() {
        let entries = parse_dictionary("alpha|beta\n");
        assert_eq!(entries[0].variants, vec!["beta".to_string()]);
        assert_eq!(entries[0].category, None);
    }

    #[test]
    fn taxonomy_round_trips_through_serde() {
        let yaml = "sectors:\n  energy: [solar]\nevents: {}\nregions: {}\nentities: {}\n";
        let tax = parse_taxonomy(yaml).unwrap();
        assert!(tax.sectors.contains_key("energy"));
    }

    #[test]
    fn synonyms_include_canonical_as_its_own_variant() {
        let yaml = "synonyms:\n  - canonical: usd\n    variants: [dollar]\n";
        let lex = parse_synonyms(yaml).unwrap();
        assert_eq!(lex.normalize("dollar"), "usd");
        assert_eq!(lex.normalize("usd"), "usd");
    }

    #[test]
    fn rule_file_parses_well_formed_facts() {
        let text = "# comment\nis_a(dog, animal)\nrelated_to(cat, dog)\n";
        let facts = parse_rule_file(text).unwrap();
        assert_eq!(
            facts,
            vec![
                ("is_a".to_string(), "dog".to_string(), "animal".to_string()),
                ("related_to".to_string(), "cat".to_string(), "dog".to_string()),
            ]
        );
    }

    #[test]
    fn rule_file_fails_whole_load_on_one_malformed_line() {
        let text = "is_a(dog, animal)\nnot a rule\n";
        let err = parse_rule_file(text).unwrap_err();
        assert!(matches!(err, KorelError::InvalidInput(_)));
    }

    #[test]
    fn rule_file_rejects_wrong_argument_count() {
        let text = "is_a(dog, animal, extra)\n";
        assert!(parse_rule_file(text).is_err());
    }

    #[test]
    fn load_rule_file_reads_from_a_real_path() {
        let f = tmpfile("used_for(hammer, nailing)\n");
        let facts = load_rule_file(f.path()).unwrap();
        assert_eq!(facts.len(), 1);
    }
}
