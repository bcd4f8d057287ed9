//! Symbolic inference engine (`spec.md` §4.F) — a fact graph of
//! `relation(subject, object)` triples supporting direct/transitive queries,
//! path explanation, and confidence-decayed query expansion.
//!
//! No learned component: every fact is either loaded from a rule file or
//! asserted by the autotuner's rule miner.

use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// The two relations for which `Query`/`QueryAll` compute a transitive
/// closure rather than a direct lookup.
const TRANSITIVE_RELATIONS: [&str; 2] = ["is_a", "related_to"];

/// The canonical relation search order for `find_path`.
const PATH_RELATIONS: [&str; 3] = ["is_a", "used_for", "related_to"];

const DEFAULT_EXPAND_DEPTH: usize = 2;
const DEFAULT_EXPAND_CAP: usize = 50;
const HOP_DECAY: f64 = 0.7;
const MIN_CONFIDENCE: f64 = 0.3;

/// One step of a discovered path: the relation traversed, its endpoints,
/// the depth at which it was found, and the rule text for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub relation: String,
    pub from: String,
    pub to: String,
    pub depth: usize,
    pub rule: String,
}

/// `facts[relation][subject] -> objects` (deduplicated, insertion order not
/// preserved since lookups, not iteration order, are what queries need).
#[derive(Debug, Clone, Default)]
pub struct InferenceEngine {
    facts: AHashMap<String, AHashMap<String, Vec<String>>>,
}

impl InferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts `relation(subject, object)`, deduplicated per
    /// `(relation, subject)`.
    pub fn assert_fact(&mut self, relation: &str, subject: &str, object: &str) {
        let objects = self
            .facts
            .entry(relation.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default();
        if !objects.iter().any(|o| o == object) {
            objects.push(object.to_string());
        }
    }

    /// Parses lines of the form `relation(subject, object)`, skipping blank
    /// lines and `#`-prefixed comments. See `spec.md` §6.
    pub fn load_rules(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(fact) = parse_rule_line(line) {
                self.assert_fact(&fact.0, &fact.1, &fact.2);
            }
        }
    }

    fn direct_objects(&self, relation: &str, subject: &str) -> &[String] {
        self.facts
            .get(relation)
            .and_then(|by_subject| by_subject.get(subject))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Direct match, or (for `is_a`/`related_to`) transitive reachability
    /// via DFS with cycle protection.
    pub fn query(&self, relation: &str, subject: &str, object: &str) -> bool {
        if self.direct_objects(relation, subject).iter().any(|o| o == object) {
            return true;
        }
        if !TRANSITIVE_RELATIONS.contains(&relation) {
            return false;
        }
        self.query_all(relation, subject).contains(object)
    }

    /// All objects reachable from `subject` under `relation`; transitive for
    /// `is_a`/`related_to`, direct otherwise.
    pub fn query_all(&self, relation: &str, subject: &str) -> AHashSet<String> {
        if !TRANSITIVE_RELATIONS.contains(&relation) {
            return self.direct_objects(relation, subject).iter().cloned().collect();
        }
        let mut visited = AHashSet::new();
        let mut stack = vec![subject.to_string()];
        let mut seen_subjects = AHashSet::new();
        seen_subjects.insert(subject.to_string());
        while let Some(current) = stack.pop() {
            for obj in self.direct_objects(relation, &current) {
                if visited.insert(obj.clone()) && seen_subjects.insert(obj.clone()) {
                    stack.push(obj.clone());
                }
            }
        }
        visited
    }

    /// Tries the three canonical relations in order, returning the first
    /// discovered path as a chain of steps.
    pub fn find_path(&self, subject: &str, object: &str) -> Option<Vec<PathStep>> {
        for relation in PATH_RELATIONS {
            if let Some(path) = self.bfs_path(relation, subject, object) {
                return Some(path);
            }
        }
        None
    }

    fn bfs_path(&self, relation: &str, subject: &str, object: &str) -> Option<Vec<PathStep>> {
        if subject == object {
            return None;
        }
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        let mut visited: AHashSet<String> = AHashSet::new();
        let mut parent: AHashMap<String, (String, usize)> = AHashMap::new();
        queue.push_back((subject.to_string(), 0));
        visited.insert(subject.to_string());

        while let Some((current, depth)) = queue.pop_front() {
            for obj in self.direct_objects(relation, &current) {
                if visited.contains(obj) {
                    continue;
                }
                visited.insert(obj.clone());
                parent.insert(obj.clone(), (current.clone(), depth + 1));
                if obj == object {
                    return Some(self.reconstruct_path(relation, subject, object, &parent));
                }
                queue.push_back((obj.clone(), depth + 1));
            }
        }
        None
    }

    fn reconstruct_path(
        &self,
        relation: &str,
        subject: &str,
        object: &str,
        parent: &AHashMap<String, (String, usize)>,
    ) -> Vec<PathStep> {
        let mut steps = Vec::new();
        let mut current = object.to_string();
        while current != subject {
            let (prev, depth) = parent.get(&current).cloned().unwrap();
            steps.push(PathStep {
                relation: relation.to_string(),
                from: prev.clone(),
                to: current.clone(),
                depth,
                rule: format!("{relation}({prev}, {current})"),
            });
            current = prev;
        }
        steps.reverse();
        steps
    }

    /// BFS from `tokens` over the union of all relations, traversed in both
    /// directions. Confidence decays by `0.7` per hop; tokens whose best
    /// confidence falls below `0.3` are pruned. The original tokens are
    /// excluded from the result. Sorted by confidence descending, ties
    /// broken alphabetically, truncated to `max_results`.
    pub fn expand_with_depth(
        &self,
        tokens: &[String],
        max_depth: usize,
        max_results: usize,
    ) -> Vec<(String, f64)> {
        let origin: AHashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
        let mut best: AHashMap<String, f64> = AHashMap::new();
        let mut frontier: Vec<(String, f64, usize)> =
            tokens.iter().map(|t| (t.clone(), 1.0, 0)).collect();
        let mut visited_at_depth: AHashSet<(String, usize)> = AHashSet::new();

        while let Some((token, confidence, depth)) = frontier.pop() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.neighbors_any_relation(&token) {
                let next_confidence = confidence * HOP_DECAY;
                if next_confidence < MIN_CONFIDENCE {
                    continue;
                }
                let key = (neighbor.clone(), depth + 1);
                if visited_at_depth.contains(&key) {
                    continue;
                }
                visited_at_depth.insert(key);
                if !origin.contains(neighbor.as_str()) {
                    let entry = best.entry(neighbor.clone()).or_insert(0.0);
                    if next_confidence > *entry {
                        *entry = next_confidence;
                    }
                }
                frontier.push((neighbor, next_confidence, depth + 1));
            }
        }

        let mut out: Vec<(String, f64)> = best.into_iter().collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out.truncate(max_results);
        out
    }

    /// `expand_with_depth` with the spec's default depth (2) and cap (50).
    pub fn expand(&self, tokens: &[String]) -> Vec<(String, f64)> {
        self.expand_with_depth(tokens, DEFAULT_EXPAND_DEPTH, DEFAULT_EXPAND_CAP)
    }

    /// Every token reachable from `token` in one hop, across all relations
    /// and both edge directions.
    fn neighbors_any_relation(&self, token: &str) -> Vec<String> {
        let mut out = AHashSet::new();
        for (_, by_subject) in self.facts.iter() {
            if let Some(objects) = by_subject.get(token) {
                out.extend(objects.iter().cloned());
            }
            for (subject, objects) in by_subject.iter() {
                if objects.iter().any(|o| o == token) {
                    out.insert(subject.clone());
                }
            }
        }
        out.into_iter().collect()
    }

    /// A human-readable rendering of `find_path(subject, object)`, or a
    /// message stating none was found.
    pub fn explain(&self, subject: &str, object: &str) -> String {
        match self.find_path(subject, object) {
            Some(steps) => steps
                .iter()
                .map(|s| s.rule.clone())
                .collect::<Vec<_>>()
                .join(" -> "),
            None => format!("no path found from {subject} to {object}"),
        }
    }
}

fn parse_rule_line(line: &str) -> Option<(String, String, String)> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    if close < open {
        return None;
    }
    let relation = line[..open].trim().to_string();
    let args = &line[open + 1..close];
    let mut parts = args.splitn(2, ',');
    let subject = parts.next()?.trim().to_string();
    let object = parts.next()?.trim().to_string();
    if relation.is_empty() || subject.is_empty() || object.is_empty() {
        return None;
    }
    Some((relation, subject, object))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
