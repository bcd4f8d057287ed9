use super::*;

fn engine() -> InferenceEngine {
    let mut e = InferenceEngine::new();
    e.assert_fact("is_a", "dog", "mammal");
    e.assert_fact("is_a", "mammal", "animal");
    e.assert_fact("used_for", "hammer", "construction");
    e.assert_fact("related_to", "rain", "umbrella");
    e
}

#[test]
fn direct_query_matches_asserted_fact() {
    let e = engine();
    assert!(e.query("is_a", "dog", "mammal"));
    assert!(!e.query("is_a", "dog", "animal"));
}

#[test]
fn transitive_query_follows_is_a_chain() {
    let e = engine();
    assert!(e.query("is_a", "dog", "animal"));
}

#[test]
fn non_transitive_relation_has_no_closure() {
    let e = engine();
    assert!(!e.query("used_for", "hammer", "tool"));
}

#[test]
fn query_all_returns_every_reachable_object() {
    let e = engine();
    let all = e.query_all("is_a", "dog");
    assert!(all.contains("mammal"));
    assert!(all.contains("animal"));
}

#[test]
fn cycle_in_transitive_relation_does_not_loop() {
    let mut e = InferenceEngine::new();
    e.assert_fact("is_a", "a", "b");
    e.assert_fact("is_a", "b", "a");
    let all = e.query_all("is_a", "a");
    assert!(all.contains("b"));
    assert_eq!(all.len(), 1);
}

#[test]
fn find_path_tries_relations_in_canonical_order() {
    let e = engine();
    let path = e.find_path("dog", "animal").unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].relation, "is_a");
    assert_eq!(path[0].from, "dog");
    assert_eq!(path[1].to, "animal");
}

#[test]
fn find_path_returns_none_when_unreachable() {
    let e = engine();
    assert!(e.find_path("dog", "umbrella").is_none());
}

#[test]
fn load_rules_skips_comments_and_blank_lines() {
    let mut e = InferenceEngine::new();
    e.load_rules("# a comment\n\nis_a(cat, mammal)\nused_for(pen, writing)\n");
    assert!(e.query("is_a", "cat", "mammal"));
    assert!(e.query("used_for", "pen", "writing"));
}

#[test]
fn expand_excludes_origin_tokens_and_decays_confidence() {
    let e = engine();
    let expanded = e.expand_with_depth(&["dog".to_string()], 2, 10);
    assert!(!expanded.iter().any(|(t, _)| t == "dog"));
    let mammal = expanded.iter().find(|(t, _)| t == "mammal").unwrap();
    assert!((mammal.1 - 0.7).abs() < 1e-9);
    let animal = expanded.iter().find(|(t, _)| t == "animal");
    assert!(animal.is_some());
    assert!(animal.unwrap().1 < mammal.1);
}

#[test]
fn expand_prunes_below_min_confidence() {
    let mut e = InferenceEngine::new();
    // Three hops of 0.7 decay: 0.7, 0.49, 0.343 — all three clear 0.3.
    // A fourth hop (0.2401) would not, and depth is capped well before then.
    e.assert_fact("related_to", "a", "b");
    e.assert_fact("related_to", "b", "c");
    e.assert_fact("related_to", "c", "d");
    e.assert_fact("related_to", "d", "e");
    let expanded = e.expand_with_depth(&["a".to_string()], 10, 50);
    let tokens: Vec<&str> = expanded.iter().map(|(t, _)| t.as_str()).collect();
    assert!(tokens.contains(&"b"));
    assert!(tokens.contains(&"c"));
    assert!(tokens.contains(&"d"));
    // 0.7^4 = 0.2401 < 0.3, so "e" must be pruned.
    assert!(!tokens.contains(&"e"));
}

#[test]
fn expand_sorts_by_confidence_then_alphabetically() {
    let mut e = InferenceEngine::new();
    e.assert_fact("related_to", "x", "zebra");
    e.assert_fact("related_to", "x", "apple");
    let expanded = e.expand_with_depth(&["x".to_string()], 1, 10);
    assert_eq!(expanded[0].1, expanded[1].1);
    assert_eq!(expanded[0].0, "apple");
    assert_eq!(expanded[1].0, "zebra");
}

#[test]
fn expand_respects_max_results_truncation() {
    let mut e = InferenceEngine::new();
    for i in 0..10 {
        e.assert_fact("related_to", "hub", &format!("leaf{i}"));
    }
    let expanded = e.expand_with_depth(&["hub".to_string()], 1, 3);
    assert_eq!(expanded.len(), 3);
}

#[test]
fn explain_renders_the_discovered_chain() {
    let e = engine();
    let text = e.explain("dog", "animal");
    assert!(text.contains("is_a(dog, mammal)"));
    assert!(text.contains("is_a(mammal, animal)"));
}

#[test]
fn explain_reports_absence_of_a_path() {
    let e = engine();
    let text = e.explain("dog", "umbrella");
    assert!(text.contains("no path"));
}
