//! Rule mining (`spec.md` §4.I, second half) — promotes high-PMI,
//! high-support token pairs into dictionary entries and inference facts.

use crate::analytics::PairStat;

const DEFAULT_MIN_PMI: f64 = 0.8;
const DEFAULT_MIN_SUPPORT: u64 = 5;
const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.6;
const DEFAULT_RELATION: &str = "related_to";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    pub min_pmi: f64,
    pub min_support: u64,
    pub confidence_floor: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            min_pmi: DEFAULT_MIN_PMI,
            min_support: DEFAULT_MIN_SUPPORT,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSuggestion {
    pub a: String,
    pub b: String,
    pub relation: String,
    pub confidence: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Retains pairs clearing `min_pmi` and `min_support`, scoring each with
/// `confidence = 0.6 * sigmoid(PMI - min_pmi) + 0.4 * sigmoid(support -
/// min_support)`, and keeps those at or above `confidence_floor`.
pub fn mine_rules(pairs: &[PairStat], thresholds: &RuleThresholds) -> Vec<RuleSuggestion> {
    let mut out = Vec::new();
    for pair in pairs {
        if pair.damped_pmi < thresholds.min_pmi || pair.support < thresholds.min_support {
            continue;
        }
        let confidence = 0.6 * sigmoid(pair.damped_pmi - thresholds.min_pmi)
            + 0.4 * sigmoid(pair.support as f64 - thresholds.min_support as f64);
        if confidence < thresholds.confidence_floor {
            continue;
        }
        out.push(RuleSuggestion {
            a: pair.a.clone(),
            b: pair.b.clone(),
            relation: DEFAULT_RELATION.to_string(),
            confidence,
        });
    }
    out
}
