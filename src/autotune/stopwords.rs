//! Iterative stopword discovery (`spec.md` §4.I, first half).

use crate::analytics::ComputedStats;
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopwordThresholds {
    pub df_percent: f64,
    pub pmi_max: f64,
    pub cat_entropy: f64,
    pub bootstrap_df_percent: f64,
}

impl Default for StopwordThresholds {
    fn default() -> Self {
        Self {
            df_percent: 50.0,
            pmi_max: 0.3,
            cat_entropy: 0.8,
            bootstrap_df_percent: 60.0,
        }
    }
}

/// A stopword candidate with the signal values that admitted it and an
/// aggregate score for ranking/review.
#[derive(Debug, Clone, PartialEq)]
pub struct StopwordCandidate {
    pub token: String,
    pub df_percent: f64,
    pub pmi_max: f64,
    pub cat_entropy: f64,
    pub high_df: bool,
    pub low_pmi: bool,
    pub high_entropy: bool,
    pub bootstrap: bool,
    pub score: f64,
}

/// Runs the three named tests (`HighDF`, `LowPMI`, `HighEntropy`) plus the
/// bootstrap fallback over every token in `df_percent`/`cat_entropy`,
/// admitting a token as a candidate if any test fires.
pub fn stopword_candidates(
    stats: &ComputedStats,
    df_percent: &AHashMap<String, f64>,
    cat_entropy: &AHashMap<String, f64>,
    thresholds: &StopwordThresholds,
) -> Vec<StopwordCandidate> {
    let mut out = Vec::new();
    for (token, &df_pct) in df_percent {
        let pmi = stats.pmi_max.get(token).copied().unwrap_or(0.0);
        let entropy = cat_entropy.get(token).copied().unwrap_or(0.0);

        let high_df = df_pct > thresholds.df_percent;
        let low_pmi = pmi < thresholds.pmi_max || pmi == 0.0;
        let high_entropy = entropy > thresholds.cat_entropy;
        let bootstrap = pmi == 0.0 && df_pct > thresholds.bootstrap_df_percent;

        if !(high_df || low_pmi || high_entropy || bootstrap) {
            continue;
        }

        let score = ((df_pct / 100.0) + (1.0 - pmi) + entropy) / 3.0;
        out.push(StopwordCandidate {
            token: token.clone(),
            df_percent: df_pct,
            pmi_max: pmi,
            cat_entropy: entropy,
            high_df,
            low_pmi,
            high_entropy,
            bootstrap,
            score,
        });
    }
    out
}
