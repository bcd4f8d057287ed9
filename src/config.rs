//! Engine configuration (`spec.md` §C, ambient stack).
//!
//! `EngineConfig` bundles every tunable named across the analytics, ranking,
//! autotune, and signals modules into one serde-friendly overlay type. Every
//! field is `Option` so a partial config (e.g. a project-level override file)
//! can be merged onto a base without clobbering unset fields. Loading a
//! config from a concrete path, a CLI flag, or the network is a
//! collaborator's concern; this module only defines the shape and the merge
//! semantics.

use crate::analytics::{DampingConfig, PmiParams};
use crate::autotune::rules::RuleThresholds;
use crate::autotune::stopwords::StopwordThresholds;
use crate::autotune::AutotuneOptions;
use crate::ranking::RankingWeights;
use crate::signals::SignalThresholds;
use serde::{Deserialize, Serialize};

/// An all-optional overlay of every tunable the engine exposes. Unset fields
/// fall back to the underlying component's own `Default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub epsilon: Option<f64>,
    pub use_npmi: Option<bool>,
    pub min_df: Option<u64>,
    pub window: Option<usize>,

    pub neighbor_threshold: Option<f64>,
    pub low_density: Option<f64>,
    pub high_density: Option<f64>,
    pub min_factor: Option<f64>,

    pub alpha_pmi: Option<f64>,
    pub beta_cats: Option<f64>,
    pub gamma_recency: Option<f64>,
    pub eta_authority: Option<f64>,
    pub delta_len: Option<f64>,
    pub half_life_days: Option<f64>,

    pub max_iterations: Option<usize>,
    pub stopword_df_percent: Option<f64>,
    pub stopword_pmi_max: Option<f64>,
    pub stopword_cat_entropy: Option<f64>,
    pub stopword_bootstrap_df_percent: Option<f64>,

    pub rule_min_pmi: Option<f64>,
    pub rule_min_support: Option<u64>,
    pub rule_confidence_floor: Option<f64>,

    pub compute_drift: Option<bool>,
    pub min_coverage: Option<f64>,
    pub min_orphan_df_share: Option<f64>,

    pub signal_min_strength: Option<f64>,
    pub signal_max_joint_pmi: Option<f64>,
    pub signal_min_surprise: Option<f64>,
    pub signal_prediction_k: Option<usize>,

    pub expand_depth: Option<usize>,
    pub expand_cap: Option<usize>,
}

impl EngineConfig {
    /// Overlays `other`'s `Some` fields onto `self`, leaving fields `other`
    /// leaves unset untouched. Later configs in a layering chain win.
    pub fn merge(&mut self, other: EngineConfig) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(epsilon);
        take!(use_npmi);
        take!(min_df);
        take!(window);
        take!(neighbor_threshold);
        take!(low_density);
        take!(high_density);
        take!(min_factor);
        take!(alpha_pmi);
        take!(beta_cats);
        take!(gamma_recency);
        take!(eta_authority);
        take!(delta_len);
        take!(half_life_days);
        take!(max_iterations);
        take!(stopword_df_percent);
        take!(stopword_pmi_max);
        take!(stopword_cat_entropy);
        take!(stopword_bootstrap_df_percent);
        take!(rule_min_pmi);
        take!(rule_min_support);
        take!(rule_confidence_floor);
        take!(compute_drift);
        take!(min_coverage);
        take!(min_orphan_df_share);
        take!(signal_min_strength);
        take!(signal_max_joint_pmi);
        take!(signal_min_surprise);
        take!(signal_prediction_k);
        take!(expand_depth);
        take!(expand_cap);
    }

    pub fn pmi_params(&self) -> PmiParams {
        let default = PmiParams::default();
        PmiParams {
            epsilon: self.epsilon.unwrap_or(default.epsilon),
            use_npmi: self.use_npmi.unwrap_or(default.use_npmi),
            min_df: self.min_df.unwrap_or(default.min_df),
        }
    }

    pub fn damping_config(&self) -> DampingConfig {
        let default = DampingConfig::default();
        DampingConfig {
            neighbor_threshold: self.neighbor_threshold.unwrap_or(default.neighbor_threshold),
            low_density: self.low_density.unwrap_or(default.low_density),
            high_density: self.high_density.unwrap_or(default.high_density),
            min_factor: self.min_factor.unwrap_or(default.min_factor),
        }
    }

    pub fn ranking_weights(&self) -> RankingWeights {
        let default = RankingWeights::default();
        RankingWeights {
            alpha_pmi: self.alpha_pmi.unwrap_or(default.alpha_pmi),
            beta_cats: self.beta_cats.unwrap_or(default.beta_cats),
            gamma_recency: self.gamma_recency.unwrap_or(default.gamma_recency),
            eta_authority: self.eta_authority.unwrap_or(default.eta_authority),
            delta_len: self.delta_len.unwrap_or(default.delta_len),
            half_life_days: self.half_life_days.unwrap_or(default.half_life_days),
        }
    }

    pub fn stopword_thresholds(&self) -> StopwordThresholds {
        let default = StopwordThresholds::default();
        StopwordThresholds {
            df_percent: self.stopword_df_percent.unwrap_or(default.df_percent),
            pmi_max: self.stopword_pmi_max.unwrap_or(default.pmi_max),
            cat_entropy: self.stopword_cat_entropy.unwrap_or(default.cat_entropy),
            bootstrap_df_percent: self
                .stopword_bootstrap_df_percent
                .unwrap_or(default.bootstrap_df_percent),
        }
    }

    pub fn rule_thresholds(&self) -> RuleThresholds {
        let default = RuleThresholds::default();
        RuleThresholds {
            min_pmi: self.rule_min_pmi.unwrap_or(default.min_pmi),
            min_support: self.rule_min_support.unwrap_or(default.min_support),
            confidence_floor: self.rule_confidence_floor.unwrap_or(default.confidence_floor),
        }
    }

    pub fn signal_thresholds(&self) -> SignalThresholds {
        let default = SignalThresholds::default();
        SignalThresholds {
            min_strength: self.signal_min_strength.unwrap_or(default.min_strength),
            max_joint_pmi: self.signal_max_joint_pmi.unwrap_or(default.max_joint_pmi),
            min_surprise: self.signal_min_surprise.unwrap_or(default.min_surprise),
            prediction_k: self.signal_prediction_k.unwrap_or(default.prediction_k),
        }
    }

    pub fn autotune_options(&self) -> AutotuneOptions {
        let default = AutotuneOptions::default();
        AutotuneOptions {
            max_iterations: self.max_iterations.unwrap_or(default.max_iterations),
            window: self.window.unwrap_or(default.window),
            damping: self.damping_config(),
            pmi: self.pmi_params(),
            stopword_thresholds: self.stopword_thresholds(),
            rule_thresholds: self.rule_thresholds(),
            compute_drift: self.compute_drift.unwrap_or(default.compute_drift),
            min_coverage: self.min_coverage.unwrap_or(default.min_coverage),
            min_orphan_df_share: self.min_orphan_df_share.unwrap_or(default.min_orphan_df_share),
        }
    }

    pub fn expand_depth(&self) -> usize {
        self.expand_depth.unwrap_or(2)
    }

    pub fn expand_cap(&self) -> usize {
        self.expand_cap.unwrap_or(50)
    }
}
