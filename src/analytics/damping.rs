//! Density damping (`spec.md` §4.C, §4.D, §9) — down-weights hub tokens
//! whose neighbor count makes up a large share of the vocabulary.

/// Damping curve configuration. Defaults are tuned for NPMI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampingConfig {
    /// Raw-score threshold a pair must clear to count toward a token's
    /// neighbor count.
    pub neighbor_threshold: f64,
    pub low_density: f64,
    pub high_density: f64,
    pub min_factor: f64,
}

impl Default for DampingConfig {
    fn default() -> Self {
        Self {
            neighbor_threshold: 0.05,
            low_density: 0.3,
            high_density: 0.6,
            min_factor: 0.1,
        }
    }
}

impl DampingConfig {
    /// Density ratio = neighbor_count / vocab_size. `vocab_size == 0`
    /// degenerates to a ratio of 0 (no damping).
    pub fn density_ratio(&self, neighbor_count: usize, vocab_size: usize) -> f64 {
        if vocab_size == 0 {
            return 0.0;
        }
        neighbor_count as f64 / vocab_size as f64
    }

    /// The smoothstep-interpolated damping factor for a given density ratio,
    /// always in `[min_factor, 1.0]`.
    pub fn factor_for_ratio(&self, ratio: f64) -> f64 {
        if ratio <= self.low_density {
            return 1.0;
        }
        if ratio >= self.high_density {
            return self.min_factor;
        }
        let t = (ratio - self.low_density) / (self.high_density - self.low_density);
        let smooth = t * t * (3.0 - 2.0 * t);
        1.0 - smooth * (1.0 - self.min_factor)
    }

    /// Convenience: damping factor directly from neighbor_count/vocab_size.
    pub fn factor(&self, neighbor_count: usize, vocab_size: usize) -> f64 {
        self.factor_for_ratio(self.density_ratio(neighbor_count, vocab_size))
    }

    /// Damped pair score: `raw * sqrt(d_a * d_b)`.
    pub fn damp_pair(&self, raw: f64, d_a: f64, d_b: f64) -> f64 {
        raw * (d_a * d_b).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_density_is_undamped() {
        let cfg = DampingConfig::default();
        assert_eq!(cfg.factor_for_ratio(0.0), 1.0);
        assert_eq!(cfg.factor_for_ratio(0.3), 1.0);
    }

    #[test]
    fn high_density_hits_floor() {
        let cfg = DampingConfig::default();
        assert_eq!(cfg.factor_for_ratio(0.6), cfg.min_factor);
        assert_eq!(cfg.factor_for_ratio(1.0), cfg.min_factor);
    }

    #[test]
    fn mid_density_is_monotonic_and_bounded() {
        let cfg = DampingConfig::default();
        let f1 = cfg.factor_for_ratio(0.35);
        let f2 = cfg.factor_for_ratio(0.5);
        let f3 = cfg.factor_for_ratio(0.55);
        assert!(f1 >= f2 && f2 >= f3);
        for f in [f1, f2, f3] {
            assert!(f >= cfg.min_factor && f <= 1.0);
        }
    }

    #[test]
    fn damp_pair_scales_by_geometric_mean() {
        let cfg = DampingConfig::default();
        assert!((cfg.damp_pair(1.0, 1.0, 1.0) - 1.0).abs() < 1e-9);
        assert!((cfg.damp_pair(2.0, 0.25, 1.0) - 1.0).abs() < 1e-9);
    }
}
