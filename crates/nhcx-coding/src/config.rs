//! Tunable matcher thresholds.
//!
//! These are operating points, not contracts: deployments may tighten or
//! relax them without affecting determinism.

/// Thresholds steering candidate retention and code acceptance.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Candidates scoring below this are discarded entirely.
    pub min_score: f64,
    /// The top candidate becomes the chosen code only at or above this.
    pub accept_threshold: f64,
    /// Jaro-Winkler floor for the last-resort fuzzy stage.
    pub fuzzy_threshold: f64,
    /// Maximum candidates kept per finding.
    pub max_candidates: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            accept_threshold: 0.60,
            fuzzy_threshold: 0.85,
            max_candidates: 5,
        }
    }
}

impl MatchConfig {
    /// Stricter acceptance for submission-critical coding.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            min_score: 0.50,
            accept_threshold: 0.80,
            fuzzy_threshold: 0.90,
            max_candidates: 3,
        }
    }

    /// Relaxed acceptance for exploratory lookup.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            min_score: 0.25,
            accept_threshold: 0.50,
            fuzzy_threshold: 0.80,
            max_candidates: 10,
        }
    }
}
