//! Validation issues and the readiness score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

/// One validation finding. Errors block submission readiness; warnings and
/// information entries do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Stable machine-readable issue code, e.g. `composition_missing`.
    pub code: String,
    pub message: String,
    /// Dotted location inside the bundle, e.g. `entries[3].Observation.value`.
    pub location: String,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            location: location.into(),
        }
    }
}

/// Scoring categories of the readiness rubric. Weights sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    RequiredResources,
    CodingCoverage,
    CompositionMetadata,
    ReferentialIntegrity,
}

impl ScoreCategory {
    pub const ALL: [Self; 4] = [
        Self::RequiredResources,
        Self::CodingCoverage,
        Self::CompositionMetadata,
        Self::ReferentialIntegrity,
    ];

    /// Maximum points this category contributes to the total.
    pub fn weight(&self) -> f64 {
        match self {
            Self::RequiredResources => 30.0,
            Self::CodingCoverage => 30.0,
            Self::CompositionMetadata => 20.0,
            Self::ReferentialIntegrity => 20.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiredResources => "required_resources",
            Self::CodingCoverage => "coding_coverage",
            Self::CompositionMetadata => "composition_metadata",
            Self::ReferentialIntegrity => "referential_integrity",
        }
    }
}

/// Weighted 0–100 submission-readiness score with its category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    pub total: u8,
    /// Points earned per category; each bounded by the category weight.
    pub breakdown: BTreeMap<ScoreCategory, f64>,
}

impl ReadinessScore {
    /// Builds a score from category points, rounding the clamped sum.
    pub fn from_breakdown(breakdown: BTreeMap<ScoreCategory, f64>) -> Self {
        let sum: f64 = breakdown.values().sum();
        let total = sum.round().clamp(0.0, 100.0) as u8;
        Self { total, breakdown }
    }

    pub fn category(&self, category: ScoreCategory) -> f64 {
        self.breakdown.get(&category).copied().unwrap_or(0.0)
    }
}

/// Validation outcome: ordered issues plus the readiness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub score: ReadinessScore,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Ready for submission: no blocking errors.
    pub fn is_submission_ready(&self) -> bool {
        !self.has_errors()
    }
}
