pub mod coding;
pub mod document;
pub mod error;
pub mod fusion;
pub mod graph;
pub mod ids;
pub mod report;

pub use coding::{AbnormalFlag, CandidateCode, ClinicalFinding, Coding, CodingSystem, FindingKind};
pub use document::{
    Demographics, EncounterMeta, ExtractedDocument, Gender, HiType, HiTypeDetection,
};
pub use error::{ExtractionError, ModelError};
pub use fusion::{Conflict, ConflictValue, FusedRecord, Resolution, ResolutionRule};
pub use graph::{
    BundleGraph, BundleMode, CodeableText, CompositionFields, ConditionFields, ResourceFields,
    ResourceNode, ResourceType, Section,
};
pub use ids::{DocumentId, LocalId, LocalIdAllocator};
pub use report::{ReadinessScore, ScoreCategory, Severity, ValidationIssue, ValidationReport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn document_id_rejects_blank() {
        assert!(DocumentId::new("  ").is_err());
        let id = DocumentId::new(" doc-a ").expect("valid id");
        assert_eq!(id.as_str(), "doc-a");
    }

    #[test]
    fn local_id_wire_form_round_trips() {
        let mut alloc = LocalIdAllocator::new();
        let first = alloc.allocate();
        let second = alloc.allocate();
        assert_eq!(first.to_string(), "res-1");
        assert!(first < second);

        let json = serde_json::to_string(&second).expect("serialize");
        assert_eq!(json, "\"res-2\"");
        let back: LocalId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, second);
    }

    #[test]
    fn readiness_score_clamps_and_rounds() {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(ScoreCategory::RequiredResources, 30.0);
        breakdown.insert(ScoreCategory::CodingCoverage, 29.6);
        let score = ReadinessScore::from_breakdown(breakdown);
        assert_eq!(score.total, 60);
        assert_eq!(score.category(ScoreCategory::ReferentialIntegrity), 0.0);
    }

    #[test]
    fn category_weights_sum_to_hundred() {
        let sum: f64 = ScoreCategory::ALL.iter().map(ScoreCategory::weight).sum();
        assert!((sum - 100.0).abs() < f64::EPSILON);
    }
}
