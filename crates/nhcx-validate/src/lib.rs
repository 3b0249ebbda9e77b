//! Bundle validation and submission-readiness scoring.
//!
//! Checks the required-element subset needed for exchange submission and
//! computes a weighted 0–100 readiness score. Validation is total: a
//! missing Composition or a dangling reference is reported as an error
//! issue, never raised.

mod validator;

pub use validator::Validator;

#[cfg(test)]
mod tests {
    use super::*;
    use nhcx_model::{
        BundleGraph, BundleMode, CodeableText, Coding, CodingSystem, CompositionFields,
        ConditionFields, LocalIdAllocator, ResourceFields, ResourceNode, ScoreCategory,
    };

    fn graph_with(entries: Vec<ResourceNode>) -> BundleGraph {
        BundleGraph {
            id: "bundle-test".to_string(),
            mode: BundleMode::Document,
            authored: chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp"),
            entries,
        }
    }

    #[test]
    fn empty_graph_scores_zero_without_failing() {
        let report = Validator::new().validate(&graph_with(Vec::new()));
        assert!(report.has_errors());
        assert_eq!(report.score.total, 0);
        assert!(report.issues.iter().any(|i| i.code == "composition_missing"));
    }

    #[test]
    fn dangling_reference_is_an_error_not_a_fault() {
        let mut alloc = LocalIdAllocator::new();
        let composition_id = alloc.allocate();
        let ghost = {
            let mut other = LocalIdAllocator::new();
            other.allocate();
            other.allocate();
            other.allocate()
        };
        let composition = ResourceNode::new(
            composition_id,
            ResourceFields::Composition(CompositionFields {
                status: "final".to_string(),
                category: Some(Coding::new(CodingSystem::SnomedCt, "373942005", "Discharge summary")),
                title: "Discharge Summary".to_string(),
                subject: Some(ghost),
                ..CompositionFields::default()
            }),
        );
        let report = Validator::new().validate(&graph_with(vec![composition]));
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.code == "reference_target_missing")
        );
        assert_eq!(report.score.category(ScoreCategory::ReferentialIntegrity), 10.0);
    }

    #[test]
    fn resolving_a_code_never_lowers_coverage() {
        let mut alloc = LocalIdAllocator::new();
        let composition_id = alloc.allocate();
        let condition_id = alloc.allocate();
        let composition = ResourceNode::new(
            composition_id,
            ResourceFields::Composition(CompositionFields {
                status: "final".to_string(),
                category: Some(Coding::new(CodingSystem::SnomedCt, "373942005", "Discharge summary")),
                title: "Discharge Summary".to_string(),
                ..CompositionFields::default()
            }),
        );
        let uncoded = ResourceNode::new(
            condition_id,
            ResourceFields::Condition(ConditionFields {
                clinical_status: "active".to_string(),
                verification_status: "confirmed".to_string(),
                category: "encounter-diagnosis".to_string(),
                code: CodeableText {
                    coding: None,
                    text: "unclear diagnosis".to_string(),
                },
                subject: None,
            }),
        );
        let before = Validator::new()
            .validate(&graph_with(vec![composition.clone(), uncoded.clone()]));

        let mut coded = uncoded;
        if let ResourceFields::Condition(fields) = &mut coded.fields {
            fields.code.coding = Some(Coding::new(CodingSystem::Icd10, "E11.9", "T2DM"));
        }
        let after = Validator::new().validate(&graph_with(vec![composition, coded]));

        assert!(
            after.score.category(ScoreCategory::CodingCoverage)
                >= before.score.category(ScoreCategory::CodingCoverage)
        );
        assert_eq!(after.score.category(ScoreCategory::CodingCoverage), 30.0);
    }
}
