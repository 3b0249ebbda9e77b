//! Fuses N coded documents describing the same patient/encounter into one
//! canonical record, surfacing every disagreement as an explicit conflict.
//!
//! Resolution never guesses: a cardinality-1 field is settled by the most
//! recent encounter, then by strict majority, and otherwise left empty with
//! an unresolved conflict. The tie-break chain plus canonical internal
//! ordering make the result identical for any supply order of the same
//! document set.

mod demographics;
mod findings;

use tracing::{info, warn};

use nhcx_model::{Conflict, ExtractedDocument, FusedRecord};

/// Fuses a document set into one canonical record.
///
/// Total: an empty slice yields an empty record, a single document passes
/// through with no conflicts.
pub fn fuse(documents: &[ExtractedDocument]) -> FusedRecord {
    // Canonical processing order, independent of supply order.
    let mut ordered: Vec<&ExtractedDocument> = documents.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let (demographics, encounter, mut conflicts, mut provenance) =
        demographics::reconcile(&ordered);
    let fused_findings = findings::merge(&ordered, &mut conflicts);

    for (path, document) in fused_findings.provenance {
        provenance.insert(path, document);
    }

    conflicts.sort_by(|a, b| a.field_path.cmp(&b.field_path));
    for conflict in conflicts.iter().filter(|c| !c.is_resolved()) {
        warn!(field = %conflict.field_path, "unresolved conflict");
    }
    info!(
        documents = ordered.len(),
        findings = fused_findings.findings.len(),
        conflicts = conflicts.len(),
        "fusion complete"
    );

    FusedRecord {
        demographics,
        encounter,
        findings: fused_findings.findings,
        conflicts,
        sources: ordered.iter().map(|d| d.id.clone()).collect(),
        provenance,
        finding_sources: fused_findings.sources,
    }
}

/// Builds a conflict entry from per-document values.
pub(crate) fn conflict(
    field_path: impl Into<String>,
    values: Vec<(nhcx_model::DocumentId, String)>,
    resolution: Option<nhcx_model::Resolution>,
) -> Conflict {
    Conflict {
        field_path: field_path.into(),
        values: values
            .into_iter()
            .map(|(document, value)| nhcx_model::ConflictValue { document, value })
            .collect(),
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nhcx_model::{Demographics, DocumentId, EncounterMeta, Gender};

    fn doc(id: &str, discharged: Option<(i32, u32, u32)>, birth: (i32, u32, u32)) -> ExtractedDocument {
        ExtractedDocument {
            id: DocumentId::new(id).expect("id"),
            demographics: Demographics {
                name: Some("Asha Rao".to_string()),
                gender: Some(Gender::Female),
                birth_date: NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2),
                ..Demographics::default()
            },
            encounter: EncounterMeta {
                discharged: discharged
                    .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
                ..EncounterMeta::default()
            },
            findings: Vec::new(),
            sections: Default::default(),
            source_bytes: None,
        }
    }

    #[test]
    fn later_encounter_wins_birth_date_dispute() {
        let a = doc("a", Some((2024, 1, 10)), (1980, 5, 1));
        let b = doc("b", Some((2024, 3, 2)), (1980, 5, 11));

        let fused = fuse(&[a.clone(), b.clone()]);
        assert_eq!(
            fused.demographics.birth_date,
            NaiveDate::from_ymd_opt(1980, 5, 11)
        );
        let conflict = fused
            .conflicts
            .iter()
            .find(|c| c.field_path == "demographics.birth_date")
            .expect("conflict recorded");
        assert_eq!(conflict.values.len(), 2);
        let resolution = conflict.resolution.as_ref().expect("resolved");
        assert_eq!(resolution.rule.as_str(), "most-recent-encounter");

        // Order independence.
        let reversed = fuse(&[b, a]);
        assert_eq!(fused, reversed);
    }

    #[test]
    fn unresolvable_dispute_leaves_field_empty() {
        let mut a = doc("a", None, (1980, 5, 1));
        let mut b = doc("b", None, (1980, 5, 11));
        a.demographics.name = Some("Asha Rao".to_string());
        b.demographics.name = Some("Usha Rao".to_string());

        let fused = fuse(&[a, b]);
        assert_eq!(fused.demographics.name, None);
        assert_eq!(fused.demographics.birth_date, None);
        let unresolved: Vec<_> = fused.unresolved_conflicts().collect();
        assert_eq!(unresolved.len(), 2);
    }

    #[test]
    fn fusing_a_duplicate_is_idempotent() {
        let a = doc("a", Some((2024, 1, 10)), (1980, 5, 1));
        let once = fuse(std::slice::from_ref(&a));
        let twice = fuse(&[a.clone(), a]);
        assert_eq!(once.demographics, twice.demographics);
        assert_eq!(once.findings, twice.findings);
        assert!(twice.unresolved_conflicts().next().is_none());
    }

    #[test]
    fn majority_settles_dateless_disputes() {
        let mut a = doc("a", None, (1980, 5, 1));
        let mut b = doc("b", None, (1980, 5, 1));
        let mut c = doc("c", None, (1980, 5, 11));
        a.encounter.facility = Some("City Hospital".to_string());
        b.encounter.facility = Some("City Hospital".to_string());
        c.encounter.facility = Some("Metro Clinic".to_string());

        let fused = fuse(&[c, b, a]);
        assert_eq!(
            fused.demographics.birth_date,
            NaiveDate::from_ymd_opt(1980, 5, 1)
        );
        assert_eq!(fused.encounter.facility.as_deref(), Some("City Hospital"));
        let birth = fused
            .conflicts
            .iter()
            .find(|c| c.field_path == "demographics.birth_date")
            .expect("conflict");
        assert_eq!(
            birth.resolution.as_ref().expect("resolved").rule.as_str(),
            "majority"
        );
    }
}
