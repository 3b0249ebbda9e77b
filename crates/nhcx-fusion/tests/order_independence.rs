//! Supply-order independence of fusion.

use chrono::NaiveDate;
use nhcx_fusion::fuse;
use nhcx_model::{
    CandidateCode, ClinicalFinding, CodingSystem, Demographics, DocumentId, EncounterMeta,
    ExtractedDocument, FindingKind, Gender,
};

fn coded_finding(doc: &str, raw: &str, system: CodingSystem, code: &str) -> ClinicalFinding {
    let chosen = CandidateCode {
        system,
        code: code.to_string(),
        display: raw.to_string(),
        score: 1.0,
        specificity_rank: 2,
    };
    ClinicalFinding {
        kind: match system {
            CodingSystem::Loinc => FindingKind::LabResult,
            _ => FindingKind::Diagnosis,
        },
        raw_text: raw.to_string(),
        normalized_text: raw.to_lowercase(),
        candidates: vec![chosen.clone()],
        chosen: Some(chosen),
        needs_review: false,
        source_document: DocumentId::new(doc).expect("id"),
        observed: None,
        value: None,
        unit: None,
        reference_range: None,
        abnormal_flag: None,
    }
}

fn sample_documents() -> Vec<ExtractedDocument> {
    let discharge = ExtractedDocument {
        id: DocumentId::new("discharge").expect("id"),
        demographics: Demographics {
            name: Some("Asha Rao".to_string()),
            gender: Some(Gender::Female),
            birth_date: NaiveDate::from_ymd_opt(1975, 2, 14),
            ..Demographics::default()
        },
        encounter: EncounterMeta {
            facility: Some("City Hospital".to_string()),
            admitted: NaiveDate::from_ymd_opt(2024, 3, 1),
            discharged: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..EncounterMeta::default()
        },
        findings: vec![coded_finding(
            "discharge",
            "Type 2 Diabetes Mellitus",
            CodingSystem::Icd10,
            "E11.9",
        )],
        sections: Default::default(),
        source_bytes: None,
    };

    let lab = ExtractedDocument {
        id: DocumentId::new("lab").expect("id"),
        demographics: Demographics {
            name: Some("Asha Rao".to_string()),
            gender: Some(Gender::Female),
            birth_date: NaiveDate::from_ymd_opt(1975, 2, 4),
            ..Demographics::default()
        },
        encounter: EncounterMeta {
            facility: Some("City Hospital Laboratory".to_string()),
            discharged: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..EncounterMeta::default()
        },
        findings: vec![
            coded_finding("lab", "HbA1c", CodingSystem::Loinc, "4548-4"),
            coded_finding("lab", "Haemoglobin", CodingSystem::Loinc, "718-7"),
        ],
        sections: Default::default(),
        source_bytes: None,
    };

    let prescription = ExtractedDocument {
        id: DocumentId::new("rx").expect("id"),
        demographics: Demographics {
            name: Some("Asha Rao".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1975, 2, 14),
            ..Demographics::default()
        },
        encounter: EncounterMeta::default(),
        findings: vec![coded_finding(
            "rx",
            "Type 2 Diabetes Mellitus",
            CodingSystem::Icd10,
            "E11.9",
        )],
        sections: Default::default(),
        source_bytes: None,
    };

    vec![discharge, lab, prescription]
}

#[test]
fn every_permutation_fuses_identically() {
    let docs = sample_documents();
    let baseline = fuse(&docs);

    let permutations: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in permutations {
        let shuffled: Vec<ExtractedDocument> =
            order.iter().map(|&i| docs[i].clone()).collect();
        assert_eq!(fuse(&shuffled), baseline, "order {order:?} must not matter");
    }
}

#[test]
fn recency_settles_the_birth_date_dispute() {
    let docs = sample_documents();
    let fused = fuse(&docs);

    // discharge (2024-03-09) outranks lab (2024-03-05); rx carries no date.
    assert_eq!(
        fused.demographics.birth_date,
        NaiveDate::from_ymd_opt(1975, 2, 14)
    );
    let conflict = fused
        .conflicts
        .iter()
        .find(|c| c.field_path == "demographics.birth_date")
        .expect("recorded");
    assert_eq!(
        conflict.resolution.as_ref().expect("resolved").rule.as_str(),
        "most-recent-encounter"
    );

    // Shared concept E11.9 merged across discharge and rx.
    assert_eq!(
        fused
            .finding_sources
            .get("ICD-10 E11.9")
            .map(|docs| docs.len()),
        Some(2)
    );
    assert_eq!(fused.findings.len(), 3);
}
