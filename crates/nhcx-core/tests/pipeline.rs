//! End-to-end pipeline behavior over the JSON document source.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use nhcx_core::{
    ClaimOutcome, ConvertError, ConvertOptions, DocumentInput, DocumentSource, JsonDocumentSource,
    Pipeline,
};
use nhcx_model::{
    BundleMode, ClinicalFinding, CodingSystem, Demographics, DocumentId, EncounterMeta,
    ExtractedDocument, ExtractionError, FindingKind, Gender, HiType, ResourceType, ScoreCategory,
};
use nhcx_standards::TerminologyRegistry;

fn authored() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
}

fn raw_finding(doc: &str, kind: FindingKind, raw: &str) -> ClinicalFinding {
    ClinicalFinding {
        kind,
        raw_text: raw.to_string(),
        normalized_text: String::new(),
        candidates: Vec::new(),
        chosen: None,
        needs_review: false,
        source_document: DocumentId::new(doc).expect("id"),
        observed: None,
        value: None,
        unit: None,
        reference_range: None,
        abnormal_flag: None,
    }
}

fn discharge_payload(id: &str, birth: (i32, u32, u32), discharged: (i32, u32, u32)) -> Vec<u8> {
    let document = ExtractedDocument {
        id: DocumentId::new(id).expect("id"),
        demographics: Demographics {
            name: Some("Asha Rao".to_string()),
            gender: Some(Gender::Female),
            birth_date: NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2),
            ..Demographics::default()
        },
        encounter: EncounterMeta {
            discharged: NaiveDate::from_ymd_opt(discharged.0, discharged.1, discharged.2),
            ..EncounterMeta::default()
        },
        findings: vec![raw_finding(id, FindingKind::Diagnosis, "Type 2 Diabetes Mellitus")],
        sections: Default::default(),
        source_bytes: None,
    };
    serde_json::to_vec(&document).expect("serialize payload")
}

fn pipeline() -> Pipeline<JsonDocumentSource> {
    Pipeline::new(
        JsonDocumentSource::new(),
        Arc::new(TerminologyRegistry::builtin()),
    )
}

fn input(id: &str, bytes: Vec<u8>, hint: Option<HiType>) -> DocumentInput {
    DocumentInput {
        id: DocumentId::new(id).expect("id"),
        bytes,
        hi_type_hint: hint,
    }
}

#[test]
fn single_discharge_summary_converts_cleanly() {
    let minimal = {
        let document = ExtractedDocument {
            id: DocumentId::new("doc-a").expect("id"),
            demographics: Demographics {
                name: Some("Asha Rao".to_string()),
                gender: Some(Gender::Female),
                birth_date: NaiveDate::from_ymd_opt(1975, 2, 14),
                ..Demographics::default()
            },
            encounter: EncounterMeta::default(),
            findings: vec![raw_finding(
                "doc-a",
                FindingKind::Diagnosis,
                "Type 2 Diabetes Mellitus",
            )],
            sections: Default::default(),
            source_bytes: None,
        };
        serde_json::to_vec(&document).expect("serialize payload")
    };

    let outcome = pipeline()
        .convert(
            input("doc-a", minimal, Some(HiType::DischargeSummary)),
            &ConvertOptions::new(BundleMode::Document, authored()),
        )
        .expect("conversion succeeds");

    let finding = &outcome.document.findings[0];
    let chosen = finding.chosen.as_ref().expect("code accepted");
    assert_eq!(chosen.code, "E11.9");
    assert!((chosen.score - 1.0).abs() < f64::EPSILON);

    let types: Vec<ResourceType> = outcome
        .bundle
        .entries
        .iter()
        .map(|n| n.resource_type())
        .collect();
    assert_eq!(
        types,
        vec![
            ResourceType::Composition,
            ResourceType::Patient,
            ResourceType::Condition,
            ResourceType::DocumentReference,
            ResourceType::Provenance,
        ]
    );
    assert_eq!(outcome.report.error_count(), 0);
    assert!(outcome.report.score.total >= 90);
}

#[test]
fn claim_fusion_prefers_the_later_encounter() {
    let inputs = vec![
        input(
            "doc-a",
            discharge_payload("doc-a", (1980, 5, 1), (2024, 1, 10)),
            Some(HiType::DischargeSummary),
        ),
        input(
            "doc-b",
            discharge_payload("doc-b", (1980, 5, 11), (2024, 3, 2)),
            Some(HiType::DischargeSummary),
        ),
    ];

    let outcome: ClaimOutcome = pipeline()
        .convert_claim(inputs, &ConvertOptions::new(BundleMode::Claim, authored()))
        .expect("claim conversion succeeds");

    assert_eq!(
        outcome.fused.demographics.birth_date,
        NaiveDate::from_ymd_opt(1980, 5, 11),
        "later encounter wins"
    );
    let conflict = outcome
        .fused
        .conflicts
        .iter()
        .find(|c| c.field_path == "demographics.birth_date")
        .expect("conflict recorded");
    assert_eq!(conflict.values.len(), 2);
    assert_eq!(
        conflict.resolution.as_ref().expect("resolved").rule.as_str(),
        "most-recent-encounter"
    );
    assert!(outcome.failed_documents.is_empty());
    assert_eq!(
        outcome.bundle.nodes_of(ResourceType::Claim).count(),
        1,
        "claim mode emits a Claim resource"
    );
}

#[test]
fn unclassified_document_still_converts_with_category_error() {
    let outcome = pipeline()
        .convert(
            input(
                "doc-a",
                discharge_payload("doc-a", (1980, 5, 1), (2024, 1, 10)),
                None,
            ),
            &ConvertOptions::new(BundleMode::Document, authored()),
        )
        .expect("conversion proceeds without classification");

    assert_eq!(outcome.hi_type, None);
    assert!(
        outcome
            .report
            .issues
            .iter()
            .any(|i| i.code == "composition_category_missing")
    );
    assert_eq!(
        outcome.report.score.category(ScoreCategory::CompositionMetadata),
        0.0
    );
    // Coding still ran: the finding is coded even without classification.
    assert!(outcome.document.findings[0].chosen.is_some());
}

/// Source that fails a named document and delegates the rest.
struct FlakySource {
    inner: JsonDocumentSource,
    failing: DocumentId,
}

impl DocumentSource for FlakySource {
    fn extract(&self, input: &DocumentInput) -> Result<ExtractedDocument, ExtractionError> {
        if input.id == self.failing {
            return Err(ExtractionError::Failed {
                document: input.id.clone(),
                reason: "unreadable scan".to_string(),
            });
        }
        self.inner.extract(input)
    }
}

#[test]
fn one_failing_document_does_not_abort_the_claim() {
    let source = FlakySource {
        inner: JsonDocumentSource::new(),
        failing: DocumentId::new("doc-b").expect("id"),
    };
    let pipeline = Pipeline::new(source, Arc::new(TerminologyRegistry::builtin()));

    let inputs = vec![
        input(
            "doc-a",
            discharge_payload("doc-a", (1980, 5, 1), (2024, 1, 10)),
            Some(HiType::DischargeSummary),
        ),
        input("doc-b", b"not json".to_vec(), None),
    ];
    let outcome = pipeline
        .convert_claim(inputs, &ConvertOptions::new(BundleMode::Claim, authored()))
        .expect("remaining document proceeds");

    assert_eq!(outcome.failed_documents.len(), 1);
    assert_eq!(outcome.failed_documents[0].document().as_str(), "doc-b");
    assert_eq!(outcome.fused.sources.len(), 1);
    assert!(outcome.report.score.total > 0);
}

#[test]
fn all_documents_failing_is_a_hard_error() {
    let pipeline = pipeline();
    let inputs = vec![
        input("doc-a", b"not json".to_vec(), None),
        input("doc-b", b"also not json".to_vec(), None),
    ];
    let err = pipeline
        .convert_claim(inputs, &ConvertOptions::new(BundleMode::Claim, authored()))
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::AllDocumentsFailed { count: 2, .. }
    ));
}

/// Source that never answers within the test timeout.
struct StalledSource;

impl DocumentSource for StalledSource {
    fn extract(&self, input: &DocumentInput) -> Result<ExtractedDocument, ExtractionError> {
        std::thread::sleep(Duration::from_millis(500));
        Err(ExtractionError::Failed {
            document: input.id.clone(),
            reason: "too late anyway".to_string(),
        })
    }
}

#[test]
fn extraction_timeout_is_surfaced_by_document() {
    let pipeline = Pipeline::new(StalledSource, Arc::new(TerminologyRegistry::builtin()))
        .with_extraction_timeout(Duration::from_millis(50));
    let err = pipeline
        .convert(
            input("doc-slow", Vec::new(), None),
            &ConvertOptions::new(BundleMode::Document, authored()),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Extraction(ExtractionError::Timeout { .. })
    ));
}

#[test]
fn search_codes_delegates_to_the_matcher() {
    let pipeline = pipeline();
    let hits = pipeline.search_codes(CodingSystem::Loinc, "haemoglobin");
    assert_eq!(hits[0].code, "718-7");
    let diagnoses = pipeline.search_codes(CodingSystem::Icd10, "dengue");
    assert_eq!(diagnoses[0].code, "A90");
}
