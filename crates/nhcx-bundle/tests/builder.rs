use chrono::{DateTime, NaiveDate, Utc};

use nhcx_bundle::{BundleBuilder, BundleOptions, SourceAttachment};
use nhcx_model::{
    BundleMode, CandidateCode, ClinicalFinding, CodingSystem, Demographics, DocumentId,
    EncounterMeta, ExtractedDocument, FindingKind, Gender, HiType, ResourceFields, ResourceType,
};

fn authored() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
}

fn diagnosis_finding(doc: &str, raw: &str, code: &str) -> ClinicalFinding {
    let chosen = CandidateCode {
        system: CodingSystem::Icd10,
        code: code.to_string(),
        display: raw.to_string(),
        score: 1.0,
        specificity_rank: 4,
    };
    ClinicalFinding {
        kind: FindingKind::Diagnosis,
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

fn discharge_document() -> ExtractedDocument {
    ExtractedDocument {
        id: DocumentId::new("discharge-1").expect("id"),
        demographics: Demographics {
            name: Some("Asha Rao".to_string()),
            gender: Some(Gender::Female),
            birth_date: NaiveDate::from_ymd_opt(1975, 2, 14),
            ..Demographics::default()
        },
        encounter: EncounterMeta {
            admitted: NaiveDate::from_ymd_opt(2024, 3, 1),
            discharged: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..EncounterMeta::default()
        },
        findings: vec![diagnosis_finding(
            "discharge-1",
            "Type 2 Diabetes Mellitus",
            "E11.9",
        )],
        sections: Default::default(),
        source_bytes: Some(b"%PDF-1.4 fake".to_vec()),
    }
}

#[test]
fn discharge_summary_emits_expected_nodes() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Document,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let graph = builder.build_from_document(&discharge_document());

    let types: Vec<ResourceType> = graph.entries.iter().map(|n| n.resource_type()).collect();
    assert_eq!(
        types,
        vec![
            ResourceType::Composition,
            ResourceType::Patient,
            ResourceType::Encounter,
            ResourceType::Condition,
            ResourceType::DocumentReference,
            ResourceType::Provenance,
        ]
    );
}

#[test]
fn minimal_document_emits_five_nodes() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Document,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let mut document = discharge_document();
    document.encounter = EncounterMeta::default();
    let graph = builder.build_from_document(&document);

    let types: Vec<ResourceType> = graph.entries.iter().map(|n| n.resource_type()).collect();
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
}

#[test]
fn composition_is_first_with_hi_type_category() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Document,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let graph = builder.build_from_document(&discharge_document());

    let composition = graph.composition().expect("composition at entry 0");
    let ResourceFields::Composition(fields) = &composition.fields else {
        panic!("entry 0 must be a Composition");
    };
    let category = fields.category.as_ref().expect("category present");
    assert_eq!(category.code, "373942005");
    assert_eq!(category.system, "http://snomed.info/sct");
    assert_eq!(fields.sections.len(), 1);
    assert_eq!(fields.sections[0].title, "Diagnoses");
}

#[test]
fn unclassified_document_builds_without_category() {
    let builder = BundleBuilder::new(BundleOptions::new(BundleMode::Document, None, authored()));
    let graph = builder.build_from_document(&discharge_document());
    let ResourceFields::Composition(fields) = &graph.entries[0].fields else {
        panic!("entry 0 must be a Composition");
    };
    assert!(fields.category.is_none());
    assert!(fields.profile.is_none());
}

#[test]
fn references_are_closed_and_ids_unique() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Claim,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let mut document = discharge_document();
    document.encounter.facility = Some("City Hospital".to_string());
    document.encounter.attending = Some("Dr Mehta".to_string());
    document.encounter.medications = vec!["Metformin 500mg".to_string()];
    let graph = builder.build_from_document(&document);

    let ids = graph.local_ids();
    assert_eq!(ids.len(), graph.len(), "no duplicate local ids");
    for node in &graph.entries {
        for target in node.references() {
            assert!(ids.contains(&target), "dangling reference {target}");
        }
    }
    assert_eq!(
        graph.nodes_of(ResourceType::Composition).count(),
        1,
        "exactly one Composition"
    );
    assert_eq!(graph.nodes_of(ResourceType::Claim).count(), 1);
}

#[test]
fn preauthorization_links_eligibility_to_coverage() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Preauthorization,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let mut document = discharge_document();
    document.encounter.insurer = Some("Star Health".to_string());
    document.encounter.insurance_id = Some("POL-991".to_string());
    let graph = builder.build_from_document(&document);

    let coverage = graph
        .nodes_of(ResourceType::Coverage)
        .next()
        .expect("coverage node");
    let request = graph
        .nodes_of(ResourceType::CoverageEligibilityRequest)
        .next()
        .expect("eligibility node");
    assert!(request.references().contains(&coverage.local_id));
    assert_eq!(graph.nodes_of(ResourceType::Claim).count(), 0);
}

#[test]
fn source_bytes_embed_as_base64_unless_disabled() {
    let options = BundleOptions::new(
        BundleMode::Document,
        Some(HiType::DischargeSummary),
        authored(),
    );
    let document = discharge_document();

    let embedded = BundleBuilder::new(options.clone()).build_from_document(&document);
    let node = embedded
        .nodes_of(ResourceType::DocumentReference)
        .next()
        .expect("document reference");
    let ResourceFields::DocumentReference(fields) = &node.fields else {
        panic!("document reference fields");
    };
    assert_eq!(fields.data.as_deref(), Some("JVBERi0xLjQgZmFrZQ=="));

    let stripped =
        BundleBuilder::new(options.without_source_embedding()).build_from_document(&document);
    let node = stripped
        .nodes_of(ResourceType::DocumentReference)
        .next()
        .expect("document reference");
    let ResourceFields::DocumentReference(fields) = &node.fields else {
        panic!("document reference fields");
    };
    assert!(fields.data.is_none());
}

#[test]
fn identical_inputs_build_identical_graphs() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Document,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let document = discharge_document();
    assert_eq!(
        builder.build_from_document(&document),
        builder.build_from_document(&document)
    );
}

#[test]
fn fused_record_attachments_become_document_references() {
    let builder = BundleBuilder::new(BundleOptions::new(
        BundleMode::Claim,
        Some(HiType::DischargeSummary),
        authored(),
    ));
    let document = discharge_document();
    let fused = nhcx_fusion_stub(&document);
    let other = DocumentId::new("lab-1").expect("id");
    let attachments = [
        SourceAttachment {
            document: &document.id,
            bytes: document.source_bytes.as_deref(),
        },
        SourceAttachment {
            document: &other,
            bytes: None,
        },
    ];
    let graph = builder.build_from_fused(&fused, &attachments);
    assert_eq!(graph.nodes_of(ResourceType::DocumentReference).count(), 2);
}

/// Minimal fused record mirroring a single document, enough for the
/// builder which only reads demographics/encounter/findings.
fn nhcx_fusion_stub(document: &ExtractedDocument) -> nhcx_model::FusedRecord {
    nhcx_model::FusedRecord {
        demographics: document.demographics.clone(),
        encounter: document.encounter.clone(),
        findings: document.findings.clone(),
        conflicts: Vec::new(),
        sources: vec![document.id.clone()],
        provenance: Default::default(),
        finding_sources: Default::default(),
    }
}
