use nhcx_model::graph::{ObservationFields, ObservationValue, PatientFields};
use nhcx_model::{
    BundleGraph, BundleMode, CodeableText, Coding, CodingSystem, CompositionFields, Gender,
    LocalIdAllocator, ResourceFields, ResourceNode, ResourceType, Section,
};

fn sample_graph() -> BundleGraph {
    let mut alloc = LocalIdAllocator::new();
    let composition_id = alloc.allocate();
    let patient_id = alloc.allocate();
    let observation_id = alloc.allocate();

    let composition = ResourceNode::new(
        composition_id,
        ResourceFields::Composition(CompositionFields {
            status: "final".to_string(),
            category: Some(Coding::new(
                CodingSystem::SnomedCt,
                "4241000179101",
                "Diagnostic report",
            )),
            title: "Diagnostic Report".to_string(),
            subject: Some(patient_id),
            sections: vec![Section {
                title: "Laboratory Results".to_string(),
                code: Coding::new(CodingSystem::Loinc, "30954-2", "Relevant diagnostic tests"),
                entries: vec![observation_id],
                narrative: "See Observation resources".to_string(),
            }],
            ..CompositionFields::default()
        }),
    );
    let patient = ResourceNode::new(
        patient_id,
        ResourceFields::Patient(PatientFields {
            name: Some("A Patient".to_string()),
            gender: Gender::Female,
            ..PatientFields::default()
        }),
    );
    let observation = ResourceNode::new(
        observation_id,
        ResourceFields::Observation(ObservationFields {
            status: "final".to_string(),
            code: CodeableText {
                coding: Some(Coding::new(
                    CodingSystem::Loinc,
                    "718-7",
                    "Hemoglobin [Mass/volume] in Blood",
                )),
                text: "Haemoglobin".to_string(),
            },
            subject: Some(patient_id),
            value: Some(ObservationValue::Quantity {
                value: 11.2,
                unit: "g/dL".to_string(),
            }),
            ..ObservationFields::default()
        }),
    );

    BundleGraph {
        id: "bundle-1".to_string(),
        mode: BundleMode::Document,
        authored: chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp"),
        entries: vec![composition, patient, observation],
    }
}

#[test]
fn graph_round_trips_through_json() {
    let graph = sample_graph();
    let json = serde_json::to_string(&graph).expect("serialize graph");
    let back: BundleGraph = serde_json::from_str(&json).expect("deserialize graph");
    assert_eq!(back, graph);
}

#[test]
fn composition_is_first_entry() {
    let graph = sample_graph();
    let composition = graph.composition().expect("composition present");
    assert_eq!(composition.resource_type(), ResourceType::Composition);
    assert_eq!(composition.local_id.to_string(), "res-1");
}

#[test]
fn references_collect_typed_fields() {
    let graph = sample_graph();
    let composition = &graph.entries[0];
    let refs: Vec<String> = composition
        .references()
        .iter()
        .map(|id| id.to_string())
        .collect();
    // subject plus one section entry
    assert_eq!(refs, vec!["res-2".to_string(), "res-3".to_string()]);

    let ids = graph.local_ids();
    for node in &graph.entries {
        for target in node.references() {
            assert!(ids.contains(&target), "reference {target} must resolve");
        }
    }
}

#[test]
fn wire_entries_carry_resource_type_tag() {
    let graph = sample_graph();
    let value = serde_json::to_value(&graph).expect("to_value");
    let entries = value["entries"].as_array().expect("entries array");
    assert_eq!(entries[0]["resource_type"], "Composition");
    assert_eq!(entries[0]["local_id"], "res-1");
    assert_eq!(entries[2]["resource_type"], "Observation");
}

#[test]
fn extensions_survive_round_trip() {
    let mut graph = sample_graph();
    graph.entries[1]
        .extensions
        .insert("ward".to_string(), serde_json::json!("B-12"));
    let json = serde_json::to_string(&graph).expect("serialize");
    let back: BundleGraph = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(
        back.entries[1].extensions.get("ward"),
        Some(&serde_json::json!("B-12"))
    );
}
