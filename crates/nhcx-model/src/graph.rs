//! Resource graph model for document-shaped bundles.
//!
//! Resources are a closed tagged-variant set rather than freeform nested
//! maps: each variant carries named typed fields, and unmodeled data rides
//! in a generic extension side-channel. The serialized form is an ordered
//! entry array with the Composition first; entry order and local-id
//! stability are wire-compatibility contracts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::coding::Coding;
use crate::document::Gender;
use crate::ids::LocalId;

/// Closed set of resource types a bundle graph may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Composition,
    Patient,
    Organization,
    Practitioner,
    Encounter,
    Condition,
    Observation,
    DiagnosticReport,
    MedicationRequest,
    DocumentReference,
    Provenance,
    Claim,
    Coverage,
    CoverageEligibilityRequest,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composition => "Composition",
            Self::Patient => "Patient",
            Self::Organization => "Organization",
            Self::Practitioner => "Practitioner",
            Self::Encounter => "Encounter",
            Self::Condition => "Condition",
            Self::Observation => "Observation",
            Self::DiagnosticReport => "DiagnosticReport",
            Self::MedicationRequest => "MedicationRequest",
            Self::DocumentReference => "DocumentReference",
            Self::Provenance => "Provenance",
            Self::Claim => "Claim",
            Self::Coverage => "Coverage",
            Self::CoverageEligibilityRequest => "CoverageEligibilityRequest",
        }
    }
}

/// A code plus free text, as used for condition and observation codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding: Option<Coding>,
    pub text: String,
}

/// One section of a Composition: a titled group of entry references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub code: Coding,
    #[serde(default)]
    pub entries: Vec<LocalId>,
    /// Generated narrative for the section.
    pub narrative: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionFields {
    pub status: String,
    /// HI-type classification coding; absent when the detector could not
    /// classify the document confidently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Coding>,
    /// Document-profile URL for the classified HI type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<LocalId>,
    pub author: Option<LocalId>,
    pub custodian: Option<LocalId>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PractitionerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterFields {
    pub status: String,
    /// Encounter class code, e.g. `IMP` for inpatient.
    pub class: String,
    pub subject: Option<LocalId>,
    pub service_provider: Option<LocalId>,
    pub participant: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionFields {
    pub clinical_status: String,
    pub verification_status: String,
    pub category: String,
    pub code: CodeableText,
    pub subject: Option<LocalId>,
}

/// Observation result value: numeric quantity or verbatim text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationValue {
    Quantity { value: f64, unit: String },
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationFields {
    pub status: String,
    pub code: CodeableText,
    pub subject: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ObservationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    /// Interpretation code (`H`/`L`) when the source flagged the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReportFields {
    pub status: String,
    pub code: CodeableText,
    pub subject: Option<LocalId>,
    pub performer: Option<LocalId>,
    #[serde(default)]
    pub results: Vec<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationRequestFields {
    pub status: String,
    pub intent: String,
    pub medication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    pub subject: Option<LocalId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentReferenceFields {
    pub status: String,
    pub doc_type: CodeableText,
    pub subject: Option<LocalId>,
    pub date: Option<DateTime<Utc>>,
    pub content_type: String,
    pub title: String,
    /// Base64-encoded source bytes, when embedding was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceFields {
    #[serde(default)]
    pub targets: Vec<LocalId>,
    pub recorded: Option<DateTime<Utc>>,
    pub agent: Option<LocalId>,
    pub activity: String,
    /// Source document labels recorded for the audit trail.
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimFields {
    pub status: String,
    /// `claim` or `preauthorization`.
    pub use_kind: String,
    pub patient: Option<LocalId>,
    pub provider: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
    #[serde(default)]
    pub diagnosis: Vec<LocalId>,
    /// Billed items, free-text product/service labels.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageFields {
    pub status: String,
    pub subscriber: Option<LocalId>,
    pub beneficiary: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageEligibilityFields {
    pub status: String,
    pub purpose: String,
    pub patient: Option<LocalId>,
    pub provider: Option<LocalId>,
    pub coverage: Option<LocalId>,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Typed fields of a resource, tagged by resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum ResourceFields {
    Composition(CompositionFields),
    Patient(PatientFields),
    Organization(OrganizationFields),
    Practitioner(PractitionerFields),
    Encounter(EncounterFields),
    Condition(ConditionFields),
    Observation(ObservationFields),
    DiagnosticReport(DiagnosticReportFields),
    MedicationRequest(MedicationRequestFields),
    DocumentReference(DocumentReferenceFields),
    Provenance(ProvenanceFields),
    Claim(ClaimFields),
    Coverage(CoverageFields),
    CoverageEligibilityRequest(CoverageEligibilityFields),
}

impl ResourceFields {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Composition(_) => ResourceType::Composition,
            Self::Patient(_) => ResourceType::Patient,
            Self::Organization(_) => ResourceType::Organization,
            Self::Practitioner(_) => ResourceType::Practitioner,
            Self::Encounter(_) => ResourceType::Encounter,
            Self::Condition(_) => ResourceType::Condition,
            Self::Observation(_) => ResourceType::Observation,
            Self::DiagnosticReport(_) => ResourceType::DiagnosticReport,
            Self::MedicationRequest(_) => ResourceType::MedicationRequest,
            Self::DocumentReference(_) => ResourceType::DocumentReference,
            Self::Provenance(_) => ResourceType::Provenance,
            Self::Claim(_) => ResourceType::Claim,
            Self::Coverage(_) => ResourceType::Coverage,
            Self::CoverageEligibilityRequest(_) => ResourceType::CoverageEligibilityRequest,
        }
    }
}

/// One entry of a bundle graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub local_id: LocalId,
    #[serde(flatten)]
    pub fields: ResourceFields,
    /// Unmodeled attributes carried through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ResourceNode {
    pub fn new(local_id: LocalId, fields: ResourceFields) -> Self {
        Self {
            local_id,
            fields,
            extensions: BTreeMap::new(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.fields.resource_type()
    }

    /// All outgoing references of this node, in field order.
    pub fn references(&self) -> Vec<LocalId> {
        let mut refs = Vec::new();
        let push = |refs: &mut Vec<LocalId>, id: &Option<LocalId>| {
            if let Some(id) = id {
                refs.push(*id);
            }
        };
        match &self.fields {
            ResourceFields::Composition(f) => {
                push(&mut refs, &f.subject);
                push(&mut refs, &f.author);
                push(&mut refs, &f.custodian);
                for section in &f.sections {
                    refs.extend(section.entries.iter().copied());
                }
            }
            ResourceFields::Patient(_)
            | ResourceFields::Organization(_)
            | ResourceFields::Practitioner(_) => {}
            ResourceFields::Encounter(f) => {
                push(&mut refs, &f.subject);
                push(&mut refs, &f.service_provider);
                push(&mut refs, &f.participant);
            }
            ResourceFields::Condition(f) => push(&mut refs, &f.subject),
            ResourceFields::Observation(f) => push(&mut refs, &f.subject),
            ResourceFields::DiagnosticReport(f) => {
                push(&mut refs, &f.subject);
                push(&mut refs, &f.performer);
                refs.extend(f.results.iter().copied());
            }
            ResourceFields::MedicationRequest(f) => push(&mut refs, &f.subject),
            ResourceFields::DocumentReference(f) => push(&mut refs, &f.subject),
            ResourceFields::Provenance(f) => {
                refs.extend(f.targets.iter().copied());
                push(&mut refs, &f.agent);
            }
            ResourceFields::Claim(f) => {
                push(&mut refs, &f.patient);
                push(&mut refs, &f.provider);
                refs.extend(f.diagnosis.iter().copied());
            }
            ResourceFields::Coverage(f) => {
                push(&mut refs, &f.subscriber);
                push(&mut refs, &f.beneficiary);
            }
            ResourceFields::CoverageEligibilityRequest(f) => {
                push(&mut refs, &f.patient);
                push(&mut refs, &f.provider);
                push(&mut refs, &f.coverage);
            }
        }
        refs
    }
}

/// Bundle mode: plain document, claim submission, or preauthorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleMode {
    Document,
    Claim,
    Preauthorization,
}

impl BundleMode {
    pub fn is_claim(&self) -> bool {
        matches!(self, Self::Claim | Self::Preauthorization)
    }
}

/// An ordered, referentially-closed resource graph.
///
/// Invariants maintained by the builder and checked by the validator:
/// exactly one Composition, at entry 0; every reference resolves to a
/// local id present in the graph; no duplicate local ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleGraph {
    pub id: String,
    pub mode: BundleMode,
    pub authored: DateTime<Utc>,
    pub entries: Vec<ResourceNode>,
}

impl BundleGraph {
    /// The Composition entry, when the graph has one at position 0.
    pub fn composition(&self) -> Option<&ResourceNode> {
        self.entries
            .first()
            .filter(|node| node.resource_type() == ResourceType::Composition)
    }

    /// Set of all local ids present in the graph (duplicates collapse).
    pub fn local_ids(&self) -> BTreeSet<LocalId> {
        self.entries.iter().map(|node| node.local_id).collect()
    }

    /// Nodes of a given resource type, in entry order.
    pub fn nodes_of(&self, resource_type: ResourceType) -> impl Iterator<Item = &ResourceNode> {
        self.entries
            .iter()
            .filter(move |node| node.resource_type() == resource_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
