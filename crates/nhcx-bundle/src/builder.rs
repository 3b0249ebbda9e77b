//! Assembles a document-shaped resource graph from one coded document or a
//! fused record.
//!
//! Entry 0 is always the Composition; every other resource is linked to the
//! patient and, via section entries, back to the Composition. Local ids are
//! allocated monotonically in emission order, so referential closure holds
//! by construction. The builder performs no I/O and samples no clocks:
//! identical inputs produce identical graphs.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use tracing::info;

use nhcx_model::graph::{
    ClaimFields, CoverageEligibilityFields, CoverageFields, DiagnosticReportFields,
    DocumentReferenceFields, EncounterFields, MedicationRequestFields, ObservationFields,
    ObservationValue, OrganizationFields, PatientFields, PractitionerFields, ProvenanceFields,
};
use nhcx_model::{
    BundleGraph, BundleMode, ClinicalFinding, CodeableText, Coding, CodingSystem,
    CompositionFields, ConditionFields, Demographics, DocumentId, EncounterMeta,
    ExtractedDocument, FindingKind, FusedRecord, HiType, LocalId, LocalIdAllocator,
    ResourceFields, ResourceNode, Section,
};
use nhcx_standards::hash::sha256_hex;
use nhcx_standards::{hi_type_profile, systems};

/// Default claim line when no procedure was extracted.
const DEFAULT_CLAIM_ITEM: &str = "Inpatient Treatment";

/// Build-time options. The authored timestamp is an explicit input so the
/// builder stays a pure function.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub mode: BundleMode,
    /// HI-type classification from the detector; `None` when the document
    /// could not be classified confidently.
    pub hi_type: Option<HiType>,
    pub authored: DateTime<Utc>,
    /// Embed original source bytes into DocumentReference entries.
    pub embed_sources: bool,
}

impl BundleOptions {
    pub fn new(mode: BundleMode, hi_type: Option<HiType>, authored: DateTime<Utc>) -> Self {
        Self {
            mode,
            hi_type,
            authored,
            embed_sources: true,
        }
    }

    #[must_use]
    pub fn without_source_embedding(mut self) -> Self {
        self.embed_sources = false;
        self
    }
}

/// One source document's attachment payload for the document-reference
/// entries.
#[derive(Debug, Clone, Copy)]
pub struct SourceAttachment<'a> {
    pub document: &'a DocumentId,
    pub bytes: Option<&'a [u8]>,
}

/// Builds referentially-closed bundle graphs.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    options: BundleOptions,
}

impl BundleBuilder {
    pub fn new(options: BundleOptions) -> Self {
        Self { options }
    }

    /// Builds from a single coded document.
    pub fn build_from_document(&self, document: &ExtractedDocument) -> BundleGraph {
        let attachments = [SourceAttachment {
            document: &document.id,
            bytes: document.source_bytes.as_deref(),
        }];
        self.build(
            &document.demographics,
            &document.encounter,
            &document.findings,
            &attachments,
        )
    }

    /// Builds from a fused record plus the original source attachments.
    pub fn build_from_fused(
        &self,
        fused: &FusedRecord,
        attachments: &[SourceAttachment<'_>],
    ) -> BundleGraph {
        self.build(
            &fused.demographics,
            &fused.encounter,
            &fused.findings,
            attachments,
        )
    }

    fn build(
        &self,
        demographics: &Demographics,
        encounter: &EncounterMeta,
        findings: &[ClinicalFinding],
        attachments: &[SourceAttachment<'_>],
    ) -> BundleGraph {
        let mut alloc = LocalIdAllocator::new();
        // Entry 0 belongs to the Composition; its id is allocated first so
        // ids stay aligned with entry order.
        let composition_id = alloc.allocate();
        let mut entries: Vec<ResourceNode> = Vec::new();

        let patient_id = alloc.allocate();
        entries.push(ResourceNode::new(
            patient_id,
            ResourceFields::Patient(PatientFields {
                identifier: demographics.patient_ref.clone(),
                name: demographics.name.clone(),
                gender: demographics.gender.unwrap_or_default(),
                birth_date: demographics.birth_date,
                phone: demographics.phone.clone(),
                address: demographics.address.clone(),
            }),
        ));

        let organization_id = encounter.facility.as_ref().map(|facility| {
            let id = alloc.allocate();
            entries.push(ResourceNode::new(
                id,
                ResourceFields::Organization(OrganizationFields {
                    identifier: Some(provider_identifier(facility)),
                    name: facility.clone(),
                    address: None,
                }),
            ));
            id
        });

        let practitioner_id = encounter.attending.as_ref().map(|attending| {
            let id = alloc.allocate();
            entries.push(ResourceNode::new(
                id,
                ResourceFields::Practitioner(PractitionerFields {
                    identifier: None,
                    name: attending.clone(),
                }),
            ));
            id
        });

        // An Encounter node only carries weight when the source reported a
        // stay period.
        if encounter.admitted.is_some() || encounter.discharged.is_some() {
            let id = alloc.allocate();
            entries.push(ResourceNode::new(
                id,
                ResourceFields::Encounter(EncounterFields {
                    status: "finished".to_string(),
                    class: "IMP".to_string(),
                    subject: Some(patient_id),
                    service_provider: organization_id,
                    participant: practitioner_id,
                    period_start: encounter.admitted,
                    period_end: encounter.discharged,
                }),
            ));
        }

        let mut condition_ids = Vec::new();
        let mut observation_ids = Vec::new();
        for finding in findings {
            match finding.kind {
                FindingKind::Diagnosis => {
                    let id = alloc.allocate();
                    entries.push(condition_node(id, finding, patient_id));
                    condition_ids.push(id);
                }
                FindingKind::LabResult => {
                    let id = alloc.allocate();
                    entries.push(observation_node(id, finding, patient_id));
                    observation_ids.push(id);
                }
                // Procedures have no standalone resource shape here; they
                // surface as claim items via the encounter metadata.
                FindingKind::Procedure => {}
            }
        }

        if !observation_ids.is_empty() {
            let id = alloc.allocate();
            entries.push(ResourceNode::new(
                id,
                ResourceFields::DiagnosticReport(DiagnosticReportFields {
                    status: "final".to_string(),
                    code: CodeableText {
                        coding: Some(Coding::new(
                            CodingSystem::Loinc,
                            "11502-2",
                            "Laboratory report",
                        )),
                        text: "Laboratory report".to_string(),
                    },
                    subject: Some(patient_id),
                    performer: practitioner_id,
                    results: observation_ids.clone(),
                    conclusion: None,
                }),
            ));
        }

        let mut medication_ids = Vec::new();
        for medication in &encounter.medications {
            let id = alloc.allocate();
            entries.push(ResourceNode::new(
                id,
                ResourceFields::MedicationRequest(MedicationRequestFields {
                    status: "active".to_string(),
                    intent: "order".to_string(),
                    medication: medication.clone(),
                    dosage: None,
                    subject: Some(patient_id),
                }),
            ));
            medication_ids.push(id);
        }

        self.push_claim_entries(
            &mut alloc,
            &mut entries,
            encounter,
            patient_id,
            organization_id,
            &condition_ids,
        );

        let mut reference_ids = Vec::new();
        for attachment in attachments {
            let id = alloc.allocate();
            entries.push(self.document_reference_node(id, attachment, patient_id));
            reference_ids.push(id);
        }

        let provenance_id = alloc.allocate();
        let mut targets: Vec<LocalId> = vec![composition_id];
        targets.extend(entries.iter().map(|node| node.local_id));
        entries.push(ResourceNode::new(
            provenance_id,
            ResourceFields::Provenance(ProvenanceFields {
                targets,
                recorded: Some(self.options.authored),
                agent: practitioner_id,
                activity: "CREATE".to_string(),
                sources: attachments
                    .iter()
                    .map(|a| a.document.as_str().to_string())
                    .collect(),
            }),
        ));

        let composition = self.composition_node(
            composition_id,
            patient_id,
            practitioner_id,
            organization_id,
            &condition_ids,
            &observation_ids,
            &medication_ids,
        );
        entries.insert(0, composition);

        let graph = BundleGraph {
            id: bundle_id(attachments, self.options.mode),
            mode: self.options.mode,
            authored: self.options.authored,
            entries,
        };
        info!(
            entries = graph.len(),
            mode = ?graph.mode,
            "assembled bundle graph"
        );
        graph
    }

    fn push_claim_entries(
        &self,
        alloc: &mut LocalIdAllocator,
        entries: &mut Vec<ResourceNode>,
        encounter: &EncounterMeta,
        patient_id: LocalId,
        organization_id: Option<LocalId>,
        condition_ids: &[LocalId],
    ) {
        let items = if encounter.procedures.is_empty() {
            vec![DEFAULT_CLAIM_ITEM.to_string()]
        } else {
            encounter.procedures.clone()
        };

        match self.options.mode {
            BundleMode::Document => {}
            BundleMode::Claim => {
                let id = alloc.allocate();
                entries.push(ResourceNode::new(
                    id,
                    ResourceFields::Claim(ClaimFields {
                        status: "active".to_string(),
                        use_kind: "claim".to_string(),
                        patient: Some(patient_id),
                        provider: organization_id,
                        insurer: encounter.insurer.clone(),
                        diagnosis: condition_ids.to_vec(),
                        items,
                        total: None,
                        currency: None,
                    }),
                ));
            }
            BundleMode::Preauthorization => {
                let coverage_id = alloc.allocate();
                entries.push(ResourceNode::new(
                    coverage_id,
                    ResourceFields::Coverage(CoverageFields {
                        status: "active".to_string(),
                        subscriber: Some(patient_id),
                        beneficiary: Some(patient_id),
                        subscriber_id: encounter.insurance_id.clone(),
                        payor: encounter.insurer.clone(),
                    }),
                ));
                let request_id = alloc.allocate();
                entries.push(ResourceNode::new(
                    request_id,
                    ResourceFields::CoverageEligibilityRequest(CoverageEligibilityFields {
                        status: "active".to_string(),
                        purpose: "benefits".to_string(),
                        patient: Some(patient_id),
                        provider: organization_id,
                        coverage: Some(coverage_id),
                        items,
                    }),
                ));
            }
        }
    }

    fn document_reference_node(
        &self,
        id: LocalId,
        attachment: &SourceAttachment<'_>,
        patient_id: LocalId,
    ) -> ResourceNode {
        let (loinc_code, loinc_display) = match self.options.hi_type {
            Some(hi_type) => {
                let profile = hi_type_profile(hi_type);
                (profile.loinc_code, profile.loinc_display)
            }
            None => ("34105-7", "Hospital Discharge summary"),
        };
        let data = if self.options.embed_sources {
            attachment.bytes.map(|bytes| BASE64.encode(bytes))
        } else {
            None
        };
        ResourceNode::new(
            id,
            ResourceFields::DocumentReference(DocumentReferenceFields {
                status: "current".to_string(),
                doc_type: CodeableText {
                    coding: Some(Coding::new(CodingSystem::Loinc, loinc_code, loinc_display)),
                    text: loinc_display.to_string(),
                },
                subject: Some(patient_id),
                date: Some(self.options.authored),
                content_type: "application/pdf".to_string(),
                title: attachment.document.as_str().to_string(),
                data,
            }),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn composition_node(
        &self,
        id: LocalId,
        patient_id: LocalId,
        practitioner_id: Option<LocalId>,
        organization_id: Option<LocalId>,
        condition_ids: &[LocalId],
        observation_ids: &[LocalId],
        medication_ids: &[LocalId],
    ) -> ResourceNode {
        let (category, profile, title) = match self.options.hi_type {
            Some(hi_type) => {
                let p = hi_type_profile(hi_type);
                (
                    Some(Coding {
                        system: systems::SNOMED.to_string(),
                        code: p.snomed_code.to_string(),
                        display: p.snomed_display.to_string(),
                    }),
                    Some(p.composition_profile.to_string()),
                    p.display.to_string(),
                )
            }
            None => (None, None, "Clinical Document".to_string()),
        };

        let mut sections = Vec::new();
        if !condition_ids.is_empty() {
            sections.push(Section {
                title: "Diagnoses".to_string(),
                code: Coding::new(CodingSystem::Loinc, "29548-5", "Diagnosis"),
                entries: condition_ids.to_vec(),
                narrative: "See Condition resources".to_string(),
            });
        }
        if !observation_ids.is_empty() {
            sections.push(Section {
                title: "Laboratory Results".to_string(),
                code: Coding::new(CodingSystem::Loinc, "30954-2", "Relevant diagnostic tests"),
                entries: observation_ids.to_vec(),
                narrative: "See Observation resources".to_string(),
            });
        }
        if !medication_ids.is_empty() {
            sections.push(Section {
                title: "Medications on Discharge".to_string(),
                code: Coding::new(CodingSystem::Loinc, "75311-1", "Discharge medications"),
                entries: medication_ids.to_vec(),
                narrative: "See MedicationRequest resources".to_string(),
            });
        }

        ResourceNode::new(
            id,
            ResourceFields::Composition(CompositionFields {
                status: "final".to_string(),
                category,
                profile,
                title,
                date: Some(self.options.authored),
                subject: Some(patient_id),
                author: practitioner_id,
                custodian: organization_id,
                sections,
            }),
        )
    }
}

fn condition_node(id: LocalId, finding: &ClinicalFinding, patient_id: LocalId) -> ResourceNode {
    ResourceNode::new(
        id,
        ResourceFields::Condition(ConditionFields {
            clinical_status: "active".to_string(),
            verification_status: "confirmed".to_string(),
            category: "encounter-diagnosis".to_string(),
            code: finding_code(finding),
            subject: Some(patient_id),
        }),
    )
}

fn observation_node(id: LocalId, finding: &ClinicalFinding, patient_id: LocalId) -> ResourceNode {
    let value = finding.value.as_ref().map(|raw| {
        match raw.replace(',', "").trim().parse::<f64>() {
            Ok(number) => ObservationValue::Quantity {
                value: number,
                unit: finding.unit.clone().unwrap_or_default(),
            },
            Err(_) => ObservationValue::Text(raw.clone()),
        }
    });
    ResourceNode::new(
        id,
        ResourceFields::Observation(ObservationFields {
            status: "final".to_string(),
            code: finding_code(finding),
            subject: Some(patient_id),
            value,
            reference_range: finding.reference_range.clone(),
            interpretation: finding.abnormal_flag.map(|f| f.code().to_string()),
        }),
    )
}

/// Resolved code when accepted, otherwise free text only; uncertainty stays
/// visible to the validator instead of being papered over.
fn finding_code(finding: &ClinicalFinding) -> CodeableText {
    CodeableText {
        coding: finding
            .chosen
            .as_ref()
            .map(|c| Coding::new(c.system, c.code.clone(), c.display.clone())),
        text: finding.raw_text.clone(),
    }
}

/// Uppercased, underscored provider identifier, truncated like upstream
/// registry identifiers.
fn provider_identifier(facility: &str) -> String {
    let mut id: String = facility
        .trim()
        .to_uppercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    id.truncate(30);
    id
}

/// Deterministic bundle id derived from the source set and mode.
fn bundle_id(attachments: &[SourceAttachment<'_>], mode: BundleMode) -> String {
    let mut canonical = String::new();
    for attachment in attachments {
        canonical.push_str(attachment.document.as_str());
        canonical.push('\n');
    }
    canonical.push_str(match mode {
        BundleMode::Document => "document",
        BundleMode::Claim => "claim",
        BundleMode::Preauthorization => "preauthorization",
    });
    format!("bundle-{}", &sha256_hex(canonical.as_bytes())[..12])
}
