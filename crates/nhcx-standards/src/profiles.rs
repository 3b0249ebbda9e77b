//! Exchange profile constants: HI-type classification codes, resource
//! profile URLs, and coding-system URIs.
//!
//! Single source of truth — resource builders and validators must take
//! these from here rather than hardcoding URLs.

use nhcx_model::{HiType, ResourceType};

/// Fixed classification profile of one health-information type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiTypeProfile {
    pub hi_type: HiType,
    pub display: &'static str,
    /// SNOMED CT classification code mandated for the Composition category.
    pub snomed_code: &'static str,
    pub snomed_display: &'static str,
    /// LOINC document-type code used on the DocumentReference.
    pub loinc_code: &'static str,
    pub loinc_display: &'static str,
    pub bundle_profile: &'static str,
    pub composition_profile: &'static str,
}

const PROFILES: [HiTypeProfile; 4] = [
    HiTypeProfile {
        hi_type: HiType::DischargeSummary,
        display: "Discharge Summary",
        snomed_code: "373942005",
        snomed_display: "Discharge summary",
        loinc_code: "34105-7",
        loinc_display: "Hospital Discharge summary",
        bundle_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DischargeSummaryRecord",
        composition_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DischargeSummary",
    },
    HiTypeProfile {
        hi_type: HiType::DiagnosticReport,
        display: "Diagnostic Report",
        snomed_code: "4241000179101",
        snomed_display: "Diagnostic report",
        loinc_code: "11502-2",
        loinc_display: "Laboratory report",
        bundle_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DiagnosticReportRecord",
        composition_profile:
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DiagnosticReportComposition",
    },
    HiTypeProfile {
        hi_type: HiType::OpConsultation,
        display: "OP Consultation",
        snomed_code: "371530004",
        snomed_display: "Clinical consultation report",
        loinc_code: "11488-4",
        loinc_display: "Consultation note",
        bundle_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/OPConsultRecord",
        composition_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/OPConsultation",
    },
    HiTypeProfile {
        hi_type: HiType::Prescription,
        display: "Prescription",
        snomed_code: "440545006",
        snomed_display: "Prescription record",
        loinc_code: "57833-6",
        loinc_display: "Prescription for medication",
        bundle_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/PrescriptionRecord",
        composition_profile: "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Prescription",
    },
];

/// Classification profile for an HI type.
pub fn hi_type_profile(hi_type: HiType) -> &'static HiTypeProfile {
    match hi_type {
        HiType::DischargeSummary => &PROFILES[0],
        HiType::DiagnosticReport => &PROFILES[1],
        HiType::OpConsultation => &PROFILES[2],
        HiType::Prescription => &PROFILES[3],
    }
}

/// NRCeS structure-definition URL for a resource type.
pub fn resource_profile(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Composition => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DischargeSummary"
        }
        ResourceType::Patient => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Patient",
        ResourceType::Organization => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Organization"
        }
        ResourceType::Practitioner => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Practitioner"
        }
        ResourceType::Encounter => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Encounter",
        ResourceType::Condition => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Condition",
        ResourceType::Observation => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Observation"
        }
        ResourceType::DiagnosticReport => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DiagnosticReportLab"
        }
        ResourceType::MedicationRequest => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/MedicationRequest"
        }
        ResourceType::DocumentReference => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/DocumentReference"
        }
        ResourceType::Provenance => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Provenance",
        ResourceType::Claim => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Claim",
        ResourceType::Coverage => "https://nrces.in/ndhm/fhir/r4/StructureDefinition/Coverage",
        ResourceType::CoverageEligibilityRequest => {
            "https://nrces.in/ndhm/fhir/r4/StructureDefinition/CoverageEligibilityRequest"
        }
    }
}

/// Coding-system and identifier-system URIs used on the wire.
pub mod systems {
    pub const SNOMED: &str = "http://snomed.info/sct";
    pub const LOINC: &str = "http://loinc.org";
    pub const ICD10: &str = "http://hl7.org/fhir/sid/icd-10";
    pub const UCUM: &str = "http://unitsofmeasure.org";
    pub const CONDITION_CLINICAL: &str =
        "http://terminology.hl7.org/CodeSystem/condition-clinical";
    pub const CONDITION_CATEGORY: &str =
        "http://terminology.hl7.org/CodeSystem/condition-category";
    pub const OBSERVATION_INTERPRETATION: &str =
        "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation";
    pub const ENCOUNTER_CLASS: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
    pub const NHCX_PROVIDER: &str = "https://nhcx.health.gov.in/providers";
    pub const NHCX_INSURER: &str = "https://nhcx.health.gov.in/insurers";
    pub const NDHM_PATIENT: &str = "https://ndhm.gov.in/patients";
    pub const NDHM_PRACTITIONER: &str = "https://ndhm.gov.in/practitioners";
}
