//! Per-document structured extraction as handed over by the extraction
//! collaborator. Read-only to the core pipeline.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coding::ClinicalFinding;
use crate::ids::DocumentId;

/// Health-information type classification, from the fixed enumerated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiType {
    DischargeSummary,
    DiagnosticReport,
    OpConsultation,
    Prescription,
}

impl HiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DischargeSummary => "discharge_summary",
            Self::DiagnosticReport => "diagnostic_report",
            Self::OpConsultation => "op_consultation",
            Self::Prescription => "prescription",
        }
    }
}

/// Detector output: one HI type plus a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiTypeDetection {
    pub hi_type: HiType,
    pub confidence: f64,
}

/// Administrative gender, closed value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Default for Gender {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

/// Patient demographics carried by a source document.
///
/// Cardinality-1 fields reconciled during fusion; absent values stay `None`
/// rather than being guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Demographics {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    /// Patient identifier issued by the source system.
    pub patient_ref: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Encounter metadata carried by a source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterMeta {
    pub facility: Option<String>,
    pub attending: Option<String>,
    pub admitted: Option<NaiveDate>,
    pub discharged: Option<NaiveDate>,
    /// HI-type hint supplied by the upstream detector, if any.
    pub hi_type_hint: Option<HiType>,
    /// Insurance details recovered for claim assembly.
    pub insurer: Option<String>,
    pub insurance_id: Option<String>,
    /// Discharge medications, free-text one entry per medication.
    #[serde(default)]
    pub medications: Vec<String>,
    /// Procedures performed, free-text.
    #[serde(default)]
    pub procedures: Vec<String>,
}

impl EncounterMeta {
    /// Reference date for the recency tie-break: discharge date when
    /// present, admission date otherwise.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.discharged.or(self.admitted)
    }
}

/// One document's structured extraction, as produced by the extraction
/// collaborator and coded by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub id: DocumentId,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub encounter: EncounterMeta,
    #[serde(default)]
    pub findings: Vec<ClinicalFinding>,
    /// Raw free-text sections keyed by heading.
    #[serde(default)]
    pub sections: BTreeMap<String, String>,
    /// Original source bytes, kept for document-reference embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_bytes: Option<Vec<u8>>,
}
