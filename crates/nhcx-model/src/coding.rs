//! Clinical coding types shared by the matcher, fusion, and bundle stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

/// Coding systems the offline matcher and the bundle builder emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodingSystem {
    Icd10,
    Loinc,
    SnomedCt,
}

impl CodingSystem {
    /// Canonical system URI as it appears on the wire.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Icd10 => "http://hl7.org/fhir/sid/icd-10",
            Self::Loinc => "http://loinc.org",
            Self::SnomedCt => "http://snomed.info/sct",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icd10 => "ICD-10",
            Self::Loinc => "LOINC",
            Self::SnomedCt => "SNOMED CT",
        }
    }
}

/// A single system/code/display triple as serialized into resource fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

impl Coding {
    pub fn new(system: CodingSystem, code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            system: system.uri().to_string(),
            code: code.into(),
            display: display.into(),
        }
    }
}

/// Kind of clinical finding, selecting the matching dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Diagnosis,
    LabResult,
    Procedure,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::LabResult => "lab_result",
            Self::Procedure => "procedure",
        }
    }
}

/// A scored dictionary match for a finding.
///
/// Candidates are ordered by score descending with deterministic tie-breaks
/// (specificity rank, then code length, then code), so the candidate list of
/// a finding is a total order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCode {
    pub system: CodingSystem,
    pub code: String,
    pub display: String,
    /// Match score in `[0, 1]`; `1.0` only for exact normalized-term hits.
    pub score: f64,
    /// Higher rank means a more specific dictionary term.
    pub specificity_rank: u8,
}

/// High/low interpretation flag carried on lab findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AbnormalFlag {
    High,
    Low,
}

impl AbnormalFlag {
    /// Single-letter interpretation code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::High => "H",
            Self::Low => "L",
        }
    }
}

/// One coded clinical finding extracted from a source document.
///
/// Immutable once produced by the coding stage except for the lazy `chosen`
/// assignment; uncertainty is carried in `needs_review` rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalFinding {
    pub kind: FindingKind,
    pub raw_text: String,
    #[serde(default)]
    pub normalized_text: String,
    /// Ordered candidate list produced by the matcher (best first).
    #[serde(default)]
    pub candidates: Vec<CandidateCode>,
    /// Top candidate, set only when its score met the acceptance threshold.
    #[serde(default)]
    pub chosen: Option<CandidateCode>,
    /// Set when no candidate met the acceptance threshold.
    #[serde(default)]
    pub needs_review: bool,
    pub source_document: DocumentId,
    /// Observation date, when the source document carried one.
    #[serde(default)]
    pub observed: Option<NaiveDate>,
    /// Lab payload: result value as printed on the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abnormal_flag: Option<AbnormalFlag>,
}

impl ClinicalFinding {
    /// Concept identity key: same system and code means the same concept.
    ///
    /// Findings without a resolved code have no concept identity.
    pub fn concept_key(&self) -> Option<(CodingSystem, &str)> {
        self.chosen.as_ref().map(|c| (c.system, c.code.as_str()))
    }
}
