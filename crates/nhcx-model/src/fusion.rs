//! Fusion output types: the canonical record and its conflict ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coding::ClinicalFinding;
use crate::document::{Demographics, EncounterMeta};
use crate::ids::DocumentId;

/// Rule that resolved a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionRule {
    MostRecentEncounter,
    Majority,
}

impl ResolutionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MostRecentEncounter => "most-recent-encounter",
            Self::Majority => "majority",
        }
    }
}

/// One document's value for a disputed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictValue {
    pub document: DocumentId,
    pub value: String,
}

/// How a conflict was settled, when it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub value: String,
    pub rule: ResolutionRule,
}

/// A detected disagreement between source documents over one logical field
/// or concept. `resolution: None` means the disagreement stands and the
/// fused field was left empty (or, for disputed codes, both kept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Dotted path of the disputed field, e.g. `demographics.birth_date`
    /// or `findings.<normalized text>.code`.
    pub field_path: String,
    pub values: Vec<ConflictValue>,
    pub resolution: Option<Resolution>,
}

impl Conflict {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Canonical record produced by fusing N coded documents.
///
/// Identical for any supply order of the same document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedRecord {
    pub demographics: Demographics,
    pub encounter: EncounterMeta,
    /// Deduplicated findings, ordered by concept key then source document.
    pub findings: Vec<ClinicalFinding>,
    pub conflicts: Vec<Conflict>,
    /// Source documents, ascending by id.
    pub sources: Vec<DocumentId>,
    /// Which document each fused field value came from.
    pub provenance: BTreeMap<String, DocumentId>,
    /// Documents that contributed to each merged finding, keyed by
    /// `<system> <code>`.
    pub finding_sources: BTreeMap<String, Vec<DocumentId>>,
}

impl FusedRecord {
    pub fn unresolved_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }
}
