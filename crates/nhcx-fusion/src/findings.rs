//! Finding deduplication and disputed-code detection.
//!
//! Two findings from different documents denote the same concept iff they
//! share coding system and code. Matching findings merge, keeping the most
//! recently observed value. Equal text with different resolved codes is a
//! disputed concept: both codes are retained and a conflict is recorded.
//! Findings without a resolved code have no concept identity and are kept
//! individually.

use std::collections::{BTreeMap, BTreeSet};

use nhcx_model::{ClinicalFinding, CodingSystem, Conflict, DocumentId, ExtractedDocument};

use crate::conflict;

pub(crate) struct FusedFindings {
    pub findings: Vec<ClinicalFinding>,
    /// `<system> <code>` -> contributing documents, ascending.
    pub sources: BTreeMap<String, Vec<DocumentId>>,
    /// `findings.<system> <code>` -> document of the kept value.
    pub provenance: BTreeMap<String, DocumentId>,
}

struct MergedConcept {
    finding: ClinicalFinding,
    sources: BTreeSet<DocumentId>,
}

pub(crate) fn merge(
    ordered: &[&ExtractedDocument],
    conflicts: &mut Vec<Conflict>,
) -> FusedFindings {
    let mut coded: BTreeMap<(CodingSystem, String), MergedConcept> = BTreeMap::new();
    let mut uncoded: Vec<ClinicalFinding> = Vec::new();

    for doc in ordered {
        for finding in &doc.findings {
            match finding.concept_key() {
                Some((system, code)) => {
                    let key = (system, code.to_string());
                    match coded.get_mut(&key) {
                        Some(merged) => {
                            merged.sources.insert(finding.source_document.clone());
                            if finding.observed > merged.finding.observed {
                                merged.finding = finding.clone();
                            }
                        }
                        None => {
                            let mut sources = BTreeSet::new();
                            sources.insert(finding.source_document.clone());
                            coded.insert(
                                key,
                                MergedConcept {
                                    finding: finding.clone(),
                                    sources,
                                },
                            );
                        }
                    }
                }
                None => {
                    // Exact duplicates collapse so fusing a document with a
                    // copy of itself stays idempotent.
                    if !uncoded.contains(finding) {
                        uncoded.push(finding.clone());
                    }
                }
            }
        }
    }

    record_disputed_codes(&coded, conflicts);

    let mut sources = BTreeMap::new();
    let mut provenance = BTreeMap::new();
    let mut findings = Vec::with_capacity(coded.len() + uncoded.len());
    for ((system, code), merged) in coded {
        let label = format!("{} {}", system.as_str(), code);
        provenance.insert(
            format!("findings.{label}"),
            merged.finding.source_document.clone(),
        );
        sources.insert(label, merged.sources.into_iter().collect());
        findings.push(merged.finding);
    }
    findings.extend(uncoded);
    sort_findings(&mut findings);

    FusedFindings {
        findings,
        sources,
        provenance,
    }
}

/// Records a conflict for every normalized text mapped to more than one
/// resolved code. Both codes stay in the record.
fn record_disputed_codes(
    coded: &BTreeMap<(CodingSystem, String), MergedConcept>,
    conflicts: &mut Vec<Conflict>,
) {
    let mut by_text: BTreeMap<&str, Vec<&MergedConcept>> = BTreeMap::new();
    for merged in coded.values() {
        if merged.finding.normalized_text.is_empty() {
            continue;
        }
        by_text
            .entry(merged.finding.normalized_text.as_str())
            .or_default()
            .push(merged);
    }

    for (text, group) in by_text {
        if group.len() < 2 {
            continue;
        }
        let values = group
            .iter()
            .filter_map(|merged| {
                merged.finding.chosen.as_ref().map(|chosen| {
                    (
                        merged.finding.source_document.clone(),
                        format!("{} {}", chosen.system.as_str(), chosen.code),
                    )
                })
            })
            .collect();
        conflicts.push(conflict(format!("findings.{text}.code"), values, None));
    }
}

/// Canonical output order: kind, text, code, then source document.
fn sort_findings(findings: &mut [ClinicalFinding]) {
    findings.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.normalized_text.cmp(&b.normalized_text))
            .then_with(|| {
                let code_a = a.chosen.as_ref().map(|c| c.code.as_str()).unwrap_or("");
                let code_b = b.chosen.as_ref().map(|c| c.code.as_str()).unwrap_or("");
                code_a.cmp(code_b)
            })
            .then_with(|| a.source_document.cmp(&b.source_document))
    });
}
