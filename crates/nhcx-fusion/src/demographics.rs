//! Cardinality-1 field reconciliation.
//!
//! Chain per field: unanimous value → most recent encounter → strict
//! majority → unresolved (field left empty). Every disagreement is
//! recorded as a conflict, resolved or not.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use nhcx_model::{
    Conflict, Demographics, DocumentId, EncounterMeta, ExtractedDocument, Resolution,
    ResolutionRule,
};
use nhcx_standards::normalize;

use crate::conflict;

/// One document's value for a field, with its comparison key and the
/// document's encounter reference date.
struct FieldValue<T> {
    document: DocumentId,
    date: Option<NaiveDate>,
    value: T,
    /// Normalized comparison key; equal keys mean agreement.
    key: String,
    /// Human-readable rendering recorded in conflicts.
    display: String,
}

pub(crate) fn reconcile(
    ordered: &[&ExtractedDocument],
) -> (
    Demographics,
    EncounterMeta,
    Vec<Conflict>,
    BTreeMap<String, DocumentId>,
) {
    let mut conflicts = Vec::new();
    let mut provenance = BTreeMap::new();

    let mut resolve_text = |path: &str, get: &dyn Fn(&ExtractedDocument) -> Option<String>| {
        let values = collect(ordered, |doc| {
            get(doc).filter(|v| !v.trim().is_empty()).map(|v| {
                let key = normalize(&v);
                (v.clone(), key, v)
            })
        });
        resolve(path, values, &mut conflicts, &mut provenance)
    };

    let name = resolve_text("demographics.name", &|d| d.demographics.name.clone());
    let patient_ref = resolve_text("demographics.patient_ref", &|d| {
        d.demographics.patient_ref.clone()
    });
    let phone = resolve_text("demographics.phone", &|d| d.demographics.phone.clone());
    let address = resolve_text("demographics.address", &|d| {
        d.demographics.address.clone()
    });
    let facility = resolve_text("encounter.facility", &|d| d.encounter.facility.clone());
    let attending = resolve_text("encounter.attending", &|d| d.encounter.attending.clone());
    let insurer = resolve_text("encounter.insurer", &|d| d.encounter.insurer.clone());
    let insurance_id = resolve_text("encounter.insurance_id", &|d| {
        d.encounter.insurance_id.clone()
    });

    let gender = {
        let values = collect(ordered, |doc| {
            doc.demographics
                .gender
                .map(|g| (g, g.as_str().to_string(), g.as_str().to_string()))
        });
        resolve(
            "demographics.gender",
            values,
            &mut conflicts,
            &mut provenance,
        )
    };

    let birth_date = {
        let values = collect(ordered, |doc| {
            doc.demographics
                .birth_date
                .map(|d| (d, d.to_string(), d.to_string()))
        });
        resolve(
            "demographics.birth_date",
            values,
            &mut conflicts,
            &mut provenance,
        )
    };

    let hi_type_hint = {
        let values = collect(ordered, |doc| {
            doc.encounter
                .hi_type_hint
                .map(|h| (h, h.as_str().to_string(), h.as_str().to_string()))
        });
        resolve(
            "encounter.hi_type_hint",
            values,
            &mut conflicts,
            &mut provenance,
        )
    };

    // The encounter span is the union of all reported spans.
    let admitted = ordered.iter().filter_map(|d| d.encounter.admitted).min();
    let discharged = ordered.iter().filter_map(|d| d.encounter.discharged).max();

    fn medications(d: &ExtractedDocument) -> &[String] {
        &d.encounter.medications
    }
    fn procedures(d: &ExtractedDocument) -> &[String] {
        &d.encounter.procedures
    }
    let medications = merge_lists(ordered, medications);
    let procedures = merge_lists(ordered, procedures);

    (
        Demographics {
            name,
            gender,
            birth_date,
            patient_ref,
            phone,
            address,
        },
        EncounterMeta {
            facility,
            attending,
            admitted,
            discharged,
            hi_type_hint,
            insurer,
            insurance_id,
            medications,
            procedures,
        },
        conflicts,
        provenance,
    )
}

fn collect<T>(
    ordered: &[&ExtractedDocument],
    get: impl Fn(&ExtractedDocument) -> Option<(T, String, String)>,
) -> Vec<FieldValue<T>> {
    ordered
        .iter()
        .filter_map(|doc| {
            get(doc).map(|(value, key, display)| FieldValue {
                document: doc.id.clone(),
                date: doc.encounter.reference_date(),
                value,
                key,
                display,
            })
        })
        .collect()
}

/// Runs the resolution chain for one field.
fn resolve<T>(
    path: &str,
    values: Vec<FieldValue<T>>,
    conflicts: &mut Vec<Conflict>,
    provenance: &mut BTreeMap<String, DocumentId>,
) -> Option<T> {
    if values.is_empty() {
        return None;
    }

    let unanimous = values.iter().all(|v| v.key == values[0].key);
    if unanimous {
        let winner = values.into_iter().next()?;
        provenance.insert(path.to_string(), winner.document);
        return Some(winner.value);
    }

    let recorded: Vec<(DocumentId, String)> = values
        .iter()
        .map(|v| (v.document.clone(), v.display.clone()))
        .collect();

    let settled = match most_recent_winner(&values) {
        Some(idx) => Some((idx, ResolutionRule::MostRecentEncounter)),
        None => majority_winner(&values).map(|idx| (idx, ResolutionRule::Majority)),
    };

    if let Some((winner_idx, rule)) = settled {
        let winner = values.into_iter().nth(winner_idx)?;
        conflicts.push(conflict(
            path,
            recorded,
            Some(Resolution {
                value: winner.display.clone(),
                rule,
            }),
        ));
        provenance.insert(path.to_string(), winner.document);
        return Some(winner.value);
    }

    // Never guess: leave the field empty and record the standoff.
    conflicts.push(conflict(path, recorded, None));
    None
}

/// Index of the winning value by recency, when the most recent encounter
/// dates all carry the same value.
fn most_recent_winner<T>(values: &[FieldValue<T>]) -> Option<usize> {
    let max_date = values.iter().filter_map(|v| v.date).max()?;
    let mut holder_key: Option<&str> = None;
    let mut winner = None;
    for (idx, value) in values.iter().enumerate() {
        if value.date != Some(max_date) {
            continue;
        }
        match holder_key {
            None => {
                holder_key = Some(&value.key);
                winner = Some(idx);
            }
            Some(key) if key == value.key => {}
            Some(_) => return None, // most recent documents disagree
        }
    }
    winner
}

/// Index of the value held by a strict majority of documents, if any.
fn majority_winner<T>(values: &[FieldValue<T>]) -> Option<usize> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(&value.key).or_insert(0) += 1;
    }
    let (winning_key, count) = counts.into_iter().max_by_key(|(_, count)| *count)?;
    if count * 2 <= values.len() {
        return None;
    }
    values.iter().position(|v| v.key == winning_key)
}

/// Merges list fields across documents, deduplicating case-insensitively
/// while preserving first-seen order.
fn merge_lists(
    ordered: &[&ExtractedDocument],
    get: for<'a> fn(&'a ExtractedDocument) -> &'a [String],
) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut merged = Vec::new();
    for doc in ordered {
        for item in get(doc) {
            let key = normalize(item);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            merged.push(item.clone());
        }
    }
    merged
}
