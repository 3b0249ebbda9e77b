//! Rubric checks and the weighted readiness score.
//!
//! Total over any structurally parseable graph: structural defects become
//! error issues and zeroed score categories, never panics or `Err`. Partial
//! credit is proportional within each category.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use nhcx_model::{
    BundleGraph, BundleMode, LocalId, ReadinessScore, ResourceFields, ResourceType, ScoreCategory,
    Severity, ValidationIssue, ValidationReport,
};

const VALID_OBSERVATION_STATUS: &[&str] =
    &["registered", "preliminary", "final", "amended", "cancelled"];
const VALID_CONDITION_CLINICAL: &[&str] = &[
    "active",
    "recurrence",
    "relapse",
    "inactive",
    "remission",
    "resolved",
];
const VALID_CLAIM_USE: &[&str] = &["claim", "preauthorization", "predetermination"];

/// Coding systems accepted as resolved codes for coverage scoring.
const ACCEPTED_CODE_SYSTEMS: &[&str] = &[
    "http://hl7.org/fhir/sid/icd-10",
    "http://loinc.org",
    "http://snomed.info/sct",
];

/// Required-element validator with the fixed weighted rubric.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    _private: (),
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates any bundle graph, builder-produced or external.
    pub fn validate(&self, graph: &BundleGraph) -> ValidationReport {
        let mut issues = Vec::new();
        let mut breakdown = BTreeMap::new();

        let structure = check_structure(graph, &mut issues);
        let references = check_references(graph, &mut issues);
        breakdown.insert(
            ScoreCategory::ReferentialIntegrity,
            ScoreCategory::ReferentialIntegrity.weight() * (structure + references) / 2.0,
        );

        breakdown.insert(
            ScoreCategory::RequiredResources,
            ScoreCategory::RequiredResources.weight() * check_required_resources(graph, &mut issues),
        );
        breakdown.insert(
            ScoreCategory::CompositionMetadata,
            ScoreCategory::CompositionMetadata.weight() * check_composition(graph, &mut issues),
        );
        breakdown.insert(
            ScoreCategory::CodingCoverage,
            ScoreCategory::CodingCoverage.weight() * check_coding_coverage(graph, &mut issues),
        );

        check_value_sets(graph, &mut issues);

        let score = ReadinessScore::from_breakdown(breakdown);
        let report = ValidationReport { issues, score };
        info!(
            errors = report.error_count(),
            warnings = report.warning_count(),
            total = report.score.total,
            "validation complete"
        );
        report
    }
}

/// Exactly one Composition, at entry 0. Returns the earned fraction of the
/// structural half of the referential-integrity category.
fn check_structure(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) -> f64 {
    let compositions: Vec<usize> = graph
        .entries
        .iter()
        .enumerate()
        .filter(|(_, node)| node.resource_type() == ResourceType::Composition)
        .map(|(idx, _)| idx)
        .collect();

    match compositions.as_slice() {
        [] => {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "composition_missing",
                "document bundle must carry a Composition as its first entry",
                "entries[0]",
            ));
            0.0
        }
        [0] => 1.0,
        [idx] => {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "composition_not_first",
                format!("Composition found at entry {idx}, expected entry 0"),
                format!("entries[{idx}]"),
            ));
            0.5
        }
        multiple => {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "composition_duplicate",
                format!("bundle carries {} Composition entries", multiple.len()),
                "entries",
            ));
            0.0
        }
    }
}

/// All references resolve and no local id repeats. Returns the earned
/// fraction of the reference half of the referential-integrity category.
fn check_references(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) -> f64 {
    let mut seen: BTreeSet<LocalId> = BTreeSet::new();
    for (idx, node) in graph.entries.iter().enumerate() {
        if !seen.insert(node.local_id) {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "duplicate_local_id",
                format!("local id {} assigned more than once", node.local_id),
                format!("entries[{idx}]"),
            ));
        }
    }

    let mut total = 0usize;
    let mut resolved = 0usize;
    for (idx, node) in graph.entries.iter().enumerate() {
        for target in node.references() {
            total += 1;
            if seen.contains(&target) {
                resolved += 1;
            } else {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "reference_target_missing",
                    format!(
                        "{} references {target} which is not in the bundle",
                        node.resource_type().as_str()
                    ),
                    format!("entries[{idx}]"),
                ));
            }
        }
    }

    let duplicates = graph.entries.len() - seen.len();
    let reference_fraction = if total == 0 {
        if graph.entries.is_empty() { 0.0 } else { 1.0 }
    } else {
        resolved as f64 / total as f64
    };
    if duplicates > 0 {
        return 0.0;
    }
    reference_fraction
}

/// Presence of the per-mode required resource set, proportional credit.
fn check_required_resources(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) -> f64 {
    let mut required: Vec<(ResourceType, Severity)> = vec![
        (ResourceType::Composition, Severity::Error),
        (ResourceType::Patient, Severity::Error),
        (ResourceType::DocumentReference, Severity::Warning),
        (ResourceType::Provenance, Severity::Warning),
    ];
    match graph.mode {
        BundleMode::Document => {}
        BundleMode::Claim => required.push((ResourceType::Claim, Severity::Error)),
        BundleMode::Preauthorization => {
            required.push((ResourceType::Coverage, Severity::Error));
            required.push((ResourceType::CoverageEligibilityRequest, Severity::Error));
        }
    }

    let present_types: BTreeSet<ResourceType> = graph
        .entries
        .iter()
        .map(|node| node.resource_type())
        .collect();

    let mut present = 0usize;
    for (resource_type, severity) in &required {
        if present_types.contains(resource_type) {
            present += 1;
        } else if *resource_type != ResourceType::Composition {
            // Composition absence is already reported by the structure check.
            issues.push(ValidationIssue::new(
                *severity,
                "required_resource_missing",
                format!("required resource missing: {}", resource_type.as_str()),
                "entries",
            ));
        }
    }
    present as f64 / required.len() as f64
}

/// Composition classification and header fields. The classification coding
/// gates the whole category: without it the document cannot be filed.
fn check_composition(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) -> f64 {
    let Some(node) = graph.composition() else {
        return 0.0;
    };
    let ResourceFields::Composition(fields) = &node.fields else {
        return 0.0;
    };

    let category_ok = fields
        .category
        .as_ref()
        .is_some_and(|coding| !coding.code.is_empty());
    if !category_ok {
        issues.push(ValidationIssue::new(
            Severity::Error,
            "composition_category_missing",
            "Composition carries no health-information type classification",
            "entries[0].Composition.category",
        ));
        return 0.0;
    }

    let mut met = 0usize;
    let checks: [(bool, &str, &str); 4] = [
        (fields.subject.is_some(), "composition_subject_missing", "subject"),
        (fields.author.is_some(), "composition_author_missing", "author"),
        (!fields.title.is_empty(), "composition_title_missing", "title"),
        (fields.status == "final", "composition_status_not_final", "status"),
    ];
    for (ok, code, field) in checks {
        if ok {
            met += 1;
        } else {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                code,
                format!("Composition.{field} should be populated"),
                format!("entries[0].Composition.{field}"),
            ));
        }
    }
    met as f64 / checks.len() as f64
}

/// Share of diagnosis/lab entries carrying a resolved code from an
/// accepted system. Resolving one more code never lowers this.
fn check_coding_coverage(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) -> f64 {
    let mut total = 0usize;
    let mut coded = 0usize;
    for (idx, node) in graph.entries.iter().enumerate() {
        let (coding, label) = match &node.fields {
            ResourceFields::Condition(f) => (&f.code.coding, "Condition"),
            ResourceFields::Observation(f) => (&f.code.coding, "Observation"),
            _ => continue,
        };
        total += 1;
        let resolved = coding
            .as_ref()
            .is_some_and(|c| ACCEPTED_CODE_SYSTEMS.iter().any(|s| c.system.starts_with(s)));
        if resolved {
            coded += 1;
        } else {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                "entry_code_unresolved",
                format!("{label} carries no resolved standard code"),
                format!("entries[{idx}].{label}.code"),
            ));
        }
    }

    if total == 0 {
        // Vacuously covered for a document with no codable entries, as long
        // as it is a document at all.
        return if graph.composition().is_some() { 1.0 } else { 0.0 };
    }
    coded as f64 / total as f64
}

/// Closed value-set checks; violations warn but do not score.
fn check_value_sets(graph: &BundleGraph, issues: &mut Vec<ValidationIssue>) {
    for (idx, node) in graph.entries.iter().enumerate() {
        match &node.fields {
            ResourceFields::Observation(f) => {
                if !VALID_OBSERVATION_STATUS.contains(&f.status.as_str()) {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        "observation_status_invalid",
                        format!("Observation.status {:?} is not a valid status", f.status),
                        format!("entries[{idx}].Observation.status"),
                    ));
                }
                if f.value.is_none() {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        "observation_value_missing",
                        "Observation has no result value",
                        format!("entries[{idx}].Observation.value"),
                    ));
                }
            }
            ResourceFields::Condition(f) => {
                if !VALID_CONDITION_CLINICAL.contains(&f.clinical_status.as_str()) {
                    issues.push(ValidationIssue::new(
                        Severity::Error,
                        "condition_clinical_status_invalid",
                        format!(
                            "Condition.clinicalStatus {:?} is not in the value set",
                            f.clinical_status
                        ),
                        format!("entries[{idx}].Condition.clinicalStatus"),
                    ));
                }
            }
            ResourceFields::Claim(f) => {
                if !VALID_CLAIM_USE.contains(&f.use_kind.as_str()) {
                    issues.push(ValidationIssue::new(
                        Severity::Error,
                        "claim_use_invalid",
                        format!("Claim.use {:?} is not in the value set", f.use_kind),
                        format!("entries[{idx}].Claim.use"),
                    ));
                }
                if f.insurer.is_none() {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        "claim_insurer_missing",
                        "Claim carries no insurer identifier",
                        format!("entries[{idx}].Claim.insurer"),
                    ));
                }
            }
            ResourceFields::Patient(f) => {
                if f.name.is_none() {
                    issues.push(ValidationIssue::new(
                        Severity::Error,
                        "patient_name_missing",
                        "Patient.name is required for submission",
                        format!("entries[{idx}].Patient.name"),
                    ));
                }
                if f.birth_date.is_none() {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        "patient_birth_date_missing",
                        "Patient.birthDate is missing",
                        format!("entries[{idx}].Patient.birthDate"),
                    ));
                }
            }
            _ => {}
        }
    }
}
