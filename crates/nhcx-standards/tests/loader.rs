use std::fs;
use std::path::PathBuf;

use nhcx_model::{CodingSystem, FindingKind};
use nhcx_standards::{StandardsError, TerminologyRegistry, load_dictionary_csv};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("nhcx-standards-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn loads_dictionary_with_rank_column() {
    let dir = scratch_dir("rank");
    let path = dir.join("diagnosis.csv");
    fs::write(
        &path,
        "term,code,display,rank\n\
         Dengue Fever,A90,Dengue fever [classical dengue],9\n\
         dengue,A90,Dengue fever [classical dengue],\n",
    )
    .expect("write csv");

    let dict = load_dictionary_csv(&path, CodingSystem::Icd10).expect("load");
    assert_eq!(dict.len(), 2);
    // Explicit rank wins; missing rank falls back to the token count.
    assert_eq!(dict.get("dengue fever").expect("entry").specificity_rank, 9);
    assert_eq!(dict.get("dengue").expect("entry").specificity_rank, 1);
}

#[test]
fn missing_column_is_a_configuration_error() {
    let dir = scratch_dir("missing-column");
    let path = dir.join("lab.csv");
    fs::write(&path, "name,code\nhb,718-7\n").expect("write csv");

    let err = load_dictionary_csv(&path, CodingSystem::Loinc).unwrap_err();
    assert!(matches!(err, StandardsError::MissingColumn { column, .. } if column == "term"));
}

#[test]
fn empty_dictionary_is_rejected() {
    let dir = scratch_dir("empty");
    let path = dir.join("lab.csv");
    fs::write(&path, "term,code,display\n").expect("write csv");

    let err = load_dictionary_csv(&path, CodingSystem::Loinc).unwrap_err();
    assert!(matches!(err, StandardsError::EmptyDictionary { .. }));
}

#[test]
fn registry_from_dir_requires_both_domains() {
    let dir = scratch_dir("registry");
    fs::write(
        dir.join("diagnosis.csv"),
        "term,code,display\ndengue,A90,Dengue fever\n",
    )
    .expect("write diagnosis");

    // lab.csv absent -> startup failure naming the missing domain.
    let err = TerminologyRegistry::from_dir(&dir).unwrap_err();
    assert!(
        matches!(err, StandardsError::MissingDictionary { kind, .. } if kind == FindingKind::LabResult)
    );

    fs::write(dir.join("lab.csv"), "term,code,display\nhb,718-7,Hemoglobin\n")
        .expect("write lab");
    let registry = TerminologyRegistry::from_dir(&dir).expect("registry");
    assert!(registry.dictionary_for(FindingKind::Diagnosis).is_ok());
    assert!(registry.dictionary_for(FindingKind::LabResult).is_ok());
    assert!(registry.dictionary_for(FindingKind::Procedure).is_err());
}

#[test]
fn fingerprint_tracks_dictionary_content() {
    let dir_a = scratch_dir("fp-a");
    let dir_b = scratch_dir("fp-b");
    for dir in [&dir_a, &dir_b] {
        fs::write(
            dir.join("diagnosis.csv"),
            "term,code,display\ndengue,A90,Dengue fever\n",
        )
        .expect("write diagnosis");
    }
    fs::write(dir_a.join("lab.csv"), "term,code,display\nhb,718-7,Hemoglobin\n")
        .expect("write lab");
    fs::write(dir_b.join("lab.csv"), "term,code,display\nesr,30341-2,ESR\n")
        .expect("write lab");

    let a = TerminologyRegistry::from_dir(&dir_a).expect("registry a");
    let b = TerminologyRegistry::from_dir(&dir_b).expect("registry b");
    assert_ne!(a.fingerprint(), b.fingerprint());
}
