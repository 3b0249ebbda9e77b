//! Process-wide terminology registry.
//!
//! Loaded once at startup and shared read-only by every request context.
//! Reload replaces the entire registry behind an atomic swap so concurrent
//! readers never observe a partially updated dictionary.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use nhcx_model::{CodingSystem, FindingKind};

use crate::builtin;
use crate::dictionary::Dictionary;
use crate::error::StandardsError;
use crate::hash::sha256_hex;
use crate::loader::{dictionary_file_name, load_abbreviations_csv, load_dictionary_csv};
use crate::text::normalize;

/// Coding domains every registry must cover.
const REQUIRED_KINDS: &[FindingKind] = &[FindingKind::Diagnosis, FindingKind::LabResult];

/// Immutable set of dictionaries plus the abbreviation table.
///
/// The fingerprint is the dictionary version: identical fingerprints
/// guarantee identical matcher output for identical input text.
#[derive(Debug, Clone)]
pub struct TerminologyRegistry {
    dictionaries: BTreeMap<FindingKind, Dictionary>,
    abbreviations: BTreeMap<String, String>,
    fingerprint: String,
}

impl TerminologyRegistry {
    /// The embedded default dictionaries.
    pub fn builtin() -> Self {
        let mut dictionaries = BTreeMap::new();
        dictionaries.insert(
            FindingKind::Diagnosis,
            Dictionary::from_rows(CodingSystem::Icd10, builtin::DIAGNOSIS_TERMS.iter().copied()),
        );
        dictionaries.insert(
            FindingKind::LabResult,
            Dictionary::from_rows(CodingSystem::Loinc, builtin::LAB_TERMS.iter().copied()),
        );
        let abbreviations = builtin::ABBREVIATIONS
            .iter()
            .map(|(short, expansion)| (normalize(short), normalize(expansion)))
            .collect();
        Self::assemble(dictionaries, abbreviations)
    }

    /// Loads dictionaries from a configuration directory. `diagnosis.csv`
    /// and `lab.csv` are required; `procedure.csv` and `abbreviations.csv`
    /// extend the registry when present.
    pub fn from_dir(dir: &Path) -> Result<Self, StandardsError> {
        let mut dictionaries = BTreeMap::new();
        for (kind, system) in [
            (FindingKind::Diagnosis, CodingSystem::Icd10),
            (FindingKind::LabResult, CodingSystem::Loinc),
        ] {
            let path = dir.join(dictionary_file_name(kind));
            if !path.is_file() {
                return Err(StandardsError::MissingDictionary {
                    kind,
                    dir: dir.to_path_buf(),
                });
            }
            dictionaries.insert(kind, load_dictionary_csv(&path, system)?);
        }

        let procedure_path = dir.join(dictionary_file_name(FindingKind::Procedure));
        if procedure_path.is_file() {
            dictionaries.insert(
                FindingKind::Procedure,
                load_dictionary_csv(&procedure_path, CodingSystem::SnomedCt)?,
            );
        }

        let abbrev_path = dir.join("abbreviations.csv");
        let abbreviations = if abbrev_path.is_file() {
            load_abbreviations_csv(&abbrev_path)?
        } else {
            BTreeMap::new()
        };

        Ok(Self::assemble(dictionaries, abbreviations))
    }

    fn assemble(
        dictionaries: BTreeMap<FindingKind, Dictionary>,
        abbreviations: BTreeMap<String, String>,
    ) -> Self {
        let fingerprint = fingerprint_of(&dictionaries, &abbreviations);
        Self {
            dictionaries,
            abbreviations,
            fingerprint,
        }
    }

    /// Dictionary for a finding kind. A kind without a configured
    /// dictionary is a configuration error, not a per-record condition.
    pub fn dictionary_for(&self, kind: FindingKind) -> Result<&Dictionary, StandardsError> {
        self.dictionaries
            .get(&kind)
            .ok_or(StandardsError::UnsupportedKind { kind })
    }

    /// Dictionary whose entries belong to the given coding system, if any.
    pub fn dictionary_for_system(&self, system: CodingSystem) -> Option<&Dictionary> {
        self.dictionaries.values().find(|d| d.system() == system)
    }

    pub fn abbreviations(&self) -> &BTreeMap<String, String> {
        &self.abbreviations
    }

    /// Content hash identifying this dictionary version.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Canonical byte rendering of the registry content, hashed into the
/// version fingerprint. BTree iteration makes the rendering order-stable.
fn fingerprint_of(
    dictionaries: &BTreeMap<FindingKind, Dictionary>,
    abbreviations: &BTreeMap<String, String>,
) -> String {
    let mut canonical = String::new();
    for (kind, dictionary) in dictionaries {
        for (term, entry) in dictionary.iter() {
            canonical.push_str(kind.as_str());
            canonical.push('\t');
            canonical.push_str(term);
            canonical.push('\t');
            canonical.push_str(&entry.code);
            canonical.push('\t');
            canonical.push_str(&entry.display);
            canonical.push('\n');
        }
    }
    for (short, expansion) in abbreviations {
        canonical.push_str(short);
        canonical.push('\t');
        canonical.push_str(expansion);
        canonical.push('\n');
    }
    sha256_hex(canonical.as_bytes())
}

/// Shared handle to the process-wide registry.
///
/// Readers take a cheap `Arc` clone; `swap` replaces the whole registry in
/// one step, never mutating in place. Requests keep using the registry they
/// started with even across a concurrent reload.
#[derive(Debug)]
pub struct SharedRegistry {
    inner: RwLock<Arc<TerminologyRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: TerminologyRegistry) -> Self {
        Self {
            inner: RwLock::new(Arc::new(registry)),
        }
    }

    /// Current registry snapshot.
    pub fn current(&self) -> Arc<TerminologyRegistry> {
        Arc::clone(&self.inner.read().expect("registry lock poisoned"))
    }

    /// Atomically replaces the registry; returns the previous one.
    pub fn swap(&self, registry: TerminologyRegistry) -> Arc<TerminologyRegistry> {
        let mut guard = self.inner.write().expect("registry lock poisoned");
        std::mem::replace(&mut guard, Arc::new(registry))
    }
}

/// Validates that a registry covers every required coding domain. Called at
/// startup so a misconfigured asset fails fast rather than per-request.
pub fn verify_required_domains(registry: &TerminologyRegistry) -> Result<(), StandardsError> {
    for &kind in REQUIRED_KINDS {
        registry.dictionary_for(kind)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_required_domains() {
        let registry = TerminologyRegistry::builtin();
        verify_required_domains(&registry).expect("builtin covers required domains");
        assert!(registry.dictionary_for(FindingKind::Procedure).is_err());
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = TerminologyRegistry::builtin();
        let b = TerminologyRegistry::builtin();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn swap_replaces_whole_registry() {
        let shared = SharedRegistry::new(TerminologyRegistry::builtin());
        let before = shared.current();
        let previous = shared.swap(TerminologyRegistry::builtin());
        assert_eq!(previous.fingerprint(), before.fingerprint());
        // Earlier snapshots stay valid after the swap.
        assert!(before.dictionary_for(FindingKind::Diagnosis).is_ok());
    }
}
