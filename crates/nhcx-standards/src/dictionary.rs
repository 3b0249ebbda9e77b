//! Terminology dictionary: canonical terms, inverted token index, and
//! inverse-document-frequency weights, all computed once at load.

use std::collections::{BTreeMap, BTreeSet};

use nhcx_model::CodingSystem;

use crate::text::{normalize, tokenize};

/// One canonical term's target code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DictionaryEntry {
    pub code: String,
    pub display: String,
    /// Higher means a more specific term; used to break score ties.
    pub specificity_rank: u8,
}

/// Read-only lookup structure for one coding system.
///
/// Built once at load time; all matching reads are lock-free and the whole
/// structure is immutable afterwards, so concurrent lookups need no
/// coordination.
#[derive(Debug, Clone)]
pub struct Dictionary {
    system: CodingSystem,
    /// Normalized canonical term -> entry.
    terms: BTreeMap<String, DictionaryEntry>,
    /// Token -> set of normalized terms containing it.
    token_index: BTreeMap<String, BTreeSet<String>>,
    /// Token -> IDF weight; generic tokens weigh less.
    idf: BTreeMap<String, f64>,
}

impl Dictionary {
    /// Builds a dictionary from `(term, code, display)` rows. Terms are
    /// normalized; the specificity rank defaults to the token count.
    pub fn from_rows<'a>(
        system: CodingSystem,
        rows: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Self {
        let entries = rows.into_iter().map(|(term, code, display)| {
            (term.to_string(), code.to_string(), display.to_string(), None)
        });
        Self::from_entries(system, entries)
    }

    /// Builds a dictionary from owned rows with an optional explicit rank.
    pub fn from_entries(
        system: CodingSystem,
        rows: impl IntoIterator<Item = (String, String, String, Option<u8>)>,
    ) -> Self {
        let mut terms = BTreeMap::new();
        for (term, code, display, rank) in rows {
            let normalized = normalize(&term);
            if normalized.is_empty() {
                continue;
            }
            let rank =
                rank.unwrap_or_else(|| tokenize(&normalized).len().min(u8::MAX as usize) as u8);
            terms.insert(
                normalized,
                DictionaryEntry {
                    code,
                    display,
                    specificity_rank: rank,
                },
            );
        }

        let mut token_index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for term in terms.keys() {
            for token in tokenize(term) {
                token_index.entry(token).or_default().insert(term.clone());
            }
        }

        let term_count = terms.len() as f64;
        let mut idf = BTreeMap::new();
        for (token, containing) in &token_index {
            let df = containing.len() as f64;
            idf.insert(token.clone(), 1.0 + ((term_count + 1.0) / (df + 1.0)).ln());
        }

        Self {
            system,
            terms,
            token_index,
            idf,
        }
    }

    pub fn system(&self) -> CodingSystem {
        self.system
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Exact lookup by normalized term.
    pub fn get(&self, normalized_term: &str) -> Option<&DictionaryEntry> {
        self.terms.get(normalized_term)
    }

    /// Terms containing the given token, in lexicographic order.
    pub fn terms_for_token(&self, token: &str) -> impl Iterator<Item = &str> {
        self.token_index
            .get(token)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// IDF weight for a token. Tokens absent from the dictionary get the
    /// weight of a token seen in no term, the maximum.
    pub fn idf(&self, token: &str) -> f64 {
        match self.idf.get(token) {
            Some(weight) => *weight,
            None => 1.0 + ((self.terms.len() as f64 + 1.0) / 1.0).ln(),
        }
    }

    /// All `(normalized term, entry)` pairs in lexicographic term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DictionaryEntry)> {
        self.terms.iter().map(|(term, entry)| (term.as_str(), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        Dictionary::from_rows(
            CodingSystem::Icd10,
            [
                ("type 2 diabetes mellitus", "E11.9", "T2DM"),
                ("diabetes", "E11.9", "T2DM"),
                ("diabetes insipidus", "E23.2", "DI"),
            ],
        )
    }

    #[test]
    fn exact_lookup_uses_normalized_terms() {
        let dict = sample();
        let entry = dict.get("type 2 diabetes mellitus").expect("entry");
        assert_eq!(entry.code, "E11.9");
        assert_eq!(entry.specificity_rank, 4);
        assert!(dict.get("Type 2 Diabetes Mellitus").is_none());
    }

    #[test]
    fn generic_tokens_weigh_less() {
        let dict = sample();
        // "diabetes" appears in all three terms, "mellitus" in one.
        assert!(dict.idf("mellitus") > dict.idf("diabetes"));
        // Unknown tokens weigh the most.
        assert!(dict.idf("zzz") >= dict.idf("mellitus"));
    }

    #[test]
    fn token_index_finds_partial_matches() {
        let dict = sample();
        let terms: Vec<&str> = dict.terms_for_token("insipidus").collect();
        assert_eq!(terms, vec!["diabetes insipidus"]);
    }
}
