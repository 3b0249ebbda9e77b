//! Matching engine: exact lookup, IDF-weighted token overlap, and a
//! Jaro-Winkler fallback, in that order.
//!
//! All inputs are read-only; identical `(raw text, dictionary fingerprint)`
//! pairs produce identical output regardless of process, thread, or call
//! order. Candidate ordering is a total order: score descending, then
//! specificity rank descending, then shortest code, then code
//! lexicographically.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;
use tracing::debug;

use nhcx_model::{
    CandidateCode, ClinicalFinding, CodingSystem, ExtractedDocument, FindingKind,
};
use nhcx_standards::dictionary::Dictionary;
use nhcx_standards::{StandardsError, TerminologyRegistry, expand_tokens, normalize, tokenize};

use crate::config::MatchConfig;

/// Result of matching one text fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Normalized, abbreviation-expanded query text.
    pub normalized_text: String,
    /// Ordered candidates, best first.
    pub candidates: Vec<CandidateCode>,
    /// Top candidate when it met the acceptance threshold.
    pub chosen: Option<CandidateCode>,
    /// Set when text was present but no candidate was acceptable.
    pub needs_review: bool,
}

/// Offline coding engine over an immutable registry snapshot.
///
/// Cheap to clone; holds the registry by `Arc` so a request keeps coding
/// against the dictionaries it started with even across a reload.
#[derive(Debug, Clone)]
pub struct CodingEngine {
    registry: Arc<TerminologyRegistry>,
    config: MatchConfig,
}

impl CodingEngine {
    pub fn new(registry: Arc<TerminologyRegistry>, config: MatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &TerminologyRegistry {
        &self.registry
    }

    /// Shared handle to the registry snapshot this engine codes against.
    pub fn registry_handle(&self) -> Arc<TerminologyRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    /// Matches a text fragment against the dictionary for its finding kind.
    ///
    /// # Errors
    ///
    /// Only for a finding kind with no configured dictionary; data-quality
    /// problems are encoded in the outcome, never raised.
    pub fn match_text(&self, kind: FindingKind, raw_text: &str) -> Result<MatchOutcome, StandardsError> {
        let dictionary = self.registry.dictionary_for(kind)?;
        Ok(self.match_against(dictionary, raw_text))
    }

    /// Interactive lookup against the dictionary of a coding system.
    ///
    /// Total: an unconfigured system yields an empty list rather than an
    /// error, so the lookup surface never faults on user input.
    pub fn search(&self, system: CodingSystem, query: &str) -> Vec<CandidateCode> {
        match self.registry.dictionary_for_system(system) {
            Some(dictionary) => self.match_against(dictionary, query).candidates,
            None => Vec::new(),
        }
    }

    /// Codes every finding of a document in place.
    pub fn code_document(&self, document: &mut ExtractedDocument) -> Result<(), StandardsError> {
        for finding in &mut document.findings {
            self.code_finding(finding)?;
        }
        Ok(())
    }

    /// Fills the candidate list and chosen code of one finding.
    pub fn code_finding(&self, finding: &mut ClinicalFinding) -> Result<(), StandardsError> {
        let outcome = self.match_text(finding.kind, &finding.raw_text)?;
        debug!(
            kind = finding.kind.as_str(),
            candidates = outcome.candidates.len(),
            accepted = outcome.chosen.is_some(),
            "coded finding"
        );
        finding.normalized_text = outcome.normalized_text;
        finding.candidates = outcome.candidates;
        finding.chosen = outcome.chosen;
        finding.needs_review = outcome.needs_review;
        Ok(())
    }

    fn match_against(&self, dictionary: &Dictionary, raw_text: &str) -> MatchOutcome {
        let normalized = normalize(raw_text);
        if normalized.is_empty() {
            return MatchOutcome {
                normalized_text: normalized,
                candidates: Vec::new(),
                chosen: None,
                needs_review: false,
            };
        }

        let tokens = expand_tokens(&tokenize(&normalized), self.registry.abbreviations());
        let query = tokens.join(" ");

        // Exact normalized-term hit: score 1.0 with no competitor.
        if let Some(entry) = dictionary.get(&query) {
            let candidate = CandidateCode {
                system: dictionary.system(),
                code: entry.code.clone(),
                display: entry.display.clone(),
                score: 1.0,
                specificity_rank: entry.specificity_rank,
            };
            return MatchOutcome {
                normalized_text: query,
                candidates: vec![candidate.clone()],
                chosen: Some(candidate),
                needs_review: false,
            };
        }

        let mut candidates = self.token_overlap_candidates(dictionary, &tokens);
        if candidates.is_empty() {
            candidates = self.fuzzy_candidates(dictionary, &query);
        }
        sort_candidates(&mut candidates);
        candidates.truncate(self.config.max_candidates);

        let chosen = candidates
            .first()
            .filter(|c| c.score >= self.config.accept_threshold)
            .cloned();
        let needs_review = chosen.is_none();

        MatchOutcome {
            normalized_text: query,
            candidates,
            chosen,
            needs_review,
        }
    }

    /// Token-overlap stage: score = IDF-weighted share of query tokens the
    /// term covers. Generic tokens contribute little, specific ones a lot.
    fn token_overlap_candidates(
        &self,
        dictionary: &Dictionary,
        tokens: &[String],
    ) -> Vec<CandidateCode> {
        let query_tokens: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
        let query_weight: f64 = query_tokens.iter().map(|t| dictionary.idf(t)).sum();
        if query_weight <= 0.0 {
            return Vec::new();
        }

        let mut terms: BTreeSet<&str> = BTreeSet::new();
        for token in &query_tokens {
            terms.extend(dictionary.terms_for_token(token));
        }

        // Keep the best-scoring term per code.
        let mut best: BTreeMap<String, CandidateCode> = BTreeMap::new();
        for term in terms {
            let Some(entry) = dictionary.get(term) else {
                continue;
            };
            let term_tokens: BTreeSet<&str> = term.split_whitespace().collect();
            let matched_weight: f64 = query_tokens
                .intersection(&term_tokens)
                .map(|t| dictionary.idf(t))
                .sum();
            let score = matched_weight / query_weight;
            if score < self.config.min_score {
                continue;
            }
            let candidate = CandidateCode {
                system: dictionary.system(),
                code: entry.code.clone(),
                display: entry.display.clone(),
                score,
                specificity_rank: entry.specificity_rank,
            };
            match best.get(&candidate.code) {
                Some(existing) if !ranks_higher(&candidate, existing) => {}
                _ => {
                    best.insert(candidate.code.clone(), candidate);
                }
            }
        }
        best.into_values().collect()
    }

    /// Last-resort stage for queries sharing no token with the dictionary,
    /// e.g. misspellings. Scores stay below 1.0: an equal string would have
    /// taken the exact path.
    fn fuzzy_candidates(&self, dictionary: &Dictionary, query: &str) -> Vec<CandidateCode> {
        let mut best: BTreeMap<String, CandidateCode> = BTreeMap::new();
        for (term, entry) in dictionary.iter() {
            let score = jaro_similarity(query.chars(), term.chars());
            if score < self.config.fuzzy_threshold {
                continue;
            }
            let candidate = CandidateCode {
                system: dictionary.system(),
                code: entry.code.clone(),
                display: entry.display.clone(),
                score,
                specificity_rank: entry.specificity_rank,
            };
            match best.get(&candidate.code) {
                Some(existing) if !ranks_higher(&candidate, existing) => {}
                _ => {
                    best.insert(candidate.code.clone(), candidate);
                }
            }
        }
        best.into_values().collect()
    }
}

/// `a` strictly ahead of `b` in the candidate order.
fn ranks_higher(a: &CandidateCode, b: &CandidateCode) -> bool {
    candidate_order(a, b) == Ordering::Less
}

/// Total candidate order: score desc, specificity desc, code length asc,
/// code lexicographic asc.
fn candidate_order(a: &CandidateCode, b: &CandidateCode) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.specificity_rank.cmp(&a.specificity_rank))
        .then_with(|| a.code.len().cmp(&b.code.len()))
        .then_with(|| a.code.cmp(&b.code))
}

fn sort_candidates(candidates: &mut [CandidateCode]) {
    candidates.sort_by(candidate_order);
}
