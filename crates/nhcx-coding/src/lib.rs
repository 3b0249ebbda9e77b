//! Offline clinical coding engine.
//!
//! Maps diagnosis text to ICD-10 and lab test names to LOINC against the
//! process-wide terminology registry, completely offline. Matching runs
//! exact → IDF-weighted token overlap → Jaro-Winkler fallback and encodes
//! uncertainty in scored candidate lists instead of raising.

mod config;
mod engine;

pub use config::MatchConfig;
pub use engine::{CodingEngine, MatchOutcome};
