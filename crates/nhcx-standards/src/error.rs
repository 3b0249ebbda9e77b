#![deny(unsafe_code)]

use std::path::PathBuf;

use nhcx_model::FindingKind;

/// Configuration failures around profile and dictionary assets.
///
/// All of these are fatal at startup; none occur per-request.
#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read dictionary asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dictionary CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("dictionary CSV {path} is missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("dictionary asset {path} contains no terms")]
    EmptyDictionary { path: PathBuf },

    #[error("no dictionary asset found for required coding domain {kind:?} in {dir}")]
    MissingDictionary { kind: FindingKind, dir: PathBuf },

    #[error("no dictionary is configured for finding kind {kind:?}")]
    UnsupportedKind { kind: FindingKind },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
