use thiserror::Error;

use crate::ids::DocumentId;

/// Errors from constructing model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid document id: {0:?}")]
    InvalidDocumentId(String),
}

/// Per-document extraction failure reported by the extraction collaborator.
///
/// Recoverable at the multi-document level: the failing document is excluded
/// from fusion and surfaced by id, the remaining documents still proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("document {document}: extraction timed out after {seconds}s")]
    Timeout { document: DocumentId, seconds: u64 },

    #[error("document {document}: {reason}")]
    Failed { document: DocumentId, reason: String },

    #[error("document {document}: malformed source bytes: {reason}")]
    Malformed { document: DocumentId, reason: String },
}

impl ExtractionError {
    /// The document this failure belongs to.
    pub fn document(&self) -> &DocumentId {
        match self {
            Self::Timeout { document, .. }
            | Self::Failed { document, .. }
            | Self::Malformed { document, .. } => document,
        }
    }
}
