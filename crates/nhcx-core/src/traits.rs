//! Collaborator contracts.
//!
//! Text/image extraction and HI-type classification are external concerns;
//! the core consumes them through these traits only.

use nhcx_model::{DocumentId, ExtractedDocument, ExtractionError, HiType, HiTypeDetection};

/// One document handed to the pipeline.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub id: DocumentId,
    pub bytes: Vec<u8>,
    /// Caller-supplied HI-type hint, trusted over detection when present.
    pub hi_type_hint: Option<HiType>,
}

/// Extraction collaborator: document bytes to structured extraction.
///
/// Implementations may be slow or remote; the pipeline wraps each call in a
/// bounded timeout and treats per-document failure as recoverable within a
/// multi-document request.
pub trait DocumentSource: Send + Sync {
    fn extract(&self, input: &DocumentInput) -> Result<ExtractedDocument, ExtractionError>;
}

/// HI-type detection collaborator: extracted text to one classification
/// from the fixed set, with a confidence. `None` means unclassifiable.
pub trait HiTypeDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<HiTypeDetection>;
}
