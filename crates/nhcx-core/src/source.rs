//! Extraction source for pre-structured payloads.

use nhcx_model::{ExtractedDocument, ExtractionError};

use crate::traits::{DocumentInput, DocumentSource};

/// Reads documents whose bytes already carry a structured extraction as
/// JSON, as produced by an upstream extraction service. Used by the CLI and
/// by tests; production deployments plug a real extraction collaborator in
/// instead.
#[derive(Debug, Clone, Default)]
pub struct JsonDocumentSource {
    _private: (),
}

impl JsonDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentSource for JsonDocumentSource {
    fn extract(&self, input: &DocumentInput) -> Result<ExtractedDocument, ExtractionError> {
        let mut document: ExtractedDocument = serde_json::from_slice(&input.bytes)
            .map_err(|e| ExtractionError::Malformed {
                document: input.id.clone(),
                reason: e.to_string(),
            })?;
        // The supplied id wins over whatever the payload claims.
        document.id = input.id.clone();
        for finding in &mut document.findings {
            finding.source_document = input.id.clone();
        }
        if document.encounter.hi_type_hint.is_none() {
            document.encounter.hi_type_hint = input.hi_type_hint;
        }
        Ok(document)
    }
}
