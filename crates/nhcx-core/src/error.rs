use thiserror::Error;

use nhcx_model::ExtractionError;
use nhcx_standards::StandardsError;

/// Hard failures of a conversion request.
///
/// Data-quality problems never appear here; they ride in the outcome as
/// scores, null codes, conflicts, and validation issues.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no documents supplied")]
    NoDocuments,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("all {count} documents failed extraction")]
    AllDocumentsFailed {
        count: usize,
        failures: Vec<ExtractionError>,
    },

    #[error(transparent)]
    Standards(#[from] StandardsError),
}
