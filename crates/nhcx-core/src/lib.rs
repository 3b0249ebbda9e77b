//! Conversion core: turns free-text clinical documents into validated,
//! exchange-compliant bundle graphs.
//!
//! The pipeline is strictly linear — coding → (fusion) → build → validate —
//! with extraction and HI-type detection consumed through collaborator
//! traits. Hard failures map to [`ConvertError`]; every data-quality
//! problem is carried in the outcome as data.

mod error;
mod pipeline;
mod source;
mod traits;

pub use error::ConvertError;
pub use pipeline::{ClaimOutcome, ConversionOutcome, ConvertOptions, Pipeline};
pub use source::JsonDocumentSource;
pub use traits::{DocumentInput, DocumentSource, HiTypeDetector};
