//! The strict linear conversion pipeline: extract → code → [fuse] → build
//! → validate.
//!
//! Every stage is a pure function of explicit inputs plus the read-only
//! terminology registry, so stages are independently testable and
//! per-finding coding may run on any number of workers. Extraction is the
//! only stage with a collaborator in the loop; each call carries a bounded
//! timeout and a failing document inside a claim request is excluded and
//! reported, not fatal.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use nhcx_bundle::{BundleBuilder, BundleOptions, SourceAttachment};
use nhcx_coding::{CodingEngine, MatchConfig};
use nhcx_fusion::fuse;
use nhcx_model::{
    BundleGraph, BundleMode, CandidateCode, CodingSystem, DocumentId, ExtractedDocument,
    ExtractionError, FusedRecord, HiType, ValidationReport,
};
use nhcx_standards::TerminologyRegistry;
use nhcx_validate::Validator;

use crate::error::ConvertError;
use crate::traits::{DocumentInput, DocumentSource, HiTypeDetector};

/// Default bound on one extraction call.
const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);
/// Detections below this confidence leave the document unclassified.
const DEFAULT_DETECTOR_MIN_CONFIDENCE: f64 = 0.5;

/// Request-level options.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub mode: BundleMode,
    /// Timestamp recorded on the bundle; explicit so conversion stays a
    /// pure function of its inputs.
    pub authored: DateTime<Utc>,
    pub embed_sources: bool,
}

impl ConvertOptions {
    pub fn new(mode: BundleMode, authored: DateTime<Utc>) -> Self {
        Self {
            mode,
            authored,
            embed_sources: true,
        }
    }
}

/// Result of a single-document conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub bundle: BundleGraph,
    pub report: ValidationReport,
    pub hi_type: Option<HiType>,
    /// The coded document, for callers that surface extraction detail.
    pub document: ExtractedDocument,
}

/// Result of a multi-document claim conversion.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub bundle: BundleGraph,
    pub report: ValidationReport,
    pub fused: FusedRecord,
    /// Documents excluded from fusion, with the reason each failed.
    pub failed_documents: Vec<ExtractionError>,
}

/// Conversion pipeline over a registry snapshot and collaborators.
pub struct Pipeline<S: DocumentSource + 'static> {
    source: Arc<S>,
    detector: Option<Arc<dyn HiTypeDetector>>,
    engine: CodingEngine,
    validator: Validator,
    extraction_timeout: Duration,
    detector_min_confidence: f64,
}

impl<S: DocumentSource + 'static> Pipeline<S> {
    pub fn new(source: S, registry: Arc<TerminologyRegistry>) -> Self {
        Self {
            source: Arc::new(source),
            detector: None,
            engine: CodingEngine::new(registry, MatchConfig::default()),
            validator: Validator::new(),
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            detector_min_confidence: DEFAULT_DETECTOR_MIN_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn HiTypeDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    #[must_use]
    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.engine = CodingEngine::new(self.engine.registry_handle(), config);
        self
    }

    #[must_use]
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Converts a single document into a validated bundle.
    pub fn convert(
        &self,
        input: DocumentInput,
        options: &ConvertOptions,
    ) -> Result<ConversionOutcome, ConvertError> {
        let mut document = self.extract_with_timeout(input)?;
        self.classify(&mut document);
        self.engine.code_document(&mut document)?;

        let hi_type = document.encounter.hi_type_hint;
        let builder = self.builder(hi_type, options);
        let bundle = builder.build_from_document(&document);
        let report = self.validator.validate(&bundle);
        info!(
            document = %document.id,
            entries = bundle.len(),
            score = report.score.total,
            "converted document"
        );
        Ok(ConversionOutcome {
            bundle,
            report,
            hi_type,
            document,
        })
    }

    /// Converts a multi-document set into one fused claim bundle.
    ///
    /// Per-document extraction runs concurrently; fusion waits for every
    /// document to finish or fail (a join barrier). One document's failure
    /// excludes only that document.
    pub fn convert_claim(
        &self,
        inputs: Vec<DocumentInput>,
        options: &ConvertOptions,
    ) -> Result<ClaimOutcome, ConvertError> {
        if inputs.is_empty() {
            return Err(ConvertError::NoDocuments);
        }
        let total = inputs.len();

        let (mut documents, failed_documents) = self.extract_all(inputs);
        if documents.is_empty() {
            return Err(ConvertError::AllDocumentsFailed {
                count: total,
                failures: failed_documents,
            });
        }
        for failure in &failed_documents {
            warn!(document = %failure.document(), error = %failure, "document excluded from claim");
        }

        for document in &mut documents {
            self.classify(document);
            self.engine.code_document(document)?;
        }

        let fused = fuse(&documents);
        let hi_type = fused.encounter.hi_type_hint;
        let attachments: Vec<SourceAttachment<'_>> = documents
            .iter()
            .map(|doc| SourceAttachment {
                document: &doc.id,
                bytes: doc.source_bytes.as_deref(),
            })
            .collect();

        let builder = self.builder(hi_type, options);
        let bundle = builder.build_from_fused(&fused, &attachments);
        let report = self.validator.validate(&bundle);
        info!(
            documents = documents.len(),
            failed = failed_documents.len(),
            conflicts = fused.conflicts.len(),
            score = report.score.total,
            "converted claim"
        );
        Ok(ClaimOutcome {
            bundle,
            report,
            fused,
            failed_documents,
        })
    }

    /// Validates an externally supplied bundle graph.
    pub fn validate(&self, bundle: &BundleGraph) -> ValidationReport {
        self.validator.validate(bundle)
    }

    /// Interactive code lookup backed by the matcher.
    pub fn search_codes(&self, system: CodingSystem, query: &str) -> Vec<CandidateCode> {
        self.engine.search(system, query)
    }

    pub fn registry_fingerprint(&self) -> &str {
        self.engine.registry().fingerprint()
    }

    fn builder(&self, hi_type: Option<HiType>, options: &ConvertOptions) -> BundleBuilder {
        let mut bundle_options = BundleOptions::new(options.mode, hi_type, options.authored);
        if !options.embed_sources {
            bundle_options = bundle_options.without_source_embedding();
        }
        BundleBuilder::new(bundle_options)
    }

    /// Runs the detector when neither caller nor extractor classified the
    /// document; low-confidence detections are dropped rather than trusted.
    fn classify(&self, document: &mut ExtractedDocument) {
        if document.encounter.hi_type_hint.is_some() {
            return;
        }
        let Some(detector) = &self.detector else {
            return;
        };
        let text: String = document
            .sections
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(detection) = detector.detect(&text) {
            if detection.confidence >= self.detector_min_confidence {
                document.encounter.hi_type_hint = Some(detection.hi_type);
            } else {
                warn!(
                    confidence = detection.confidence,
                    "detector confidence too low, leaving document unclassified"
                );
            }
        }
    }

    /// Single-document extraction under the per-call timeout.
    fn extract_with_timeout(
        &self,
        input: DocumentInput,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let id = input.id.clone();
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        thread::spawn(move || {
            // Receiver may be gone after a timeout; nothing to do then.
            let _ = tx.send(source.extract(&input));
        });
        match rx.recv_timeout(self.extraction_timeout) {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                document: id,
                seconds: self.extraction_timeout.as_secs(),
            }),
        }
    }

    /// Concurrent extraction of all documents; the join barrier before
    /// fusion. Returns successful documents in ascending id order plus the
    /// named failures.
    fn extract_all(
        &self,
        inputs: Vec<DocumentInput>,
    ) -> (Vec<ExtractedDocument>, Vec<ExtractionError>) {
        let mut receivers = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = input.id.clone();
            let (tx, rx) = mpsc::channel();
            let source = Arc::clone(&self.source);
            thread::spawn(move || {
                let _ = tx.send(source.extract(&input));
            });
            receivers.push((id, rx));
        }

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for (id, rx) in receivers {
            match rx.recv_timeout(self.extraction_timeout) {
                Ok(Ok(document)) => documents.push(document),
                Ok(Err(error)) => failures.push(error),
                Err(_) => failures.push(ExtractionError::Timeout {
                    document: id,
                    seconds: self.extraction_timeout.as_secs(),
                }),
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        failures.sort_by(|a, b| a.document().cmp(b.document()));
        (documents, failures)
    }
}
