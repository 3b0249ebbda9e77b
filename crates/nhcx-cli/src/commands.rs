//! Command implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use nhcx_core::{ConvertOptions, DocumentInput, JsonDocumentSource, Pipeline};
use nhcx_model::{BundleGraph, DocumentId, HiType, ValidationReport};
use nhcx_standards::{TerminologyRegistry, verify_required_domains};

use crate::cli::{ClaimArgs, CodesArgs, ConvertArgs, ValidateArgs};
use crate::summary::{print_codes, print_conversion_summary, print_validation_summary};

/// Outcome handed back to `main` for exit-code mapping.
pub struct RunResult {
    pub has_errors: bool,
}

pub fn run_convert(args: &ConvertArgs, dictionary_dir: Option<&Path>) -> Result<RunResult> {
    let pipeline = build_pipeline(dictionary_dir)?;
    let input = read_document_input(&args.document, args.hi_type.map(HiType::from))?;

    let mut options = ConvertOptions::new(args.mode.into(), Utc::now());
    options.embed_sources = !args.no_embed;

    let outcome = pipeline.convert(input, &options)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_out_path(&args.document));
    let result = serde_json::json!({
        "bundle": outcome.bundle,
        "validation": outcome.report,
        "hi_type": outcome.hi_type,
        "document": outcome.document,
    });
    write_json(&out, &result)?;
    info!(out = %out.display(), "wrote conversion result");

    print_conversion_summary(&outcome.report, &outcome.bundle, &[], &[]);
    Ok(RunResult {
        has_errors: outcome.report.has_errors(),
    })
}

pub fn run_claim(args: &ClaimArgs, dictionary_dir: Option<&Path>) -> Result<RunResult> {
    let pipeline = build_pipeline(dictionary_dir)?;
    let hint = args.hi_type.map(HiType::from);
    let inputs = args
        .documents
        .iter()
        .map(|path| read_document_input(path, hint))
        .collect::<Result<Vec<_>>>()?;

    let mut options = ConvertOptions::new(args.use_case.into(), Utc::now());
    options.embed_sources = !args.no_embed;

    let outcome = pipeline.convert_claim(inputs, &options)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_out_path(&args.documents[0]));
    let result = serde_json::json!({
        "bundle": outcome.bundle,
        "validation": outcome.report,
        "fusion": {
            "record": outcome.fused,
            "conflicts": outcome.fused.conflicts,
        },
        "failed_documents": outcome
            .failed_documents
            .iter()
            .map(|e| serde_json::json!({
                "document": e.document().as_str(),
                "reason": e.to_string(),
            }))
            .collect::<Vec<_>>(),
    });
    write_json(&out, &result)?;
    info!(out = %out.display(), "wrote claim result");

    print_conversion_summary(
        &outcome.report,
        &outcome.bundle,
        &outcome.fused.conflicts,
        &outcome.failed_documents,
    );
    Ok(RunResult {
        has_errors: outcome.report.has_errors(),
    })
}

pub fn run_validate(args: &ValidateArgs) -> Result<RunResult> {
    let raw = fs::read(&args.bundle)
        .with_context(|| format!("failed to read bundle {}", args.bundle.display()))?;
    let bundle: BundleGraph = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse bundle {}", args.bundle.display()))?;

    let validator = nhcx_validate::Validator::new();
    let report: ValidationReport = validator.validate(&bundle);
    print_validation_summary(&report);
    Ok(RunResult {
        has_errors: report.has_errors(),
    })
}

pub fn run_codes(args: &CodesArgs, dictionary_dir: Option<&Path>) -> Result<RunResult> {
    let pipeline = build_pipeline(dictionary_dir)?;
    let hits = pipeline.search_codes(args.system.into(), &args.query);
    print_codes(&args.query, &hits);
    Ok(RunResult { has_errors: false })
}

/// Loads the terminology registry and assembles the pipeline. Dictionary
/// problems are fatal here, at startup, never per-request.
fn build_pipeline(dictionary_dir: Option<&Path>) -> Result<Pipeline<JsonDocumentSource>> {
    let registry = match dictionary_dir {
        Some(dir) => TerminologyRegistry::from_dir(dir)
            .with_context(|| format!("failed to load dictionaries from {}", dir.display()))?,
        None => TerminologyRegistry::builtin(),
    };
    verify_required_domains(&registry).context("dictionary configuration incomplete")?;
    info!(fingerprint = registry.fingerprint(), "terminology registry loaded");
    Ok(Pipeline::new(JsonDocumentSource::new(), Arc::new(registry)))
}

fn read_document_input(path: &Path, hint: Option<HiType>) -> Result<DocumentInput> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read document {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let id = DocumentId::new(stem)
        .with_context(|| format!("invalid document name {}", path.display()))?;
    Ok(DocumentInput {
        id,
        bytes,
        hi_type_hint: hint,
    })
}

fn default_out_path(document: &Path) -> PathBuf {
    document.with_extension("bundle.json")
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render result JSON")?;
    fs::write(path, rendered)
        .with_context(|| format!("failed to write result to {}", path.display()))
}
