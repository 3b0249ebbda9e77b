//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use nhcx_model::{BundleMode, CodingSystem, HiType};

#[derive(Parser)]
#[command(
    name = "nhcx-convert",
    version,
    about = "NHCX clinical document converter - build and validate exchange bundles",
    long_about = "Convert structured clinical document extractions into \
                  NHCX-compliant FHIR R4 document bundles.\n\n\
                  Codes diagnoses (ICD-10) and lab tests (LOINC) fully offline,\n\
                  fuses multi-document claims, and scores submission readiness."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Directory with dictionary assets (diagnosis.csv, lab.csv) replacing
    /// the embedded terminology.
    #[arg(long = "dictionary-dir", value_name = "DIR", global = true)]
    pub dictionary_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a single extracted document into a validated bundle.
    Convert(ConvertArgs),

    /// Fuse several extracted documents into one claim bundle.
    Claim(ClaimArgs),

    /// Validate an existing bundle JSON file.
    Validate(ValidateArgs),

    /// Search the offline terminology dictionaries.
    Codes(CodesArgs),
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Extracted document JSON file.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Health-information type, overriding detection.
    #[arg(long = "hi-type", value_enum)]
    pub hi_type: Option<HiTypeArg>,

    /// Bundle mode to assemble.
    #[arg(long = "mode", value_enum, default_value = "document")]
    pub mode: ModeArg,

    /// Output path for the result JSON (default: <DOCUMENT>.bundle.json).
    #[arg(long = "out", value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Skip embedding the original source bytes into the bundle.
    #[arg(long = "no-embed")]
    pub no_embed: bool,
}

#[derive(Parser)]
pub struct ClaimArgs {
    /// Extracted document JSON files (discharge summary, lab reports, ...).
    #[arg(value_name = "DOCUMENTS", required = true)]
    pub documents: Vec<PathBuf>,

    /// Claim use case.
    #[arg(long = "use-case", value_enum, default_value = "claim")]
    pub use_case: UseCaseArg,

    /// Health-information type, overriding detection.
    #[arg(long = "hi-type", value_enum)]
    pub hi_type: Option<HiTypeArg>,

    /// Output path for the result JSON.
    #[arg(long = "out", value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Skip embedding the original source bytes into the bundle.
    #[arg(long = "no-embed")]
    pub no_embed: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Bundle JSON file to validate.
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,
}

#[derive(Parser)]
pub struct CodesArgs {
    /// Coding system to search.
    #[arg(value_enum)]
    pub system: SystemArg,

    /// Query text, e.g. "type 2 diabetes" or "haemoglobin".
    #[arg(value_name = "QUERY")]
    pub query: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HiTypeArg {
    DischargeSummary,
    DiagnosticReport,
    OpConsultation,
    Prescription,
}

impl From<HiTypeArg> for HiType {
    fn from(arg: HiTypeArg) -> Self {
        match arg {
            HiTypeArg::DischargeSummary => HiType::DischargeSummary,
            HiTypeArg::DiagnosticReport => HiType::DiagnosticReport,
            HiTypeArg::OpConsultation => HiType::OpConsultation,
            HiTypeArg::Prescription => HiType::Prescription,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Document,
    Claim,
    Preauthorization,
}

impl From<ModeArg> for BundleMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Document => BundleMode::Document,
            ModeArg::Claim => BundleMode::Claim,
            ModeArg::Preauthorization => BundleMode::Preauthorization,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UseCaseArg {
    Claim,
    Preauthorization,
}

impl From<UseCaseArg> for BundleMode {
    fn from(arg: UseCaseArg) -> Self {
        match arg {
            UseCaseArg::Claim => BundleMode::Claim,
            UseCaseArg::Preauthorization => BundleMode::Preauthorization,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SystemArg {
    Icd10,
    Loinc,
}

impl From<SystemArg> for CodingSystem {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::Icd10 => CodingSystem::Icd10,
            SystemArg::Loinc => CodingSystem::Loinc,
        }
    }
}
