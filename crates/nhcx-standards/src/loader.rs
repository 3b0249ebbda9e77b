//! CSV dictionary asset loading.
//!
//! A dictionary directory contains one CSV per coding domain:
//! `diagnosis.csv` (ICD-10) and `lab.csv` (LOINC) are required,
//! `procedure.csv` and `abbreviations.csv` are optional. Dictionary CSVs
//! carry `term,code,display` columns with an optional `rank`;
//! `abbreviations.csv` carries `short,expansion`.

use std::collections::BTreeMap;
use std::path::Path;

use nhcx_model::{CodingSystem, FindingKind};

use crate::dictionary::Dictionary;
use crate::error::StandardsError;
use crate::text::normalize;

const TERM_COLUMN: &str = "term";
const CODE_COLUMN: &str = "code";
const DISPLAY_COLUMN: &str = "display";
const RANK_COLUMN: &str = "rank";

/// Loads one dictionary CSV.
pub fn load_dictionary_csv(
    path: &Path,
    system: CodingSystem,
) -> Result<Dictionary, StandardsError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, &e))?;

    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, &e))?
        .clone();
    let term_idx = column_index(&headers, TERM_COLUMN, path)?;
    let code_idx = column_index(&headers, CODE_COLUMN, path)?;
    let display_idx = column_index(&headers, DISPLAY_COLUMN, path)?;
    let rank_idx = headers.iter().position(|h| h.eq_ignore_ascii_case(RANK_COLUMN));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, &e))?;
        let term = record.get(term_idx).unwrap_or_default().to_string();
        let code = record.get(code_idx).unwrap_or_default().to_string();
        let display = record.get(display_idx).unwrap_or_default().to_string();
        if term.is_empty() || code.is_empty() {
            continue;
        }
        let rank = rank_idx
            .and_then(|idx| record.get(idx))
            .and_then(|raw| raw.parse::<u8>().ok());
        rows.push((term, code, display, rank));
    }

    if rows.is_empty() {
        return Err(StandardsError::EmptyDictionary {
            path: path.to_path_buf(),
        });
    }

    Ok(Dictionary::from_entries(system, rows))
}

/// Loads the optional abbreviation table. Short forms and expansions are
/// both normalized so they compose with query normalization.
pub fn load_abbreviations_csv(path: &Path) -> Result<BTreeMap<String, String>, StandardsError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, &e))?;

    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, &e))?
        .clone();
    let short_idx = column_index(&headers, "short", path)?;
    let expansion_idx = column_index(&headers, "expansion", path)?;

    let mut table = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, &e))?;
        let short = normalize(record.get(short_idx).unwrap_or_default());
        let expansion = normalize(record.get(expansion_idx).unwrap_or_default());
        if !short.is_empty() && !expansion.is_empty() {
            table.insert(short, expansion);
        }
    }
    Ok(table)
}

/// File name for a coding domain's dictionary asset.
pub fn dictionary_file_name(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::Diagnosis => "diagnosis.csv",
        FindingKind::LabResult => "lab.csv",
        FindingKind::Procedure => "procedure.csv",
    }
}

fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    path: &Path,
) -> Result<usize, StandardsError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .ok_or_else(|| StandardsError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

fn csv_error(path: &Path, error: &dyn std::fmt::Display) -> StandardsError {
    StandardsError::Csv {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
