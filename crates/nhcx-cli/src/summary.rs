//! Human-readable run summaries.

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};

use nhcx_model::{
    BundleGraph, CandidateCode, Conflict, ExtractionError, ScoreCategory, Severity,
    ValidationReport,
};

pub fn print_conversion_summary(
    report: &ValidationReport,
    bundle: &BundleGraph,
    conflicts: &[Conflict],
    failed: &[ExtractionError],
) {
    println!(
        "bundle {} - {} entries, mode {:?}",
        bundle.id,
        bundle.len(),
        bundle.mode
    );
    if !conflicts.is_empty() {
        let unresolved = conflicts.iter().filter(|c| !c.is_resolved()).count();
        println!(
            "conflicts: {} detected, {} unresolved",
            conflicts.len(),
            unresolved
        );
        for conflict in conflicts {
            match &conflict.resolution {
                Some(resolution) => println!(
                    "  {} -> {:?} ({})",
                    conflict.field_path,
                    resolution.value,
                    resolution.rule.as_str()
                ),
                None => println!("  {} -> unresolved", conflict.field_path),
            }
        }
    }
    for failure in failed {
        println!("excluded document: {failure}");
    }
    print_validation_summary(report);
}

pub fn print_validation_summary(report: &ValidationReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["category", "points", "weight"]);
    for category in ScoreCategory::ALL {
        table.add_row(vec![
            Cell::new(category.as_str()),
            Cell::new(format!("{:.1}", report.score.category(category))),
            Cell::new(format!("{:.0}", category.weight())),
        ]);
    }
    table.add_row(vec![
        Cell::new("total"),
        Cell::new(report.score.total.to_string()),
        Cell::new("100"),
    ]);
    println!("{table}");

    println!(
        "issues: {} errors, {} warnings, {} informational",
        report.error_count(),
        report.warning_count(),
        report.issues.len() - report.error_count() - report.warning_count()
    );
    for issue in &report.issues {
        let tag = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
        };
        println!("  [{tag}] {}: {} ({})", issue.code, issue.message, issue.location);
    }
    println!(
        "submission ready: {}",
        if report.is_submission_ready() { "yes" } else { "no" }
    );
}

pub fn print_codes(query: &str, hits: &[CandidateCode]) {
    if hits.is_empty() {
        println!("no codes matched {query:?}");
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["code", "display", "score", "system"]);
    for hit in hits {
        table.add_row(vec![
            Cell::new(&hit.code),
            Cell::new(&hit.display),
            Cell::new(format!("{:.2}", hit.score)),
            Cell::new(hit.system.as_str()),
        ]);
    }
    println!("{table}");
}
