//! Human-readable audit reports
//!
//! Plain string rendering of a batch audit: per-page budget verdicts, size
//! diffs for the types that regressed, and the pages that could not be
//! audited at all. Machine consumers use `--format json` instead.

use crate::audit::{AuditVerdict, BYTES_PER_KB};
use crate::manifest::{DiffKind, DiffReport};
use crate::runner::{AuditSummary, PageAudit, TypeDiff};

/// Bytes rendered in the unit budgets are configured in
fn kb(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / BYTES_PER_KB as f64)
}

fn signed_kb(bytes: i64) -> String {
    format!("{:+.2} KB", bytes as f64 / BYTES_PER_KB as f64)
}

fn verdict_line(verdict: &AuditVerdict) -> String {
    match verdict.size_over_budget {
        Some(over) => format!(
            "  ❌ {}: {} ({} over budget)\n",
            verdict.resource_type,
            kb(verdict.size),
            kb(over)
        ),
        None => format!(
            "  ✅ {}: {} (within budget)\n",
            verdict.resource_type,
            kb(verdict.size)
        ),
    }
}

fn diff_section(diff: &TypeDiff) -> String {
    let mut section = String::new();
    match &diff.report {
        None => {
            section.push_str(&format!(
                "  📦 {} size changes: no baseline manifest yet, diff skipped\n",
                diff.filetype
            ));
        }
        Some(report) if report.is_empty() => {
            section.push_str(&format!(
                "  📦 {} size changes: none (bundle contents unchanged)\n",
                diff.filetype
            ));
        }
        Some(report) => {
            section.push_str(&format!("  📦 {} size changes:\n", diff.filetype));
            section.push_str(&render_diff_entries(report));
        }
    }
    section
}

fn render_diff_entries(report: &DiffReport) -> String {
    let mut out = String::new();
    for entry in &report.entries {
        let marker = match entry.kind {
            DiffKind::Added => "+",
            DiffKind::Removed => "-",
            DiffKind::Modified => "~",
        };
        out.push_str(&format!(
            "    {} {} ({}): {} -> {}, {}\n",
            marker,
            entry.file,
            entry.bundle_name,
            entry
                .previous_size
                .map(kb)
                .unwrap_or_else(|| "absent".to_string()),
            entry
                .current_size
                .map(kb)
                .unwrap_or_else(|| "absent".to_string()),
            signed_kb(entry.change)
        ));
    }
    out.push_str(&format!(
        "    Total across changed files: {} -> {}, {}\n",
        kb(report.totals.previous),
        kb(report.totals.current),
        signed_kb(report.totals.change)
    ));
    out
}

fn page_section(page: &PageAudit) -> String {
    let mut section = format!("Page: {}\n", page.url);
    if page.verdicts.is_empty() {
        section.push_str("  (none of the budgeted resource types were observed)\n");
    }
    for verdict in &page.verdicts {
        section.push_str(&verdict_line(verdict));
    }
    for diff in &page.diffs {
        section.push_str(&diff_section(diff));
    }
    section
}

/// Render the whole batch result as a report string
pub fn render_summary(summary: &AuditSummary) -> String {
    let mut report = String::new();
    for page in &summary.pages {
        report.push_str(&page_section(page));
        report.push('\n');
    }

    if !summary.failures.is_empty() {
        report.push_str("⚠️  Pages that could not be audited:\n");
        for failure in &summary.failures {
            report.push_str(&format!("  {}: {}\n", failure.path, failure.reason));
        }
        report.push('\n');
    }

    let failed = summary.failed_audit_count();
    if failed == 0 && summary.failures.is_empty() {
        report.push_str("✅ All audited pages are within budget\n");
    } else {
        report.push_str(&format!(
            "❌ {} budget check(s) failed across {} page(s)\n",
            failed,
            summary.pages.len()
        ));
    }
    report
}
