//! CLI output formatting for pipeline stages.
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ```text
//! ==> catalog
//!     warning: object "ghost": no image source
//!     objects.json written (12 objects)
//! ==> stories
//!     warning: step 3: Object "ghost" has no usable image source
//!     story-1.json written (8 steps, 1 warnings)
//! ```
//!
//! Findings (things a curator should fix) are prefixed `warning:` so they
//! stand out from the progress notes; none of them stop the build.

use crate::pipeline::{StageReport, has_findings};

fn indent(line: &str) -> String {
    format!("    {line}")
}

/// Format a single stage report: header, findings, then notes.
pub fn format_stage_report(report: &StageReport) -> Vec<String> {
    let mut lines = vec![format!("==> {}", report.stage)];
    for finding in &report.findings {
        lines.push(indent(&format!("warning: {finding}")));
    }
    for note in &report.notes {
        lines.push(indent(note));
    }
    lines
}

pub fn print_stage_report(report: &StageReport) {
    for line in format_stage_report(report) {
        println!("{line}");
    }
}

/// One-line build summary across all stages.
pub fn format_build_summary(reports: &[StageReport]) -> String {
    let findings: usize = reports.iter().map(|r| r.findings.len()).sum();
    if findings == 0 {
        "==> Build complete".to_string()
    } else {
        format!("==> Build complete with {findings} warning(s)")
    }
}

pub fn print_build_summary(reports: &[StageReport]) {
    println!("{}", format_build_summary(reports));
}

/// Summary for `check`: validation only, nothing written.
pub fn format_check_summary(reports: &[StageReport]) -> String {
    if has_findings(reports) {
        let findings: usize = reports.iter().map(|r| r.findings.len()).sum();
        format!("==> Found {findings} problem(s); nothing was written")
    } else {
        "==> Content is valid".to_string()
    }
}

pub fn print_check_summary(reports: &[StageReport]) {
    println!("{}", format_check_summary(reports));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageReport;

    fn report(stage: &'static str, findings: &[&str], notes: &[&str]) -> StageReport {
        StageReport {
            stage,
            findings: findings.iter().map(|f| f.to_string()).collect(),
            notes: notes.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn findings_listed_before_notes() {
        let lines = format_stage_report(&report(
            "catalog",
            &["object \"ghost\": no image source"],
            &["objects.json written (1 objects)"],
        ));
        assert_eq!(lines[0], "==> catalog");
        assert!(lines[1].contains("warning: object \"ghost\""));
        assert!(lines[2].contains("objects.json written"));
    }

    #[test]
    fn clean_build_summary() {
        let reports = vec![report("catalog", &[], &["done"])];
        assert_eq!(format_build_summary(&reports), "==> Build complete");
    }

    #[test]
    fn summary_counts_findings_across_stages() {
        let reports = vec![
            report("catalog", &["a"], &[]),
            report("stories", &["b", "c"], &[]),
        ];
        assert_eq!(
            format_build_summary(&reports),
            "==> Build complete with 3 warning(s)"
        );
        assert!(format_check_summary(&reports).contains("3 problem(s)"));
    }

    #[test]
    fn check_summary_when_clean() {
        let reports = vec![report("project", &[], &["2 settings, 1 stories"])];
        assert_eq!(format_check_summary(&reports), "==> Content is valid");
    }
}
