//! Collects findings from any number of walker runs into one ordered,
//! deduplicated result.

use std::cmp::Ordering;

use super::types::{AnalysisResult, Finding, SeverityCounts, SuppressedFinding};

/// Total order used for every report: file, then position, then rule id.
/// Remaining keys only break ties between findings at the same spot; the
/// more severe of two otherwise equal findings sorts first.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    a.file
        .cmp(&b.file)
        .then(a.span.start_line.cmp(&b.span.start_line))
        .then(a.span.start_col.cmp(&b.span.start_col))
        .then(a.rule.as_str().cmp(b.rule.as_str()))
        .then(a.span.end_line.cmp(&b.span.end_line))
        .then(a.span.end_col.cmp(&b.span.end_col))
        .then(b.severity.cmp(&a.severity))
        .then(a.message.cmp(&b.message))
}

/// Sort findings and drop duplicates (same rule, file and span), keeping
/// the most severe of each group.
pub fn order_findings(findings: &mut Vec<Finding>) {
    findings.sort_by(compare_findings);
    findings.dedup_by(|later, earlier| {
        later.rule == earlier.rule && later.file == earlier.file && later.span == earlier.span
    });
}

/// Builds an [`AnalysisResult`] from per-file outputs arriving in any order.
#[derive(Debug, Default)]
pub struct Aggregator {
    findings: Vec<Finding>,
    suppressed: Vec<SuppressedFinding>,
    scanned: usize,
    skipped: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one analyzed file.
    pub fn add_file(&mut self, findings: Vec<Finding>, suppressed: Vec<SuppressedFinding>) {
        self.scanned += 1;
        self.findings.extend(findings);
        self.suppressed.extend(suppressed);
    }

    /// Record a file that was never started.
    pub fn skip_file(&mut self) {
        self.skipped += 1;
    }

    pub fn finish(self) -> AnalysisResult {
        let mut findings = self.findings;
        order_findings(&mut findings);

        let mut suppressed = self.suppressed;
        suppressed.sort_by(|a, b| compare_findings(&a.finding, &b.finding));

        let mut summary = SeverityCounts::default();
        for finding in &findings {
            summary.add(finding.severity);
        }

        AnalysisResult {
            findings,
            suppressed,
            summary,
            scanned: self.scanned,
            skipped: self.skipped,
        }
    }
}
