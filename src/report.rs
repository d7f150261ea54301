//! Output formatting for smellcheck results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use crate::detect::{AnalysisResult, Finding, RuleId, Severity, SeverityCounts, SuppressedFinding};
use crate::rules::Rule;
use crate::score::RiskScore;

/// What was scanned, and against which settings.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    /// Path given on the command line.
    pub path: &'a str,
    /// Config file used, if any.
    pub config: Option<&'a str>,
    pub fail_on: Severity,
}

impl ReportContext<'_> {
    pub fn passed(&self, result: &AnalysisResult) -> bool {
        !result.exceeds(self.fail_on)
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub fail_on: Severity,
    pub passed: bool,
    pub score: u32,
    pub grade: String,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub summary: SeverityCounts,
    pub findings: Vec<JsonFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedFinding>,
    pub suppressed_count: usize,
    pub breakdown: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFinding {
    pub rule: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSuppressedFinding {
    pub finding: JsonFinding,
    pub suppression_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Breakdown entry for score details.
#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub rule: String,
    pub points: u32,
    pub findings: usize,
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    JsonFinding {
        rule: f.rule.as_str().to_string(),
        severity: f.severity.to_string(),
        file: f.file.clone(),
        line: f.span.start_line,
        column: f.span.start_col,
        end_line: f.span.end_line,
        end_column: f.span.end_col,
        message: f.message.clone(),
        suggestion: f.suggestion.clone(),
        cwe: f.cwe.clone(),
    }
}

fn suppressed_to_json(s: &SuppressedFinding) -> JsonSuppressedFinding {
    JsonSuppressedFinding {
        finding: finding_to_json(&s.finding),
        suppression_line: s.suppression_line,
        reason: s.reason.clone(),
    }
}

/// Build the JSON report.
pub fn json_report(ctx: &ReportContext<'_>, result: &AnalysisResult, score: &RiskScore) -> JsonReport {
    let breakdown = score
        .breakdown
        .iter()
        .map(|(rule, points)| BreakdownEntry {
            rule: rule.clone(),
            points: *points,
            findings: result
                .findings
                .iter()
                .filter(|f| f.rule.as_str() == rule)
                .count(),
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: ctx.path.to_string(),
        config: ctx.config.map(str::to_string),
        fail_on: ctx.fail_on,
        passed: ctx.passed(result),
        score: score.score,
        grade: score.grade.clone(),
        files_scanned: result.scanned,
        files_skipped: result.skipped,
        summary: result.summary,
        findings: result.findings.iter().map(finding_to_json).collect(),
        suppressed: result.suppressed.iter().map(suppressed_to_json).collect(),
        suppressed_count: result.suppressed_count(),
        breakdown,
    }
}

/// Write results in JSON format.
pub fn write_json(ctx: &ReportContext<'_>, result: &AnalysisResult, score: &RiskScore) -> anyhow::Result<()> {
    emit_json(&mut io::stdout().lock(), &json_report(ctx, result, score))
}

/// Write `value` as pretty JSON plus a newline. A reader that has gone
/// away (`smellcheck ... | head`) is not an error.
pub fn emit_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> anyhow::Result<()> {
    let written = serde_json::to_writer_pretty(&mut *out, value)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(out))
        .and_then(|()| out.flush());
    match written {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "smellcheck";
const INFO_URI: &str = "https://github.com/zen-systems/smellcheck";

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    #[serde(rename = "informationUri")]
    pub information_uri: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "helpUri", skip_serializing_if = "Option::is_none")]
    pub help_uri: Option<String>,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SarifProperties>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifProperties {
    pub cwe: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "startColumn")]
    pub start_column: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    #[serde(rename = "endColumn")]
    pub end_column: usize,
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// Level of a rule's default severity; engine pseudo-rules are errors.
fn default_level(id: RuleId) -> &'static str {
    Rule::builtin(id, None)
        .map(|rule| map_severity_to_level(rule.severity()))
        .unwrap_or("error")
}

/// `long_parameter_list` -> `LongParameterList`.
fn pascal_case(id: &str) -> String {
    id.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn cwe_uri(cwe: &str) -> Option<String> {
    cwe.strip_prefix("CWE-")
        .map(|n| format!("https://cwe.mitre.org/data/definitions/{}.html", n))
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    if base_path.to_string_lossy().is_empty() {
        return file_path.to_string();
    }

    let file = Path::new(file_path);

    // Single file scan: just the file name
    if file == base_path {
        return file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());
    }

    file.strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.to_string())
}

/// Build the SARIF log. Rules are listed for every rule id that has a finding.
pub fn sarif_report(base_path: &Path, result: &AnalysisResult) -> SarifReport {
    let rule_ids: BTreeSet<RuleId> = result.findings.iter().map(|f| f.rule).collect();

    let rules = rule_ids
        .into_iter()
        .map(|id| SarifRule {
            id: id.as_str().to_string(),
            name: pascal_case(id.as_str()),
            short_description: SarifMessage {
                text: id.description().to_string(),
            },
            help_uri: id.cwe().and_then(cwe_uri),
            default_config: SarifRuleConfig {
                level: default_level(id).to_string(),
            },
        })
        .collect();

    let results = result
        .findings
        .iter()
        .map(|f| SarifResult {
            rule_id: f.rule.as_str().to_string(),
            level: map_severity_to_level(f.severity).to_string(),
            message: SarifMessage {
                text: f.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&f.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: f.span.start_line.max(1),
                        start_column: f.span.start_col.max(1),
                        end_line: f.span.end_line.max(1),
                        end_column: f.span.end_col.max(1),
                    },
                },
            }],
            properties: f.cwe.clone().map(|cwe| SarifProperties { cwe }),
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    information_uri: INFO_URI.to_string(),
                    rules,
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(base_path: &Path, result: &AnalysisResult) -> anyhow::Result<()> {
    emit_json(&mut io::stdout().lock(), &sarif_report(base_path, result))
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(
    ctx: &ReportContext<'_>,
    result: &AnalysisResult,
    score: &RiskScore,
    show_suppressed: bool,
) {
    println!();
    print!("  ");
    print!("{}", "smellcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", ctx.path);
    print!("  {}", "Config:   ".dimmed());
    println!("{}", ctx.config.unwrap_or("(built-in defaults)"));
    print!("  {}", "Files:    ".dimmed());
    print!("{}", result.scanned);
    if result.skipped > 0 {
        print!("{}", format!(" ({} skipped by timeout)", result.skipped).yellow());
    }
    println!();
    println!();

    write_result_summary(ctx.passed(result), score, result.suppressed.len());
    println!();

    if !result.findings.is_empty() {
        write_findings(&result.findings);
        println!();
    }

    if !result.suppressed.is_empty() {
        write_suppressed_summary(&result.suppressed, show_suppressed);
        println!();
    }

    write_counts(&result.summary);
    println!();

    write_final_status(ctx, result);
    println!();
}

fn write_result_summary(passed: bool, score: &RiskScore, suppressed_count: usize) {
    if passed {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }

    print!("  Risk: ");
    write_colored_score(score.score);
    print!("  Grade: ");
    write_colored_grade(&score.grade);

    if suppressed_count > 0 {
        print!(
            "  {}",
            format!("({} suppressed)", suppressed_count).dimmed()
        );
    }

    println!();
}

fn write_colored_score(s: u32) {
    match s {
        s if s <= 10 => print!("{}", s.to_string().green().bold()),
        s if s <= 25 => print!("{}", s.to_string().green()),
        s if s <= 50 => print!("{}", s.to_string().yellow()),
        s if s <= 75 => print!("{}", s.to_string().yellow().bold()),
        _ => print!("{}", s.to_string().red()),
    }
}

fn write_colored_grade(grade: &str) {
    match grade {
        "A" => print!("{}", grade.green().bold()),
        "B" => print!("{}", grade.green()),
        "C" => print!("{}", grade.yellow()),
        "D" => print!("{}", grade.yellow().bold()),
        _ => print!("{}", grade.red()),
    }
}

fn write_findings(findings: &[Finding]) {
    println!("  {} ({}):", "Findings".bold(), findings.len());
    println!();

    for f in findings {
        write_severity_tag(f.severity);
        print!("   ");
        print!("{:<22}", f.rule.as_str().dimmed());
        print!("{}", f.file.blue());
        print!("{}", format!(":{}", f.span).dimmed());
        println!();

        println!("            {}", f.message);
        if let Some(suggestion) = &f.suggestion {
            println!("            {}", format!("hint: {}", suggestion).dimmed());
        }
        println!();
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {} ", "CRIT ".red().bold()),
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_counts(counts: &SeverityCounts) {
    println!("  {}", "Summary:".bold());
    for severity in Severity::descending() {
        println!("    {:<10} {:>4}", severity.as_str(), counts.get(severity));
    }
}

fn write_final_status(ctx: &ReportContext<'_>, result: &AnalysisResult) {
    print!("  {}", format!("Fail on: {}", ctx.fail_on).dimmed());
    print!("  ");
    if ctx.passed(result) {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

fn write_suppressed_summary(suppressed: &[SuppressedFinding], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for s in suppressed {
        let f = &s.finding;
        print!("    {:<22}", f.rule.as_str().dimmed());
        print!("{}", f.file.blue());
        print!("{}", format!(":{}", f.line()).dimmed());
        println!();

        if let Some(reason) = &s.reason {
            println!("            {}", format!("reason: {:?}", reason).dimmed());
        }
    }
}
