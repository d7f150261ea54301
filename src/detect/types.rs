//! Core types for analysis results.

use serde::{Deserialize, Serialize};

use crate::tree::Span;

/// Severity levels for findings, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// All severities from most to least severe.
    pub fn descending() -> [Severity; 4] {
        [
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Info,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Stable rule identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    HardcodedSecret,
    UnsafeSink,
    Complexity,
    GlobalMutation,
    LongParameterList,
    MagicLiteral,
    UnusedBinding,
    WeakRandomness,
    StringBuiltQuery,
    DuplicateBlock,
    // Produced by the engine, not by a registered rule
    ParseError,
    RuleInternalError,
}

impl RuleId {
    /// Rules that can be registered and configured.
    pub const BUILTIN: [RuleId; 10] = [
        RuleId::HardcodedSecret,
        RuleId::UnsafeSink,
        RuleId::Complexity,
        RuleId::GlobalMutation,
        RuleId::LongParameterList,
        RuleId::MagicLiteral,
        RuleId::UnusedBinding,
        RuleId::WeakRandomness,
        RuleId::StringBuiltQuery,
        RuleId::DuplicateBlock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::HardcodedSecret => "hardcoded_secret",
            RuleId::UnsafeSink => "unsafe_sink",
            RuleId::Complexity => "complexity",
            RuleId::GlobalMutation => "global_mutation",
            RuleId::LongParameterList => "long_parameter_list",
            RuleId::MagicLiteral => "magic_literal",
            RuleId::UnusedBinding => "unused_binding",
            RuleId::WeakRandomness => "weak_randomness",
            RuleId::StringBuiltQuery => "string_built_query",
            RuleId::DuplicateBlock => "duplicate_block",
            RuleId::ParseError => "parse_error",
            RuleId::RuleInternalError => "rule_internal_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hardcoded_secret" => Some(RuleId::HardcodedSecret),
            "unsafe_sink" => Some(RuleId::UnsafeSink),
            "complexity" => Some(RuleId::Complexity),
            "global_mutation" => Some(RuleId::GlobalMutation),
            "long_parameter_list" => Some(RuleId::LongParameterList),
            "magic_literal" => Some(RuleId::MagicLiteral),
            "unused_binding" => Some(RuleId::UnusedBinding),
            "weak_randomness" => Some(RuleId::WeakRandomness),
            "string_built_query" => Some(RuleId::StringBuiltQuery),
            "duplicate_block" => Some(RuleId::DuplicateBlock),
            "parse_error" => Some(RuleId::ParseError),
            "rule_internal_error" => Some(RuleId::RuleInternalError),
            _ => None,
        }
    }

    /// One-line description used by `smellcheck rules` and SARIF output.
    pub fn description(&self) -> &'static str {
        match self {
            RuleId::HardcodedSecret => "String literal assigned to a secret-looking name",
            RuleId::UnsafeSink => {
                "Built shell commands, unsafe deserialization, dynamic evaluation, markup injection, built patterns, prototype writes, predictable temp files or secrets in logs"
            }
            RuleId::Complexity => "Function cyclomatic complexity above threshold",
            RuleId::GlobalMutation => "Function writes to state declared outside its scope",
            RuleId::LongParameterList => "Function declares too many parameters",
            RuleId::MagicLiteral => "Unnamed literal used in a comparison or arithmetic",
            RuleId::UnusedBinding => "Local variable or import never referenced",
            RuleId::WeakRandomness => "Non-cryptographic randomness used for a token or secret",
            RuleId::StringBuiltQuery => "Query built by string interpolation or concatenation",
            RuleId::DuplicateBlock => "Block duplicates the structure of an earlier block",
            RuleId::ParseError => "File could not be parsed",
            RuleId::RuleInternalError => "A rule failed while inspecting a node",
        }
    }

    /// CWE identifier for security rules. Findings of `unsafe_sink` carry
    /// the CWE of their sink class instead.
    pub fn cwe(&self) -> Option<&'static str> {
        match self {
            RuleId::HardcodedSecret => Some("CWE-798"),
            RuleId::UnsafeSink => Some("CWE-78"),
            RuleId::WeakRandomness => Some("CWE-338"),
            RuleId::StringBuiltQuery => Some("CWE-89"),
            _ => None,
        }
    }

    /// Whether the rule accepts a `threshold` override, with its bounds.
    pub fn threshold_range(&self) -> Option<(i64, i64)> {
        match self {
            RuleId::Complexity => Some((1, 1000)),
            RuleId::LongParameterList => Some((1, 255)),
            RuleId::DuplicateBlock => Some((2, 1000)),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported issue. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: RuleId,
    pub severity: Severity,
    pub file: String,
    pub span: Span,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    /// Rule that failed, for `rule_internal_error` findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<RuleId>,
}

impl Finding {
    pub fn new(
        rule: RuleId,
        severity: Severity,
        file: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            file: file.into(),
            span,
            message: message.into(),
            suggestion: None,
            cwe: None,
            origin: None,
        }
    }

    pub fn with_origin(mut self, rule: RuleId) -> Self {
        self.origin = Some(rule);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_cwe(mut self, cwe: impl Into<String>) -> Self {
        self.cwe = Some(cwe.into());
        self
    }

    pub fn line(&self) -> usize {
        self.span.start_line
    }

    pub fn column(&self) -> usize {
        self.span.start_col
    }
}

/// A finding removed by an inline suppression comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedFinding {
    pub finding: Finding,
    /// Line of the suppression comment.
    pub suppression_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Finding counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }

    /// Number of findings at or above `threshold`.
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        Severity::descending()
            .into_iter()
            .filter(|s| *s >= threshold)
            .map(|s| self.get(s))
            .sum()
    }

    pub fn total(&self) -> usize {
        self.critical + self.error + self.warning + self.info
    }
}

/// Ordered findings of one run plus summary counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub suppressed: Vec<SuppressedFinding>,
    pub summary: SeverityCounts,
    /// Number of files analyzed
    pub scanned: usize,
    /// Files skipped because the run deadline passed
    #[serde(default)]
    pub skipped: usize,
}

impl AnalysisResult {
    /// Whether any finding is at or above `fail_on`.
    pub fn exceeds(&self, fail_on: Severity) -> bool {
        self.summary.at_or_above(fail_on) > 0
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }
}
