//! Error types for smellcheck.
//!
//! Library errors are typed with `thiserror`. The CLI wraps them in
//! `anyhow::Result` at the application boundary.

use thiserror::Error;

use crate::detect::RuleId;
use crate::tree::NodeKind;

/// Invalid configuration. Always reported before any file is analyzed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown rule id {0:?}")]
    UnknownRule(String),

    #[error("rule {rule} does not take a threshold")]
    ThresholdNotSupported { rule: String },

    #[error("threshold {value} for rule {rule} is out of range ({min}..={max})")]
    ThresholdOutOfRange {
        rule: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("invalid severity {0:?}, expected one of info, warning, error, critical")]
    InvalidSeverity(String),

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown language {0:?}")]
    UnknownLanguage(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised while building the rule registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("rule {0} is already registered")]
    DuplicateRuleId(RuleId),
}

/// Internal failure of a single rule matcher.
///
/// The walker turns these into `rule_internal_error` findings instead of
/// aborting the analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{kind} node is missing its {role} child")]
    MissingChild { kind: NodeKind, role: &'static str },

    #[error("unexpected {found} node where {expected} was expected")]
    UnexpectedNode {
        expected: &'static str,
        found: NodeKind,
    },
}

/// A file could not be turned into a syntax tree.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not valid UTF-8")]
    Encoding,

    #[error("no analyzer for {0:?}")]
    UnsupportedLanguage(String),

    #[error("failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at {line}:{column}")]
    Syntax {
        line: usize,
        column: usize,
        /// Byte offset of the first error node.
        offset: usize,
    },
}
