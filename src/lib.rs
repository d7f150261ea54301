//! Smellcheck - anti-pattern and security smell analyzer.
//!
//! Smellcheck parses source files with tree-sitter, lowers them into an
//! owned syntax tree, and walks each tree once while a registry of rules
//! inspects the nodes they are interested in.
//!
//! # Architecture
//!
//! - `parser`: tree-sitter adapters per language and lowering
//! - `tree`: the owned syntax tree rules run on
//! - `rules`: the built-in rule set
//! - `detect`: rule registry, walker, aggregation and the file runner
//! - `config`: YAML configuration and validation
//! - `report`: output formatting (pretty, JSON, SARIF)
//! - `score`: risk score calculation
//!
//! # Example
//!
//! ```no_run
//! use smellcheck::config::Config;
//! use smellcheck::detect::{collect_files, RuleRegistry, Runner};
//!
//! let config = Config::default();
//! let registry = RuleRegistry::from_config(&config)?;
//! let files = collect_files(std::path::Path::new("src"), &config)?;
//! let result = Runner::new(&registry).run(&files);
//! for finding in &result.findings {
//!     println!("{}:{} {}", finding.file, finding.span, finding.message);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Adding a New Language
//!
//! Implement `LanguageAdapter` in `src/parser/languages/` and route its
//! extensions in `languages/mod.rs`.

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod parser;
pub mod report;
pub mod rules;
pub mod score;
pub mod tree;

pub use config::Config;
pub use detect::{AnalysisResult, Finding, RuleId, RuleRegistry, Runner, Severity, Walker};
pub use error::{ConfigError, ParseError, RegistryError, RuleError};
pub use parser::LanguageAdapter;
pub use score::RiskScore;
pub use tree::{NodeKind, SyntaxTree};
