//! Detection engine: rule registry, tree walker, finding aggregation and
//! the multi-file runner.

mod aggregate;
mod registry;
mod runner;
mod suppress;
mod types;
mod walker;

pub use aggregate::{compare_findings, order_findings, Aggregator};
pub use registry::RuleRegistry;
pub use runner::{collect_files, Runner};
pub use suppress::{apply_suppressions, parse_suppressions, Suppression, SuppressionScope};
pub use types::{
    AnalysisResult, Finding, RuleId, Severity, SeverityCounts, SuppressedFinding,
};
pub use walker::{events, Events, Walker};
