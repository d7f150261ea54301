//! Multi-file analysis runner.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::ParseError;
use crate::parser::{self, LanguageAdapter};
use crate::tree::Span;

use super::aggregate::Aggregator;
use super::registry::RuleRegistry;
use super::suppress::{apply_suppressions, parse_suppressions};
use super::types::{AnalysisResult, Finding, RuleId, Severity, SuppressedFinding};
use super::walker::Walker;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "__pycache__", "dist", "build"];

/// Directory names holding tests, skipped unless test files are included.
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "testdata", "test_data"];

/// Outcome of one file.
enum FileOutcome {
    Analyzed {
        findings: Vec<Finding>,
        suppressed: Vec<SuppressedFinding>,
    },
    /// Not started before the run deadline.
    Skipped,
}

/// Analyzes a set of files in parallel against one registry.
pub struct Runner<'r> {
    registry: &'r RuleRegistry,
    language: Option<&'static dyn LanguageAdapter>,
    timeout: Option<Duration>,
}

impl<'r> Runner<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            language: None,
            timeout: None,
        }
    }

    /// Parse every file with this adapter instead of choosing by extension.
    pub fn language(mut self, adapter: Option<&'static dyn LanguageAdapter>) -> Self {
        self.language = adapter;
        self
    }

    /// Whole-run timeout. Files not started when it expires are skipped.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyze `files` and aggregate their findings.
    pub fn run(&self, files: &[PathBuf]) -> AnalysisResult {
        let walker = Walker::new(self.registry);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    tracing::warn!(file = %path.display(), "run timeout reached, skipping file");
                    return FileOutcome::Skipped;
                }
                let (findings, suppressed) = self.analyze_file(&walker, path);
                FileOutcome::Analyzed {
                    findings,
                    suppressed,
                }
            })
            .collect();

        let mut aggregator = Aggregator::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Analyzed {
                    findings,
                    suppressed,
                } => aggregator.add_file(findings, suppressed),
                FileOutcome::Skipped => aggregator.skip_file(),
            }
        }
        let result = aggregator.finish();

        tracing::info!(
            scanned = result.scanned,
            skipped = result.skipped,
            findings = result.findings.len(),
            suppressed = result.suppressed.len(),
            "analysis finished"
        );
        result
    }

    fn analyze_file(&self, walker: &Walker<'_>, path: &Path) -> (Vec<Finding>, Vec<SuppressedFinding>) {
        let file_name = path.to_string_lossy();
        tracing::debug!(file = %file_name, "analyzing");

        let source = match parser::read_source(path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "cannot read file");
                return (vec![parse_error(&file_name, "", &e)], Vec::new());
            }
        };
        let (findings, suppressed) = self.analyze_source(walker, path, &source);
        tracing::debug!(file = %file_name, findings = findings.len(), "done");
        (findings, suppressed)
    }

    /// Analyze one in-memory source as if read from `path`.
    pub fn analyze_source(
        &self,
        walker: &Walker<'_>,
        path: &Path,
        source: &str,
    ) -> (Vec<Finding>, Vec<SuppressedFinding>) {
        let file_name = path.to_string_lossy();
        let parsed = parser::adapter_for(path, self.language)
            .and_then(|adapter| adapter.parse(&file_name, source));

        let findings = match parsed {
            Ok(tree) => walker.analyze(&tree),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "parse failed, rules skipped");
                vec![parse_error(&file_name, source, &e)]
            }
        };

        apply_suppressions(findings, &parse_suppressions(source))
    }
}

/// The single finding reported for a file that could not be parsed.
fn parse_error(file: &str, source: &str, err: &ParseError) -> Finding {
    let span = match err {
        ParseError::Syntax { offset, .. } if *offset <= source.len() => {
            Span::from_range(source, *offset..*offset)
        }
        _ => Span::file_start(),
    };
    Finding::new(RuleId::ParseError, Severity::Error, file, span, err.to_string())
}

/// Collect the analyzable files under `root`.
///
/// Hidden, vendored and build directories are skipped, as are test
/// directories and test files unless the config includes them. A `root`
/// that is a file is returned as is.
pub fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let excluded = config.excluded_matcher()?;
    let extensions = parser::supported_extensions();
    let include_tests = config.include_test_files;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !(name.starts_with('.')
                || SKIPPED_DIRS.contains(&name.as_ref())
                || (!include_tests && TEST_DIRS.contains(&name.as_ref())))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.contains(&ext) {
            continue;
        }
        if !include_tests && is_test_file(path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if excluded.is_match(relative) {
            tracing::debug!(file = %path.display(), "excluded by config");
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// `test_x.py`, `x_test.py`, `x.test.js`, `x.spec.ts` and friends.
fn is_test_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let stem = name.split('.').next().unwrap_or(name);
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name == "conftest.py"
}
