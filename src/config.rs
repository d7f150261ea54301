//! Configuration file schema and pre-flight validation.
//!
//! A config selects which rules run and how strict they are. It is fully
//! validated before any file is read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::detect::{RuleId, Severity};
use crate::error::ConfigError;
use crate::rules::Rule;

/// File names looked for when no config is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] =
    &["smellcheck.yaml", ".smellcheck.yaml", "smellcheck.yml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Lowest severity that makes the run fail.
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    /// Whether to analyze test files and test directories (default: false)
    #[serde(default)]
    pub include_test_files: bool,
    /// Glob patterns for paths to exclude, relative to the scanned root
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Whole-run timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Per-rule overrides keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            include_test_files: false,
            excluded_paths: Vec::new(),
            timeout_secs: None,
            rules: BTreeMap::new(),
        }
    }
}

/// Overrides for one rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub threshold: Option<i64>,
    /// Identifier name patterns (secret and randomness rules).
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
    /// Extra sink callee names (sink and query rules).
    #[serde(default)]
    pub sinks: Option<Vec<String>>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            threshold: None,
            patterns: None,
            sinks: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fail_on() -> Severity {
    Severity::Error
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&content).map_err(|source| {
            ConfigError::Parse {
                path: display,
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Load `explicit` if given, else a discovered file, else the defaults.
    ///
    /// Returns the config and the file it came from.
    pub fn resolve(
        explicit: Option<&Path>,
        dir: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(dir),
        };
        match path {
            Some(p) => {
                tracing::debug!(config = %p.display(), "loading config");
                Ok((Self::load(&p)?, Some(p)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Check every rule override and pattern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rule_config) in &self.rules {
            let id = RuleId::parse(name)
                .filter(|id| RuleId::BUILTIN.contains(id))
                .ok_or_else(|| ConfigError::UnknownRule(name.clone()))?;

            if let Some(value) = rule_config.threshold {
                let (min, max) = id.threshold_range().ok_or_else(|| {
                    ConfigError::ThresholdNotSupported {
                        rule: name.clone(),
                    }
                })?;
                if value < min || value > max {
                    return Err(ConfigError::ThresholdOutOfRange {
                        rule: name.clone(),
                        value,
                        min,
                        max,
                    });
                }
            }

            // Compiles the rule's patterns
            Rule::builtin(id, Some(rule_config))?;
        }

        self.excluded_matcher()?;
        Ok(())
    }

    /// Matcher over `excluded_paths`.
    pub fn excluded_matcher(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: self.excluded_paths.join(", "),
            message: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn is_enabled(&self, id: RuleId) -> bool {
        self.rules
            .get(id.as_str())
            .map(|c| c.enabled)
            .unwrap_or(true)
    }
}
