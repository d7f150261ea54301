//! The set of rules a run checks.
//!
//! Built once at startup and shared read-only with every walker.

use std::collections::HashSet;

use crate::config::Config;
use crate::error::{ConfigError, RegistryError};
use crate::rules::Rule;

use super::types::RuleId;

#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    ids: HashSet<RuleId>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in rule enabled by `config`, with its overrides applied.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for id in RuleId::BUILTIN {
            let rule_config = config.rules.get(id.as_str());
            if rule_config.map(|c| !c.enabled).unwrap_or(false) {
                tracing::debug!(rule = %id, "rule disabled by config");
                continue;
            }
            registry.register(Rule::builtin(id, rule_config)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, rule: Rule) -> Result<(), RegistryError> {
        if !self.ids.insert(rule.id()) {
            return Err(RegistryError::DuplicateRuleId(rule.id()));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Rules in registration order.
    pub fn all(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
