//! Hardcoded secrets: string literals bound to secret-looking names.

use globset::GlobSet;

use crate::error::{ConfigError, RuleError};
use crate::tree::{NodeKind, NodeRef, Role};

use super::{
    is_interpolated, is_upper_snake, literal_body, name_patterns, target_name, unwrap_parens, Hit,
    Interest, Visit,
};

pub const DEFAULT_PATTERNS: &[&str] = &["*secret*", "*password*", "*token*", "*key*"];

#[derive(Debug)]
pub struct HardcodedSecret {
    names: GlobSet,
}

impl HardcodedSecret {
    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Assignment),
        Interest::exit(NodeKind::Declaration),
        Interest::exit(NodeKind::KeywordArgument),
    ];

    pub fn new(patterns: Option<&[String]>) -> Result<Self, ConfigError> {
        let names = match patterns {
            Some(p) => name_patterns(p)?,
            None => name_patterns(DEFAULT_PATTERNS)?,
        };
        Ok(Self { names })
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let target = match node.kind() {
            NodeKind::KeywordArgument => node.child_of_kind(NodeKind::KeywordName),
            _ => node.child(Role::Target),
        };
        let (Some(target), Some(value)) = (target, node.child(Role::Value)) else {
            return Ok(());
        };
        let Some(name) = target_name(target) else {
            return Ok(());
        };
        if !self.names.is_match(name) {
            return Ok(());
        }

        let value = unwrap_parens(value);
        if value.kind() != NodeKind::StringLiteral
            || is_interpolated(value)
            || literal_body(value).is_empty()
        {
            return Ok(());
        }

        out.push(
            Hit::at(node)
                .arg("name", name)
                .escalate(is_upper_snake(name)),
        );
        Ok(())
    }
}
