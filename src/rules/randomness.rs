//! Weak randomness flowing into tokens, secrets and session ids.

use globset::GlobSet;

use crate::error::{ConfigError, RuleError};
use crate::tree::{NodeKind, NodeRef, Role};

use super::{
    function_name, name_patterns, resolved_callee_path, target_name, Hit, Interest, Visit,
};

pub const DEFAULT_PATTERNS: &[&str] = &["*token*", "*secret*", "*session*"];

const WEAK_SOURCES: &[&str] = &[
    "random.random",
    "random.randint",
    "random.randrange",
    "random.choice",
    "random.choices",
    "random.uniform",
    "random.getrandbits",
    "random.sample",
    "Math.random",
];

#[derive(Debug)]
pub struct WeakRandomness {
    names: GlobSet,
}

impl WeakRandomness {
    pub const INTERESTS: &'static [Interest] = &[Interest::exit(NodeKind::Call)];

    pub fn new(patterns: Option<&[String]>) -> Result<Self, ConfigError> {
        let names = match patterns {
            Some(p) => name_patterns(p)?,
            None => name_patterns(DEFAULT_PATTERNS)?,
        };
        Ok(Self { names })
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let Some(path) = resolved_callee_path(node) else {
            return Ok(());
        };
        if !WEAK_SOURCES.contains(&path.as_str()) {
            return Ok(());
        }
        if let Some(name) = sink_name(node) {
            if self.names.is_match(name) {
                out.push(Hit::at(node).arg("source", path).arg("name", name));
            }
        }
        Ok(())
    }
}

/// The name a value ends up bound to, following it outward through
/// enclosing expressions until a binding, return or keyword argument.
fn sink_name<'t>(value: NodeRef<'t>) -> Option<&'t str> {
    let mut child = value;
    for anc in value.ancestors() {
        match anc.kind() {
            NodeKind::Assignment | NodeKind::Declaration | NodeKind::AugAssignment => {
                if child.role() == Role::Target {
                    return None;
                }
                return anc.child(Role::Target).and_then(target_name);
            }
            NodeKind::KeywordArgument => {
                return anc.child_of_kind(NodeKind::KeywordName).map(|n| n.text());
            }
            NodeKind::Return => return anc.enclosing_function().map(function_name),
            // Used as a condition or index: the value does not flow on
            NodeKind::Comparison
            | NodeKind::If
            | NodeKind::ElseIf
            | NodeKind::While
            | NodeKind::For
            | NodeKind::Block
            | NodeKind::Module
            | NodeKind::Function
            | NodeKind::Lambda
            | NodeKind::Class => return None,
            NodeKind::Subscript if child.role() == Role::Index => return None,
            _ => {}
        }
        child = anc;
    }
    None
}
