//! Cyclomatic complexity per function.
//!
//! Complexity starts at 1 and adds one per decision point in the
//! function's own body: if / elif / comprehension-if, loops, ternaries,
//! catch clauses, case clauses and boolean operators. Nested functions
//! are measured on their own exit.

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef};

use super::{function_name, Hit, Interest, Visit};

#[derive(Debug)]
pub struct Complexity {
    threshold: usize,
}

impl Complexity {
    pub const DEFAULT_THRESHOLD: usize = 10;

    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Function),
        Interest::exit(NodeKind::Lambda),
    ];

    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let complexity = cyclomatic(node);
        if complexity > self.threshold {
            out.push(
                Hit::at(node)
                    .arg("name", function_name(node))
                    .arg("complexity", complexity)
                    .arg("threshold", self.threshold),
            );
        }
        Ok(())
    }
}

/// Decision points in the function's own scope, plus one.
pub fn cyclomatic(func: NodeRef<'_>) -> usize {
    1 + func
        .scope_descendants()
        .filter(|n| n.kind().is_decision_point())
        .count()
}
