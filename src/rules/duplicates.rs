//! Structurally duplicated blocks.
//!
//! Each block is reduced to a fingerprint of its node kinds, operators,
//! member names and literal text, with identifiers normalized. Blocks of
//! at least the minimum line count whose fingerprint was already seen are
//! reported against the first occurrence.

use std::collections::HashMap;

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Span};

use super::{Hit, Interest, Visit};

#[derive(Debug)]
pub struct DuplicateBlock {
    min_lines: usize,
}

impl DuplicateBlock {
    pub const DEFAULT_MIN_LINES: usize = 4;

    pub const INTERESTS: &'static [Interest] = &[Interest::exit(NodeKind::Module)];

    pub fn new(min_lines: usize) -> Self {
        Self { min_lines }
    }

    pub fn check(&self, module: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut reported: Vec<Span> = Vec::new();

        for block in module
            .descendants()
            .filter(|n| n.kind() == NodeKind::Block)
            .filter(|n| n.span().line_count() >= self.min_lines)
        {
            let span = block.span();
            if reported
                .iter()
                .any(|r| r.start_byte <= span.start_byte && span.end_byte <= r.end_byte)
            {
                continue;
            }
            let print = fingerprint(block);
            match first_seen.get(&print).copied() {
                Some(line) => {
                    reported.push(span);
                    out.push(Hit::at(block).arg("line", line));
                }
                None => {
                    first_seen.insert(print, span.start_line);
                }
            }
        }
        Ok(())
    }
}

/// Structural fingerprint of a subtree.
pub fn fingerprint(root: NodeRef<'_>) -> String {
    let mut out = String::new();
    // (node, children already emitted)
    let mut stack = vec![(root, false)];
    while let Some((node, done)) = stack.pop() {
        if done {
            out.push(')');
            continue;
        }
        out.push_str(node.kind().as_str());
        match node.kind() {
            NodeKind::Identifier => {}
            NodeKind::Property
            | NodeKind::KeywordName
            | NodeKind::StringContent
            | NodeKind::NumberLiteral => {
                out.push(':');
                out.push_str(node.text());
            }
            _ => {
                if let Some(op) = node.operator() {
                    out.push(':');
                    out.push_str(op);
                }
            }
        }
        out.push('(');
        stack.push((node, true));
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, false));
        }
    }
    out
}
