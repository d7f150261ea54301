//! Magic literals in comparisons and arithmetic.

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Role};

use super::{is_interpolated, is_upper_snake, literal_body, target_name, Hit, Interest, Visit};

#[derive(Debug)]
pub struct MagicLiteral;

impl MagicLiteral {
    pub const INTERESTS: &'static [Interest] = &[
        Interest::enter(NodeKind::NumberLiteral),
        Interest::enter(NodeKind::StringLiteral),
    ];

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        // Climb through grouping and sign to the operator using the literal
        let mut operand = node;
        let mut negated = false;
        let mut parent = node.parent();
        while let Some(p) = parent {
            match p.kind() {
                NodeKind::Parenthesized => {}
                NodeKind::UnaryOp => negated ^= p.operator() == Some("-"),
                _ => break,
            }
            operand = p;
            parent = p.parent();
        }
        let Some(parent) = parent else {
            return Ok(());
        };

        let context = match parent.kind() {
            NodeKind::Comparison => "comparison",
            // `"%s" % x` is a format template, not an operand
            NodeKind::BinaryOp
                if node.kind() == NodeKind::StringLiteral && parent.operator() == Some("%") =>
            {
                return Ok(())
            }
            NodeKind::BinaryOp => "arithmetic",
            NodeKind::AugAssignment if operand.role() != Role::Target => "arithmetic",
            _ => return Ok(()),
        };

        let literal = match node.kind() {
            NodeKind::NumberLiteral => {
                if is_trivial_number(node.text()) {
                    return Ok(());
                }
                if negated {
                    format!("-{}", node.text())
                } else {
                    node.text().to_string()
                }
            }
            _ => {
                let body = literal_body(node);
                if is_interpolated(node) || body.is_empty() || is_dunder(body) {
                    return Ok(());
                }
                node.text().to_string()
            }
        };

        if binds_constant(parent) {
            return Ok(());
        }

        out.push(Hit::at(node).arg("literal", literal).arg("context", context));
        Ok(())
    }
}

/// 0, 1 and -1 in any spelling (`1.0`, `0x0`, `1_0` is not).
fn is_trivial_number(text: &str) -> bool {
    let cleaned = text.replace('_', "").to_lowercase();
    let value = if let Some(hex) = cleaned.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok().map(|v| v as f64)
    } else {
        cleaned
            .trim_end_matches(|c| matches!(c, 'l' | 'n' | 'j'))
            .parse::<f64>()
            .ok()
    };
    matches!(value, Some(v) if v == 0.0 || v == 1.0)
}

/// `"__main__"` and friends.
fn is_dunder(body: &str) -> bool {
    body.len() > 4 && body.starts_with("__") && body.ends_with("__")
}

/// Whether the expression is the value of an UPPER_SNAKE binding.
fn binds_constant(expr: NodeRef<'_>) -> bool {
    for anc in std::iter::once(expr).chain(expr.ancestors()) {
        match anc.kind() {
            NodeKind::Assignment | NodeKind::Declaration => {
                return anc
                    .child(Role::Target)
                    .and_then(target_name)
                    .map(is_upper_snake)
                    .unwrap_or(false);
            }
            NodeKind::Block
            | NodeKind::Module
            | NodeKind::Function
            | NodeKind::Lambda
            | NodeKind::Class
            | NodeKind::Call => return false,
            _ => {}
        }
    }
    false
}
