//! Queries built by string interpolation or concatenation.

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Role};

use super::{
    callee_name, earlier_value, first_argument, is_built_string, is_interpolated, literal_body,
    unwrap_parens, Hit, Interest, Visit,
};

const QUERY_SINKS: &[&str] = &[
    "execute",
    "executemany",
    "executescript",
    "exec_driver_sql",
    "mogrify",
    "query",
    "raw",
];

const SQL_VERBS: &[&str] = &["select", "insert", "update", "delete"];

#[derive(Debug, Default)]
pub struct StringBuiltQuery {
    /// Extra method names treated as query sinks.
    extra: Vec<String>,
}

impl StringBuiltQuery {
    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Call),
        Interest::exit(NodeKind::StringLiteral),
        Interest::exit(NodeKind::BinaryOp),
    ];

    pub fn new(extra: &[String]) -> Self {
        Self {
            extra: extra.to_vec(),
        }
    }

    fn is_sink(&self, call: NodeRef<'_>) -> Option<String> {
        let name = callee_name(call)?;
        if QUERY_SINKS.contains(&name) || self.extra.iter().any(|e| e == name) {
            Some(name.to_string())
        } else {
            None
        }
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        match node.kind() {
            NodeKind::Call => self.check_call(node, out),
            _ => self.check_statement(node, out),
        }
        Ok(())
    }

    fn check_call(&self, call: NodeRef<'_>, out: &mut Vec<Hit>) {
        let Some(sink) = self.is_sink(call) else {
            return;
        };
        let Some(arg) = first_argument(call).map(unwrap_parens) else {
            return;
        };
        let built = if is_built_string(arg) {
            true
        } else {
            match earlier_value(arg).map(unwrap_parens) {
                // Already reported where the statement was built
                Some(value) if is_sql_statement(value) => false,
                Some(value) => is_built_string(value),
                None => false,
            }
        };
        if built {
            out.push(Hit::at(call).arg(
                "detail",
                format!("query passed to '{}' is built from strings", sink),
            ));
        }
    }

    fn check_statement(&self, node: NodeRef<'_>, out: &mut Vec<Hit>) {
        if !is_sql_statement(node) {
            return;
        }
        let (outer, parent) = outermost(node);
        if parent.map(|p| p.kind() == NodeKind::BinaryOp).unwrap_or(false) {
            return;
        }
        if self.is_direct_sink_argument(outer) {
            return;
        }
        out.push(Hit::at(node).arg("detail", "SQL statement built by string interpolation"));
    }

    /// Whether `expr` is the first argument of a query sink call.
    fn is_direct_sink_argument(&self, expr: NodeRef<'_>) -> bool {
        let Some(args) = expr.parent().filter(|p| p.kind() == NodeKind::Arguments) else {
            return false;
        };
        let Some(call) = args.parent().filter(|p| p.kind() == NodeKind::Call) else {
            return false;
        };
        self.is_sink(call).is_some()
            && first_argument(call).map(|a| a == expr).unwrap_or(false)
    }
}

/// Climb out of grouping parentheses; returns the outermost group and its parent.
fn outermost(node: NodeRef<'_>) -> (NodeRef<'_>, Option<NodeRef<'_>>) {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() != NodeKind::Parenthesized {
            return (current, Some(parent));
        }
        current = parent;
    }
    (current, None)
}

/// Interpolated or concatenated string that starts with a SQL verb.
fn is_sql_statement(node: NodeRef<'_>) -> bool {
    let leading = match node.kind() {
        NodeKind::StringLiteral if is_interpolated(node) => node,
        NodeKind::BinaryOp if is_built_string(node) => match leftmost_string(node) {
            Some(s) => s,
            None => return false,
        },
        _ => return false,
    };
    let body = literal_body(leading).trim_start().to_lowercase();
    SQL_VERBS.iter().any(|verb| {
        body.strip_prefix(verb)
            .map(|rest| rest.starts_with(char::is_whitespace))
            .unwrap_or(false)
    })
}

fn leftmost_string(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    let mut current = unwrap_parens(node);
    while current.kind() == NodeKind::BinaryOp {
        current = unwrap_parens(current.child(Role::Left)?);
    }
    (current.kind() == NodeKind::StringLiteral).then_some(current)
}

#[cfg(test)]
mod tests {
    use crate::detect::{RuleId, Severity};
    use crate::rules::testing::{check_js, check_py, messages};

    #[test]
    fn test_interpolated_statement() {
        let findings = check_py(
            RuleId::StringBuiltQuery,
            "def unsafe_query(user_id):\n    query = f\"SELECT * FROM users WHERE id = {user_id}\"\n    return query\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(
            messages(&findings),
            vec!["SQL statement built by string interpolation"]
        );
    }

    #[test]
    fn test_direct_sink_argument_reported_once() {
        let findings = check_py(
            RuleId::StringBuiltQuery,
            "cursor.execute(f\"DELETE FROM t WHERE id = {i}\")\n",
        );
        assert_eq!(
            messages(&findings),
            vec!["query passed to 'execute' is built from strings"]
        );
    }

    #[test]
    fn test_variable_built_by_concatenation() {
        let findings = check_py(
            RuleId::StringBuiltQuery,
            "def find(db, name):\n    where = \"name = '\" + name + \"'\"\n    db.execute(where)\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].span.start_line, 3);
    }

    #[test]
    fn test_parameterized_query_is_clean() {
        let findings = check_py(
            RuleId::StringBuiltQuery,
            "cursor.execute(\"SELECT * FROM users WHERE id = %s\", (user_id,))\nmsg = f\"selected {n} rows\"\n",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_javascript_concatenated_statement() {
        let findings = check_js(
            RuleId::StringBuiltQuery,
            "const sql = 'SELECT * FROM users WHERE name = ' + name + ' LIMIT 1';\ndb.query(`UPDATE t SET a = ${a}`);\n",
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].span.start_line, 1);
        assert!(findings[1].message.contains("'query'"));
    }
}
