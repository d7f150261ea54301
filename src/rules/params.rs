//! Long parameter lists.

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Role};

use super::{function_name, Hit, Interest, Visit};

/// Grammar nodes inside a parameter list that are not parameters.
const SEPARATORS: &[&str] = &["keyword_separator", "positional_separator"];

#[derive(Debug)]
pub struct LongParameterList {
    threshold: usize,
}

impl LongParameterList {
    pub const DEFAULT_THRESHOLD: usize = 5;

    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Function),
        Interest::exit(NodeKind::Lambda),
    ];

    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let count = parameter_count(node)?;
        if count > self.threshold {
            out.push(
                Hit::at(node)
                    .arg("name", function_name(node))
                    .arg("count", count)
                    .arg("threshold", self.threshold),
            );
        }
        Ok(())
    }
}

/// Declared parameters, not counting the leading `self` / `cls` of a method.
pub fn parameter_count(func: NodeRef<'_>) -> Result<usize, RuleError> {
    let params = match func.child(Role::Parameters) {
        Some(params) => params,
        // Python lambdas without arguments have no parameter list
        None if func.kind() == NodeKind::Lambda => return Ok(0),
        None => {
            return Err(RuleError::MissingChild {
                kind: func.kind(),
                role: "parameters",
            })
        }
    };
    if params.kind() != NodeKind::Parameters {
        // `x => ...`
        return Ok(1);
    }

    let method = func
        .enclosing_scope()
        .is_some_and(|scope| scope.kind() == NodeKind::Class);

    let mut count = 0;
    for (i, param) in params.children().enumerate() {
        if SEPARATORS.contains(&param.raw_kind()) {
            continue;
        }
        if method && i == 0 && matches!(param.text(), "self" | "cls") {
            continue;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{RuleId, Severity};
    use crate::parser::get_adapter;
    use crate::rules::testing::{check_js, check_py, check_source};
    use crate::rules::{Matcher, Rule};

    const FIFTEEN: &str = "def create_user_profile(first_name, last_name, email, phone, address,\n                        city, state, zip_code, country, age, gender,\n                        occupation, salary, education, marital_status):\n    return first_name\n";

    #[test]
    fn test_fifteen_parameters_flagged() {
        let findings = check_py(RuleId::LongParameterList, FIFTEEN);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "function 'create_user_profile' declares 15 parameters (threshold 5)"
        );
    }

    #[test]
    fn test_threshold_twenty_is_clean() {
        let rule = Rule::new(
            RuleId::LongParameterList,
            Severity::Warning,
            "{count}",
            Matcher::LongParameterList(LongParameterList::new(20)),
        );
        assert!(check_source(rule, "t.py", FIFTEEN).is_empty());
    }

    #[test]
    fn test_parameter_kinds_counted() {
        let source = "class A:\n    def m(self, a, b=1, *args, c: int = 2, **kw):\n        pass\n";
        let tree = get_adapter("py").unwrap().parse("t.py", source).unwrap();
        let func = tree
            .nodes()
            .find(|n| n.kind() == NodeKind::Function)
            .unwrap();
        assert_eq!(parameter_count(func).unwrap(), 5);
    }

    #[test]
    fn test_self_counted_outside_classes() {
        let source = "def free(self, a):\n    pass\n\nclass A:\n    @classmethod\n    def make(cls, a):\n        def inner(self, b):\n            pass\n";
        let tree = get_adapter("py").unwrap().parse("t.py", source).unwrap();
        let counts: Vec<_> = tree
            .nodes()
            .filter(|n| n.kind() == NodeKind::Function)
            .map(|f| (function_name(f), parameter_count(f).unwrap()))
            .collect();
        assert_eq!(counts, vec![("free", 2), ("make", 1), ("inner", 2)]);
    }

    #[test]
    fn test_keyword_separator_not_counted() {
        let tree = get_adapter("py")
            .unwrap()
            .parse("t.py", "def f(a, *, b):\n    pass\n")
            .unwrap();
        let func = tree.nodes().find(|n| n.kind() == NodeKind::Function).unwrap();
        assert_eq!(parameter_count(func).unwrap(), 2);
    }

    #[test]
    fn test_javascript_functions_and_arrows() {
        let findings = check_js(
            RuleId::LongParameterList,
            "function createUser(a, b, c, d, e, f) {}\nconst g = (a, b, c, d, e, f, h) => a;\nconst k = x => x;\n",
        );
        let names: Vec<_> = findings.iter().map(|f| f.message.clone()).collect();
        assert_eq!(
            names,
            vec![
                "function 'createUser' declares 6 parameters (threshold 5)",
                "function 'g' declares 7 parameters (threshold 5)"
            ]
        );
    }
}
