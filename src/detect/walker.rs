//! Single-pass tree walker that drives the registered rules.

use std::collections::HashMap;

use crate::rules::{Hit, Rule, Visit};
use crate::tree::{NodeKind, NodeRef, SyntaxTree};

use super::registry::RuleRegistry;
use super::types::{Finding, RuleId, Severity};

/// Dispatches every node of a tree to the rules interested in it.
///
/// The dispatch table is computed once per registry; a walker can then
/// analyze any number of trees, from any number of threads.
pub struct Walker<'r> {
    registry: &'r RuleRegistry,
    dispatch: HashMap<(NodeKind, Visit), Vec<usize>>,
}

impl<'r> Walker<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        let mut dispatch: HashMap<(NodeKind, Visit), Vec<usize>> = HashMap::new();
        for (idx, rule) in registry.all().iter().enumerate() {
            for interest in rule.interests() {
                let slot = dispatch.entry((interest.kind, interest.visit)).or_default();
                if !slot.contains(&idx) {
                    slot.push(idx);
                }
            }
        }
        Self { registry, dispatch }
    }

    /// Walk `tree` once, depth-first, and collect the findings of every rule.
    ///
    /// Each node gets an Enter event before its children and an Exit event
    /// after them. Findings come out in emission order; ordering is the
    /// aggregator's job.
    pub fn analyze(&self, tree: &SyntaxTree) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut hits = Vec::new();

        for (node, visit) in events(tree) {
            self.visit(node, visit, &mut hits, &mut findings);
        }

        debug_assert!(findings
            .iter()
            .all(|f| f.span.within(tree.source().len())));
        findings
    }

    fn visit(&self, node: NodeRef<'_>, visit: Visit, hits: &mut Vec<Hit>, out: &mut Vec<Finding>) {
        let Some(interested) = self.dispatch.get(&(node.kind(), visit)) else {
            return;
        };
        let file = node.tree().path();
        for &idx in interested {
            let rule = &self.registry.all()[idx];
            hits.clear();
            match rule.check(node, visit, hits) {
                Ok(()) => out.extend(hits.drain(..).map(|hit| rule.finding(hit, file))),
                Err(e) => {
                    tracing::warn!(rule = %rule.id(), file, node = %node.kind(), error = %e, "rule failed");
                    out.push(internal_error(rule, node, &e.to_string()));
                }
            }
        }
    }
}

/// Depth-first Enter/Exit events over every node of `tree`.
///
/// A node is entered after all of its ancestors and before any of its
/// descendants, and exited after all of its descendants.
pub fn events(tree: &SyntaxTree) -> Events<'_> {
    Events {
        stack: vec![(tree.root(), false)],
    }
}

/// Iterator returned by [`events`].
pub struct Events<'t> {
    /// (node, subtree already walked)
    stack: Vec<(NodeRef<'t>, bool)>,
}

impl<'t> Iterator for Events<'t> {
    type Item = (NodeRef<'t>, Visit);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, exiting) = self.stack.pop()?;
        if exiting {
            return Some((node, Visit::Exit));
        }
        self.stack.push((node, true));
        let children: Vec<_> = node.children().collect();
        self.stack.extend(children.into_iter().rev().map(|c| (c, false)));
        Some((node, Visit::Enter))
    }
}

fn internal_error(rule: &Rule, node: NodeRef<'_>, error: &str) -> Finding {
    Finding::new(
        RuleId::RuleInternalError,
        Severity::Error,
        node.tree().path(),
        node.span(),
        format!("rule '{}' failed: {}", rule.id(), error),
    )
    .with_origin(rule.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::get_adapter;
    use crate::rules::{Complexity, Matcher};
    use crate::tree::{Role, TreeBuilder};

    fn registry(ids: &[RuleId]) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for id in ids {
            registry.register(Rule::builtin(*id, None).unwrap()).unwrap();
        }
        registry
    }

    /// A function node with no parameter list, which no parser produces.
    fn malformed_function() -> SyntaxTree {
        let src = "def f:\n    x\n";
        let mut b = TreeBuilder::new(src, "broken.py", "python").implicit_locals(true);
        let s = b.span(0..src.len());
        b.open(NodeKind::Module, Role::None, s);
        let s = b.span(0..src.len() - 1);
        b.open(NodeKind::Function, Role::None, s);
        let s = b.span(4..5);
        b.leaf(NodeKind::Identifier, Role::Name, s);
        let s = b.span(11..12);
        b.open(NodeKind::Block, Role::Body, s);
        b.leaf(NodeKind::Identifier, Role::None, s);
        b.build()
    }

    #[test]
    fn test_rule_failure_is_contained() {
        let mut registry = registry(&[RuleId::LongParameterList]);
        registry
            .register(Rule::new(
                RuleId::Complexity,
                Severity::Warning,
                "{name} {complexity}",
                Matcher::Complexity(Complexity::new(0)),
            ))
            .unwrap();

        let tree = malformed_function();
        let findings = Walker::new(&registry).analyze(&tree);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule, RuleId::RuleInternalError);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].origin, Some(RuleId::LongParameterList));
        assert!(findings[0].message.contains("long_parameter_list"));
        assert!(findings[0].message.contains("parameters"));
        assert_eq!(findings[1].rule, RuleId::Complexity);
        assert_eq!(findings[1].message, "f 1");
    }

    #[test]
    fn test_every_node_visited_once() {
        let source = "if a > 3:\n    b = c * 7\nelse:\n    b = c * 9\n";
        let tree = get_adapter("py").unwrap().parse("t.py", source).unwrap();
        let findings = Walker::new(&registry(&[RuleId::MagicLiteral])).analyze(&tree);
        assert_eq!(findings.len(), 3);
        let lines: Vec<_> = findings.iter().map(|f| f.line()).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_enter_sees_only_ancestors() {
        let source = "def f(a):\n    if a > 1:\n        return [a * 2 for a in range(3)]\n    return 0\n";
        let tree = get_adapter("py").unwrap().parse("t.py", source).unwrap();

        let mut open = Vec::new();
        let mut entered = vec![false; tree.len()];
        let mut exited = vec![false; tree.len()];
        for (node, visit) in events(&tree) {
            let id = node.id().index();
            match visit {
                Visit::Enter => {
                    assert!(!entered[id], "{node:?} entered twice");
                    // the open nodes are exactly the ancestors, root first
                    let mut ancestors: Vec<_> = node.ancestors().collect();
                    ancestors.reverse();
                    assert_eq!(open, ancestors, "{node:?}");
                    assert!(node.descendants().all(|d| !entered[d.id().index()]));
                    entered[id] = true;
                    open.push(node);
                }
                Visit::Exit => {
                    assert!(node.descendants().all(|d| exited[d.id().index()]));
                    assert_eq!(open.pop(), Some(node));
                    exited[id] = true;
                }
            }
        }
        assert!(open.is_empty());
        assert!(entered.iter().chain(&exited).all(|&seen| seen));
    }

    #[test]
    fn test_rules_without_interest_are_not_called() {
        let tree = get_adapter("py").unwrap().parse("t.py", "x = 1\n").unwrap();
        let registry = registry(&[RuleId::Complexity, RuleId::LongParameterList]);
        assert!(Walker::new(&registry).analyze(&tree).is_empty());
    }

    #[test]
    fn test_walker_is_reusable_across_trees() {
        let registry = registry(&[RuleId::HardcodedSecret]);
        let walker = Walker::new(&registry);
        let adapter = get_adapter("py").unwrap();
        let a = adapter.parse("a.py", "API_KEY = \"abc123\"\n").unwrap();
        let b = adapter.parse("b.py", "name = \"abc123\"\n").unwrap();
        assert_eq!(walker.analyze(&a).len(), 1);
        assert!(walker.analyze(&b).is_empty());
        assert_eq!(walker.analyze(&a)[0].file, "a.py");
    }
}
