//! Writes to global state from inside functions.

use std::collections::HashSet;

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Role};

use super::unused::binding_site;
use super::{function_name, Hit, Interest, Visit};

#[derive(Debug)]
pub struct GlobalMutation;

impl GlobalMutation {
    pub const INTERESTS: &'static [Interest] = &[Interest::exit(NodeKind::Module)];

    pub fn check(&self, module: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let module_names = bound_names(module, false);
        let implicit = module.tree().implicit_locals();

        for func in module
            .descendants()
            .filter(|n| matches!(n.kind(), NodeKind::Function | NodeKind::Lambda))
        {
            let declared: HashSet<&str> = func
                .scope_descendants()
                .filter(|n| n.kind() == NodeKind::Global)
                .flat_map(|g| g.children())
                .filter(|c| c.kind() == NodeKind::Identifier)
                .map(|c| c.text())
                .collect();

            let mut locals = parameter_names(func);
            locals.extend(bound_names(func, implicit));
            locals.retain(|n| !declared.contains(n));

            let is_global = |name: &str| {
                declared.contains(name) || (module_names.contains(name) && !locals.contains(name))
            };

            for write in func.scope_descendants().filter(|n| is_write(*n)) {
                let Some(base) = base_name(write) else {
                    continue;
                };
                if is_global(base) {
                    out.push(
                        Hit::at(write)
                            .arg("function", function_name(func))
                            .arg("name", base),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Names bound in `scope` by assignments (when `implicit`) and declarations.
///
/// At module level every assignment binds, so `implicit` is ignored.
fn bound_names<'t>(scope: NodeRef<'t>, implicit: bool) -> HashSet<&'t str> {
    let module = scope.kind() == NodeKind::Module;
    scope
        .scope_descendants()
        .filter(|n| n.kind() == NodeKind::Identifier)
        .filter(|n| match binding_site(*n) {
            Some(site) if site.kind() == NodeKind::Declaration => true,
            Some(_) => module || implicit,
            None => false,
        })
        .map(|n| n.text())
        .collect()
}

fn parameter_names<'t>(func: NodeRef<'t>) -> HashSet<&'t str> {
    func.child(Role::Parameters)
        .into_iter()
        .flat_map(|p| std::iter::once(p).chain(p.descendants()))
        .filter(|n| n.kind() == NodeKind::Identifier)
        .map(|n| n.text())
        .collect()
}

/// Target of an assignment or augmented assignment, including the
/// elements of a destructuring target.
fn is_write(node: NodeRef<'_>) -> bool {
    if node.role() != Role::Target {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        NodeKind::Assignment | NodeKind::AugAssignment => node.kind() != NodeKind::Sequence,
        NodeKind::Sequence => binding_site(node).is_some(),
        _ => false,
    }
}

/// The variable a write ultimately lands in: `x`, `x[k]` and `x.a.b` give `x`.
fn base_name<'t>(target: NodeRef<'t>) -> Option<&'t str> {
    let mut node = target;
    loop {
        match node.kind() {
            NodeKind::Identifier => return Some(node.text()),
            NodeKind::Subscript | NodeKind::Attribute => node = node.child(Role::Object)?,
            NodeKind::Parenthesized => node = node.children().next()?,
            _ => return None,
        }
    }
}
