//! Unused local variables and imports.
//!
//! Checked when a scope is exited, so every reference in the scope has
//! already been walked. Function scopes track imports and local
//! variables; the module scope tracks imports only.

use std::collections::HashSet;

use crate::error::RuleError;
use crate::tree::{NodeKind, NodeRef, Role};

use super::{Hit, Interest, Visit};

#[derive(Debug)]
pub struct UnusedBinding;

impl UnusedBinding {
    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Function),
        Interest::exit(NodeKind::Module),
    ];

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        let is_module = node.kind() == NodeKind::Module;
        if is_module && is_reexport_module(node.tree().path()) {
            return Ok(());
        }

        let implicit = node.tree().implicit_locals();
        let declared_global = global_names(node);
        let mut seen = HashSet::new();

        for binding in bindings(node, is_module, implicit) {
            let name = binding.name();
            if name.starts_with('_') || declared_global.contains(name) || !seen.insert(name) {
                continue;
            }
            if !referenced_after(node, binding, name) {
                let what = if binding.kind() == NodeKind::ImportBinding {
                    "import"
                } else {
                    "variable"
                };
                out.push(Hit::at(binding).arg("what", what).arg("name", name));
            }
        }
        Ok(())
    }
}

/// `__init__.py` imports are re-exports.
fn is_reexport_module(path: &str) -> bool {
    path.ends_with("__init__.py")
}

/// Names a scope declares `global` / `nonlocal`.
fn global_names<'t>(scope: NodeRef<'t>) -> HashSet<&'t str> {
    scope
        .scope_descendants()
        .filter(|n| n.kind() == NodeKind::Global)
        .flat_map(|g| g.children())
        .filter(|c| c.kind() == NodeKind::Identifier)
        .map(|c| c.text())
        .collect()
}

/// Binding occurrences owned by `scope`, in source order.
fn bindings<'t>(scope: NodeRef<'t>, is_module: bool, implicit: bool) -> Vec<NodeRef<'t>> {
    scope
        .scope_descendants()
        .filter(|n| match n.kind() {
            NodeKind::ImportBinding => true,
            NodeKind::Identifier if !is_module => match binding_site(*n) {
                Some(site) if site.kind() == NodeKind::Declaration => true,
                Some(site) => implicit && site.kind() == NodeKind::Assignment,
                None => false,
            },
            _ => false,
        })
        .collect()
}

/// The assignment or declaration an identifier is the target of, looking
/// through destructuring patterns.
pub(crate) fn binding_site(ident: NodeRef<'_>) -> Option<NodeRef<'_>> {
    let mut current = ident;
    loop {
        let parent = current.parent()?;
        match parent.kind() {
            NodeKind::Sequence => current = parent,
            NodeKind::Assignment | NodeKind::Declaration if current.role() == Role::Target => {
                return Some(parent)
            }
            _ => return None,
        }
    }
}

/// Whether `name` is read anywhere in `scope` after `binding` starts.
fn referenced_after(scope: NodeRef<'_>, binding: NodeRef<'_>, name: &str) -> bool {
    let start = binding.span().end_byte;
    scope.descendants().any(|n| {
        n.kind() == NodeKind::Identifier
            && n.span().start_byte >= start
            && n.text() == name
            && binding_site(n).is_none()
            && !is_definition_name(n)
    })
}

/// The name of a function or class definition is not a reference.
fn is_definition_name(ident: NodeRef<'_>) -> bool {
    ident.role() == Role::Name
        && ident
            .parent()
            .map(|p| matches!(p.kind(), NodeKind::Function | NodeKind::Class))
            .unwrap_or(false)
}
