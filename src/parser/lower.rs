//! Lowering of tree-sitter trees into [`SyntaxTree`]s.

use crate::tree::{Role, Span, SyntaxTree, TreeBuilder};

use super::{LanguageAdapter, NodeContext};

/// Walk the grammar tree once with a cursor and emit lowered nodes in pre-order.
///
/// Anonymous tokens and extras (comments) are skipped. Nodes the adapter
/// drops are skipped with their subtrees; opaque nodes are kept as leaves.
pub(crate) fn lower<A>(adapter: &A, tree: &tree_sitter::Tree, source: &str, path: &str) -> SyntaxTree
where
    A: LanguageAdapter + ?Sized,
{
    let mut builder = TreeBuilder::new(source, path, adapter.language_id())
        .implicit_locals(adapter.implicit_locals());
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if node.is_named() && !node.is_extra() {
            let field = cursor.field_name();
            let parent = builder.current_kind();
            let ctx = NodeContext { field, parent };
            if let Some(class) = adapter.classify(node, ctx, source) {
                let role = parent.map_or(Role::None, |p| Role::from_field(p, field));
                let id = builder.open(class.kind, role, Span::from_node(node));
                builder.set_raw_kind(id, node.kind());
                if let Some(name) = class.name {
                    builder.set_name(id, name);
                }
                if let Some(origin) = class.origin {
                    builder.set_origin(id, origin);
                }
                if let Some(op) = class.operator {
                    builder.set_operator(id, op);
                }
                if !class.opaque && cursor.goto_first_child() {
                    continue 'walk;
                }
                builder.close();
            }
        }

        // Only lowered nodes are ever descended into, so every parent we
        // climb back to has an open builder node.
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
            builder.close();
        }
    }

    builder.build()
}
