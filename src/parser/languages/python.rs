//! Python adapter.

use tree_sitter::{Language, Node};

use crate::parser::{node_text, operator_text, Classified, LanguageAdapter, NodeContext};
use crate::tree::NodeKind;

pub struct PythonAdapter {
    language: Language,
}

impl PythonAdapter {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Name bound by `import a.b.c` (the first segment).
fn dotted_binding(text: &str) -> &str {
    text.split('.').next().unwrap_or(text).trim()
}

/// Module of the enclosing `from m import ...`, if any.
fn from_module<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.parent()
        .filter(|p| p.kind() == "import_from_statement")?
        .child_by_field_name("module_name")
        .map(|m| node_text(m, source))
}

/// `random` + `randint` gives `random.randint`; relative modules keep their dots.
fn qualify(module: Option<&str>, path: &str) -> String {
    match module {
        Some(m) if m.ends_with('.') => format!("{}{}", m, path),
        Some(m) => format!("{}.{}", m, path),
        None => path.to_string(),
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn implicit_locals(&self) -> bool {
        true
    }

    fn classify(&self, node: Node<'_>, ctx: NodeContext<'_>, source: &str) -> Option<Classified> {
        let kind = match node.kind() {
            "module" => NodeKind::Module,
            "function_definition" => NodeKind::Function,
            "lambda" => NodeKind::Lambda,
            "class_definition" => NodeKind::Class,
            "parameters" | "lambda_parameters" => NodeKind::Parameters,
            "block" => NodeKind::Block,
            "assignment" => NodeKind::Assignment,
            "augmented_assignment" => {
                return Some(
                    Classified::new(NodeKind::AugAssignment)
                        .with_operator(operator_text(node, source)),
                )
            }
            "call" => NodeKind::Call,
            "argument_list" => NodeKind::Arguments,
            "keyword_argument" => NodeKind::KeywordArgument,
            "identifier" => match (ctx.parent, ctx.field) {
                (Some(NodeKind::KeywordArgument), Some("name")) => NodeKind::KeywordName,
                (Some(NodeKind::Attribute), Some("attribute")) => NodeKind::Property,
                _ => NodeKind::Identifier,
            },
            "attribute" => NodeKind::Attribute,
            "subscript" => NodeKind::Subscript,
            "string" | "concatenated_string" => NodeKind::StringLiteral,
            "string_content" => return Some(Classified::new(NodeKind::StringContent).opaque()),
            "string_start" | "string_end" => return None,
            "interpolation" => NodeKind::Interpolation,
            "integer" | "float" => NodeKind::NumberLiteral,
            "binary_operator" => {
                return Some(
                    Classified::new(NodeKind::BinaryOp).with_operator(operator_text(node, source)),
                )
            }
            "boolean_operator" => {
                return Some(
                    Classified::new(NodeKind::BooleanOp).with_operator(operator_text(node, source)),
                )
            }
            "comparison_operator" => {
                let op = node
                    .child_by_field_name("operators")
                    .map(|op| node_text(op, source));
                return Some(Classified::new(NodeKind::Comparison).with_operator(op));
            }
            "unary_operator" => {
                return Some(
                    Classified::new(NodeKind::UnaryOp).with_operator(operator_text(node, source)),
                )
            }
            "not_operator" => {
                return Some(Classified::new(NodeKind::UnaryOp).with_operator(Some("not")))
            }
            "if_statement" | "if_clause" => NodeKind::If,
            "elif_clause" => NodeKind::ElseIf,
            "else_clause" => NodeKind::Else,
            "for_statement" | "for_in_clause" => NodeKind::For,
            "while_statement" => NodeKind::While,
            "conditional_expression" => NodeKind::Ternary,
            "try_statement" => NodeKind::Try,
            "except_clause" | "except_group_clause" => NodeKind::Catch,
            "match_statement" => NodeKind::Switch,
            "case_clause" => NodeKind::Case,
            "global_statement" | "nonlocal_statement" => NodeKind::Global,
            "import_statement" | "import_from_statement" => NodeKind::Import,
            "future_import_statement" => return None,
            "dotted_name" | "relative_import" if ctx.parent == Some(NodeKind::Import) => {
                // `from pkg import x`: the module path binds nothing
                if ctx.field == Some("module_name") {
                    return None;
                }
                let text = node_text(node, source);
                let origin = match from_module(node, source) {
                    Some(module) => qualify(Some(module), text),
                    None => dotted_binding(text).to_string(),
                };
                return Some(
                    Classified::new(NodeKind::ImportBinding)
                        .named(dotted_binding(text))
                        .with_origin(origin)
                        .opaque(),
                );
            }
            "aliased_import" => {
                let alias = node
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, source))
                    .unwrap_or_else(|| node_text(node, source));
                let imported = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or(alias);
                return Some(
                    Classified::new(NodeKind::ImportBinding)
                        .named(alias)
                        .with_origin(qualify(from_module(node, source), imported))
                        .opaque(),
                );
            }
            "wildcard_import" => return None,
            "return_statement" => NodeKind::Return,
            "parenthesized_expression" => NodeKind::Parenthesized,
            "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "expression_list" => {
                NodeKind::Sequence
            }
            _ => NodeKind::Other,
        };
        Some(Classified::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Role, SyntaxTree};

    fn parse(source: &str) -> SyntaxTree {
        PythonAdapter::new().parse("test.py", source).unwrap()
    }

    fn kinds(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
        tree.nodes()
            .filter(|n| n.kind() == kind)
            .map(|n| n.name().to_string())
            .collect()
    }

    #[test]
    fn test_import_bindings() {
        let tree = parse(
            "import os\nimport os.path\nimport numpy as np\nfrom json import loads, dumps as d\nfrom x import *\n",
        );
        assert_eq!(
            kinds(&tree, NodeKind::ImportBinding),
            vec!["os", "os", "np", "loads", "d"]
        );
    }

    #[test]
    fn test_import_origins() {
        let tree = parse(
            "import os.path\nimport numpy as np\nfrom random import randint\nfrom os import system as run\nfrom . import util\n",
        );
        let origins: Vec<_> = tree
            .nodes()
            .filter(|n| n.kind() == NodeKind::ImportBinding)
            .map(|n| (n.name(), n.origin().unwrap()))
            .collect();
        assert_eq!(
            origins,
            vec![
                ("os", "os"),
                ("np", "numpy"),
                ("randint", "random.randint"),
                ("run", "os.system"),
                ("util", ".util"),
            ]
        );
    }

    #[test]
    fn test_attribute_and_keyword_names() {
        let tree = parse("subprocess.run(cmd, shell=True)\n");
        assert_eq!(kinds(&tree, NodeKind::Property), vec!["run"]);
        assert_eq!(kinds(&tree, NodeKind::KeywordName), vec!["shell"]);
        let call = tree
            .nodes()
            .find(|n| n.kind() == NodeKind::Call)
            .unwrap();
        assert_eq!(call.child(Role::Callee).unwrap().kind(), NodeKind::Attribute);
        assert_eq!(call.child(Role::Arguments).unwrap().children().count(), 2);
    }

    #[test]
    fn test_operators_recorded() {
        let tree = parse("x = a + b\ny = a and b\nz = a >= 3\nw = not a\nx += 2\n");
        let ops: Vec<_> = tree.nodes().filter_map(|n| n.operator()).collect();
        assert_eq!(ops, vec!["+", "and", ">=", "not", "+="]);
    }

    #[test]
    fn test_string_parts() {
        let tree = parse("s = f\"hello {name}\"\ne = \"\"\n");
        assert_eq!(kinds(&tree, NodeKind::Interpolation).len(), 1);
        assert_eq!(kinds(&tree, NodeKind::StringLiteral).len(), 2);
        assert_eq!(kinds(&tree, NodeKind::StringContent), vec!["hello "]);
    }
}
