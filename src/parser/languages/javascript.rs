//! JavaScript and TypeScript adapter.
//!
//! The TypeScript grammars extend the JavaScript one, so a single
//! classification table serves all three dialects.

use tree_sitter::{Language, Node};

use crate::parser::{node_text, operator_text, Classified, LanguageAdapter, NodeContext};
use crate::tree::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
    Tsx,
}

pub struct JavaScriptAdapter {
    dialect: Dialect,
    language: Language,
}

impl JavaScriptAdapter {
    pub fn new(dialect: Dialect) -> Self {
        let language = match dialect {
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        };
        Self { dialect, language }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Module path of the enclosing `import ... from "m"`, quotes stripped.
fn import_source<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    std::iter::successors(node.parent(), |n| n.parent())
        .find(|n| n.kind() == "import_statement")?
        .child_by_field_name("source")
        .map(|s| node_text(s, source).trim_matches(|c| matches!(c, '"' | '\'' | '`')))
}

fn binary_kind(op: Option<&str>) -> NodeKind {
    match op {
        Some("&&" | "||" | "??") => NodeKind::BooleanOp,
        Some("==" | "===" | "!=" | "!==" | "<" | ">" | "<=" | ">=" | "instanceof" | "in") => {
            NodeKind::Comparison
        }
        _ => NodeKind::BinaryOp,
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language_id(&self) -> &'static str {
        match self.dialect {
            Dialect::JavaScript => "javascript",
            Dialect::TypeScript => "typescript",
            Dialect::Tsx => "tsx",
        }
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        match self.dialect {
            Dialect::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Dialect::TypeScript => &["ts", "mts"],
            Dialect::Tsx => &["tsx"],
        }
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn implicit_locals(&self) -> bool {
        false
    }

    fn classify(&self, node: Node<'_>, ctx: NodeContext<'_>, source: &str) -> Option<Classified> {
        let kind = match node.kind() {
            "program" => NodeKind::Module,
            "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function_declaration"
            | "generator_function"
            | "method_definition" => NodeKind::Function,
            "arrow_function" => NodeKind::Lambda,
            "class_declaration" | "class" | "abstract_class_declaration" => NodeKind::Class,
            "formal_parameters" => NodeKind::Parameters,
            "statement_block" => NodeKind::Block,
            "variable_declarator" => NodeKind::Declaration,
            "assignment_expression" => NodeKind::Assignment,
            "augmented_assignment_expression" => {
                return Some(
                    Classified::new(NodeKind::AugAssignment)
                        .with_operator(operator_text(node, source)),
                )
            }
            "update_expression" => {
                // `x++` writes its argument like `x += 1`
                return Some(
                    Classified::new(NodeKind::AugAssignment)
                        .with_operator(operator_text(node, source)),
                );
            }
            "identifier" if node.parent().is_some_and(|p| p.kind() == "import_clause") => {
                let class = Classified::new(NodeKind::ImportBinding);
                return Some(match import_source(node, source) {
                    Some(module) => class.with_origin(module),
                    None => class,
                });
            }
            // `import x from "mod"`: the module path binds nothing
            "string" if ctx.parent == Some(NodeKind::Import) => return None,
            "call_expression" | "new_expression" => NodeKind::Call,
            "arguments" => NodeKind::Arguments,
            "pair" => NodeKind::KeywordArgument,
            "property_identifier" if ctx.parent == Some(NodeKind::KeywordArgument) => {
                NodeKind::KeywordName
            }
            "property_identifier" | "private_property_identifier" => NodeKind::Property,
            "identifier"
            | "shorthand_property_identifier"
            | "shorthand_property_identifier_pattern"
            | "type_identifier" => NodeKind::Identifier,
            "member_expression" => NodeKind::Attribute,
            "subscript_expression" => NodeKind::Subscript,
            "string" | "template_string" => NodeKind::StringLiteral,
            "string_fragment" => return Some(Classified::new(NodeKind::StringContent).opaque()),
            "template_substitution" => NodeKind::Interpolation,
            "number" => NodeKind::NumberLiteral,
            "binary_expression" => {
                let op = operator_text(node, source);
                return Some(Classified::new(binary_kind(op)).with_operator(op));
            }
            "unary_expression" => {
                return Some(
                    Classified::new(NodeKind::UnaryOp).with_operator(operator_text(node, source)),
                )
            }
            "if_statement" => NodeKind::If,
            "else_clause" => NodeKind::Else,
            "for_statement" | "for_in_statement" => NodeKind::For,
            "while_statement" | "do_statement" => NodeKind::While,
            "ternary_expression" => NodeKind::Ternary,
            "try_statement" => NodeKind::Try,
            "catch_clause" => NodeKind::Catch,
            "switch_statement" => NodeKind::Switch,
            "switch_case" => NodeKind::Case,
            "import_statement" => NodeKind::Import,
            "namespace_import" => {
                let name = node
                    .named_child(0)
                    .map(|n| node_text(n, source))
                    .unwrap_or_default();
                let class = Classified::new(NodeKind::ImportBinding).named(name).opaque();
                return Some(match import_source(node, source) {
                    Some(module) => class.with_origin(module),
                    None => class,
                });
            }
            "import_specifier" => {
                let imported = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_default();
                let bound = node
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, source))
                    .unwrap_or(imported);
                let class = Classified::new(NodeKind::ImportBinding).named(bound).opaque();
                return Some(match import_source(node, source) {
                    Some(module) => class.with_origin(format!("{}.{}", module, imported)),
                    None => class,
                });
            }
            "return_statement" => NodeKind::Return,
            "parenthesized_expression" => NodeKind::Parenthesized,
            "array_pattern" | "object_pattern" | "sequence_expression" => NodeKind::Sequence,
            "regex" => return Some(Classified::new(NodeKind::Other).opaque()),
            "comment" => return None,
            _ => NodeKind::Other,
        };
        Some(Classified::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Role, SyntaxTree};

    fn parse(dialect: Dialect, source: &str) -> SyntaxTree {
        JavaScriptAdapter::new(dialect)
            .parse("test.js", source)
            .unwrap()
    }

    fn names(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
        tree.nodes()
            .filter(|n| n.kind() == kind)
            .map(|n| n.name().to_string())
            .collect()
    }

    #[test]
    fn test_import_bindings() {
        let tree = parse(
            Dialect::JavaScript,
            "import fs from 'fs';\nimport * as path from 'path';\nimport { exec, spawn as sp } from 'child_process';\n",
        );
        assert_eq!(
            names(&tree, NodeKind::ImportBinding),
            vec!["fs", "path", "exec", "sp"]
        );
        assert!(names(&tree, NodeKind::StringLiteral).is_empty());
        let origins: Vec<_> = tree
            .nodes()
            .filter_map(|n| n.origin())
            .collect();
        assert_eq!(
            origins,
            vec!["fs", "path", "child_process.exec", "child_process.spawn"]
        );
    }

    #[test]
    fn test_binary_operator_kinds() {
        let tree = parse(
            Dialect::JavaScript,
            "const a = x && y;\nconst b = x === 3;\nconst c = x * 2;\n",
        );
        let kinds: Vec<_> = tree
            .nodes()
            .filter(|n| n.operator().is_some())
            .map(|n| n.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::BooleanOp, NodeKind::Comparison, NodeKind::BinaryOp]
        );
    }

    #[test]
    fn test_declarator_roles() {
        let tree = parse(Dialect::JavaScript, "let token = Math.random();\n");
        let decl = tree
            .nodes()
            .find(|n| n.kind() == NodeKind::Declaration)
            .unwrap();
        assert_eq!(decl.child(Role::Target).unwrap().text(), "token");
        assert_eq!(decl.child(Role::Value).unwrap().kind(), NodeKind::Call);
    }

    #[test]
    fn test_object_pairs_as_keyword_arguments() {
        let tree = parse(Dialect::JavaScript, "connect({ password: 'hunter2' });\n");
        assert_eq!(names(&tree, NodeKind::KeywordName), vec!["password"]);
    }

    #[test]
    fn test_typescript_dialects_parse() {
        let ts = parse(Dialect::TypeScript, "function f(a: number, b: string): void {}\n");
        let params = ts
            .nodes()
            .find(|n| n.kind() == NodeKind::Parameters)
            .unwrap();
        assert_eq!(params.children().count(), 2);

        let tsx = parse(Dialect::Tsx, "const el = <div>{name}</div>;\n");
        assert_eq!(tsx.language(), "tsx");
    }
}
