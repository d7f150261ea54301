//! Tree-sitter front end.
//!
//! This module provides:
//! - `LanguageAdapter` trait: parses one language and classifies its
//!   grammar nodes into normalized [`NodeKind`]s
//! - Adapter lookup by file extension or language id
//! - Lowering of tree-sitter trees into owned [`SyntaxTree`]s

use std::path::Path;

use tree_sitter::{Language, Node};

use crate::error::ParseError;
use crate::tree::{NodeKind, SyntaxTree};

pub mod languages;
mod lower;

pub use languages::{get_adapter, get_adapter_by_id, language_ids, supported_extensions};

/// How an adapter maps one grammar node into the lowered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: NodeKind,
    /// Bound name overriding the node text (import bindings).
    pub name: Option<String>,
    /// Qualified path an import binding refers to.
    pub origin: Option<String>,
    /// Operator token for operator nodes.
    pub operator: Option<String>,
    /// Keep the node but do not lower its children.
    pub opaque: bool,
}

impl Classified {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            origin: None,
            operator: None,
            opaque: false,
        }
    }

    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_operator(mut self, operator: Option<&str>) -> Self {
        self.operator = operator.map(str::to_string);
        self
    }
}

/// Where a grammar node sits, as seen by [`LanguageAdapter::classify`].
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// Field name under the parent grammar node.
    pub field: Option<&'a str>,
    /// Normalized kind of the nearest lowered ancestor.
    pub parent: Option<NodeKind>,
}

/// Language-specific parsing and node classification.
///
/// Implementations are stateless and shared across threads;
/// `tree_sitter::Parser` is not `Sync`, so a parser is created per call.
pub trait LanguageAdapter: Send + Sync {
    /// Returns the language identifier (e.g., "python").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this adapter handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// The tree-sitter grammar.
    fn language(&self) -> &Language;

    /// Whether plain assignment inside a function creates a local binding.
    fn implicit_locals(&self) -> bool;

    /// Classify a named grammar node. `None` drops the node and its subtree.
    fn classify(&self, node: Node<'_>, ctx: NodeContext<'_>, source: &str) -> Option<Classified>;

    /// Check if this adapter handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }

    /// Parse source text and lower it into a [`SyntaxTree`].
    ///
    /// Trees containing syntax errors are rejected with the position of the
    /// first error node.
    fn parse(&self, path: &str, source: &str) -> Result<SyntaxTree, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(self.language())
            .map_err(|e| ParseError::Grammar {
                language: self.language_id().to_string(),
                message: e.to_string(),
            })?;
        let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;

        let root = tree.root_node();
        if root.has_error() {
            let node = first_error(root).unwrap_or(root);
            let pos = node.start_position();
            return Err(ParseError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
                offset: node.start_byte(),
            });
        }

        Ok(lower::lower(self, &tree, source, path))
    }
}

/// The adapter for `path`: the forced one if given, otherwise by extension.
pub fn adapter_for(
    path: &Path,
    forced: Option<&'static dyn LanguageAdapter>,
) -> Result<&'static dyn LanguageAdapter, ParseError> {
    if let Some(adapter) = forced {
        return Ok(adapter);
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    get_adapter(ext).ok_or_else(|| ParseError::UnsupportedLanguage(ext.to_string()))
}

/// Read a source file as UTF-8.
pub fn read_source(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| ParseError::Encoding)
}

/// Read and parse a file, choosing the adapter by extension unless one is forced.
pub fn parse_file(
    path: &Path,
    forced: Option<&'static dyn LanguageAdapter>,
) -> Result<SyntaxTree, ParseError> {
    let adapter = adapter_for(path, forced)?;
    let source = read_source(path)?;
    adapter.parse(&path.to_string_lossy(), &source)
}

/// First ERROR or MISSING node in pre-order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Text of a grammar node.
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Text of a node's `operator` field.
pub(crate) fn operator_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name("operator")
        .map(|op| node_text(op, source))
}
