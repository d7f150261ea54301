//! Owned structural representation of a parsed source file.
//!
//! Language adapters lower a tree-sitter tree into a [`SyntaxTree`]: an
//! arena of nodes stored in pre-order, each tagged with a normalized
//! [`NodeKind`] and the [`Role`] it plays under its parent. Rules only
//! ever see this representation, never the grammar-specific tree.
//!
//! Because nodes are stored in pre-order, the subtree of a node is the
//! contiguous id range `id + 1 .. subtree_end`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// Span covering a byte range of `source`.
    pub fn from_range(source: &str, range: Range<usize>) -> Self {
        let (start_line, start_col) = line_col(source, range.start);
        let (end_line, end_col) = line_col(source, range.end);
        Self {
            start_byte: range.start,
            end_byte: range.end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at the start of a file.
    pub fn file_start() -> Self {
        Self {
            start_byte: 0,
            end_byte: 0,
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: 1,
        }
    }

    /// Check that the span lies within a source of `len` bytes.
    pub fn within(&self, len: usize) -> bool {
        self.start_byte <= self.end_byte && self.end_byte <= len
    }

    /// Number of lines the span touches.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// 1-indexed line and column of a byte offset.
fn line_col(source: &str, byte: usize) -> (usize, usize) {
    let byte = byte.min(source.len());
    let before = &source.as_bytes()[..byte];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, byte - line_start + 1)
}

/// Normalized node kinds shared by every language adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Module,
    Function,
    Lambda,
    Class,
    Parameters,
    Block,
    /// Plain assignment (`x = ...`).
    Assignment,
    /// Compound assignment (`x += ...`); reads and writes its target.
    AugAssignment,
    /// Declarator that introduces a binding (`let x = ...`).
    Declaration,
    Call,
    Arguments,
    KeywordArgument,
    KeywordName,
    Identifier,
    /// Member name after a dot; never a variable reference.
    Property,
    Attribute,
    Subscript,
    StringLiteral,
    StringContent,
    Interpolation,
    NumberLiteral,
    BinaryOp,
    BooleanOp,
    Comparison,
    UnaryOp,
    If,
    ElseIf,
    Else,
    For,
    While,
    Ternary,
    Try,
    Catch,
    Switch,
    Case,
    /// `global` / `nonlocal` declaration.
    Global,
    Import,
    /// A name bound by an import clause.
    ImportBinding,
    Return,
    Parenthesized,
    /// Tuple / list / destructuring pattern.
    Sequence,
    Other,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::Lambda => "lambda",
            NodeKind::Class => "class",
            NodeKind::Parameters => "parameters",
            NodeKind::Block => "block",
            NodeKind::Assignment => "assignment",
            NodeKind::AugAssignment => "aug_assignment",
            NodeKind::Declaration => "declaration",
            NodeKind::Call => "call",
            NodeKind::Arguments => "arguments",
            NodeKind::KeywordArgument => "keyword_argument",
            NodeKind::KeywordName => "keyword_name",
            NodeKind::Identifier => "identifier",
            NodeKind::Property => "property",
            NodeKind::Attribute => "attribute",
            NodeKind::Subscript => "subscript",
            NodeKind::StringLiteral => "string",
            NodeKind::StringContent => "string_content",
            NodeKind::Interpolation => "interpolation",
            NodeKind::NumberLiteral => "number",
            NodeKind::BinaryOp => "binary_op",
            NodeKind::BooleanOp => "boolean_op",
            NodeKind::Comparison => "comparison",
            NodeKind::UnaryOp => "unary_op",
            NodeKind::If => "if",
            NodeKind::ElseIf => "else_if",
            NodeKind::Else => "else",
            NodeKind::For => "for",
            NodeKind::While => "while",
            NodeKind::Ternary => "ternary",
            NodeKind::Try => "try",
            NodeKind::Catch => "catch",
            NodeKind::Switch => "switch",
            NodeKind::Case => "case",
            NodeKind::Global => "global",
            NodeKind::Import => "import",
            NodeKind::ImportBinding => "import_binding",
            NodeKind::Return => "return",
            NodeKind::Parenthesized => "parenthesized",
            NodeKind::Sequence => "sequence",
            NodeKind::Other => "other",
        }
    }

    /// Nodes that open a new variable scope.
    pub fn is_scope(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Lambda | NodeKind::Class)
    }

    /// Nodes that add one to cyclomatic complexity.
    pub fn is_decision_point(&self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::ElseIf
                | NodeKind::For
                | NodeKind::While
                | NodeKind::Ternary
                | NodeKind::Catch
                | NodeKind::Case
                | NodeKind::BooleanOp
        )
    }

    /// Assignment-like nodes with a target and a value.
    pub fn is_binding_site(&self) -> bool {
        matches!(
            self,
            NodeKind::Assignment | NodeKind::AugAssignment | NodeKind::Declaration
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The role a node plays under its parent (a normalized field name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Name,
    Target,
    Value,
    Callee,
    Arguments,
    Parameters,
    Body,
    Condition,
    Left,
    Right,
    Object,
    Property,
    Index,
    Alias,
    Type,
    None,
}

impl Role {
    /// Map a grammar field name to a role, given the parent's kind.
    pub fn from_field(parent: NodeKind, field: Option<&str>) -> Role {
        let Some(field) = field else {
            return Role::None;
        };
        match field {
            "left" if parent.is_binding_site() => Role::Target,
            "right" if parent.is_binding_site() => Role::Value,
            "left" => Role::Left,
            "right" => Role::Right,
            "name" if parent == NodeKind::Declaration => Role::Target,
            "argument" if parent == NodeKind::AugAssignment => Role::Target,
            "name" => Role::Name,
            "value" if parent == NodeKind::Subscript => Role::Object,
            "value" => Role::Value,
            "function" | "constructor" => Role::Callee,
            "arguments" => Role::Arguments,
            "parameters" | "parameter" => Role::Parameters,
            "body" => Role::Body,
            "condition" => Role::Condition,
            "object" => Role::Object,
            "attribute" | "property" => Role::Property,
            "subscript" | "index" => Role::Index,
            "alias" => Role::Alias,
            "type" | "return_type" => Role::Type,
            _ => Role::None,
        }
    }
}

/// Identity of a node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    raw_kind: &'static str,
    role: Role,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    subtree_end: usize,
    name: Option<String>,
    origin: Option<String>,
    operator: Option<String>,
}

/// A lowered syntax tree. Immutable once built.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    source: String,
    path: String,
    language: &'static str,
    implicit_locals: bool,
}

impl SyntaxTree {
    /// The root node (always the first node).
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Whether a plain assignment inside a function creates a local (Python).
    pub fn implicit_locals(&self) -> bool {
        self.implicit_locals
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(move |i| NodeRef {
            tree: self,
            id: NodeId(i),
        })
    }
}

/// A borrowed handle to one node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind(), self.span())
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'t> NodeRef<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    /// The grammar's own node kind (e.g. `function_definition`).
    pub fn raw_kind(&self) -> &'static str {
        self.data().raw_kind
    }

    pub fn role(&self) -> Role {
        self.data().role
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    /// Source text covered by this node.
    pub fn text(&self) -> &'t str {
        let span = self.span();
        self.tree
            .source
            .get(span.start_byte..span.end_byte)
            .unwrap_or("")
    }

    /// Bound name for import bindings, otherwise the node text.
    pub fn name(&self) -> &'t str {
        self.data().name.as_deref().unwrap_or_else(|| self.text())
    }

    /// Qualified path an import binding stands for: `random.randint` for
    /// `from random import randint`, `os` for `import os as o`.
    pub fn origin(&self) -> Option<&'t str> {
        self.data().origin.as_deref()
    }

    /// Operator token for operator nodes (`+`, `==`, `and`, `+=`).
    pub fn operator(&self) -> Option<&'t str> {
        self.data().operator.as_deref()
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| tree.node(id))
    }

    /// First child playing `role`.
    pub fn child(&self, role: Role) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.role() == role)
    }

    /// First child of `kind`.
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// All nodes below this one, in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        (self.id.0 + 1..self.data().subtree_end).map(move |i| tree.node(NodeId(i)))
    }

    /// Nodes below this one that belong to the same scope.
    ///
    /// Nested functions, lambdas and classes are yielded themselves but
    /// their interiors are skipped.
    pub fn scope_descendants(&self) -> ScopeIter<'t> {
        ScopeIter {
            tree: self.tree,
            next: self.id.0 + 1,
            end: self.data().subtree_end,
        }
    }

    /// Whether `other` lies strictly inside this node's subtree.
    pub fn contains(&self, other: NodeRef<'_>) -> bool {
        self.id.0 < other.id.0 && other.id.0 < self.data().subtree_end
    }

    /// Nearest ancestor that opens a scope (function, lambda, class).
    pub fn enclosing_scope(&self) -> Option<NodeRef<'t>> {
        self.ancestors().find(|a| a.kind().is_scope())
    }

    /// Nearest enclosing function, if any.
    pub fn enclosing_function(&self) -> Option<NodeRef<'t>> {
        self.ancestors().find(|a| a.kind() == NodeKind::Function)
    }
}

/// Iterator returned by [`NodeRef::scope_descendants`].
pub struct ScopeIter<'t> {
    tree: &'t SyntaxTree,
    next: usize,
    end: usize,
}

impl<'t> Iterator for ScopeIter<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let node = self.tree.node(NodeId(self.next));
        self.next = if node.kind().is_scope() {
            node.data().subtree_end
        } else {
            self.next + 1
        };
        Some(node)
    }
}

/// Incremental builder for a [`SyntaxTree`].
///
/// Nodes are opened in pre-order; `close` finishes the most recently
/// opened node. Used by the tree-sitter lowering and by tests that need
/// hand-shaped trees.
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    source: String,
    path: String,
    language: &'static str,
    implicit_locals: bool,
}

impl TreeBuilder {
    pub fn new(source: impl Into<String>, path: impl Into<String>, language: &'static str) -> Self {
        Self {
            nodes: Vec::new(),
            stack: Vec::new(),
            source: source.into(),
            path: path.into(),
            language,
            implicit_locals: false,
        }
    }

    pub fn implicit_locals(mut self, yes: bool) -> Self {
        self.implicit_locals = yes;
        self
    }

    /// Kind of the currently open node.
    pub fn current_kind(&self) -> Option<NodeKind> {
        self.stack.last().map(|id| self.nodes[id.0].kind)
    }

    /// Span of a byte range of the builder's source.
    pub fn span(&self, range: Range<usize>) -> Span {
        Span::from_range(&self.source, range)
    }

    /// Open a node as a child of the currently open node.
    pub fn open(&mut self, kind: NodeKind, role: Role, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.stack.last().copied();
        self.nodes.push(NodeData {
            kind,
            raw_kind: kind.as_str(),
            role,
            span,
            parent,
            children: Vec::new(),
            subtree_end: id.0 + 1,
            name: None,
            origin: None,
            operator: None,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        self.stack.push(id);
        id
    }

    /// Close the most recently opened node.
    pub fn close(&mut self) {
        if let Some(id) = self.stack.pop() {
            self.nodes[id.0].subtree_end = self.nodes.len();
        }
    }

    /// Open and immediately close a node.
    pub fn leaf(&mut self, kind: NodeKind, role: Role, span: Span) -> NodeId {
        let id = self.open(kind, role, span);
        self.close();
        id
    }

    pub fn set_raw_kind(&mut self, id: NodeId, raw_kind: &'static str) {
        self.nodes[id.0].raw_kind = raw_kind;
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id.0].name = Some(name.into());
    }

    pub fn set_origin(&mut self, id: NodeId, origin: impl Into<String>) {
        self.nodes[id.0].origin = Some(origin.into());
    }

    pub fn set_operator(&mut self, id: NodeId, operator: impl Into<String>) {
        self.nodes[id.0].operator = Some(operator.into());
    }

    /// Finish the tree, closing any nodes left open.
    pub fn build(mut self) -> SyntaxTree {
        while !self.stack.is_empty() {
            self.close();
        }
        SyntaxTree {
            nodes: self.nodes,
            source: self.source,
            path: self.path,
            language: self.language,
            implicit_locals: self.implicit_locals,
        }
    }
}
