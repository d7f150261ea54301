//! The built-in rule set.
//!
//! Every rule is a [`Rule`]: fixed metadata plus one [`Matcher`] variant.
//! The matcher set is closed, so dispatch is a plain `match` instead of
//! trait objects. Matchers are pure: for a given node they always report
//! the same hits and keep no state between calls.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::RuleConfig;
use crate::detect::{Finding, RuleId, Severity};
use crate::error::{ConfigError, RuleError};
use crate::tree::{NodeKind, NodeRef, Role, Span};

mod complexity;
mod duplicates;
mod globals;
mod magic;
mod params;
mod queries;
mod randomness;
mod secrets;
mod sinks;
mod unused;

pub use complexity::Complexity;
pub use duplicates::DuplicateBlock;
pub use globals::GlobalMutation;
pub use magic::MagicLiteral;
pub use params::LongParameterList;
pub use queries::StringBuiltQuery;
pub use randomness::WeakRandomness;
pub use secrets::HardcodedSecret;
pub use sinks::UnsafeSink;
pub use unused::UnusedBinding;

/// When a node is delivered to a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visit {
    /// Before the node's children; only the node and its ancestors are known.
    Enter,
    /// After the node's subtree has been walked.
    Exit,
}

/// A (kind, visit) pair a matcher wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest {
    pub kind: NodeKind,
    pub visit: Visit,
}

impl Interest {
    pub const fn enter(kind: NodeKind) -> Self {
        Self {
            kind,
            visit: Visit::Enter,
        }
    }

    pub const fn exit(kind: NodeKind) -> Self {
        Self {
            kind,
            visit: Visit::Exit,
        }
    }
}

/// A partial finding reported by a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub span: Span,
    /// Values substituted into the rule's message template.
    pub args: Vec<(&'static str, String)>,
    /// Raise the finding to critical regardless of the rule severity.
    pub escalate: bool,
    /// Severity for this kind of hit when the rule's is not overridden.
    pub severity: Option<Severity>,
    /// CWE replacing the rule's own.
    pub cwe: Option<&'static str>,
    /// Suggestion replacing the rule's own.
    pub suggestion: Option<&'static str>,
}

impl Hit {
    pub fn at(node: NodeRef<'_>) -> Self {
        Self {
            span: node.span(),
            args: Vec::new(),
            escalate: false,
            severity: None,
            cwe: None,
            suggestion: None,
        }
    }

    pub fn arg(mut self, key: &'static str, value: impl ToString) -> Self {
        self.args.push((key, value.to_string()));
        self
    }

    pub fn escalate(mut self, yes: bool) -> Self {
        self.escalate = yes;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn cwe(mut self, cwe: &'static str) -> Self {
        self.cwe = Some(cwe);
        self
    }

    pub fn suggestion(mut self, suggestion: &'static str) -> Self {
        self.suggestion = Some(suggestion);
        self
    }
}

/// Closed set of matchers, one variant per rule kind.
#[derive(Debug)]
pub enum Matcher {
    HardcodedSecret(HardcodedSecret),
    UnsafeSink(UnsafeSink),
    Complexity(Complexity),
    GlobalMutation(GlobalMutation),
    LongParameterList(LongParameterList),
    MagicLiteral(MagicLiteral),
    UnusedBinding(UnusedBinding),
    WeakRandomness(WeakRandomness),
    StringBuiltQuery(StringBuiltQuery),
    DuplicateBlock(DuplicateBlock),
}

impl Matcher {
    pub fn interests(&self) -> &'static [Interest] {
        match self {
            Matcher::HardcodedSecret(_) => HardcodedSecret::INTERESTS,
            Matcher::UnsafeSink(_) => UnsafeSink::INTERESTS,
            Matcher::Complexity(_) => Complexity::INTERESTS,
            Matcher::GlobalMutation(_) => GlobalMutation::INTERESTS,
            Matcher::LongParameterList(_) => LongParameterList::INTERESTS,
            Matcher::MagicLiteral(_) => MagicLiteral::INTERESTS,
            Matcher::UnusedBinding(_) => UnusedBinding::INTERESTS,
            Matcher::WeakRandomness(_) => WeakRandomness::INTERESTS,
            Matcher::StringBuiltQuery(_) => StringBuiltQuery::INTERESTS,
            Matcher::DuplicateBlock(_) => DuplicateBlock::INTERESTS,
        }
    }

    pub fn check(&self, node: NodeRef<'_>, visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        match self {
            Matcher::HardcodedSecret(m) => m.check(node, visit, out),
            Matcher::UnsafeSink(m) => m.check(node, visit, out),
            Matcher::Complexity(m) => m.check(node, visit, out),
            Matcher::GlobalMutation(m) => m.check(node, visit, out),
            Matcher::LongParameterList(m) => m.check(node, visit, out),
            Matcher::MagicLiteral(m) => m.check(node, visit, out),
            Matcher::UnusedBinding(m) => m.check(node, visit, out),
            Matcher::WeakRandomness(m) => m.check(node, visit, out),
            Matcher::StringBuiltQuery(m) => m.check(node, visit, out),
            Matcher::DuplicateBlock(m) => m.check(node, visit, out),
        }
    }
}

/// A registered rule. Immutable once built.
#[derive(Debug)]
pub struct Rule {
    id: RuleId,
    severity: Severity,
    /// Set by an explicit severity override; escalation is then ignored.
    pinned: bool,
    message: &'static str,
    suggestion: Option<&'static str>,
    matcher: Matcher,
}

impl Rule {
    pub fn new(id: RuleId, severity: Severity, message: &'static str, matcher: Matcher) -> Self {
        Self {
            id,
            severity,
            pinned: false,
            message,
            suggestion: None,
            matcher,
        }
    }

    pub fn with_suggestion(mut self, suggestion: &'static str) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    /// Override the severity. An overridden severity also wins over
    /// escalation by the matcher.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self.pinned = true;
        self
    }

    /// Build a built-in rule with its defaults, then apply config overrides.
    pub fn builtin(id: RuleId, config: Option<&RuleConfig>) -> Result<Self, ConfigError> {
        let patterns = config.and_then(|c| c.patterns.as_deref());
        let sinks = config.and_then(|c| c.sinks.as_deref()).unwrap_or(&[]);
        let threshold = config.and_then(|c| c.threshold);

        let rule = match id {
            RuleId::HardcodedSecret => Rule::new(
                id,
                Severity::Error,
                "hardcoded secret assigned to '{name}'",
                Matcher::HardcodedSecret(HardcodedSecret::new(patterns)?),
            )
            .with_suggestion("read the value from an environment variable or secret store"),
            RuleId::UnsafeSink => Rule::new(
                id,
                Severity::Critical,
                "unsafe {class} sink '{sink}'",
                Matcher::UnsafeSink(UnsafeSink::new(sinks)?),
            )
            .with_suggestion("keep untrusted input away from this call"),
            RuleId::Complexity => Rule::new(
                id,
                Severity::Warning,
                "function '{name}' has cyclomatic complexity {complexity} (threshold {threshold})",
                Matcher::Complexity(Complexity::new(threshold_or(threshold, Complexity::DEFAULT_THRESHOLD))),
            )
            .with_suggestion("split the function into smaller functions"),
            RuleId::GlobalMutation => Rule::new(
                id,
                Severity::Warning,
                "function '{function}' mutates global '{name}'",
                Matcher::GlobalMutation(GlobalMutation),
            )
            .with_suggestion("pass state explicitly or encapsulate it in an object"),
            RuleId::LongParameterList => Rule::new(
                id,
                Severity::Warning,
                "function '{name}' declares {count} parameters (threshold {threshold})",
                Matcher::LongParameterList(LongParameterList::new(threshold_or(
                    threshold,
                    LongParameterList::DEFAULT_THRESHOLD,
                ))),
            )
            .with_suggestion("group related parameters into a structure"),
            RuleId::MagicLiteral => Rule::new(
                id,
                Severity::Info,
                "magic literal {literal} in {context}",
                Matcher::MagicLiteral(MagicLiteral),
            )
            .with_suggestion("bind the literal to a named constant"),
            RuleId::UnusedBinding => Rule::new(
                id,
                Severity::Warning,
                "{what} '{name}' is never used",
                Matcher::UnusedBinding(UnusedBinding),
            )
            .with_suggestion("remove the binding or prefix it with '_'"),
            RuleId::WeakRandomness => Rule::new(
                id,
                Severity::Error,
                "non-cryptographic random source '{source}' used for '{name}'",
                Matcher::WeakRandomness(WeakRandomness::new(patterns)?),
            )
            .with_suggestion("use a cryptographically secure generator such as secrets or crypto.randomBytes"),
            RuleId::StringBuiltQuery => Rule::new(
                id,
                Severity::Critical,
                "{detail}",
                Matcher::StringBuiltQuery(StringBuiltQuery::new(sinks)),
            )
            .with_suggestion("use parameterized queries"),
            RuleId::DuplicateBlock => Rule::new(
                id,
                Severity::Info,
                "block duplicates the one at line {line}",
                Matcher::DuplicateBlock(DuplicateBlock::new(threshold_or(
                    threshold,
                    DuplicateBlock::DEFAULT_MIN_LINES,
                ))),
            )
            .with_suggestion("extract the shared logic into a function"),
            RuleId::ParseError | RuleId::RuleInternalError => {
                return Err(ConfigError::UnknownRule(id.as_str().to_string()))
            }
        };

        Ok(match config.and_then(|c| c.severity) {
            Some(severity) => rule.with_severity(severity),
            None => rule,
        })
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message_template(&self) -> &'static str {
        self.message
    }

    pub fn interests(&self) -> &'static [Interest] {
        self.matcher.interests()
    }

    pub fn check(&self, node: NodeRef<'_>, visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        self.matcher.check(node, visit, out)
    }

    /// Render a hit into a finding for `file`.
    ///
    /// Severity precedence: an explicit override, then escalation, then the
    /// hit's own severity, then the rule default.
    pub fn finding(&self, hit: Hit, file: &str) -> Finding {
        let severity = if self.pinned {
            self.severity
        } else if hit.escalate {
            Severity::Critical
        } else {
            hit.severity.unwrap_or(self.severity)
        };
        let mut finding = Finding::new(
            self.id,
            severity,
            file,
            hit.span,
            render(self.message, &hit.args),
        );
        if let Some(cwe) = hit.cwe.or_else(|| self.id.cwe()) {
            finding = finding.with_cwe(cwe);
        }
        match hit.suggestion.or(self.suggestion) {
            Some(s) => finding.with_suggestion(s),
            None => finding,
        }
    }
}

fn threshold_or(threshold: Option<i64>, default: usize) -> usize {
    threshold
        .and_then(|t| usize::try_from(t).ok())
        .unwrap_or(default)
}

/// Substitute `{key}` placeholders.
pub fn render(template: &str, args: &[(&'static str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in args {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

/// Case-insensitive glob set over identifier names.
pub fn name_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(","),
        message: e.to_string(),
    })
}

/// `API_SECRET`, `MAX_RETRIES`, `V2`.
pub fn is_upper_snake(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// The name an assignment target binds: `x`, `self.x` and `obj.x` give `x`.
pub fn target_name<'t>(target: NodeRef<'t>) -> Option<&'t str> {
    match target.kind() {
        NodeKind::Identifier | NodeKind::KeywordName => Some(target.text()),
        NodeKind::Attribute => target.child(Role::Property).map(|p| p.text()),
        _ => None,
    }
}

/// Dotted path of a name or member chain: `os.system`, `Object.prototype`.
pub fn dotted_path(node: NodeRef<'_>) -> Option<String> {
    match node.kind() {
        NodeKind::Identifier => Some(node.text().to_string()),
        NodeKind::Attribute => {
            let object = dotted_path(node.child(Role::Object)?)?;
            let property = node.child(Role::Property)?;
            Some(format!("{}.{}", object, property.text()))
        }
        NodeKind::Parenthesized => dotted_path(node.children().next()?),
        _ => None,
    }
}

/// Dotted path of a callee: `os.system`, `eval`, `child_process.exec`.
pub fn callee_path(call: NodeRef<'_>) -> Option<String> {
    dotted_path(call.child(Role::Callee)?)
}

/// [`callee_path`] with its first segment resolved through the file's
/// imports: `system` after `from os import system` gives `os.system`,
/// `rnd.random` after `import random as rnd` gives `random.random`.
pub fn resolved_callee_path(call: NodeRef<'_>) -> Option<String> {
    let path = callee_path(call)?;
    let head = path.split('.').next().unwrap_or(&path);
    let origin = call
        .tree()
        .nodes()
        .filter(|n| n.kind() == NodeKind::ImportBinding && n.name() == head)
        .find_map(|n| n.origin());
    let Some(origin) = origin else {
        return Some(path);
    };
    Some(match path.split_once('.') {
        Some((_, rest)) => format!("{}.{}", origin, rest),
        None => origin.to_string(),
    })
}

/// Last segment of a callee, even when the receiver is an arbitrary expression.
pub fn callee_name<'t>(call: NodeRef<'t>) -> Option<&'t str> {
    let callee = call.child(Role::Callee)?;
    match callee.kind() {
        NodeKind::Identifier => Some(callee.text()),
        NodeKind::Attribute => callee.child(Role::Property).map(|p| p.text()),
        _ => None,
    }
}

/// First positional argument of a call.
pub fn first_argument(call: NodeRef<'_>) -> Option<NodeRef<'_>> {
    call.child(Role::Arguments)?
        .children()
        .find(|a| a.kind() != NodeKind::KeywordArgument)
}

/// Strip grouping parentheses.
pub fn unwrap_parens(mut node: NodeRef<'_>) -> NodeRef<'_> {
    while node.kind() == NodeKind::Parenthesized {
        match node.children().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Whether a string literal contains interpolations.
pub fn is_interpolated(node: NodeRef<'_>) -> bool {
    node.kind() == NodeKind::StringLiteral
        && node
            .descendants()
            .any(|d| d.kind() == NodeKind::Interpolation)
}

/// Text of a string literal between its quotes, prefixes dropped.
pub fn literal_body(node: NodeRef<'_>) -> &str {
    let text = node
        .text()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if text.len() >= 2 * quote.len() && text.starts_with(quote) && text.ends_with(quote) {
            return &text[quote.len()..text.len() - quote.len()];
        }
    }
    text
}

/// Whether an expression builds a string dynamically: interpolation,
/// concatenation with a string, `%` formatting or `.format(...)`.
pub fn is_built_string(node: NodeRef<'_>) -> bool {
    let node = unwrap_parens(node);
    match node.kind() {
        NodeKind::StringLiteral => is_interpolated(node),
        NodeKind::BinaryOp => match node.operator() {
            Some("+") => {
                let mut has_string = false;
                let mut has_dynamic = false;
                for side in node.children().map(unwrap_parens) {
                    match side.kind() {
                        NodeKind::StringLiteral if !is_interpolated(side) => has_string = true,
                        _ if is_built_string(side) => {
                            has_string = true;
                            has_dynamic = true;
                        }
                        _ => has_dynamic = true,
                    }
                }
                has_string && has_dynamic
            }
            Some("%") => node
                .child(Role::Left)
                .map(|l| unwrap_parens(l).kind() == NodeKind::StringLiteral)
                .unwrap_or(false),
            _ => false,
        },
        NodeKind::Call => {
            callee_name(node) == Some("format")
                && node
                    .child(Role::Callee)
                    .and_then(|c| c.child(Role::Object))
                    .map(|o| o.kind() == NodeKind::StringLiteral)
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/// Value most recently assigned to an identifier before its use, looking
/// only at nodes of the same scope that precede it.
pub fn earlier_value<'t>(ident: NodeRef<'t>) -> Option<NodeRef<'t>> {
    if ident.kind() != NodeKind::Identifier {
        return None;
    }
    let name = ident.text();
    let at = ident.span().start_byte;
    let scope = ident
        .ancestors()
        .find(|a| a.kind().is_scope() || a.kind() == NodeKind::Module)?;

    scope
        .scope_descendants()
        .take_while(|n| n.span().start_byte < at)
        .filter(|n| matches!(n.kind(), NodeKind::Assignment | NodeKind::Declaration))
        .filter(|n| n.span().end_byte <= at)
        .filter(|n| {
            n.child(Role::Target)
                .map(|t| t.kind() == NodeKind::Identifier && t.text() == name)
                .unwrap_or(false)
        })
        .last()
        .and_then(|n| n.child(Role::Value))
}

/// Whether a value is a built string, directly or through a variable
/// assigned earlier in the same scope.
pub fn is_built_value(value: NodeRef<'_>) -> bool {
    let value = unwrap_parens(value);
    is_built_string(value) || earlier_value(value).map(is_built_string).unwrap_or(false)
}

/// Name of a function node, or `<anonymous>`.
pub fn function_name<'t>(func: NodeRef<'t>) -> &'t str {
    func.child(Role::Name)
        .map(|n| n.text())
        .or_else(|| {
            // `const f = () => ...` names the lambda after its declarator
            func.parent()
                .filter(|p| p.kind() == NodeKind::Declaration)
                .and_then(|p| p.child(Role::Target))
                .map(|t| t.text())
        })
        .unwrap_or("<anonymous>")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::detect::{RuleRegistry, Walker};
    use crate::parser::get_adapter;

    /// Run a single rule over `source`, picking the adapter from `path`.
    pub fn check_source(rule: Rule, path: &str, source: &str) -> Vec<Finding> {
        let ext = path.rsplit('.').next().unwrap_or("");
        let tree = get_adapter(ext).unwrap().parse(path, source).unwrap();
        let mut registry = RuleRegistry::new();
        registry.register(rule).unwrap();
        Walker::new(&registry).analyze(&tree)
    }

    pub fn check_py(id: RuleId, source: &str) -> Vec<Finding> {
        check_source(Rule::builtin(id, None).unwrap(), "test.py", source)
    }

    pub fn check_js(id: RuleId, source: &str) -> Vec<Finding> {
        check_source(Rule::builtin(id, None).unwrap(), "test.js", source)
    }

    pub fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::get_adapter;
    use crate::tree::SyntaxTree;

    fn parse_py(source: &str) -> SyntaxTree {
        get_adapter("py").unwrap().parse("t.py", source).unwrap()
    }

    fn first(tree: &SyntaxTree, kind: NodeKind) -> NodeRef<'_> {
        tree.nodes().find(|n| n.kind() == kind).unwrap()
    }

    #[test]
    fn test_render_template() {
        let args = vec![("name", "f".to_string()), ("count", "7".to_string())];
        assert_eq!(render("{name} has {count}", &args), "f has 7");
        assert_eq!(render("{missing}", &args), "{missing}");
    }

    #[test]
    fn test_upper_snake() {
        assert!(is_upper_snake("API_SECRET"));
        assert!(is_upper_snake("V2"));
        assert!(!is_upper_snake("api_secret"));
        assert!(!is_upper_snake("_"));
    }

    #[test]
    fn test_name_patterns_case_insensitive() {
        let set = name_patterns(&["*secret*"]).unwrap();
        assert!(set.is_match("API_SECRET"));
        assert!(!set.is_match("public"));
        assert!(name_patterns(&["[unclosed"]).is_err());
    }

    #[test]
    fn test_callee_path() {
        let tree = parse_py("os.path.join(a, b)\n");
        let call = first(&tree, NodeKind::Call);
        assert_eq!(callee_path(call).as_deref(), Some("os.path.join"));
        assert_eq!(callee_name(call), Some("join"));
        assert_eq!(first_argument(call).unwrap().text(), "a");
    }

    #[test]
    fn test_callee_path_resolves_imports() {
        let tree = parse_py(
            "from os import system\nimport random as rnd\nimport subprocess\nsystem(c)\nrnd.randint(1, 2)\nsubprocess.call(c)\nlocal(c)\n",
        );
        let paths: Vec<_> = tree
            .nodes()
            .filter(|n| n.kind() == NodeKind::Call)
            .filter_map(resolved_callee_path)
            .collect();
        assert_eq!(
            paths,
            vec!["os.system", "random.randint", "subprocess.call", "local"]
        );
    }

    #[test]
    fn test_built_strings() {
        let cases = [
            ("f\"ls {d}\"", true),
            ("\"ls \" + d", true),
            ("\"ls %s\" % d", true),
            ("\"ls {}\".format(d)", true),
            ("\"ls\"", false),
            ("\"a\" + \"b\"", false),
            ("a + b", false),
        ];
        for (expr, expected) in cases {
            let tree = parse_py(&format!("x = {}\n", expr));
            let value = first(&tree, NodeKind::Assignment).child(Role::Value).unwrap();
            assert_eq!(is_built_string(value), expected, "{expr}");
        }
    }

    #[test]
    fn test_literal_body() {
        let tree = parse_py("a = ''\nb = r'x'\nc = \"\"\"doc\"\"\"\n");
        let bodies: Vec<_> = tree
            .nodes()
            .filter(|n| n.kind() == NodeKind::StringLiteral)
            .map(literal_body)
            .collect();
        assert_eq!(bodies, vec!["", "x", "doc"]);
    }

    #[test]
    fn test_severity_override_wins_over_escalation() {
        let source = "API_KEY = 'abc'\n";
        let default = testing::check_source(
            Rule::builtin(RuleId::HardcodedSecret, None).unwrap(),
            "t.py",
            source,
        );
        assert_eq!(default[0].severity, Severity::Critical);

        let overridden = testing::check_source(
            Rule::builtin(RuleId::HardcodedSecret, None)
                .unwrap()
                .with_severity(Severity::Info),
            "t.py",
            source,
        );
        assert_eq!(overridden[0].severity, Severity::Info);

        let config = RuleConfig {
            severity: Some(Severity::Warning),
            ..RuleConfig::default()
        };
        let configured = testing::check_source(
            Rule::builtin(RuleId::HardcodedSecret, Some(&config)).unwrap(),
            "t.py",
            source,
        );
        assert_eq!(configured[0].severity, Severity::Warning);
    }

    #[test]
    fn test_builtin_rules_build_with_defaults() {
        for id in RuleId::BUILTIN {
            let rule = Rule::builtin(id, None).unwrap();
            assert_eq!(rule.id(), id);
            assert!(!rule.interests().is_empty());
        }
        assert!(Rule::builtin(RuleId::ParseError, None).is_err());
    }
}
