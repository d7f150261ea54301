//! Unsafe sinks: shell execution, deserialization, dynamic evaluation,
//! markup injection, pattern construction, prototype mutation, temporary
//! files and secrets written to logs.

use globset::GlobSet;

use crate::detect::Severity;
use crate::error::{ConfigError, RuleError};
use crate::tree::{NodeKind, NodeRef, Role};

use super::{
    callee_name, first_argument, is_built_value, is_interpolated, literal_body,
    name_patterns, resolved_callee_path, unwrap_parens, Hit, Interest, Visit,
};
const PYTHON_SHELL: &[&str] = &[
    "os.system",
    "os.popen",
    "subprocess.call",
    "subprocess.run",
    "subprocess.Popen",
    "subprocess.check_call",
    "subprocess.check_output",
    "subprocess.getoutput",
    "subprocess.getstatusoutput",
];

const PYTHON_DESERIALIZE: &[&str] = &[
    "pickle.load",
    "pickle.loads",
    "cPickle.load",
    "cPickle.loads",
    "dill.load",
    "dill.loads",
    "marshal.load",
    "marshal.loads",
    "shelve.open",
    "jsonpickle.decode",
    "yaml.unsafe_load",
    "yaml.load",
];

const PYTHON_EVAL: &[&str] = &["eval", "exec"];

const JS_SHELL: &[&str] = &[
    "exec",
    "execSync",
    "child_process.exec",
    "child_process.execSync",
];

const JS_DESERIALIZE: &[&str] = &["unserialize", "serialize.unserialize"];

const JS_EVAL: &[&str] = &[
    "eval",
    "Function",
    "vm.runInThisContext",
    "vm.runInNewContext",
];

const JS_MARKUP_CALLS: &[&str] = &["document.write", "document.writeln"];

const MARKUP_PROPERTIES: &[&str] = &["innerHTML", "outerHTML"];

const PYTHON_PATTERN: &[&str] = &["re.compile"];

const JS_PATTERN: &[&str] = &["RegExp"];

const PYTHON_TEMP_NAMES: &[&str] = &["tempfile.mktemp", "os.tempnam", "os.tmpnam"];

const PYTHON_FILE_OPEN: &[&str] = &["open", "os.open", "io.open"];

const JS_FILE_OPEN: &[&str] = &[
    "fs.open",
    "fs.openSync",
    "fs.writeFile",
    "fs.writeFileSync",
    "fs.createWriteStream",
];

const LOG_RECEIVERS: &[&str] = &["logging", "logger", "log", "console"];

const LOG_METHODS: &[&str] = &[
    "debug",
    "info",
    "log",
    "warn",
    "warning",
    "error",
    "critical",
    "exception",
    "trace",
];

/// Names whose values must not reach log output.
const DISCLOSED_NAMES: &[&str] = &[
    "*password*",
    "*passwd*",
    "*secret*",
    "*token*",
    "*api_key*",
    "*apikey*",
    "*private_key*",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkClass {
    Shell,
    Deserialization,
    Evaluation,
    Markup,
    Pattern,
    Prototype,
    TempFile,
    Disclosure,
}

impl SinkClass {
    fn as_str(&self) -> &'static str {
        match self {
            SinkClass::Shell => "shell execution",
            SinkClass::Deserialization => "deserialization",
            SinkClass::Evaluation => "dynamic evaluation",
            SinkClass::Markup => "markup injection",
            SinkClass::Pattern => "pattern construction",
            SinkClass::Prototype => "prototype mutation",
            SinkClass::TempFile => "temporary file",
            SinkClass::Disclosure => "secret disclosure",
        }
    }

    fn cwe(&self) -> &'static str {
        match self {
            SinkClass::Shell => "CWE-78",
            SinkClass::Deserialization => "CWE-502",
            SinkClass::Evaluation => "CWE-94",
            SinkClass::Markup => "CWE-79",
            SinkClass::Pattern => "CWE-1333",
            SinkClass::Prototype => "CWE-1321",
            SinkClass::TempFile => "CWE-377",
            SinkClass::Disclosure => "CWE-532",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            SinkClass::Shell => "pass the command as an argument list instead of a built shell string",
            SinkClass::Deserialization => "use a data-only format such as JSON for untrusted input",
            SinkClass::Evaluation => "parse the input instead of executing it",
            SinkClass::Markup => "escape the value or assign textContent instead",
            SinkClass::Pattern => "escape the input before building a pattern from it",
            SinkClass::Prototype => "use Object.create(null) or a Map for keyed data",
            SinkClass::TempFile => "use tempfile.mkstemp or tempfile.NamedTemporaryFile",
            SinkClass::Disclosure => "keep secrets out of log and console output",
        }
    }

    /// Default severity; `None` keeps the rule's.
    fn severity(&self) -> Option<Severity> {
        match self {
            SinkClass::Shell | SinkClass::Deserialization | SinkClass::Evaluation => None,
            SinkClass::Markup | SinkClass::Prototype | SinkClass::Disclosure => Some(Severity::Error),
            SinkClass::Pattern | SinkClass::TempFile => Some(Severity::Warning),
        }
    }

    fn hit(&self, node: NodeRef<'_>, sink: impl ToString) -> Hit {
        let hit = Hit::at(node)
            .arg("class", self.as_str())
            .arg("sink", sink)
            .cwe(self.cwe())
            .suggestion(self.suggestion());
        match self.severity() {
            Some(severity) => hit.severity(severity),
            None => hit,
        }
    }
}

#[derive(Debug)]
pub struct UnsafeSink {
    /// Extra callee paths treated as shell sinks.
    extra: Vec<String>,
    disclosed: GlobSet,
}

impl UnsafeSink {
    pub const INTERESTS: &'static [Interest] = &[
        Interest::exit(NodeKind::Call),
        Interest::exit(NodeKind::Assignment),
        Interest::exit(NodeKind::AugAssignment),
    ];

    pub fn new(extra: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            extra: extra.to_vec(),
            disclosed: name_patterns(DISCLOSED_NAMES)?,
        })
    }

    pub fn check(&self, node: NodeRef<'_>, _visit: Visit, out: &mut Vec<Hit>) -> Result<(), RuleError> {
        match node.kind() {
            NodeKind::Call => self.check_call(node, out),
            NodeKind::Assignment | NodeKind::AugAssignment => check_assignment(node, out),
            _ => {}
        }
        Ok(())
    }

    fn check_call(&self, node: NodeRef<'_>, out: &mut Vec<Hit>) {
        let python = node.tree().language() == "python";
        let Some(path) = resolved_callee_path(node) else {
            // `$(el).html(...)` has no dotted path
            if !python && callee_name(node) == Some("html") && built_first_argument(node) {
                out.push(SinkClass::Markup.hit(node, "html"));
            }
            return;
        };

        let flagged = if python {
            self.python_call(node, &path)
        } else {
            self.js_call(node, &path)
        };
        if let Some(class) = flagged {
            out.push(class.hit(node, path));
        } else if is_log_call(python, &path) && self.discloses(node) {
            out.push(SinkClass::Disclosure.hit(node, path));
        }
    }

    fn python_call(&self, node: NodeRef<'_>, path: &str) -> Option<SinkClass> {
        if PYTHON_SHELL.contains(&path) || self.is_extra(path) {
            return built_first_argument(node).then_some(SinkClass::Shell);
        }
        if PYTHON_DESERIALIZE.contains(&path) {
            let safe = path == "yaml.load" && uses_safe_loader(node);
            return (!safe).then_some(SinkClass::Deserialization);
        }
        if PYTHON_EVAL.contains(&path) {
            return Some(SinkClass::Evaluation);
        }
        if PYTHON_PATTERN.contains(&path) {
            return built_first_argument(node).then_some(SinkClass::Pattern);
        }
        if PYTHON_TEMP_NAMES.contains(&path) {
            return Some(SinkClass::TempFile);
        }
        if PYTHON_FILE_OPEN.contains(&path) {
            return opens_shared_tmp(node).then_some(SinkClass::TempFile);
        }
        None
    }

    fn js_call(&self, node: NodeRef<'_>, path: &str) -> Option<SinkClass> {
        if JS_SHELL.contains(&path) || self.is_extra(path) {
            return built_first_argument(node).then_some(SinkClass::Shell);
        }
        if JS_DESERIALIZE.contains(&path) {
            return Some(SinkClass::Deserialization);
        }
        if JS_EVAL.contains(&path) {
            return Some(SinkClass::Evaluation);
        }
        if JS_MARKUP_CALLS.contains(&path) {
            return (!constant_first_argument(node)).then_some(SinkClass::Markup);
        }
        if JS_PATTERN.contains(&path) {
            return built_first_argument(node).then_some(SinkClass::Pattern);
        }
        if JS_FILE_OPEN.contains(&path) {
            return opens_shared_tmp(node).then_some(SinkClass::TempFile);
        }
        if callee_name(node) == Some("html") && built_first_argument(node) {
            return Some(SinkClass::Markup);
        }
        None
    }

    fn is_extra(&self, path: &str) -> bool {
        self.extra.iter().any(|e| e == path)
    }

    /// Whether any name passed to the call looks like a secret.
    fn discloses(&self, call: NodeRef<'_>) -> bool {
        let Some(args) = call.child(Role::Arguments) else {
            return false;
        };
        args.descendants()
            .filter(|n| matches!(n.kind(), NodeKind::Identifier | NodeKind::Property))
            .any(|n| self.disclosed.is_match(n.text()))
    }
}

/// Markup sinks and prototype writes reached through assignment.
fn check_assignment(node: NodeRef<'_>, out: &mut Vec<Hit>) {
    if node.tree().language() == "python" {
        return;
    }
    let Some(target) = node.child(Role::Target).map(unwrap_parens) else {
        return;
    };

    if let Some(root) = prototype_root(target) {
        out.push(SinkClass::Prototype.hit(node, root));
        return;
    }

    let property = match target.kind() {
        NodeKind::Attribute => target.child(Role::Property).map(|p| p.text()),
        _ => None,
    };
    let Some(property) = property.filter(|p| MARKUP_PROPERTIES.contains(p)) else {
        return;
    };
    let dynamic = node.child(Role::Value).is_some_and(|value| {
        if node.kind() == NodeKind::AugAssignment {
            !is_constant_string(value)
        } else {
            is_built_value(value)
        }
    });
    if dynamic {
        out.push(SinkClass::Markup.hit(node, property));
    }
}

/// The prototype reached by a member chain being written, if any:
/// `__proto__`, `Object.prototype` or `constructor.prototype`.
fn prototype_root(target: NodeRef<'_>) -> Option<&'static str> {
    let mut node = target;
    loop {
        match node.kind() {
            NodeKind::Attribute => {
                let property = node.child(Role::Property).map(|p| p.text());
                let object = node.child(Role::Object).map(unwrap_parens);
                match property {
                    Some("__proto__") => return Some("__proto__"),
                    Some("prototype") => {
                        if object.is_some_and(|o| o.kind() == NodeKind::Identifier && o.text() == "Object") {
                            return Some("Object.prototype");
                        }
                        let via_constructor = object.is_some_and(|o| {
                            o.text() == "constructor"
                                || (o.kind() == NodeKind::Attribute
                                    && o.child(Role::Property).is_some_and(|p| p.text() == "constructor"))
                        });
                        if via_constructor {
                            return Some("constructor.prototype");
                        }
                    }
                    _ => {}
                }
            }
            NodeKind::Subscript => {
                let key = node.child(Role::Index).map(unwrap_parens);
                if key.is_some_and(|k| k.kind() == NodeKind::StringLiteral && literal_body(k) == "__proto__") {
                    return Some("__proto__");
                }
            }
            _ => return None,
        }
        node = node.child(Role::Object)?;
    }
}

fn built_first_argument(call: NodeRef<'_>) -> bool {
    first_argument(call).is_some_and(is_built_value)
}

fn is_constant_string(node: NodeRef<'_>) -> bool {
    let node = unwrap_parens(node);
    node.kind() == NodeKind::StringLiteral && !is_interpolated(node)
}

/// `document.write("<hr>")` writes fixed markup.
fn constant_first_argument(call: NodeRef<'_>) -> bool {
    first_argument(call).is_some_and(is_constant_string)
}

/// A file opened at a fixed path under the shared `/tmp` directory.
fn opens_shared_tmp(call: NodeRef<'_>) -> bool {
    first_argument(call)
        .map(unwrap_parens)
        .is_some_and(|a| a.kind() == NodeKind::StringLiteral && literal_body(a).starts_with("/tmp/"))
}

/// `print(...)`, `logging.info(...)`, `logger.debug(...)`, `console.log(...)`.
fn is_log_call(python: bool, path: &str) -> bool {
    if python && path == "print" {
        return true;
    }
    let Some((receiver, method)) = path.rsplit_once('.') else {
        return false;
    };
    let receiver = receiver.rsplit('.').next().unwrap_or(receiver);
    LOG_RECEIVERS.contains(&receiver) && LOG_METHODS.contains(&method)
}

/// `yaml.load(data, Loader=yaml.SafeLoader)` is safe.
fn uses_safe_loader(call: NodeRef<'_>) -> bool {
    call.child(Role::Arguments)
        .into_iter()
        .flat_map(|args| args.children())
        .filter(|a| a.kind() == NodeKind::KeywordArgument)
        .any(|kw| {
            let is_loader = kw
                .child_of_kind(NodeKind::KeywordName)
                .map(|n| n.text() == "Loader")
                .unwrap_or(false);
            let safe = kw
                .child(Role::Value)
                .map(|v| v.text().contains("Safe"))
                .unwrap_or(false);
            is_loader && safe
        })
}
