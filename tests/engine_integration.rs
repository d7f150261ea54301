//! Integration tests for the full analysis pipeline.
//!
//! These run the default rule set against the testdata fixtures and check
//! that each smell is reported where the fixture plants it.

use std::path::{Path, PathBuf};

use smellcheck::config::{Config, RuleConfig};
use smellcheck::detect::{collect_files, AnalysisResult, Finding, RuleId, RuleRegistry, Runner, Severity};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn fixture(name: &str) -> PathBuf {
    testdata_path().join(name)
}

/// 1-based line of the first occurrence of `needle` in a fixture.
fn line_of(name: &str, needle: &str) -> usize {
    let source = std::fs::read_to_string(fixture(name)).expect("should read fixture");
    source
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i + 1)
        .unwrap_or_else(|| panic!("{:?} not found in {}", needle, name))
}

fn run_with(config: &Config, files: &[PathBuf]) -> AnalysisResult {
    let registry = RuleRegistry::from_config(config).expect("config should build a registry");
    Runner::new(&registry).run(files)
}

fn run_default(name: &str) -> AnalysisResult {
    run_with(&Config::default(), &[fixture(name)])
}

fn of_rule(result: &AnalysisResult, rule: RuleId) -> Vec<&Finding> {
    result.findings.iter().filter(|f| f.rule == rule).collect()
}

fn lines_of(result: &AnalysisResult, rule: RuleId) -> Vec<usize> {
    of_rule(result, rule).iter().map(|f| f.line()).collect()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_python_secrets() {
    let result = run_default("sample.py");
    let secrets = of_rule(&result, RuleId::HardcodedSecret);

    let lines: Vec<_> = secrets.iter().map(|f| f.line()).collect();
    assert!(lines.contains(&line_of("sample.py", "API_SECRET = ")));
    assert!(lines.contains(&line_of("sample.py", "DATABASE_PASSWORD = ")));
    // Module-level UPPER_SNAKE constants are escalated
    assert!(secrets.iter().all(|f| f.severity == Severity::Critical));
}

#[test]
fn test_python_unsafe_sinks() {
    let result = run_default("sample.py");
    let lines = lines_of(&result, RuleId::UnsafeSink);

    assert!(lines.contains(&line_of("sample.py", "subprocess.call(")));
    assert!(lines.contains(&line_of("sample.py", "pickle.loads(")));
    assert!(lines.contains(&line_of("sample.py", "eval(data)")));
}

#[test]
fn test_python_complexity() {
    let result = run_default("sample.py");
    let complex = of_rule(&result, RuleId::Complexity);

    assert_eq!(complex.len(), 1, "{:#?}", complex);
    assert_eq!(complex[0].line(), line_of("sample.py", "def complex_function"));
    assert!(complex[0].message.contains("complex_function"));
    assert_eq!(complex[0].severity, Severity::Warning);
}

#[test]
fn test_python_global_mutation() {
    let result = run_default("sample.py");
    let lines = lines_of(&result, RuleId::GlobalMutation);

    assert!(lines.contains(&line_of("sample.py", "global_counter += 1")));
    assert!(lines.contains(&line_of("sample.py", "global_data[key] = value")));
}

#[test]
fn test_long_parameter_list_threshold() {
    let result = run_default("sample.py");
    let long = of_rule(&result, RuleId::LongParameterList);
    assert_eq!(long.len(), 1);
    assert_eq!(long[0].line(), line_of("sample.py", "def create_user_profile"));
    assert!(long[0].message.contains("15 parameters"));

    let mut config = Config::default();
    config.rules.insert(
        "long_parameter_list".to_string(),
        RuleConfig {
            threshold: Some(20),
            ..RuleConfig::default()
        },
    );
    let result = run_with(&config, &[fixture("sample.py")]);
    assert!(of_rule(&result, RuleId::LongParameterList).is_empty());
}

#[test]
fn test_python_magic_literals() {
    let result = run_default("sample.py");
    let magic = of_rule(&result, RuleId::MagicLiteral);

    let comparison = line_of("sample.py", "if income > 100000");
    assert!(magic
        .iter()
        .any(|f| f.line() == comparison && f.message.contains("100000")));
    assert!(magic.iter().all(|f| f.severity == Severity::Info));
}

#[test]
fn test_python_unused_bindings() {
    let result = run_default("sample.py");
    let unused = of_rule(&result, RuleId::UnusedBinding);
    let messages: Vec<_> = unused.iter().map(|f| f.message.as_str()).collect();

    assert!(messages.contains(&"variable 'unused_var' is never used"));
    assert!(messages.contains(&"variable 'another_unused' is never used"));
    assert!(messages.contains(&"import 'json' is never used"));
    assert!(!messages.iter().any(|m| m.contains("'used_var'")));
}

#[test]
fn test_python_weak_randomness() {
    let result = run_default("sample.py");
    let weak = of_rule(&result, RuleId::WeakRandomness);

    assert_eq!(weak.len(), 1);
    assert_eq!(weak[0].line(), line_of("sample.py", "random.randint(1000, 9999)"));
    assert!(weak[0].message.contains("generate_token"));
}

#[test]
fn test_python_string_built_query() {
    let result = run_default("sample.py");
    let lines = lines_of(&result, RuleId::StringBuiltQuery);

    assert_eq!(lines, vec![line_of("sample.py", "SELECT * FROM users")]);
}

#[test]
fn test_python_duplicate_block() {
    let result = run_default("sample.py");
    let dups = of_rule(&result, RuleId::DuplicateBlock);

    let admin = line_of("sample.py", "def process_admin_data");
    let user = line_of("sample.py", "def process_user_data");
    assert!(
        dups.iter().any(|f| {
            (admin..=admin + 1).contains(&f.line())
                && (f.message.contains(&format!("line {}", user))
                    || f.message.contains(&format!("line {}", user + 1)))
        }),
        "{:#?}",
        dups
    );
}

#[test]
fn test_javascript_sample() {
    let result = run_default("sample.js");

    let secrets = of_rule(&result, RuleId::HardcodedSecret);
    let severities: Vec<_> = secrets.iter().map(|f| (f.line(), f.severity)).collect();
    assert_eq!(
        severities,
        vec![
            (line_of("sample.js", "const API_KEY"), Severity::Critical),
            (line_of("sample.js", "const password"), Severity::Error),
        ]
    );

    assert_eq!(
        lines_of(&result, RuleId::UnsafeSink),
        vec![line_of("sample.js", "return eval(userInput)")]
    );
    assert_eq!(
        lines_of(&result, RuleId::LongParameterList),
        vec![line_of("sample.js", "function createUser")]
    );
    assert_eq!(
        lines_of(&result, RuleId::StringBuiltQuery),
        vec![line_of("sample.js", "db.query(")]
    );
    assert_eq!(
        lines_of(&result, RuleId::WeakRandomness),
        vec![line_of("sample.js", "Math.random()")]
    );

    let unused: Vec<_> = of_rule(&result, RuleId::UnusedBinding)
        .iter()
        .map(|f| f.message.clone())
        .collect();
    assert!(unused.contains(&"variable 'unused' is never used".to_string()));
    assert!(unused.contains(&"variable 'alsoUnused' is never used".to_string()));

    assert!(!of_rule(&result, RuleId::DuplicateBlock).is_empty());
}

#[test]
fn test_clean_file_has_no_findings() {
    let result = run_default("clean.py");
    assert!(result.findings.is_empty(), "{:#?}", result.findings);
    assert_eq!(result.scanned, 1);
}

#[test]
fn test_broken_file_yields_single_parse_error() {
    let result = run_default("broken.py");

    assert_eq!(result.findings.len(), 1, "{:#?}", result.findings);
    let finding = &result.findings[0];
    assert_eq!(finding.rule, RuleId::ParseError);
    assert_eq!(finding.severity, Severity::Error);
    // The secret on line 1 is not reported: rules are skipped entirely
    assert!(finding.file.ends_with("broken.py"));
}

#[test]
fn test_runs_are_deterministic() {
    let files = collect_files(&testdata_path(), &Config::default()).unwrap();
    let first = serde_json::to_string(&run_with(&Config::default(), &files)).unwrap();
    let second = serde_json::to_string(&run_with(&Config::default(), &files)).unwrap();
    assert_eq!(first, second);

    let reversed: Vec<_> = files.iter().rev().cloned().collect();
    let third = serde_json::to_string(&run_with(&Config::default(), &reversed)).unwrap();
    assert_eq!(first, third);
}

#[test]
fn test_findings_are_ordered() {
    let files = collect_files(&testdata_path(), &Config::default()).unwrap();
    let result = run_with(&Config::default(), &files);
    let keys: Vec<_> = result
        .findings
        .iter()
        .map(|f| (f.file.clone(), f.line(), f.column()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_disabling_a_rule_removes_only_its_findings() {
    let files = vec![fixture("sample.py"), fixture("sample.js")];
    let full = run_with(&Config::default(), &files);

    for id in RuleId::BUILTIN {
        let mut config = Config::default();
        config.rules.insert(
            id.as_str().to_string(),
            RuleConfig {
                enabled: false,
                ..RuleConfig::default()
            },
        );
        let partial = run_with(&config, &files);

        let expected: Vec<_> = full.findings.iter().filter(|f| f.rule != id).collect();
        let actual: Vec<_> = partial.findings.iter().collect();
        assert_eq!(actual, expected, "disabling {}", id.as_str());
    }
}

#[test]
fn test_safe_patterns_are_not_flagged() {
    let temp = TempDir::new().unwrap();
    let file = write(
        temp.path(),
        "safe.py",
        r#"import os
import subprocess

API_SECRET = os.environ["API_SECRET"]
DB_PASSWORD = os.getenv("DB_PASSWORD")


def listing():
    return subprocess.call(["ls", "-la"])


def fixed():
    return subprocess.call("ls -la", shell=True)
"#,
    );
    let result = run_with(&Config::default(), &[file]);
    assert!(of_rule(&result, RuleId::HardcodedSecret).is_empty());
    assert!(of_rule(&result, RuleId::UnsafeSink).is_empty());
}

#[test]
fn test_config_file_overrides() {
    let config = Config::load(fixture("smellcheck.yaml")).unwrap();
    assert_eq!(config.fail_on, Severity::Critical);

    let result = run_with(&config, &[fixture("sample.py")]);
    assert!(of_rule(&result, RuleId::MagicLiteral).is_empty());
    assert!(of_rule(&result, RuleId::LongParameterList).is_empty());

    // A configured severity is final, even for UPPER_SNAKE constants
    let secrets = of_rule(&result, RuleId::HardcodedSecret);
    assert!(!secrets.is_empty());
    assert!(secrets.iter().all(|f| f.severity == Severity::Warning));
}

#[test]
fn test_inline_suppression_in_file() {
    let temp = TempDir::new().unwrap();
    let file = write(
        temp.path(),
        "app.py",
        "# smellcheck:ignore-next-line hardcoded_secret - test fixture\nAPI_KEY = \"abc123\"\nAUTH_TOKEN = \"def456\"\n",
    );
    let result = run_with(&Config::default(), &[file]);

    assert_eq!(lines_of(&result, RuleId::HardcodedSecret), vec![3]);
    assert_eq!(result.suppressed.len(), 1);
    assert_eq!(result.suppressed[0].finding.line(), 2);
    assert_eq!(result.suppressed[0].reason.as_deref(), Some("test fixture"));
}

#[test]
fn test_typescript_file() {
    let temp = TempDir::new().unwrap();
    let file = write(
        temp.path(),
        "client.ts",
        "const API_TOKEN: string = 'abcdef123456';\n\nexport function run(cmd: string): unknown {\n    return eval(cmd);\n}\n",
    );
    let result = run_with(&Config::default(), &[file]);

    assert_eq!(lines_of(&result, RuleId::HardcodedSecret), vec![1]);
    assert_eq!(lines_of(&result, RuleId::UnsafeSink), vec![4]);
}

#[test]
fn test_finding_spans_stay_in_bounds() {
    let config = Config::default();
    let files = collect_files(&testdata_path(), &config).unwrap();
    let result = run_with(&config, &files);
    assert!(!result.findings.is_empty());

    for finding in &result.findings {
        let source = std::fs::read_to_string(&finding.file).unwrap();
        let span = finding.span;
        assert!(span.within(source.len()), "{:?}", finding);
        assert!(span.start_line >= 1 && span.start_col >= 1, "{:?}", finding);
        assert!(span.end_line <= source.lines().count() + 1, "{:?}", finding);
        assert!(
            (span.start_line, span.start_col) <= (span.end_line, span.end_col),
            "{:?}",
            finding
        );
    }
}
