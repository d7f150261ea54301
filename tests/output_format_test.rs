//! Tests for the JSON and SARIF report structure.
//!
//! These run the default rules over the testdata fixtures and inspect the
//! serialized reports field by field.

use std::path::PathBuf;

use serde_json::Value;
use smellcheck::config::Config;
use smellcheck::detect::{collect_files, AnalysisResult, RuleRegistry, Runner, Severity};
use smellcheck::report::{json_report, sarif_report, ReportContext};
use smellcheck::score;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_testdata() -> AnalysisResult {
    let config = Config::default();
    let registry = RuleRegistry::from_config(&config).expect("default config is valid");
    let files = collect_files(&testdata_path(), &config).expect("should collect testdata");
    Runner::new(&registry).run(&files)
}

fn json_value(fail_on: Severity) -> (AnalysisResult, Value) {
    let result = run_testdata();
    let risk = score::calculate(&result);
    let path = testdata_path().to_string_lossy().to_string();
    let ctx = ReportContext {
        path: &path,
        config: None,
        fail_on,
    };
    let report = json_report(&ctx, &result, &risk);
    (result, serde_json::to_value(&report).unwrap())
}

#[test]
fn test_json_report_fields() {
    let (result, json) = json_value(Severity::Error);

    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["fail_on"], "error");
    assert_eq!(json["passed"], false);
    assert_eq!(json["files_scanned"], 4);
    assert_eq!(json["files_skipped"], 0);
    assert_eq!(json["suppressed_count"], 0);
    assert!(json.get("config").is_none() || json["config"].is_null());

    let findings = json["findings"].as_array().unwrap();
    assert_eq!(findings.len(), result.findings.len());
    let first = &findings[0];
    for key in [
        "rule",
        "severity",
        "file",
        "line",
        "column",
        "end_line",
        "end_column",
        "message",
    ] {
        assert!(first.get(key).is_some(), "finding is missing {key}");
    }
    assert!(first["line"].as_u64().unwrap() >= 1);
}

#[test]
fn test_json_summary_matches_findings() {
    let (result, json) = json_value(Severity::Error);
    let summary = &json["summary"];
    let total = ["critical", "error", "warning", "info"]
        .iter()
        .map(|k| summary[*k].as_u64().unwrap())
        .sum::<u64>();
    assert_eq!(total as usize, result.findings.len());
    assert!(summary["critical"].as_u64().unwrap() > 0);
}

#[test]
fn test_json_breakdown_and_score() {
    let (_, json) = json_value(Severity::Error);

    let breakdown = json["breakdown"].as_array().unwrap();
    assert!(!breakdown.is_empty());
    let mut points = 0;
    for entry in breakdown {
        assert!(entry["findings"].as_u64().unwrap() > 0);
        points += entry["points"].as_u64().unwrap();
    }
    let score = json["score"].as_u64().unwrap();
    assert_eq!(score, points.min(100));
    // Secrets, sinks and queries alone push the fixtures past the cap
    assert_eq!(json["grade"], "F");
}

#[test]
fn test_passed_depends_only_on_fail_on() {
    let result = run_testdata();
    let path = String::from(".");
    let strict = ReportContext {
        path: &path,
        config: None,
        fail_on: Severity::Info,
    };
    assert!(!strict.passed(&result));

    let empty = AnalysisResult::default();
    assert!(strict.passed(&empty));
}

#[test]
fn test_sarif_structure() {
    let result = run_testdata();
    let sarif = serde_json::to_value(sarif_report(&testdata_path(), &result)).unwrap();

    assert_eq!(sarif["version"], "2.1.0");
    assert!(sarif["$schema"].as_str().unwrap().contains("sarif-schema-2.1.0"));

    let run = &sarif["runs"][0];
    assert_eq!(run["tool"]["driver"]["name"], "smellcheck");

    let results = run["results"].as_array().unwrap();
    assert_eq!(results.len(), result.findings.len());
    for r in results {
        let level = r["level"].as_str().unwrap();
        assert!(["error", "warning", "note"].contains(&level));
        let location = &r["locations"][0]["physicalLocation"];
        let uri = location["artifactLocation"]["uri"].as_str().unwrap();
        assert!(!uri.starts_with('/'), "uri should be relative: {uri}");
        assert!(location["region"]["startLine"].as_u64().unwrap() >= 1);
        assert!(location["region"]["startColumn"].as_u64().unwrap() >= 1);
    }

    // Every result references a listed rule
    let rules: Vec<_> = run["tool"]["driver"]["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    for r in results {
        assert!(rules.contains(&r["ruleId"].as_str().unwrap().to_string()));
    }
}

#[test]
fn test_sarif_rule_metadata() {
    let result = run_testdata();
    let sarif = serde_json::to_value(sarif_report(&testdata_path(), &result)).unwrap();
    let rules = sarif["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();

    let secret = rules
        .iter()
        .find(|r| r["id"] == "hardcoded_secret")
        .expect("hardcoded_secret should be listed");
    assert_eq!(secret["name"], "HardcodedSecret");
    assert_eq!(secret["defaultConfiguration"]["level"], "error");
    assert!(secret["helpUri"].as_str().unwrap().contains("cwe.mitre.org"));

    let parse = rules
        .iter()
        .find(|r| r["id"] == "parse_error")
        .expect("broken.py should produce parse_error");
    assert_eq!(parse["defaultConfiguration"]["level"], "error");
}
