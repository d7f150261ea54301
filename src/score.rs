//! Risk score and grade for an analysis result.
//!
//! The score (0-100) summarizes how many findings a run produced, weighted
//! by severity. It is informational: the exit code depends only on
//! `fail_on`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::{AnalysisResult, Severity};

/// Point weights per finding severity.
pub mod points {
    pub const CRITICAL: u32 = 10;
    pub const ERROR: u32 = 7;
    pub const WARNING: u32 = 4;
    pub const INFO: u32 = 1;
}

/// Grade thresholds.
pub mod grades {
    pub const A_MAX: u32 = 10;
    pub const B_MAX: u32 = 25;
    pub const C_MAX: u32 = 50;
    pub const D_MAX: u32 = 75;
}

pub const MAX_SCORE: u32 = 100;

/// The calculated risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Score from 0-100, higher = riskier
    pub score: u32,
    /// Letter grade: "A" (0-10), "B" (11-25), "C" (26-50), "D" (51-75), "F" (76-100)
    pub grade: String,
    /// Points by rule id, before capping
    pub breakdown: BTreeMap<String, u32>,
}

impl RiskScore {
    /// Total points before capping at 100.
    pub fn total_points(&self) -> u32 {
        self.breakdown.values().sum()
    }
}

pub fn points_for(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => points::CRITICAL,
        Severity::Error => points::ERROR,
        Severity::Warning => points::WARNING,
        Severity::Info => points::INFO,
    }
}

fn calculate_grade(score: u32) -> String {
    match score {
        s if s <= grades::A_MAX => "A".to_string(),
        s if s <= grades::B_MAX => "B".to_string(),
        s if s <= grades::C_MAX => "C".to_string(),
        s if s <= grades::D_MAX => "D".to_string(),
        _ => "F".to_string(),
    }
}

/// Score the active findings of `result`. Suppressed findings do not count.
pub fn calculate(result: &AnalysisResult) -> RiskScore {
    let mut breakdown: BTreeMap<String, u32> = BTreeMap::new();
    for finding in &result.findings {
        *breakdown.entry(finding.rule.as_str().to_string()).or_insert(0) +=
            points_for(finding.severity);
    }
    let score = breakdown.values().sum::<u32>().min(MAX_SCORE);

    RiskScore {
        score,
        grade: calculate_grade(score),
        breakdown,
    }
}
