//! Risk scoring.
//!
//! The deduction weights are a policy choice kept for compatibility
//! with earlier report consumers, not a law; tune them here.

use gossamer_crawler::visit::{Finding, Severity};

pub const MAX_SCORE: u32 = 100;
pub const HIGH_DEDUCTION: u32 = 15;
pub const MEDIUM_DEDUCTION: u32 = 7;
pub const LOW_DEDUCTION: u32 = 3;

/// Aggregate findings into a bounded 0-100 score, higher is safer.
pub fn risk_score(findings: &[Finding]) -> u32 {
    let deductions: u32 = findings
        .iter()
        .map(|f| match f.severity {
            Severity::High => HIGH_DEDUCTION,
            Severity::Medium => MEDIUM_DEDUCTION,
            Severity::Low => LOW_DEDUCTION,
        })
        .sum();
    MAX_SCORE.saturating_sub(deductions)
}

/// Coarse risk bucket for report summaries: any high finding makes
/// the scan high risk, more than two mediums make it medium.
pub fn risk_level(findings: &[Finding]) -> &'static str {
    let highs = findings.iter().filter(|f| f.severity == Severity::High).count();
    let mediums = findings
        .iter()
        .filter(|f| f.severity == Severity::Medium)
        .count();
    if highs > 0 {
        "high"
    } else if mediums > 2 {
        "medium"
    } else {
        "low"
    }
}
