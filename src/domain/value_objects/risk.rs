//! Risk value objects module
//!
//! Weighted risk findings, the categorical risk level derived from a score,
//! and the per-item risk assessment produced by the risk scorer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One weighted finding contributing to an item's risk score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RiskFinding {
    Overdue,
    ApproachingDeadline,
    LowConfidence,
    NoEstimate,
    NoTargetDate,
    Blocked,
    BehindBaseline,
    NoStartDate,
}

impl RiskFinding {
    /// Score contribution of this finding
    pub fn weight(&self) -> u32 {
        match self {
            RiskFinding::Overdue => 35,
            RiskFinding::ApproachingDeadline => 20,
            RiskFinding::LowConfidence => 15,
            RiskFinding::NoEstimate => 10,
            RiskFinding::NoTargetDate => 10,
            RiskFinding::Blocked => 15,
            RiskFinding::BehindBaseline => 15,
            RiskFinding::NoStartDate => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFinding::Overdue => "overdue",
            RiskFinding::ApproachingDeadline => "approachingDeadline",
            RiskFinding::LowConfidence => "lowConfidence",
            RiskFinding::NoEstimate => "noEstimate",
            RiskFinding::NoTargetDate => "noTargetDate",
            RiskFinding::Blocked => "blocked",
            RiskFinding::BehindBaseline => "behindBaseline",
            RiskFinding::NoStartDate => "noStartDate",
        }
    }

    pub const ALL: [RiskFinding; 8] = [
        RiskFinding::Overdue,
        RiskFinding::ApproachingDeadline,
        RiskFinding::LowConfidence,
        RiskFinding::NoEstimate,
        RiskFinding::NoTargetDate,
        RiskFinding::Blocked,
        RiskFinding::BehindBaseline,
        RiskFinding::NoStartDate,
    ];
}

/// Categorical risk level derived from a summed score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Level thresholds: critical >= 50, high >= 30, medium >= 15, low >= 1
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 50 => RiskLevel::Critical,
            s if s >= 30 => RiskLevel::High,
            s if s >= 15 => RiskLevel::Medium,
            s if s >= 1 => RiskLevel::Low,
            _ => RiskLevel::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk assessment of one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub number: u64,
    pub title: String,
    pub score: u32,
    pub level: RiskLevel,
    pub findings: Vec<RiskFinding>,
}

impl RiskAssessment {
    /// Builds an assessment from a set of findings, summing their weights
    pub fn from_findings(number: u64, title: String, findings: Vec<RiskFinding>) -> Self {
        let score = findings.iter().map(|f| f.weight()).sum();
        Self {
            number,
            title,
            score,
            level: RiskLevel::from_score(score),
            findings,
        }
    }

    /// Assessment of a completed item: score 0, no findings
    pub fn completed(number: u64, title: String) -> Self {
        Self {
            number,
            title,
            score: 0,
            level: RiskLevel::None,
            findings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::None);
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(14), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(15), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(49), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::Critical);
    }

    #[test]
    fn test_assessment_sums_weights() {
        let assessment = RiskAssessment::from_findings(
            7,
            "Ship it".to_string(),
            vec![
                RiskFinding::Overdue,
                RiskFinding::LowConfidence,
                RiskFinding::NoEstimate,
            ],
        );
        assert_eq!(assessment.score, 60);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn test_completed_assessment_is_clean() {
        let assessment = RiskAssessment::completed(3, "Done item".to_string());
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::None);
        assert!(assessment.findings.is_empty());
    }
}
