//! Risk register entity module
//!
//! Manually-managed risk register entries, persisted per project. These are
//! distinct from the computed per-item risk assessments produced by the risk
//! scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a registered risk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskSeverity::Critical => "critical",
            RiskSeverity::High => "high",
            RiskSeverity::Medium => "medium",
            RiskSeverity::Low => "low",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "critical" => RiskSeverity::Critical,
            "high" => RiskSeverity::High,
            "low" => RiskSeverity::Low,
            _ => RiskSeverity::Medium,
        }
    }
}

/// Lifecycle status of a registered risk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Open,
    Mitigated,
    Closed,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Open => "open",
            RiskStatus::Mitigated => "mitigated",
            RiskStatus::Closed => "closed",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "mitigated" => RiskStatus::Mitigated,
            "closed" => RiskStatus::Closed,
            _ => RiskStatus::Open,
        }
    }
}

/// One registered risk on a tracked project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecord {
    pub id: i64,
    pub installation_id: i64,
    pub project_number: u64,
    pub title: String,
    pub description: Option<String>,
    pub severity: RiskSeverity,
    pub status: RiskStatus,
    pub owner: Option<String>,
    /// Issue numbers this risk is linked to
    pub linked_issues: Vec<u64>,
    pub mitigation_plan: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_roundtrip() {
        for sev in [
            RiskSeverity::Critical,
            RiskSeverity::High,
            RiskSeverity::Medium,
            RiskSeverity::Low,
        ] {
            assert_eq!(RiskSeverity::from_str_lossy(sev.as_str()), sev);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_open() {
        assert_eq!(RiskStatus::from_str_lossy("wat"), RiskStatus::Open);
    }
}
