//! Installation entity module
//!
//! This module defines the Installation entity representing one tenant
//! binding of the app, together with its plan tier, billing linkage, and
//! per-installation scheduling settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConfidenceTable, EstimateTable};

/// Kind of account that owns an installation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Organization,
    User,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Organization => "organization",
            OwnerKind::User => "user",
        }
    }

    /// Parses a stored owner-kind string, defaulting to organization
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "user" => OwnerKind::User,
            _ => OwnerKind::Organization,
        }
    }
}

/// Billing plan tier of an installation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

impl PlanTier {
    /// Maximum number of items processed per recalculation, if capped
    pub fn max_tracked_issues(&self) -> Option<usize> {
        match self {
            PlanTier::Free => Some(25),
            PlanTier::Pro => None,
        }
    }

    /// Whether baseline, variance, and custom-holiday features are available
    pub fn allows_baselines(&self) -> bool {
        matches!(self, PlanTier::Pro)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "pro" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }
}

/// Per-installation scheduling settings
///
/// Stored as one JSON blob on the installation row; updates replace the
/// whole object. Absent keys fall back to defaults at the serde layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallationSettings {
    /// Weekday indices treated as weekend (0 = Sunday .. 6 = Saturday)
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<u32>,
    #[serde(default)]
    pub estimate_days: EstimateTable,
    #[serde(default)]
    pub confidence_buffer: ConfidenceTable,
}

fn default_weekend_days() -> Vec<u32> {
    vec![0, 6]
}

impl Default for InstallationSettings {
    fn default() -> Self {
        Self {
            weekend_days: default_weekend_days(),
            estimate_days: EstimateTable::default(),
            confidence_buffer: ConfidenceTable::default(),
        }
    }
}

/// One tenant binding of the app
///
/// Created on the external "installed" notification, deleted on
/// "uninstalled"; the plan tier is mutated by billing events only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    /// Stable numeric id assigned by the upstream service
    pub installation_id: i64,
    pub owner_handle: String,
    pub owner_kind: OwnerKind,
    pub plan: PlanTier,
    /// Billing subscription status ("active", "trialing", "canceled",
    /// "suspended", ...)
    pub sub_status: Option<String>,
    pub sub_expires_at: Option<DateTime<Utc>>,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub settings: InstallationSettings,
}

impl Installation {
    /// Creates a new free-tier installation with default settings
    pub fn new(installation_id: i64, owner_handle: String, owner_kind: OwnerKind) -> Self {
        Self {
            installation_id,
            owner_handle,
            owner_kind,
            plan: PlanTier::Free,
            sub_status: None,
            sub_expires_at: None,
            billing_customer_id: None,
            billing_subscription_id: None,
            settings: InstallationSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_installation_is_free() {
        let inst = Installation::new(42, "acme".to_string(), OwnerKind::Organization);
        assert_eq!(inst.plan, PlanTier::Free);
        assert_eq!(inst.plan.max_tracked_issues(), Some(25));
        assert!(!inst.plan.allows_baselines());
    }

    #[test]
    fn test_pro_plan_is_unbounded() {
        assert_eq!(PlanTier::Pro.max_tracked_issues(), None);
        assert!(PlanTier::Pro.allows_baselines());
    }

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: InstallationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.weekend_days, vec![0, 6]);
    }
}
