//! Project entity module
//!
//! This module defines the Project entity (one tracked project belonging to
//! an installation) and the cache of upstream field identifiers for the nine
//! logical fields the engine reads and writes.

use serde::{Deserialize, Serialize};

/// The nine logical fields the engine binds to upstream project fields
///
/// Binding is by display name, case-sensitive on read. Renaming a field
/// upstream silently breaks the binding (known limitation).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogicalField {
    StartDate,
    TargetDate,
    ActualEndDate,
    BaselineStart,
    BaselineTarget,
    Estimate,
    Confidence,
    PercentComplete,
    Status,
}

impl LogicalField {
    pub const ALL: [LogicalField; 9] = [
        LogicalField::StartDate,
        LogicalField::TargetDate,
        LogicalField::ActualEndDate,
        LogicalField::BaselineStart,
        LogicalField::BaselineTarget,
        LogicalField::Estimate,
        LogicalField::Confidence,
        LogicalField::PercentComplete,
        LogicalField::Status,
    ];

    /// Upstream display name used for field-value extraction
    pub fn display_name(&self) -> &'static str {
        match self {
            LogicalField::StartDate => "Start Date",
            LogicalField::TargetDate => "Target Date",
            LogicalField::ActualEndDate => "Actual End Date",
            LogicalField::BaselineStart => "Baseline Start",
            LogicalField::BaselineTarget => "Baseline Target",
            LogicalField::Estimate => "Estimate",
            LogicalField::Confidence => "Confidence",
            LogicalField::PercentComplete => "Percent Complete",
            LogicalField::Status => "Status",
        }
    }

    /// Whether the auto-creation path only provisions this field on Pro
    pub fn is_pro_only(&self) -> bool {
        matches!(
            self,
            LogicalField::BaselineStart | LogicalField::BaselineTarget | LogicalField::Confidence
        )
    }
}

/// Cached upstream ids for the nine logical fields
///
/// Populated lazily from field introspection and refreshed on miss.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldIdCache {
    pub start_date: Option<String>,
    pub target_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub baseline_start: Option<String>,
    pub baseline_target: Option<String>,
    pub estimate: Option<String>,
    pub confidence: Option<String>,
    pub percent_complete: Option<String>,
    pub status: Option<String>,
}

impl FieldIdCache {
    pub fn get(&self, field: LogicalField) -> Option<&str> {
        match field {
            LogicalField::StartDate => self.start_date.as_deref(),
            LogicalField::TargetDate => self.target_date.as_deref(),
            LogicalField::ActualEndDate => self.actual_end_date.as_deref(),
            LogicalField::BaselineStart => self.baseline_start.as_deref(),
            LogicalField::BaselineTarget => self.baseline_target.as_deref(),
            LogicalField::Estimate => self.estimate.as_deref(),
            LogicalField::Confidence => self.confidence.as_deref(),
            LogicalField::PercentComplete => self.percent_complete.as_deref(),
            LogicalField::Status => self.status.as_deref(),
        }
    }

    pub fn set(&mut self, field: LogicalField, id: String) {
        let slot = match field {
            LogicalField::StartDate => &mut self.start_date,
            LogicalField::TargetDate => &mut self.target_date,
            LogicalField::ActualEndDate => &mut self.actual_end_date,
            LogicalField::BaselineStart => &mut self.baseline_start,
            LogicalField::BaselineTarget => &mut self.baseline_target,
            LogicalField::Estimate => &mut self.estimate,
            LogicalField::Confidence => &mut self.confidence,
            LogicalField::PercentComplete => &mut self.percent_complete,
            LogicalField::Status => &mut self.status,
        };
        *slot = Some(id);
    }

    /// Whether every field the engine writes has a cached id
    pub fn is_complete(&self) -> bool {
        LogicalField::ALL.iter().all(|f| self.get(*f).is_some())
    }
}

/// One tracked project belonging to an installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Local row id
    pub id: i64,
    pub installation_id: i64,
    pub owner: String,
    pub repo: Option<String>,
    pub project_number: u64,
    /// External project node id (webhook lookup key)
    pub external_project_id: String,
    pub field_ids: FieldIdCache,
}

impl Project {
    pub fn new(
        installation_id: i64,
        owner: String,
        project_number: u64,
        external_project_id: String,
    ) -> Self {
        Self {
            id: 0,
            installation_id,
            owner,
            repo: None,
            project_number,
            external_project_id,
            field_ids: FieldIdCache::default(),
        }
    }
}
