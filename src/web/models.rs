use serde::{Deserialize, Serialize};

use crate::domain::entities::{RiskSeverity, RiskStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateRequest {
    pub owner: String,
    pub project_number: u64,
    #[serde(default)]
    pub setup_fields: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBaselineRequest {
    pub owner: String,
    pub project_number: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceQuery {
    pub owner: String,
    pub project_number: u64,
}

/// Owner disambiguation for project-scoped GET routes
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectQuery {
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProjectRequest {
    pub owner: String,
    pub project_number: u64,
    /// External project node id
    pub project_id: String,
    pub repo: Option<String>,
    #[serde(default)]
    pub setup_fields: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRiskRequest {
    pub title: String,
    pub description: Option<String>,
    pub severity: RiskSeverity,
    pub owner: Option<String>,
    #[serde(default)]
    pub linked_issues: Vec<u64>,
    pub mitigation_plan: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRiskStatusRequest {
    pub status: RiskStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HolidayRequest {
    pub date: chrono::NaiveDate,
    pub name: Option<String>,
    #[serde(default)]
    pub recurring: bool,
}
