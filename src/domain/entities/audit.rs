//! Audit entry entity module

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit-log record: who did what, with structured details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub installation_id: i64,
    /// Action name, e.g. "recalculate", "save_baseline", "installation_created"
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
