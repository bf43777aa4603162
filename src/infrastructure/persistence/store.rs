//! SQLite store module
//!
//! Durable record of installations, tracked projects, holidays, the audit
//! log, and the risk register. The connection is opened with write-ahead
//! logging so readers never block on the single writer.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::entities::{
    AuditEntry, FieldIdCache, Installation, InstallationSettings, OwnerKind, PlanTier, Project,
    RiskRecord, RiskSeverity, RiskStatus,
};

/// Shared SQLite-backed store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database and prepares the schema
    pub fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let conn = Connection::open(database_path).context("Failed to open SQLite database")?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;        -- Readers never block on the writer
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS installations (
                installation_id INTEGER PRIMARY KEY,
                owner_handle TEXT NOT NULL,
                owner_kind TEXT NOT NULL DEFAULT 'organization',
                plan TEXT NOT NULL DEFAULT 'free',
                sub_status TEXT,
                sub_expires_at TEXT,
                billing_customer_id TEXT,
                billing_subscription_id TEXT,
                encrypted_oauth_token TEXT,
                settings_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                installation_id INTEGER NOT NULL
                    REFERENCES installations(installation_id) ON DELETE CASCADE,
                owner TEXT NOT NULL,
                repo TEXT,
                project_number INTEGER NOT NULL,
                external_project_id TEXT NOT NULL,
                field_start_date TEXT,
                field_target_date TEXT,
                field_actual_end_date TEXT,
                field_baseline_start TEXT,
                field_baseline_target TEXT,
                field_estimate TEXT,
                field_confidence TEXT,
                field_percent_complete TEXT,
                field_status TEXT,
                settings_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                UNIQUE(installation_id, owner, project_number)
            );

            CREATE TABLE IF NOT EXISTS holidays (
                installation_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                name TEXT,
                recurring INTEGER NOT NULL DEFAULT 0,
                UNIQUE(installation_id, date)
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                installation_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                details_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS risks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                installation_id INTEGER NOT NULL,
                project_number INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                severity TEXT NOT NULL DEFAULT 'medium',
                status TEXT NOT NULL DEFAULT 'open',
                owner TEXT,
                linked_issues_json TEXT NOT NULL DEFAULT '[]',
                mitigation_plan TEXT,
                created_at TEXT NOT NULL
            );

            -- Reserved
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                installation_id INTEGER NOT NULL,
                title TEXT,
                content TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_installation
                ON projects(installation_id);
            CREATE INDEX IF NOT EXISTS idx_projects_external_id
                ON projects(external_project_id);
            CREATE INDEX IF NOT EXISTS idx_audit_installation
                ON audit_log(installation_id);
            CREATE INDEX IF NOT EXISTS idx_risks_project
                ON risks(installation_id, project_number);
            "#,
        )?;
        Ok(())
    }

    // ---- installations ----

    pub fn upsert_installation(&self, installation: &Installation) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO installations (
                installation_id, owner_handle, owner_kind, plan, sub_status,
                sub_expires_at, billing_customer_id, billing_subscription_id,
                settings_json, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(installation_id) DO UPDATE SET
                owner_handle = excluded.owner_handle,
                owner_kind = excluded.owner_kind,
                plan = excluded.plan,
                sub_status = excluded.sub_status,
                sub_expires_at = excluded.sub_expires_at,
                billing_customer_id = excluded.billing_customer_id,
                billing_subscription_id = excluded.billing_subscription_id,
                settings_json = excluded.settings_json
            "#,
            params![
                installation.installation_id,
                installation.owner_handle,
                installation.owner_kind.as_str(),
                installation.plan.as_str(),
                installation.sub_status,
                installation.sub_expires_at.map(|ts| ts.to_rfc3339()),
                installation.billing_customer_id,
                installation.billing_subscription_id,
                serde_json::to_string(&installation.settings)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_installation(&self, installation_id: i64) -> Result<Option<Installation>> {
        let conn = self.conn.lock().unwrap();
        let installation = conn
            .query_row(
                r#"
                SELECT installation_id, owner_handle, owner_kind, plan, sub_status,
                       sub_expires_at, billing_customer_id, billing_subscription_id,
                       settings_json
                FROM installations WHERE installation_id = ?1
                "#,
                params![installation_id],
                Self::map_installation,
            )
            .optional()?;
        Ok(installation)
    }

    pub fn find_installation_by_owner(&self, owner_handle: &str) -> Result<Option<Installation>> {
        let conn = self.conn.lock().unwrap();
        let installation = conn
            .query_row(
                r#"
                SELECT installation_id, owner_handle, owner_kind, plan, sub_status,
                       sub_expires_at, billing_customer_id, billing_subscription_id,
                       settings_json
                FROM installations WHERE owner_handle = ?1
                "#,
                params![owner_handle],
                Self::map_installation,
            )
            .optional()?;
        Ok(installation)
    }

    pub fn find_installation_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Installation>> {
        let conn = self.conn.lock().unwrap();
        let installation = conn
            .query_row(
                r#"
                SELECT installation_id, owner_handle, owner_kind, plan, sub_status,
                       sub_expires_at, billing_customer_id, billing_subscription_id,
                       settings_json
                FROM installations WHERE billing_customer_id = ?1
                "#,
                params![customer_id],
                Self::map_installation,
            )
            .optional()?;
        Ok(installation)
    }

    pub fn delete_installation(&self, installation_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM installations WHERE installation_id = ?1",
            params![installation_id],
        )?;
        Ok(())
    }

    pub fn set_plan(
        &self,
        installation_id: i64,
        plan: PlanTier,
        sub_status: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE installations SET plan = ?2, sub_status = ?3 WHERE installation_id = ?1",
            params![installation_id, plan.as_str(), sub_status],
        )?;
        Ok(())
    }

    pub fn set_sub_status(&self, installation_id: i64, sub_status: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE installations SET sub_status = ?2 WHERE installation_id = ?1",
            params![installation_id, sub_status],
        )?;
        Ok(())
    }

    pub fn set_billing_ids(
        &self,
        installation_id: i64,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            UPDATE installations
            SET billing_customer_id = ?2, billing_subscription_id = ?3
            WHERE installation_id = ?1
            "#,
            params![installation_id, customer_id, subscription_id],
        )?;
        Ok(())
    }

    /// Atomic whole-object replacement of the settings blob
    pub fn update_settings(
        &self,
        installation_id: i64,
        settings: &InstallationSettings,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE installations SET settings_json = ?2 WHERE installation_id = ?1",
            params![installation_id, serde_json::to_string(settings)?],
        )?;
        Ok(())
    }

    pub fn set_oauth_token(&self, installation_id: i64, encrypted_token: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE installations SET encrypted_oauth_token = ?2 WHERE installation_id = ?1",
            params![installation_id, encrypted_token],
        )?;
        Ok(())
    }

    pub fn get_oauth_token(&self, installation_id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT encrypted_oauth_token FROM installations WHERE installation_id = ?1",
                params![installation_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(token.flatten())
    }

    fn map_installation(row: &Row) -> rusqlite::Result<Installation> {
        let owner_kind: String = row.get(2)?;
        let plan: String = row.get(3)?;
        let sub_expires_at: Option<String> = row.get(5)?;
        let settings_json: String = row.get(8)?;

        Ok(Installation {
            installation_id: row.get(0)?,
            owner_handle: row.get(1)?,
            owner_kind: OwnerKind::from_str_lossy(&owner_kind),
            plan: PlanTier::from_str_lossy(&plan),
            sub_status: row.get(4)?,
            sub_expires_at: sub_expires_at
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            billing_customer_id: row.get(6)?,
            billing_subscription_id: row.get(7)?,
            settings: serde_json::from_str(&settings_json).unwrap_or_default(),
        })
    }

    // ---- projects ----

    pub fn upsert_project(&self, project: &Project) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO projects (
                installation_id, owner, repo, project_number, external_project_id,
                created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(installation_id, owner, project_number) DO UPDATE SET
                repo = excluded.repo,
                external_project_id = excluded.external_project_id
            "#,
            params![
                project.installation_id,
                project.owner,
                project.repo,
                project.project_number as i64,
                project.external_project_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id: i64 = conn.query_row(
            r#"
            SELECT id FROM projects
            WHERE installation_id = ?1 AND owner = ?2 AND project_number = ?3
            "#,
            params![project.installation_id, project.owner, project.project_number as i64],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn get_project(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
    ) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        let project = conn
            .query_row(
                &format!(
                    "{} WHERE installation_id = ?1 AND owner = ?2 AND project_number = ?3",
                    Self::PROJECT_SELECT
                ),
                params![installation_id, owner, project_number as i64],
                Self::map_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn find_project_by_node_id(&self, external_project_id: &str) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        let project = conn
            .query_row(
                &format!("{} WHERE external_project_id = ?1", Self::PROJECT_SELECT),
                params![external_project_id],
                Self::map_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects_for_installation(&self, installation_id: i64) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE installation_id = ?1 ORDER BY project_number",
            Self::PROJECT_SELECT
        ))?;
        let projects = stmt
            .query_map(params![installation_id], Self::map_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Persists the resolved field-id cache for a project
    pub fn save_field_ids(&self, project_id: i64, fields: &FieldIdCache) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            UPDATE projects SET
                field_start_date = ?2,
                field_target_date = ?3,
                field_actual_end_date = ?4,
                field_baseline_start = ?5,
                field_baseline_target = ?6,
                field_estimate = ?7,
                field_confidence = ?8,
                field_percent_complete = ?9,
                field_status = ?10
            WHERE id = ?1
            "#,
            params![
                project_id,
                fields.start_date,
                fields.target_date,
                fields.actual_end_date,
                fields.baseline_start,
                fields.baseline_target,
                fields.estimate,
                fields.confidence,
                fields.percent_complete,
                fields.status,
            ],
        )?;
        Ok(())
    }

    const PROJECT_SELECT: &'static str = r#"
        SELECT id, installation_id, owner, repo, project_number, external_project_id,
               field_start_date, field_target_date, field_actual_end_date,
               field_baseline_start, field_baseline_target, field_estimate,
               field_confidence, field_percent_complete, field_status
        FROM projects
    "#;

    fn map_project(row: &Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: row.get(0)?,
            installation_id: row.get(1)?,
            owner: row.get(2)?,
            repo: row.get(3)?,
            project_number: row.get::<_, i64>(4)? as u64,
            external_project_id: row.get(5)?,
            field_ids: FieldIdCache {
                start_date: row.get(6)?,
                target_date: row.get(7)?,
                actual_end_date: row.get(8)?,
                baseline_start: row.get(9)?,
                baseline_target: row.get(10)?,
                estimate: row.get(11)?,
                confidence: row.get(12)?,
                percent_complete: row.get(13)?,
                status: row.get(14)?,
            },
        })
    }

    // ---- holidays ----

    pub fn add_holiday(
        &self,
        installation_id: i64,
        date: NaiveDate,
        name: Option<&str>,
        recurring: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO holidays (installation_id, date, name, recurring)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(installation_id, date) DO UPDATE SET
                name = excluded.name,
                recurring = excluded.recurring
            "#,
            params![installation_id, date.to_string(), name, recurring],
        )?;
        Ok(())
    }

    pub fn remove_holiday(&self, installation_id: i64, date: NaiveDate) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM holidays WHERE installation_id = ?1 AND date = ?2",
            params![installation_id, date.to_string()],
        )?;
        Ok(removed > 0)
    }

    /// (date, recurring) pairs for calendar construction
    pub fn list_holidays(&self, installation_id: i64) -> Result<Vec<(NaiveDate, bool)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT date, recurring FROM holidays WHERE installation_id = ?1 ORDER BY date",
        )?;
        let holidays = stmt
            .query_map(params![installation_id], |row| {
                let date: String = row.get(0)?;
                let recurring: bool = row.get(1)?;
                Ok((date, recurring))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .filter_map(|(date, recurring)| date.parse::<NaiveDate>().ok().map(|d| (d, recurring)))
            .collect();
        Ok(holidays)
    }

    // ---- audit log ----

    pub fn record_audit(
        &self,
        installation_id: i64,
        action: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO audit_log (installation_id, action, details_json, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                installation_id,
                action,
                details.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_audit(&self, installation_id: i64, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, installation_id, action, details_json, created_at
            FROM audit_log WHERE installation_id = ?1
            ORDER BY id DESC LIMIT ?2
            "#,
        )?;
        let entries = stmt
            .query_map(params![installation_id, limit as i64], |row| {
                let details_json: String = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    installation_id: row.get(1)?,
                    action: row.get(2)?,
                    details: serde_json::from_str(&details_json)
                        .unwrap_or(serde_json::Value::Null),
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|ts| ts.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    // ---- risk register ----

    pub fn create_risk(&self, risk: &RiskRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO risks (
                installation_id, project_number, title, description, severity,
                status, owner, linked_issues_json, mitigation_plan, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                risk.installation_id,
                risk.project_number as i64,
                risk.title,
                risk.description,
                risk.severity.as_str(),
                risk.status.as_str(),
                risk.owner,
                serde_json::to_string(&risk.linked_issues)?,
                risk.mitigation_plan,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_risks(&self, installation_id: i64, project_number: u64) -> Result<Vec<RiskRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, installation_id, project_number, title, description, severity,
                   status, owner, linked_issues_json, mitigation_plan, created_at
            FROM risks
            WHERE installation_id = ?1 AND project_number = ?2
            ORDER BY id
            "#,
        )?;
        let risks = stmt
            .query_map(params![installation_id, project_number as i64], Self::map_risk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(risks)
    }

    pub fn update_risk_status(&self, risk_id: i64, status: RiskStatus) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE risks SET status = ?2 WHERE id = ?1",
            params![risk_id, status.as_str()],
        )?;
        Ok(updated > 0)
    }

    fn map_risk(row: &Row) -> rusqlite::Result<RiskRecord> {
        let severity: String = row.get(5)?;
        let status: String = row.get(6)?;
        let linked_issues_json: String = row.get(8)?;
        let created_at: String = row.get(10)?;

        Ok(RiskRecord {
            id: row.get(0)?,
            installation_id: row.get(1)?,
            project_number: row.get::<_, i64>(2)? as u64,
            title: row.get(3)?,
            description: row.get(4)?,
            severity: RiskSeverity::from_str_lossy(&severity),
            status: RiskStatus::from_str_lossy(&status),
            owner: row.get(7)?,
            linked_issues: serde_json::from_str(&linked_issues_json).unwrap_or_default(),
            mitigation_plan: row.get(9)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
