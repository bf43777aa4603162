//! Schedule adjustment use case module
//!
//! Reactive adjustments that precede a recalculation: stamping the actual
//! end date when an issue closes, and pulling past-due targets forward to
//! today so the cascade re-plans downstream work.

use chrono::NaiveDate;
use serde_json::json;
use tracing::{error, info};

use crate::application::use_cases::load_snapshot::load_snapshot;
use crate::application::use_cases::recalculate_project::RecalculateProject;
use crate::domain::entities::{LogicalField, RecalculationOutcome};
use crate::domain::repositories::ProjectSource;
use crate::error::EngineError;
use crate::infrastructure::persistence::SqliteStore;

/// Use case: event-driven schedule adjustments
pub struct AdjustSchedule<'a> {
    db: &'a SqliteStore,
    source: &'a dyn ProjectSource,
}

impl<'a> AdjustSchedule<'a> {
    pub fn new(db: &'a SqliteStore, source: &'a dyn ProjectSource) -> Self {
        Self { db, source }
    }

    /// An issue closed: set its Actual End Date to today if unset, then
    /// recalculate so dependents chain from the real end
    pub async fn on_issue_closed(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        issue_number: u64,
        today: NaiveDate,
    ) -> Result<RecalculationOutcome, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;

        if let Some(item) = snapshot.store.get(issue_number) {
            if item.fields.actual_end_date.is_none() {
                match snapshot
                    .context
                    .project
                    .field_ids
                    .get(LogicalField::ActualEndDate)
                {
                    Some(field_id) => {
                        self.source
                            .write_date_field(
                                &snapshot.context.project_ref,
                                &item.item_id,
                                field_id,
                                today,
                            )
                            .await?;
                        self.db.record_audit(
                            installation_id,
                            "issue_closed",
                            json!({
                                "issue": issue_number,
                                "actualEndDate": today.to_string(),
                            }),
                        )?;
                    }
                    None => error!(
                        "no Actual End Date binding; cannot stamp #{issue_number} on close"
                    ),
                }
            }
        }

        RecalculateProject::new(self.db, self.source)
            .execute(installation_id, owner, project_number, false, today)
            .await
    }

    /// Pulls past-due targets of open items forward to today, then
    /// recalculates to cascade the shift through dependents
    pub async fn adjust_past_due_dates(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        today: NaiveDate,
    ) -> Result<RecalculationOutcome, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;

        let target_field = snapshot
            .context
            .project
            .field_ids
            .get(LogicalField::TargetDate)
            .map(String::from);

        let mut adjusted = 0usize;
        if let Some(field_id) = target_field {
            for item in snapshot.store.items() {
                if item.is_completed() {
                    continue;
                }
                let Some(target) = item.fields.target_date else {
                    continue;
                };
                if target >= today {
                    continue;
                }

                match self
                    .source
                    .write_date_field(
                        &snapshot.context.project_ref,
                        &item.item_id,
                        &field_id,
                        today,
                    )
                    .await
                {
                    Ok(()) => adjusted += 1,
                    Err(e) => error!("past-due adjust failed for #{}: {}", item.number, e),
                }
            }
        } else {
            error!("no Target Date binding; past-due adjustment writes nothing");
        }

        info!(
            "adjusted {} past-due items on {}/{}",
            adjusted, owner, project_number
        );
        self.db.record_audit(
            installation_id,
            "adjust_past_due",
            json!({ "adjusted": adjusted, "owner": owner, "projectNumber": project_number }),
        )?;

        RecalculateProject::new(self.db, self.source)
            .execute(installation_id, owner, project_number, false, today)
            .await
    }
}
