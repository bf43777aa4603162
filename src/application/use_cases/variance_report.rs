//! Variance report use case module

use crate::application::services::{BaselineService, VarianceReport};
use crate::application::use_cases::load_snapshot::load_snapshot;
use crate::domain::repositories::ProjectSource;
use crate::error::EngineError;
use crate::infrastructure::persistence::SqliteStore;

/// Use case: baseline-vs-current variance report (Pro)
pub struct GenerateVarianceReport<'a> {
    db: &'a SqliteStore,
    source: &'a dyn ProjectSource,
}

impl<'a> GenerateVarianceReport<'a> {
    pub fn new(db: &'a SqliteStore, source: &'a dyn ProjectSource) -> Self {
        Self { db, source }
    }

    pub async fn execute(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
    ) -> Result<VarianceReport, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;

        if !snapshot.context.installation.plan.allows_baselines() {
            return Err(EngineError::PlanGate);
        }

        let service = BaselineService::new(&snapshot.store, &snapshot.context.calendar);
        Ok(service.variance_report())
    }
}
