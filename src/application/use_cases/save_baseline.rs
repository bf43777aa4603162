//! Save baseline use case module
//!
//! Stamps baseline start/target for items that have dates but no baseline
//! yet. Existing baselines are never overwritten, so re-running the
//! operation writes nothing.

use serde_json::json;
use tracing::{error, info};

use crate::application::services::BaselineService;
use crate::application::use_cases::load_snapshot::load_snapshot;
use crate::domain::repositories::ProjectSource;
use crate::error::EngineError;
use crate::infrastructure::persistence::SqliteStore;

/// Outcome of one baseline save
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SaveBaselineOutcome {
    /// Number of baseline fields written
    pub saved: usize,
}

/// Use case: freeze the current schedule as the baseline (Pro)
pub struct SaveBaseline<'a> {
    db: &'a SqliteStore,
    source: &'a dyn ProjectSource,
}

impl<'a> SaveBaseline<'a> {
    pub fn new(db: &'a SqliteStore, source: &'a dyn ProjectSource) -> Self {
        Self { db, source }
    }

    pub async fn execute(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
    ) -> Result<SaveBaselineOutcome, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;

        if !snapshot.context.installation.plan.allows_baselines() {
            return Err(EngineError::PlanGate);
        }

        let service = BaselineService::new(&snapshot.store, &snapshot.context.calendar);
        let plan = service.baseline_plan();

        let mut saved = 0usize;
        for write in &plan {
            let Some(field_id) = snapshot.context.project.field_ids.get(write.field) else {
                error!(
                    "no field binding for {:?}; skipping baseline write for #{}",
                    write.field, write.number
                );
                continue;
            };

            match self
                .source
                .write_date_field(
                    &snapshot.context.project_ref,
                    &write.item_id,
                    field_id,
                    write.date,
                )
                .await
            {
                Ok(()) => saved += 1,
                Err(e) => error!("baseline write failed for #{}: {}", write.number, e),
            }
        }

        self.db.record_audit(
            installation_id,
            "save_baseline",
            json!({
                "saved": saved,
                "owner": owner,
                "projectNumber": project_number,
            }),
        )?;

        info!(
            "saved baseline for {}/{}: {} fields",
            owner, project_number, saved
        );
        Ok(SaveBaselineOutcome { saved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::load_snapshot::test_support::seeded_db;
    use crate::domain::entities::{FieldIdCache, Item, LogicalField, PlanTier};
    use crate::domain::repositories::{ItemPage, MockProjectSource};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scheduled_item(number: u64) -> Item {
        let mut item = Item::new(format!("I{number}"), number, format!("Item {number}"));
        item.fields.start_date = Some(date(2024, 1, 1));
        item.fields.target_date = Some(date(2024, 1, 17));
        item
    }

    fn db_with_baseline_fields(plan: PlanTier) -> SqliteStore {
        let db = seeded_db(plan);
        let project = db.get_project(42, "acme", 7).unwrap().unwrap();
        let mut cache = FieldIdCache::default();
        cache.set(LogicalField::BaselineStart, "F_bs".to_string());
        cache.set(LogicalField::BaselineTarget, "F_bt".to_string());
        db.save_field_ids(project.id, &cache).unwrap();
        db
    }

    fn source_for(items: Vec<Item>) -> MockProjectSource {
        let mut source = MockProjectSource::new();
        source.expect_fetch_project_page().returning(move |_, _| {
            Ok(ItemPage {
                items: items.clone(),
                next_cursor: None,
            })
        });
        source
    }

    #[tokio::test]
    async fn test_saves_both_baseline_fields() {
        let db = db_with_baseline_fields(PlanTier::Pro);
        let mut source = source_for(vec![scheduled_item(1)]);
        source
            .expect_write_date_field()
            .times(2)
            .returning(|_, _, _, _| Ok(()));

        let outcome = SaveBaseline::new(&db, &source)
            .execute(42, "acme", 7)
            .await
            .unwrap();
        assert_eq!(outcome.saved, 2);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let db = db_with_baseline_fields(PlanTier::Pro);
        let mut item = scheduled_item(1);
        item.fields.baseline_start = item.fields.start_date;
        item.fields.baseline_target = item.fields.target_date;

        let mut source = source_for(vec![item]);
        source.expect_write_date_field().never();

        let outcome = SaveBaseline::new(&db, &source)
            .execute(42, "acme", 7)
            .await
            .unwrap();
        assert_eq!(outcome.saved, 0);
    }

    #[tokio::test]
    async fn test_free_plan_is_gated() {
        let db = db_with_baseline_fields(PlanTier::Free);
        let source = source_for(vec![scheduled_item(1)]);

        let err = SaveBaseline::new(&db, &source)
            .execute(42, "acme", 7)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PlanGate));
    }
}
