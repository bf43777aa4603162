//! Recalculate project use case module
//!
//! Orchestrates one full recalculation: resolve field bindings, load the
//! snapshot, run the date engine, diff computed dates against loaded field
//! values, write changes back (start before target), and record the audit
//! entry. Per-item write failures are logged and counted as skipped; they
//! never abort the pass.

use chrono::NaiveDate;
use serde_json::json;
use tracing::{error, info, warn};

use crate::application::services::DateEngine;
use crate::application::use_cases::load_snapshot::{
    load_context, load_snapshot_with_context, LoadedSnapshot,
};
use crate::domain::entities::{FieldIdCache, LogicalField, RecalculationOutcome};
use crate::domain::repositories::ProjectSource;
use crate::error::EngineError;
use crate::infrastructure::github::{ensure_fields, resolve_field_ids};
use crate::infrastructure::persistence::SqliteStore;

/// Use case: recompute and write back schedule dates for one project
pub struct RecalculateProject<'a> {
    db: &'a SqliteStore,
    source: &'a dyn ProjectSource,
}

impl<'a> RecalculateProject<'a> {
    pub fn new(db: &'a SqliteStore, source: &'a dyn ProjectSource) -> Self {
        Self { db, source }
    }

    /// Runs the recalculation for (installation, owner, project)
    ///
    /// # Arguments
    ///
    /// * `setup_fields` - Also create missing upstream fields first
    /// * `today` - Scheduling anchor date (whole day, UTC)
    pub async fn execute(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        setup_fields: bool,
        today: NaiveDate,
    ) -> Result<RecalculationOutcome, EngineError> {
        let mut context = load_context(self.db, installation_id, owner, project_number)?;
        let mut fields_created = Vec::new();

        if setup_fields {
            let setup = ensure_fields(
                self.source,
                &context.project_ref,
                context.installation.plan,
            )
            .await?;
            merge_field_ids(&mut context.project.field_ids, &setup.field_ids);
            fields_created = setup.created;
            self.db
                .save_field_ids(context.project.id, &context.project.field_ids)?;
        } else if context.project.field_ids.get(LogicalField::StartDate).is_none()
            || context.project.field_ids.get(LogicalField::TargetDate).is_none()
        {
            // Cache miss: refresh the binding from upstream field definitions
            let resolved = resolve_field_ids(self.source, &context.project_ref).await?;
            merge_field_ids(&mut context.project.field_ids, &resolved);
            self.db
                .save_field_ids(context.project.id, &context.project.field_ids)?;
        }

        let snapshot = load_snapshot_with_context(self.source, context).await?;
        let outcome = self
            .compute_and_write(&snapshot, today, fields_created)
            .await?;

        self.db.record_audit(
            installation_id,
            "recalculate",
            json!({
                "updated": outcome.updated,
                "skipped": outcome.skipped,
                "owner": owner,
                "projectNumber": project_number,
            }),
        )?;

        info!(
            "recalculated {}/{}: {} updated, {} skipped",
            owner, project_number, outcome.updated, outcome.skipped
        );
        Ok(outcome)
    }

    async fn compute_and_write(
        &self,
        snapshot: &LoadedSnapshot,
        today: NaiveDate,
        fields_created: Vec<String>,
    ) -> Result<RecalculationOutcome, EngineError> {
        let settings = &snapshot.context.installation.settings;
        let engine = DateEngine::new(
            &snapshot.store,
            &snapshot.context.calendar,
            &settings.estimate_days,
            &settings.confidence_buffer,
            today,
        );
        let computation = engine.compute();

        let field_ids = &snapshot.context.project.field_ids;
        let start_field = field_ids.get(LogicalField::StartDate);
        let target_field = field_ids.get(LogicalField::TargetDate);

        let mut updated = 0usize;
        let mut skipped = 0usize;

        for &number in &computation.order {
            let (Some(item), Some(computed)) =
                (snapshot.store.get(number), computation.dates.get(&number))
            else {
                continue;
            };

            if computed.is_summary || computed.is_completed {
                skipped += 1;
                continue;
            }

            let start_write = computed
                .start_date
                .filter(|start| Some(*start) != item.fields.start_date);
            let target_write = computed
                .target_date
                .filter(|target| Some(*target) != item.fields.target_date);

            if start_write.is_none() && target_write.is_none() {
                skipped += 1;
                continue;
            }

            let (Some(start_field), Some(target_field)) = (start_field, target_field) else {
                warn!("missing date field bindings; skipping writes for #{number}");
                skipped += 1;
                continue;
            };

            // Start before target, so an observer never sees a target
            // without its matching start
            match self
                .write_pair(snapshot, &item.item_id, start_field, start_write, target_field, target_write)
                .await
            {
                Ok(()) => updated += 1,
                Err(e) => {
                    error!("write failed for #{number}: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok(RecalculationOutcome {
            updated,
            skipped,
            limit_reached: snapshot.limit_reached,
            total_items: snapshot.total_items,
            processed_items: snapshot.processed_items,
            fields_created,
        })
    }

    async fn write_pair(
        &self,
        snapshot: &LoadedSnapshot,
        item_id: &str,
        start_field: &str,
        start: Option<NaiveDate>,
        target_field: &str,
        target: Option<NaiveDate>,
    ) -> Result<(), EngineError> {
        let project_ref = &snapshot.context.project_ref;
        if let Some(date) = start {
            self.source
                .write_date_field(project_ref, item_id, start_field, date)
                .await?;
        }
        if let Some(date) = target {
            self.source
                .write_date_field(project_ref, item_id, target_field, date)
                .await?;
        }
        Ok(())
    }
}

/// Adopts every resolved id from `fresh` into `cache`
fn merge_field_ids(cache: &mut FieldIdCache, fresh: &FieldIdCache) {
    for field in LogicalField::ALL {
        if let Some(id) = fresh.get(field) {
            cache.set(field, id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::load_snapshot::test_support::seeded_db;
    use crate::domain::entities::{IssueState, Item, PlanTier};
    use crate::domain::repositories::{FieldDef, ItemPage, MockProjectSource};
    use crate::domain::value_objects::{Confidence, Estimate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leaf(number: u64) -> Item {
        let mut item = Item::new(format!("I{number}"), number, format!("Item {number}"));
        item.fields.estimate = Some(Estimate::M);
        item.fields.confidence = Some(Confidence::Medium);
        item
    }

    fn date_field_defs() -> Vec<FieldDef> {
        LogicalField::ALL
            .iter()
            .map(|f| FieldDef {
                id: format!("F_{}", f.display_name().replace(' ', "_")),
                name: f.display_name().to_string(),
                data_type: "DATE".to_string(),
            })
            .collect()
    }

    fn source_for(items: Vec<Item>) -> MockProjectSource {
        let mut source = MockProjectSource::new();
        source
            .expect_list_fields()
            .returning(|_| Ok(date_field_defs()));
        source.expect_fetch_project_page().returning(move |_, _| {
            Ok(ItemPage {
                items: items.clone(),
                next_cursor: None,
            })
        });
        source
    }

    #[tokio::test]
    async fn test_writes_start_then_target_for_changed_items() {
        let db = seeded_db(PlanTier::Pro);
        let a = leaf(1);
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let mut source = source_for(vec![a, b]);
        let mut write_log: Vec<(String, NaiveDate)> = Vec::new();
        let writes = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let writes_clone = writes.clone();
        source
            .expect_write_date_field()
            .times(4)
            .returning(move |_, item_id, field_id, date| {
                writes_clone
                    .lock()
                    .unwrap()
                    .push((item_id.to_string(), field_id.to_string(), date));
                Ok(())
            });

        let use_case = RecalculateProject::new(&db, &source);
        let outcome = use_case
            .execute(42, "acme", 7, false, date(2024, 1, 1))
            .await
            .unwrap();

        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.skipped, 0);
        assert!(!outcome.limit_reached);

        write_log.extend(
            writes
                .lock()
                .unwrap()
                .iter()
                .map(|(item, field, d)| (format!("{item}:{field}"), *d)),
        );
        assert_eq!(
            write_log,
            vec![
                ("I1:F_Start_Date".to_string(), date(2024, 1, 1)),
                ("I1:F_Target_Date".to_string(), date(2024, 1, 17)),
                ("I2:F_Start_Date".to_string(), date(2024, 1, 18)),
                ("I2:F_Target_Date".to_string(), date(2024, 2, 5)),
            ]
        );

        let audit = db.list_audit(42, 5).unwrap();
        assert_eq!(audit[0].action, "recalculate");
        assert_eq!(audit[0].details["updated"], 2);
    }

    #[tokio::test]
    async fn test_unchanged_completed_and_summary_are_skipped() {
        let db = seeded_db(PlanTier::Pro);

        let mut unchanged = leaf(1);
        unchanged.fields.start_date = Some(date(2024, 1, 1));
        unchanged.fields.target_date = Some(date(2024, 1, 17));

        let mut done = leaf(2);
        done.state = IssueState::Closed;

        let mut parent = leaf(3);
        parent.sub_issues = vec![1];
        let mut child = unchanged.clone();
        child.parent = Some(3);

        let source = source_for(vec![child, done, parent]);

        let use_case = RecalculateProject::new(&db, &source);
        let outcome = use_case
            .execute(42, "acme", 7, false, date(2024, 1, 1))
            .await
            .unwrap();

        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.skipped, 3);
    }

    #[tokio::test]
    async fn test_write_failure_counts_skipped_but_pass_continues() {
        let db = seeded_db(PlanTier::Pro);
        let a = leaf(1);
        let b = leaf(2);

        let mut source = source_for(vec![a, b]);
        source
            .expect_write_date_field()
            .returning(|_, item_id, _, _| {
                if item_id == "I1" {
                    Err(EngineError::Upstream("boom".to_string()))
                } else {
                    Ok(())
                }
            });

        let use_case = RecalculateProject::new(&db, &source);
        let outcome = use_case
            .execute(42, "acme", 7, false, date(2024, 1, 1))
            .await
            .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn test_field_cache_persisted_after_resolution() {
        let db = seeded_db(PlanTier::Pro);
        let source = source_for(vec![leaf(1)]);
        let mut write_source = source;
        write_source
            .expect_write_date_field()
            .returning(|_, _, _, _| Ok(()));

        RecalculateProject::new(&db, &write_source)
            .execute(42, "acme", 7, false, date(2024, 1, 1))
            .await
            .unwrap();

        let project = db.get_project(42, "acme", 7).unwrap().unwrap();
        assert_eq!(
            project.field_ids.get(LogicalField::StartDate),
            Some("F_Start_Date")
        );
    }
}
