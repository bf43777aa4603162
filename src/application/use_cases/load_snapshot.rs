//! Snapshot loading module
//!
//! Shared loading path for every project-scoped use case: resolve the
//! installation and project, build the working calendar, fetch the item
//! snapshot with the plan cap applied, and assemble the item store.

use crate::application::services::{ItemStore, WorkingCalendar};
use crate::domain::entities::{Installation, Project};
use crate::domain::repositories::{fetch_all_items, ProjectRef, ProjectSource};
use crate::error::EngineError;
use crate::infrastructure::persistence::SqliteStore;

/// Installation- and project-scoped context without item data
#[derive(Debug)]
pub struct ProjectContext {
    pub installation: Installation,
    pub project: Project,
    pub project_ref: ProjectRef,
    pub calendar: WorkingCalendar,
}

/// Context plus the fetched item snapshot
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub context: ProjectContext,
    pub store: ItemStore,
    pub total_items: usize,
    pub processed_items: usize,
    /// True when the plan cap truncated the snapshot
    pub limit_reached: bool,
}

/// Loads installation, project, and calendar from the database
pub fn load_context(
    db: &SqliteStore,
    installation_id: i64,
    owner: &str,
    project_number: u64,
) -> Result<ProjectContext, EngineError> {
    let installation = db
        .get_installation(installation_id)?
        .ok_or_else(|| EngineError::NotFound(format!("installation {installation_id}")))?;

    let project = db
        .get_project(installation_id, owner, project_number)?
        .ok_or_else(|| {
            EngineError::NotFound(format!("project {owner}/{project_number} is not tracked"))
        })?;

    let holidays = db.list_holidays(installation_id)?;
    let calendar = WorkingCalendar::from_settings(&installation.settings, &holidays);

    let project_ref = ProjectRef {
        owner: project.owner.clone(),
        owner_kind: installation.owner_kind,
        project_number: project.project_number,
        project_node_id: project.external_project_id.clone(),
        installation_id,
    };

    Ok(ProjectContext {
        installation,
        project,
        project_ref,
        calendar,
    })
}

/// Fetches all items and applies the plan cap: free installations process
/// only the first slice of the paginated order
pub async fn load_snapshot(
    db: &SqliteStore,
    source: &dyn ProjectSource,
    installation_id: i64,
    owner: &str,
    project_number: u64,
) -> Result<LoadedSnapshot, EngineError> {
    let context = load_context(db, installation_id, owner, project_number)?;
    load_snapshot_with_context(source, context).await
}

pub async fn load_snapshot_with_context(
    source: &dyn ProjectSource,
    context: ProjectContext,
) -> Result<LoadedSnapshot, EngineError> {
    let mut items = fetch_all_items(source, &context.project_ref).await?;
    let total_items = items.len();

    let mut limit_reached = false;
    if let Some(cap) = context.installation.plan.max_tracked_issues() {
        if items.len() > cap {
            items.truncate(cap);
            limit_reached = true;
        }
    }
    let processed_items = items.len();

    Ok(LoadedSnapshot {
        context,
        store: ItemStore::from_items(items),
        total_items,
        processed_items,
        limit_reached,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::entities::{Item, PlanTier};

    fn items(count: u64) -> Vec<Item> {
        (1..=count)
            .map(|n| Item::new(format!("I{n}"), n, format!("Item {n}")))
            .collect()
    }

    #[tokio::test]
    async fn test_free_plan_caps_processed_items() {
        let db = seeded_db(PlanTier::Free);
        let source = source_with_items(items(30));

        let snapshot = load_snapshot(&db, &source, 42, "acme", 7).await.unwrap();
        assert_eq!(snapshot.total_items, 30);
        assert_eq!(snapshot.processed_items, 25);
        assert!(snapshot.limit_reached);
        assert_eq!(snapshot.store.len(), 25);
    }

    #[tokio::test]
    async fn test_pro_plan_is_uncapped() {
        let db = seeded_db(PlanTier::Pro);
        let source = source_with_items(items(30));

        let snapshot = load_snapshot(&db, &source, 42, "acme", 7).await.unwrap();
        assert_eq!(snapshot.processed_items, 30);
        assert!(!snapshot.limit_reached);
    }

    #[tokio::test]
    async fn test_unknown_installation_is_not_found() {
        let db = SqliteStore::open_in_memory().unwrap();
        let source = source_with_items(vec![]);

        let err = load_snapshot(&db, &source, 9, "acme", 7).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
