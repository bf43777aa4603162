//! Project source trait module
//!
//! The seam between the engine and the upstream project service. The real
//! implementation is the GraphQL client in `infrastructure::github`; tests
//! substitute a mock.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::entities::{Item, OwnerKind};
use crate::error::EngineError;

/// Hard cap on items fetched per project, to bound memory and API use
pub const MAX_ITEMS_PER_PROJECT: usize = 1_000;

/// Page size requested from the upstream service
pub const PAGE_SIZE: usize = 100;

/// Identifies one upstream project for queries and mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub owner: String,
    pub owner_kind: OwnerKind,
    pub project_number: u64,
    /// External project node id; required for item mutations
    pub project_node_id: String,
    pub installation_id: i64,
}

/// One page of project items
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
}

/// An upstream field definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
    /// Upstream data type, e.g. "DATE", "SINGLE_SELECT", "TEXT"
    pub data_type: String,
}

/// Option of a single-select field, with its display color
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub name: String,
    pub color: String,
}

/// Adapter over the upstream project service's query/mutation API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Fetches at most one page (100 items) of project items
    async fn fetch_project_page(
        &self,
        project: &ProjectRef,
        cursor: Option<String>,
    ) -> Result<ItemPage, EngineError>;

    /// Writes a single date field value on one item
    async fn write_date_field(
        &self,
        project: &ProjectRef,
        item_id: &str,
        field_id: &str,
        date: NaiveDate,
    ) -> Result<(), EngineError>;

    /// Lists the project's field definitions
    async fn list_fields(&self, project: &ProjectRef) -> Result<Vec<FieldDef>, EngineError>;

    /// Creates a DATE field with the given display name
    async fn create_date_field(
        &self,
        project: &ProjectRef,
        name: &str,
    ) -> Result<FieldDef, EngineError>;

    /// Creates a SINGLE_SELECT field with the given options
    async fn create_single_select_field(
        &self,
        project: &ProjectRef,
        name: &str,
        options: &[SelectOption],
    ) -> Result<FieldDef, EngineError>;
}

/// Paginates until the upstream reports no next cursor, capped at
/// [`MAX_ITEMS_PER_PROJECT`] items
pub async fn fetch_all_items(
    source: &dyn ProjectSource,
    project: &ProjectRef,
) -> Result<Vec<Item>, EngineError> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = source.fetch_project_page(project, cursor).await?;
        items.extend(page.items);

        if items.len() >= MAX_ITEMS_PER_PROJECT {
            warn!(
                "project {}/{} exceeds {} items; truncating fetch",
                project.owner, project.project_number, MAX_ITEMS_PER_PROJECT
            );
            items.truncate(MAX_ITEMS_PER_PROJECT);
            break;
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(range: std::ops::Range<u64>, next: Option<&str>) -> ItemPage {
        ItemPage {
            items: range
                .map(|n| Item::new(format!("I{n}"), n, format!("Item {n}")))
                .collect(),
            next_cursor: next.map(String::from),
        }
    }

    fn project_ref() -> ProjectRef {
        ProjectRef {
            owner: "acme".to_string(),
            owner_kind: OwnerKind::Organization,
            project_number: 1,
            project_node_id: "PVT_1".to_string(),
            installation_id: 42,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_follows_cursors() {
        let mut source = MockProjectSource::new();
        source
            .expect_fetch_project_page()
            .withf(|_, cursor| cursor.is_none())
            .returning(|_, _| Ok(page_of(0..100, Some("c1"))));
        source
            .expect_fetch_project_page()
            .withf(|_, cursor| cursor.as_deref() == Some("c1"))
            .returning(|_, _| Ok(page_of(100..150, None)));

        let items = fetch_all_items(&source, &project_ref()).await.unwrap();
        assert_eq!(items.len(), 150);
    }

    #[tokio::test]
    async fn test_fetch_all_caps_at_limit() {
        let mut source = MockProjectSource::new();
        source
            .expect_fetch_project_page()
            .returning(|_, _| Ok(page_of(0..100, Some("again"))));

        let items = fetch_all_items(&source, &project_ref()).await.unwrap();
        assert_eq!(items.len(), MAX_ITEMS_PER_PROJECT);
    }
}
