//! GitHub Projects client module
//!
//! Thin adapter over the Projects v2 GraphQL API implementing the
//! [`ProjectSource`] seam: paginated item queries, single-field date
//! mutations, and field introspection/creation. Every call carries a
//! 10-second deadline; failures are reported upstream and never retried
//! here.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::domain::entities::{Item, OwnerKind};
use crate::domain::repositories::{FieldDef, ItemPage, ProjectRef, ProjectSource, SelectOption};
use crate::error::EngineError;
use crate::infrastructure::github::app_auth::AppAuth;
use crate::infrastructure::github::models::{
    CreateFieldData, FieldsData, GraphQlResponse, ItemsData,
};

const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// Upstream call deadline
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

const ITEMS_QUERY_ORG: &str = r#"
query($login: String!, $number: Int!, $cursor: String) {
  owner: organization(login: $login) {
    project: projectV2(number: $number) {
      id
      items(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          content {
            ... on Issue {
              number title state closedAt
              milestone { number title description dueOn state url }
              parent { number }
              subIssues(first: 50) { nodes { number } }
              blockedBy(first: 50) { nodes { ... on Issue { number } } }
              assignees(first: 20) { nodes { login name avatarUrl } }
            }
          }
          fieldValues(first: 50) {
            nodes {
              ... on ProjectV2ItemFieldDateValue {
                date
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldNumberValue {
                number
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldTextValue {
                text
                field { ... on ProjectV2FieldCommon { name } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

const ITEMS_QUERY_USER: &str = r#"
query($login: String!, $number: Int!, $cursor: String) {
  owner: user(login: $login) {
    project: projectV2(number: $number) {
      id
      items(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          content {
            ... on Issue {
              number title state closedAt
              milestone { number title description dueOn state url }
              parent { number }
              subIssues(first: 50) { nodes { number } }
              blockedBy(first: 50) { nodes { ... on Issue { number } } }
              assignees(first: 20) { nodes { login name avatarUrl } }
            }
          }
          fieldValues(first: 50) {
            nodes {
              ... on ProjectV2ItemFieldDateValue {
                date
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldNumberValue {
                number
                field { ... on ProjectV2FieldCommon { name } }
              }
              ... on ProjectV2ItemFieldTextValue {
                text
                field { ... on ProjectV2FieldCommon { name } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

const FIELDS_QUERY_ORG: &str = r#"
query($login: String!, $number: Int!) {
  owner: organization(login: $login) {
    project: projectV2(number: $number) {
      fields(first: 50) {
        nodes { ... on ProjectV2FieldCommon { id name dataType } }
      }
    }
  }
}
"#;

const FIELDS_QUERY_USER: &str = r#"
query($login: String!, $number: Int!) {
  owner: user(login: $login) {
    project: projectV2(number: $number) {
      fields(first: 50) {
        nodes { ... on ProjectV2FieldCommon { id name dataType } }
      }
    }
  }
}
"#;

const UPDATE_DATE_MUTATION: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $date: Date!) {
  updateProjectV2ItemFieldValue(
    input: { projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: { date: $date } }
  ) {
    projectV2Item { id }
  }
}
"#;

const CREATE_FIELD_MUTATION: &str = r#"
mutation($projectId: ID!, $dataType: ProjectV2CustomFieldType!, $name: String!, $options: [ProjectV2SingleSelectFieldOptionInput!]) {
  createProjectV2Field(
    input: { projectId: $projectId, dataType: $dataType, name: $name, singleSelectOptions: $options }
  ) {
    projectV2Field { ... on ProjectV2FieldCommon { id name dataType } }
  }
}
"#;

/// GraphQL client bound to one app installation set
pub struct GithubProjectsClient {
    http: reqwest::Client,
    auth: Arc<AppAuth>,
    graphql_endpoint: String,
}

impl GithubProjectsClient {
    pub fn new(auth: Arc<AppAuth>) -> Self {
        Self::with_endpoint(auth, DEFAULT_GRAPHQL_ENDPOINT.to_string())
    }

    pub fn with_endpoint(auth: Arc<AppAuth>, graphql_endpoint: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .unwrap_or_default(),
            auth,
            graphql_endpoint,
        }
    }

    async fn post_graphql<T: DeserializeOwned>(
        &self,
        installation_id: i64,
        query: &str,
        variables: Value,
    ) -> Result<T, EngineError> {
        let token = self.auth.installation_token(installation_id).await?;

        let response = self
            .http
            .post(&self.graphql_endpoint)
            .bearer_auth(token)
            .header("User-Agent", "planweaver")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| {
                error!("upstream GraphQL call failed: {}", e);
                EngineError::Upstream(format!("GraphQL request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("upstream GraphQL call returned {}", status);
            return Err(EngineError::Upstream(format!(
                "GraphQL request returned {status}"
            )));
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(format!("malformed GraphQL response: {e}")))?;

        if let Some(errors) = body.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            error!("upstream GraphQL errors: {}", messages.join("; "));
            return Err(EngineError::Upstream(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| EngineError::Upstream("GraphQL response had no data".to_string()))
    }

    fn items_query(owner_kind: OwnerKind) -> &'static str {
        match owner_kind {
            OwnerKind::Organization => ITEMS_QUERY_ORG,
            OwnerKind::User => ITEMS_QUERY_USER,
        }
    }

    fn fields_query(owner_kind: OwnerKind) -> &'static str {
        match owner_kind {
            OwnerKind::Organization => FIELDS_QUERY_ORG,
            OwnerKind::User => FIELDS_QUERY_USER,
        }
    }
}

#[async_trait]
impl ProjectSource for GithubProjectsClient {
    async fn fetch_project_page(
        &self,
        project: &ProjectRef,
        cursor: Option<String>,
    ) -> Result<ItemPage, EngineError> {
        let data: ItemsData = self
            .post_graphql(
                project.installation_id,
                Self::items_query(project.owner_kind),
                json!({
                    "login": project.owner,
                    "number": project.project_number,
                    "cursor": cursor,
                }),
            )
            .await?;

        let node = data
            .owner
            .and_then(|owner| owner.project)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "project {}/{} not found upstream",
                    project.owner, project.project_number
                ))
            })?;

        let next_cursor = if node.items.page_info.has_next_page {
            node.items.page_info.end_cursor
        } else {
            None
        };

        let items: Vec<Item> = node
            .items
            .nodes
            .into_iter()
            .filter_map(|n| n.into_item())
            .collect();

        Ok(ItemPage { items, next_cursor })
    }

    async fn write_date_field(
        &self,
        project: &ProjectRef,
        item_id: &str,
        field_id: &str,
        date: NaiveDate,
    ) -> Result<(), EngineError> {
        let _: Value = self
            .post_graphql(
                project.installation_id,
                UPDATE_DATE_MUTATION,
                json!({
                    "projectId": project.project_node_id,
                    "itemId": item_id,
                    "fieldId": field_id,
                    "date": date.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    async fn list_fields(&self, project: &ProjectRef) -> Result<Vec<FieldDef>, EngineError> {
        let data: FieldsData = self
            .post_graphql(
                project.installation_id,
                Self::fields_query(project.owner_kind),
                json!({
                    "login": project.owner,
                    "number": project.project_number,
                }),
            )
            .await?;

        let node = data.owner.and_then(|owner| owner.project).ok_or_else(|| {
            EngineError::NotFound(format!(
                "project {}/{} not found upstream",
                project.owner, project.project_number
            ))
        })?;

        Ok(node
            .fields
            .nodes
            .into_iter()
            .filter_map(|field| {
                Some(FieldDef {
                    id: field.id?,
                    name: field.name?,
                    data_type: field.data_type.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn create_date_field(
        &self,
        project: &ProjectRef,
        name: &str,
    ) -> Result<FieldDef, EngineError> {
        let data: CreateFieldData = self
            .post_graphql(
                project.installation_id,
                CREATE_FIELD_MUTATION,
                json!({
                    "projectId": project.project_node_id,
                    "dataType": "DATE",
                    "name": name,
                    "options": Value::Null,
                }),
            )
            .await?;

        created_field(data, name)
    }

    async fn create_single_select_field(
        &self,
        project: &ProjectRef,
        name: &str,
        options: &[SelectOption],
    ) -> Result<FieldDef, EngineError> {
        let option_inputs: Vec<Value> = options
            .iter()
            .map(|o| json!({ "name": o.name, "color": o.color, "description": "" }))
            .collect();

        let data: CreateFieldData = self
            .post_graphql(
                project.installation_id,
                CREATE_FIELD_MUTATION,
                json!({
                    "projectId": project.project_node_id,
                    "dataType": "SINGLE_SELECT",
                    "name": name,
                    "options": option_inputs,
                }),
            )
            .await?;

        created_field(data, name)
    }
}

fn created_field(data: CreateFieldData, name: &str) -> Result<FieldDef, EngineError> {
    let node = data
        .create_project_v2_field
        .and_then(|c| c.project_v2_field)
        .ok_or_else(|| EngineError::Upstream(format!("field creation returned no field: {name}")))?;

    Ok(FieldDef {
        id: node.id.unwrap_or_default(),
        name: node.name.unwrap_or_else(|| name.to_string()),
        data_type: node.data_type.unwrap_or_default(),
    })
}
