//! GitHub wire model module
//!
//! Serde DTOs for the slice of the Projects v2 GraphQL schema the engine
//! consumes, plus the conversion into domain items. Field values are bound
//! to logical fields by case-sensitive display-name match.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::domain::entities::{Assignee, IssueState, Item, LogicalField, Milestone};
use crate::domain::value_objects::{Confidence, Estimate};

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Top-level data for the items query; the owner object is aliased so the
/// same shape covers organizations and users
#[derive(Debug, Deserialize)]
pub struct ItemsData {
    pub owner: Option<OwnerProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerProjectNode {
    pub project: Option<ProjectItemsNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectItemsNode {
    pub id: String,
    pub items: ItemConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    pub id: String,
    pub content: Option<IssueContent>,
    pub field_values: FieldValueConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueContent {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub milestone: Option<MilestoneNode>,
    pub parent: Option<IssueRef>,
    #[serde(default)]
    pub sub_issues: NumberConnection,
    #[serde(default)]
    pub blocked_by: NumberConnection,
    #[serde(default)]
    pub assignees: AssigneeConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneNode {
    pub number: u64,
    pub title: String,
    pub description: Option<String>,
    pub due_on: Option<DateTime<Utc>>,
    pub state: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueRef {
    pub number: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct NumberConnection {
    #[serde(default)]
    pub nodes: Vec<IssueRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssigneeConnection {
    #[serde(default)]
    pub nodes: Vec<AssigneeNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeNode {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FieldValueConnection {
    #[serde(default)]
    pub nodes: Vec<FieldValueNode>,
}

/// One field value; exactly one of the value slots is set depending on the
/// upstream field type
#[derive(Debug, Default, Deserialize)]
pub struct FieldValueNode {
    pub date: Option<NaiveDate>,
    pub name: Option<String>,
    pub number: Option<f64>,
    pub text: Option<String>,
    pub field: Option<FieldRef>,
}

#[derive(Debug, Deserialize)]
pub struct FieldRef {
    pub name: String,
}

/// Top-level data for the fields query
#[derive(Debug, Deserialize)]
pub struct FieldsData {
    pub owner: Option<OwnerFieldsNode>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerFieldsNode {
    pub project: Option<ProjectFieldsNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectFieldsNode {
    pub fields: FieldDefConnection,
}

#[derive(Debug, Deserialize)]
pub struct FieldDefConnection {
    pub nodes: Vec<FieldDefNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub data_type: Option<String>,
}

/// Data for the create-field mutation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldData {
    pub create_project_v2_field: Option<CreatedFieldNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFieldNode {
    pub project_v2_field: Option<FieldDefNode>,
}

impl ItemNode {
    /// Converts one wire item into a domain item
    ///
    /// Items without issue content (for example drafts) are skipped.
    pub fn into_item(self) -> Option<Item> {
        let content = self.content?;

        let mut item = Item::new(self.id, content.number, content.title);
        item.state = if content.state == "CLOSED" {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        item.closed_at = content.closed_at;
        item.parent = content.parent.map(|p| p.number);
        item.sub_issues = content.sub_issues.nodes.iter().map(|n| n.number).collect();
        item.blocked_by = content.blocked_by.nodes.iter().map(|n| n.number).collect();
        item.milestone = content.milestone.map(|m| Milestone {
            number: m.number,
            title: m.title,
            description: m.description,
            due_on: m.due_on.map(|ts| ts.date_naive()),
            state: m.state.to_lowercase(),
            url: m.url,
        });
        item.assignees = content
            .assignees
            .nodes
            .into_iter()
            .map(|a| Assignee {
                login: a.login,
                name: a.name,
                avatar_url: a.avatar_url,
            })
            .collect();

        for value in self.field_values.nodes {
            apply_field_value(&mut item, value);
        }

        Some(item)
    }
}

/// Binds one field value onto the item, matching display names exactly
fn apply_field_value(item: &mut Item, value: FieldValueNode) {
    let Some(field) = &value.field else {
        return;
    };
    let fields = &mut item.fields;

    match field.name.as_str() {
        name if name == LogicalField::StartDate.display_name() => {
            fields.start_date = value.date;
        }
        name if name == LogicalField::TargetDate.display_name() => {
            fields.target_date = value.date;
        }
        name if name == LogicalField::ActualEndDate.display_name() => {
            fields.actual_end_date = value.date;
        }
        name if name == LogicalField::BaselineStart.display_name() => {
            fields.baseline_start = value.date;
        }
        name if name == LogicalField::BaselineTarget.display_name() => {
            fields.baseline_target = value.date;
        }
        name if name == LogicalField::Estimate.display_name() => {
            fields.estimate = value.name.as_deref().and_then(Estimate::parse);
        }
        name if name == LogicalField::Confidence.display_name() => {
            fields.confidence = value.name.as_deref().and_then(Confidence::parse);
        }
        name if name == LogicalField::PercentComplete.display_name() => {
            fields.percent_complete = parse_percent(&value);
        }
        name if name == LogicalField::Status.display_name() => {
            fields.status = value.name.or(value.text);
        }
        _ => {}
    }
}

/// Percent complete arrives as a number, select name, or free text; values
/// are clamped to 0..=100
fn parse_percent(value: &FieldValueNode) -> Option<u8> {
    if let Some(number) = value.number {
        return Some(number.clamp(0.0, 100.0) as u8);
    }
    let raw = value.name.as_deref().or(value.text.as_deref())?;
    let digits = raw.trim().trim_end_matches('%').trim();
    digits.parse::<i64>().ok().map(|n| n.clamp(0, 100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(json: serde_json::Value) -> ItemNode {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_item_conversion_with_fields() {
        let item = node(json!({
            "id": "PVTI_1",
            "content": {
                "number": 12,
                "title": "Build the thing",
                "state": "OPEN",
                "closedAt": null,
                "milestone": {
                    "number": 3, "title": "v1", "description": null,
                    "dueOn": "2024-06-01T00:00:00Z", "state": "OPEN", "url": null
                },
                "parent": { "number": 5 },
                "subIssues": { "nodes": [] },
                "blockedBy": { "nodes": [{ "number": 9 }] },
                "assignees": { "nodes": [{ "login": "alice", "name": "Alice", "avatarUrl": null }] }
            },
            "fieldValues": {
                "nodes": [
                    { "date": "2024-01-08", "field": { "name": "Start Date" } },
                    { "date": "2024-01-22", "field": { "name": "Target Date" } },
                    { "name": "M", "field": { "name": "Estimate" } },
                    { "name": "Low", "field": { "name": "Confidence" } },
                    { "text": "45%", "field": { "name": "Percent Complete" } },
                    { "name": "In Progress", "field": { "name": "Status" } },
                    { "field": null }
                ]
            }
        }))
        .into_item()
        .unwrap();

        assert_eq!(item.number, 12);
        assert_eq!(item.parent, Some(5));
        assert_eq!(item.blocked_by, vec![9]);
        assert_eq!(item.fields.estimate, Some(Estimate::M));
        assert_eq!(item.fields.confidence, Some(Confidence::Low));
        assert_eq!(item.fields.percent_complete, Some(45));
        assert_eq!(item.fields.status.as_deref(), Some("In Progress"));
        assert_eq!(
            item.milestone.as_ref().unwrap().due_on,
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(item.milestone.as_ref().unwrap().state, "open");
    }

    #[test]
    fn test_field_name_match_is_case_sensitive() {
        let item = node(json!({
            "id": "PVTI_2",
            "content": {
                "number": 1, "title": "t", "state": "OPEN", "closedAt": null,
                "milestone": null, "parent": null,
                "subIssues": { "nodes": [] }, "blockedBy": { "nodes": [] },
                "assignees": { "nodes": [] }
            },
            "fieldValues": {
                "nodes": [{ "date": "2024-01-08", "field": { "name": "start date" } }]
            }
        }))
        .into_item()
        .unwrap();

        assert!(item.fields.start_date.is_none());
    }

    #[test]
    fn test_draft_items_are_skipped() {
        let converted = node(json!({
            "id": "PVTI_3",
            "content": null,
            "fieldValues": { "nodes": [] }
        }))
        .into_item();
        assert!(converted.is_none());
    }

    #[test]
    fn test_percent_parsing_variants() {
        let from = |v: serde_json::Value| parse_percent(&serde_json::from_value(v).unwrap());
        assert_eq!(from(json!({ "number": 80.0 })), Some(80));
        assert_eq!(from(json!({ "text": "45%" })), Some(45));
        assert_eq!(from(json!({ "name": "100" })), Some(100));
        assert_eq!(from(json!({ "number": 250.0 })), Some(100));
        assert_eq!(from(json!({ "text": "n/a" })), None);
    }
}
