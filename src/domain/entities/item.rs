//! Item entity module
//!
//! This module defines the Item entity: one tracked issue as surfaced into a
//! project, together with its dependency links, milestone, assignees, and the
//! custom field values the engine schedules against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Confidence, Estimate};

/// Open/closed state of the underlying issue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    Open,
    Closed,
}

/// Milestone reference attached to an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    /// Milestone number (unique within the repository)
    pub number: u64,
    pub title: String,
    pub description: Option<String>,
    /// Due date, whole calendar day in UTC
    pub due_on: Option<NaiveDate>,
    /// "open" or "closed"
    pub state: String,
    pub url: Option<String>,
}

/// Assignee of an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignee {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Custom field values attached to an item by the project
///
/// All values are optional; absent fields simply have no value upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldValues {
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub baseline_start: Option<NaiveDate>,
    pub baseline_target: Option<NaiveDate>,
    pub estimate: Option<Estimate>,
    pub confidence: Option<Confidence>,
    /// 0..=100, parsed from a text or single-select value
    pub percent_complete: Option<u8>,
    /// Free text; "Done" is semantically terminal
    pub status: Option<String>,
}

/// One tracked issue with its project fields
///
/// Items refer to parents and blockers by issue number only; all traversal
/// goes through maps keyed by number, never through pointers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// External project item node id (write target for field mutations)
    pub item_id: String,
    /// Issue number, unique within owner/repo
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub closed_at: Option<DateTime<Utc>>,
    /// Parent issue number, if this item is a sub-issue
    pub parent: Option<u64>,
    /// Sub-issue numbers
    pub sub_issues: Vec<u64>,
    /// Issue numbers of blockers (this item is blocked by them)
    pub blocked_by: Vec<u64>,
    pub milestone: Option<Milestone>,
    pub assignees: Vec<Assignee>,
    pub fields: FieldValues,
}

/// Behavioral classification of an item, produced during the load pass
///
/// The Date Engine dispatches on this tag instead of re-checking raw fields
/// at every decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Open item without children; receives computed dates directly
    Leaf,
    /// Item with children; dates are rolled up, never computed directly
    Summary,
    /// Closed or status "Done"; anchors dependents, never written
    Completed,
}

impl Item {
    /// Creates an item with the minimal identifying fields
    ///
    /// # Arguments
    ///
    /// * `item_id` - External project item node id
    /// * `number` - Issue number
    /// * `title` - Issue title
    pub fn new(item_id: String, number: u64, title: String) -> Self {
        Self {
            item_id,
            number,
            title,
            state: IssueState::Open,
            closed_at: None,
            parent: None,
            sub_issues: Vec::new(),
            blocked_by: Vec::new(),
            milestone: None,
            assignees: Vec::new(),
            fields: FieldValues::default(),
        }
    }

    /// Whether the item is terminal: issue closed or status "Done"
    pub fn is_completed(&self) -> bool {
        self.state == IssueState::Closed || self.fields.status.as_deref() == Some("Done")
    }

    /// Whether the item declares sub-issues of its own
    pub fn has_children(&self) -> bool {
        !self.sub_issues.is_empty()
    }

    /// Whether the item has at least one blocker
    pub fn has_blockers(&self) -> bool {
        !self.blocked_by.is_empty()
    }

    /// The calendar day the issue was closed, if known
    pub fn closed_date(&self) -> Option<NaiveDate> {
        self.closed_at.map(|ts| ts.date_naive())
    }

    /// End date this item contributes to its dependents
    ///
    /// Completed items anchor on actual end, falling back to the closed
    /// date, then the target date. Open items contribute their target.
    pub fn end_for_dependents(&self) -> Option<NaiveDate> {
        if self.is_completed() {
            self.fields
                .actual_end_date
                .or_else(|| self.closed_date())
                .or(self.fields.target_date)
        } else {
            self.fields.target_date
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(number: u64) -> Item {
        Item::new(format!("ITEM_{number}"), number, format!("Item {number}"))
    }

    #[test]
    fn test_new_item_is_open_leaf() {
        let it = item(1);
        assert_eq!(it.state, IssueState::Open);
        assert!(!it.is_completed());
        assert!(!it.has_children());
        assert!(!it.has_blockers());
    }

    #[test]
    fn test_done_status_is_completed() {
        let mut it = item(2);
        it.fields.status = Some("Done".to_string());
        assert!(it.is_completed());
    }

    #[test]
    fn test_status_match_is_exact() {
        let mut it = item(3);
        it.fields.status = Some("done".to_string());
        assert!(!it.is_completed());
    }

    #[test]
    fn test_end_for_dependents_prefers_actual_end() {
        let mut it = item(4);
        it.state = IssueState::Closed;
        it.closed_at = Some(Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap());
        it.fields.actual_end_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        it.fields.target_date = NaiveDate::from_ymd_opt(2024, 2, 9);

        assert_eq!(it.end_for_dependents(), NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_end_for_dependents_falls_back_to_closed_date() {
        let mut it = item(5);
        it.state = IssueState::Closed;
        it.closed_at = Some(Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap());

        assert_eq!(it.end_for_dependents(), NaiveDate::from_ymd_opt(2024, 2, 2));
    }

    #[test]
    fn test_open_item_contributes_target() {
        let mut it = item(6);
        it.fields.target_date = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(it.end_for_dependents(), NaiveDate::from_ymd_opt(2024, 3, 15));
    }
}
