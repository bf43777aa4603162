//! Resource aggregator service module
//!
//! Groups a project's items by assignee and derives per-assignee workload
//! buckets from remaining effort and open item counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::services::ItemStore;
use crate::domain::value_objects::{EstimateTable, WorkloadBucket};

/// Workload summary for one assignee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub login: String,
    pub name: Option<String>,
    pub total_items: usize,
    pub completed_items: usize,
    pub open_items: usize,
    /// Estimated working days across all assigned items
    pub total_days: u32,
    /// Estimated working days across open items only
    pub remaining_days: u32,
    pub workload: WorkloadBucket,
}

/// Project-level resource overview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOverview {
    pub total_assignees: usize,
    pub unassigned_items: usize,
    pub overloaded_count: usize,
}

/// Full resource report for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReport {
    pub resources: Vec<ResourceSummary>,
    pub summary: ResourceOverview,
}

/// Aggregates items per assignee
pub struct ResourceAggregator<'a> {
    store: &'a ItemStore,
    estimates: &'a EstimateTable,
}

struct Accumulator {
    name: Option<String>,
    total_items: usize,
    completed_items: usize,
    total_days: u32,
    remaining_days: u32,
}

impl<'a> ResourceAggregator<'a> {
    pub fn new(store: &'a ItemStore, estimates: &'a EstimateTable) -> Self {
        Self { store, estimates }
    }

    /// Builds the per-assignee report; items with several assignees count
    /// fully for each of them
    pub fn aggregate(&self) -> ResourceReport {
        // BTreeMap keeps the report ordered by login
        let mut accumulators: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut unassigned_items = 0usize;

        for item in self.store.items() {
            let days = self.estimates.days(item.fields.estimate);
            let completed = item.is_completed();

            if item.assignees.is_empty() {
                unassigned_items += 1;
                continue;
            }

            for assignee in &item.assignees {
                let acc = accumulators
                    .entry(assignee.login.clone())
                    .or_insert_with(|| Accumulator {
                        name: assignee.name.clone(),
                        total_items: 0,
                        completed_items: 0,
                        total_days: 0,
                        remaining_days: 0,
                    });
                acc.total_items += 1;
                acc.total_days += days;
                if completed {
                    acc.completed_items += 1;
                } else {
                    acc.remaining_days += days;
                }
            }
        }

        let resources: Vec<ResourceSummary> = accumulators
            .into_iter()
            .map(|(login, acc)| {
                let open_items = acc.total_items - acc.completed_items;
                ResourceSummary {
                    login,
                    name: acc.name,
                    total_items: acc.total_items,
                    completed_items: acc.completed_items,
                    open_items,
                    total_days: acc.total_days,
                    remaining_days: acc.remaining_days,
                    workload: WorkloadBucket::classify(acc.remaining_days, open_items),
                }
            })
            .collect();

        let overloaded_count = resources
            .iter()
            .filter(|r| r.workload == WorkloadBucket::Overloaded)
            .count();

        ResourceReport {
            summary: ResourceOverview {
                total_assignees: resources.len(),
                unassigned_items,
                overloaded_count,
            },
            resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Assignee, IssueState, Item};
    use crate::domain::value_objects::Estimate;

    fn assigned(number: u64, login: &str, estimate: Estimate) -> Item {
        let mut item = Item::new(format!("I{number}"), number, format!("Item {number}"));
        item.fields.estimate = Some(estimate);
        item.assignees = vec![Assignee {
            login: login.to_string(),
            name: None,
            avatar_url: None,
        }];
        item
    }

    #[test]
    fn test_aggregates_per_assignee() {
        let mut done = assigned(1, "alice", Estimate::M);
        done.state = IssueState::Closed;
        let open = assigned(2, "alice", Estimate::S);
        let other = assigned(3, "bob", Estimate::Xs);
        let unassigned = Item::new("I4".to_string(), 4, "Nobody".to_string());

        let estimates = EstimateTable::default();
        let store = ItemStore::from_items(vec![done, open, other, unassigned]);
        let report = ResourceAggregator::new(&store, &estimates).aggregate();

        assert_eq!(report.summary.total_assignees, 2);
        assert_eq!(report.summary.unassigned_items, 1);

        let alice = &report.resources[0];
        assert_eq!(alice.login, "alice");
        assert_eq!(alice.total_items, 2);
        assert_eq!(alice.completed_items, 1);
        assert_eq!(alice.total_days, 15);
        assert_eq!(alice.remaining_days, 5);
        assert_eq!(alice.workload, WorkloadBucket::Low);
    }

    #[test]
    fn test_overloaded_by_item_count() {
        let mut items = Vec::new();
        for n in 1..=8 {
            items.push(assigned(n, "carol", Estimate::Xs));
        }
        let estimates = EstimateTable::default();
        let store = ItemStore::from_items(items);
        let report = ResourceAggregator::new(&store, &estimates).aggregate();

        assert_eq!(report.resources[0].workload, WorkloadBucket::Overloaded);
        assert_eq!(report.summary.overloaded_count, 1);
    }
}
