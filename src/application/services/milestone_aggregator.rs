//! Milestone aggregator service module
//!
//! Groups items by milestone and derives a risk level against the milestone
//! due date from completion and elapsed time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::services::ItemStore;
use crate::domain::value_objects::EstimateTable;

/// Risk level of a milestone relative to its due date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneRisk {
    Critical,
    High,
    Medium,
    None,
}

/// Aggregated view of one milestone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSummary {
    pub number: u64,
    pub title: String,
    pub due_on: Option<NaiveDate>,
    pub state: String,
    pub total_items: usize,
    pub completed_items: usize,
    pub total_days: u32,
    pub remaining_days: u32,
    pub earliest_start: Option<NaiveDate>,
    pub latest_target: Option<NaiveDate>,
    /// Percent of member items completed
    pub completion: f64,
    pub risk: MilestoneRisk,
}

/// Project-level milestone overview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneOverview {
    pub total_milestones: usize,
    pub at_risk: usize,
}

/// Full milestone report for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneReport {
    pub milestones: Vec<MilestoneSummary>,
    pub summary: MilestoneOverview,
}

/// Aggregates items per milestone
pub struct MilestoneAggregator<'a> {
    store: &'a ItemStore,
    estimates: &'a EstimateTable,
    today: NaiveDate,
}

impl<'a> MilestoneAggregator<'a> {
    pub fn new(store: &'a ItemStore, estimates: &'a EstimateTable, today: NaiveDate) -> Self {
        Self {
            store,
            estimates,
            today,
        }
    }

    pub fn aggregate(&self) -> MilestoneReport {
        let mut milestones: Vec<MilestoneSummary> = self
            .store
            .milestone_members()
            .iter()
            .filter_map(|(number, members)| self.summarize(*number, members))
            .collect();
        milestones.sort_by_key(|m| m.number);

        let at_risk = milestones
            .iter()
            .filter(|m| matches!(m.risk, MilestoneRisk::Critical | MilestoneRisk::High))
            .count();

        MilestoneReport {
            summary: MilestoneOverview {
                total_milestones: milestones.len(),
                at_risk,
            },
            milestones,
        }
    }

    fn summarize(&self, number: u64, members: &[u64]) -> Option<MilestoneSummary> {
        // Milestone metadata comes from any member carrying the reference
        let reference = members
            .iter()
            .filter_map(|n| self.store.get(*n))
            .find_map(|item| item.milestone.clone())?;

        let mut total_items = 0usize;
        let mut completed_items = 0usize;
        let mut total_days = 0u32;
        let mut remaining_days = 0u32;
        let mut earliest_start: Option<NaiveDate> = None;
        let mut latest_target: Option<NaiveDate> = None;

        for item in members.iter().filter_map(|n| self.store.get(*n)) {
            total_items += 1;
            let days = self.estimates.days(item.fields.estimate);
            total_days += days;
            if item.is_completed() {
                completed_items += 1;
            } else {
                remaining_days += days;
            }

            if let Some(start) = item.fields.start_date {
                earliest_start = Some(earliest_start.map_or(start, |e| e.min(start)));
            }
            if let Some(target) = item.fields.target_date {
                latest_target = Some(latest_target.map_or(target, |l| l.max(target)));
            }
        }

        let completion = if total_items == 0 {
            0.0
        } else {
            completed_items as f64 / total_items as f64 * 100.0
        };

        let risk = self.classify(&reference, completion, earliest_start, latest_target);

        Some(MilestoneSummary {
            number,
            title: reference.title,
            due_on: reference.due_on,
            state: reference.state,
            total_items,
            completed_items,
            total_days,
            remaining_days,
            earliest_start,
            latest_target,
            completion,
            risk,
        })
    }

    fn classify(
        &self,
        milestone: &crate::domain::entities::Milestone,
        completion: f64,
        earliest_start: Option<NaiveDate>,
        latest_target: Option<NaiveDate>,
    ) -> MilestoneRisk {
        let Some(due_on) = milestone.due_on else {
            return MilestoneRisk::None;
        };

        if milestone.state == "open" && due_on < self.today && completion < 100.0 {
            return MilestoneRisk::Critical;
        }

        if latest_target.is_some_and(|target| target > due_on) {
            return MilestoneRisk::High;
        }

        if completion < 50.0 {
            if let Some(start) = earliest_start {
                let total_span = (due_on - start).num_days();
                let elapsed = (self.today - start).num_days();
                if total_span > 0 && elapsed as f64 / total_span as f64 > 0.5 {
                    return MilestoneRisk::Medium;
                }
            }
        }

        MilestoneRisk::None
    }
}
