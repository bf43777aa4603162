//! Baseline and variance service module
//!
//! Baselines freeze an item's (start, target) pair once; variance compares
//! the current target against the frozen one in working days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::services::{ItemStore, WorkingCalendar};
use crate::domain::entities::LogicalField;

/// One pending baseline field write
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineWrite {
    pub number: u64,
    pub item_id: String,
    pub field: LogicalField,
    pub date: NaiveDate,
}

/// Variance bucket of one item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VarianceStatus {
    Done,
    Behind,
    Ahead,
    OnTrack,
    NoBaseline,
}

/// Variance of one item against its baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVariance {
    pub number: u64,
    pub title: String,
    pub baseline_start: Option<NaiveDate>,
    pub baseline_target: Option<NaiveDate>,
    pub current_start: Option<NaiveDate>,
    pub current_target: Option<NaiveDate>,
    /// Signed working days; positive means behind the baseline
    pub variance_days: i64,
    pub status: VarianceStatus,
}

/// Variance counts; `on_track` includes completed items
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VarianceSummary {
    pub ahead: usize,
    pub on_track: usize,
    pub behind: usize,
    pub no_baseline: usize,
    pub done: usize,
}

/// Full variance report for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceReport {
    pub items: Vec<ItemVariance>,
    pub summary: VarianceSummary,
}

/// Baseline stamping and variance reporting
pub struct BaselineService<'a> {
    store: &'a ItemStore,
    calendar: &'a WorkingCalendar,
}

impl<'a> BaselineService<'a> {
    pub fn new(store: &'a ItemStore, calendar: &'a WorkingCalendar) -> Self {
        Self { store, calendar }
    }

    /// Fields to stamp: any set start/target whose baseline twin is unset
    ///
    /// Existing baselines are never overwritten, which makes the save
    /// operation idempotent.
    pub fn baseline_plan(&self) -> Vec<BaselineWrite> {
        let mut writes = Vec::new();

        for item in self.store.items() {
            if let (Some(start), None) = (item.fields.start_date, item.fields.baseline_start) {
                writes.push(BaselineWrite {
                    number: item.number,
                    item_id: item.item_id.clone(),
                    field: LogicalField::BaselineStart,
                    date: start,
                });
            }
            if let (Some(target), None) = (item.fields.target_date, item.fields.baseline_target) {
                writes.push(BaselineWrite {
                    number: item.number,
                    item_id: item.item_id.clone(),
                    field: LogicalField::BaselineTarget,
                    date: target,
                });
            }
        }

        writes
    }

    /// Computes per-item variance and the bucket summary
    pub fn variance_report(&self) -> VarianceReport {
        let mut items = Vec::new();
        let mut summary = VarianceSummary::default();

        for item in self.store.items() {
            let fields = &item.fields;
            let completed = item.is_completed();

            let (variance_days, status) = match (fields.baseline_target, fields.target_date) {
                (None, _) => (0, VarianceStatus::NoBaseline),
                (Some(baseline), current) => {
                    let variance = current.map_or(0, |target| {
                        let magnitude =
                            i64::from(self.calendar.working_days_between(baseline, target));
                        if target > baseline {
                            magnitude
                        } else {
                            -magnitude
                        }
                    });
                    let status = if completed {
                        VarianceStatus::Done
                    } else if variance > 0 {
                        VarianceStatus::Behind
                    } else if variance < 0 {
                        VarianceStatus::Ahead
                    } else {
                        VarianceStatus::OnTrack
                    };
                    (variance, status)
                }
            };

            match status {
                VarianceStatus::Done => {
                    summary.done += 1;
                    summary.on_track += 1;
                }
                VarianceStatus::Behind => summary.behind += 1,
                VarianceStatus::Ahead => summary.ahead += 1,
                VarianceStatus::OnTrack => summary.on_track += 1,
                VarianceStatus::NoBaseline => summary.no_baseline += 1,
            }

            items.push(ItemVariance {
                number: item.number,
                title: item.title.clone(),
                baseline_start: fields.baseline_start,
                baseline_target: fields.baseline_target,
                current_start: fields.start_date,
                current_target: fields.target_date,
                variance_days,
                status,
            });
        }

        VarianceReport { items, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{IssueState, Item};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(number: u64) -> Item {
        Item::new(format!("I{number}"), number, format!("Item {number}"))
    }

    #[test]
    fn test_baseline_plan_only_fills_unset() {
        let mut fresh = item(1);
        fresh.fields.start_date = Some(date(2024, 1, 1));
        fresh.fields.target_date = Some(date(2024, 1, 17));

        let mut stamped = item(2);
        stamped.fields.start_date = Some(date(2024, 1, 1));
        stamped.fields.target_date = Some(date(2024, 1, 17));
        stamped.fields.baseline_start = Some(date(2024, 1, 1));
        stamped.fields.baseline_target = Some(date(2024, 1, 10));

        let store = ItemStore::from_items(vec![fresh, stamped]);
        let calendar = WorkingCalendar::default();
        let plan = BaselineService::new(&store, &calendar).baseline_plan();

        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|w| w.number == 1));
        assert!(plan.iter().any(|w| w.field == LogicalField::BaselineStart));
        assert!(plan.iter().any(|w| w.field == LogicalField::BaselineTarget));
    }

    #[test]
    fn test_baseline_plan_is_idempotent() {
        let mut stamped = item(1);
        stamped.fields.start_date = Some(date(2024, 1, 1));
        stamped.fields.target_date = Some(date(2024, 1, 17));
        stamped.fields.baseline_start = Some(date(2024, 1, 1));
        stamped.fields.baseline_target = Some(date(2024, 1, 17));

        let store = ItemStore::from_items(vec![stamped]);
        let calendar = WorkingCalendar::default();
        assert!(BaselineService::new(&store, &calendar)
            .baseline_plan()
            .is_empty());
    }

    #[test]
    fn test_variance_signs() {
        let mut behind = item(1);
        behind.fields.baseline_target = Some(date(2024, 1, 10));
        behind.fields.target_date = Some(date(2024, 1, 17));

        let mut ahead = item(2);
        ahead.fields.baseline_target = Some(date(2024, 1, 17));
        ahead.fields.target_date = Some(date(2024, 1, 10));

        let mut on_track = item(3);
        on_track.fields.baseline_target = Some(date(2024, 1, 10));
        on_track.fields.target_date = Some(date(2024, 1, 10));

        let no_baseline = item(4);

        let store = ItemStore::from_items(vec![behind, ahead, on_track, no_baseline]);
        let calendar = WorkingCalendar::default();
        let report = BaselineService::new(&store, &calendar).variance_report();

        assert_eq!(report.items[0].variance_days, 5);
        assert_eq!(report.items[0].status, VarianceStatus::Behind);
        assert_eq!(report.items[1].variance_days, -5);
        assert_eq!(report.items[1].status, VarianceStatus::Ahead);
        assert_eq!(report.items[2].variance_days, 0);
        assert_eq!(report.items[2].status, VarianceStatus::OnTrack);
        assert_eq!(report.items[3].status, VarianceStatus::NoBaseline);

        assert_eq!(
            report.summary,
            VarianceSummary {
                ahead: 1,
                on_track: 1,
                behind: 1,
                no_baseline: 1,
                done: 0,
            }
        );
    }

    #[test]
    fn test_done_counts_into_on_track() {
        let mut done = item(1);
        done.state = IssueState::Closed;
        done.fields.baseline_target = Some(date(2024, 1, 10));
        done.fields.target_date = Some(date(2024, 1, 17));

        let store = ItemStore::from_items(vec![done]);
        let calendar = WorkingCalendar::default();
        let report = BaselineService::new(&store, &calendar).variance_report();

        assert_eq!(report.items[0].status, VarianceStatus::Done);
        assert_eq!(report.summary.done, 1);
        assert_eq!(report.summary.on_track, 1);
        assert_eq!(report.summary.behind, 0);
    }
}
