//! Date engine service module
//!
//! Computes start and target dates for every item of one project snapshot:
//! topological ordering over the blocked-by graph, per-item date
//! propagation through the working calendar, and the parent roll-up for
//! summary items. The engine is pure; loading and write-back live in the
//! use-case layer.

use chrono::{Days, NaiveDate};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::application::services::{ItemStore, WorkingCalendar};
use crate::domain::entities::{ComputedDates, ItemKind};
use crate::domain::value_objects::{ConfidenceTable, EstimateTable};

/// Result of one schedule computation
#[derive(Debug)]
pub struct ScheduleComputation {
    /// Computed dates keyed by issue number
    pub dates: HashMap<u64, ComputedDates>,
    /// Topological order used for the pass (blockers before dependents)
    pub order: Vec<u64>,
    /// True when a back-edge was observed in the dependency graph
    pub cycle_detected: bool,
}

/// Date propagation over one project snapshot
pub struct DateEngine<'a> {
    store: &'a ItemStore,
    calendar: &'a WorkingCalendar,
    estimates: &'a EstimateTable,
    confidence: &'a ConfidenceTable,
    today: NaiveDate,
}

impl<'a> DateEngine<'a> {
    pub fn new(
        store: &'a ItemStore,
        calendar: &'a WorkingCalendar,
        estimates: &'a EstimateTable,
        confidence: &'a ConfidenceTable,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            calendar,
            estimates,
            confidence,
            today,
        }
    }

    /// Runs the full pass: topo order, per-item dates, parent roll-up
    pub fn compute(&self) -> ScheduleComputation {
        let (order, cycle_detected) = self.topological_order();
        if cycle_detected {
            warn!("dependency graph contains a cycle; first revisited node treated as scheduled");
        }

        let mut dates: HashMap<u64, ComputedDates> = HashMap::new();

        for &number in &order {
            if let Some(computed) = self.compute_item(number, &dates) {
                dates.insert(number, computed);
            }
        }

        self.roll_up_parents(&mut dates);

        ScheduleComputation {
            dates,
            order,
            cycle_detected,
        }
    }

    /// Depth-first topological sort: mark on enter, append on exit
    ///
    /// Missing blocker numbers are tolerated (the edge is ignored). A node
    /// reached twice terminates recursion, which also breaks accidental
    /// cycles: the first node on a back-edge counts as already scheduled.
    fn topological_order(&self) -> (Vec<u64>, bool) {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut order = Vec::with_capacity(self.store.len());
        let mut cycle = false;

        for &number in self.store.numbers_in_order() {
            self.visit(number, &mut visited, &mut on_stack, &mut order, &mut cycle);
        }

        (order, cycle)
    }

    fn visit(
        &self,
        number: u64,
        visited: &mut HashSet<u64>,
        on_stack: &mut HashSet<u64>,
        order: &mut Vec<u64>,
        cycle: &mut bool,
    ) {
        if self.store.get(number).is_none() {
            return;
        }
        if visited.contains(&number) {
            if on_stack.contains(&number) {
                *cycle = true;
            }
            return;
        }

        visited.insert(number);
        on_stack.insert(number);

        for &blocker in self.store.blockers_of(number) {
            self.visit(blocker, visited, on_stack, order, cycle);
        }

        on_stack.remove(&number);
        order.push(number);
    }

    fn compute_item(&self, number: u64, dates: &HashMap<u64, ComputedDates>) -> Option<ComputedDates> {
        let item = self.store.get(number)?;
        let mut computed = ComputedDates::new(number);
        computed.dependency_count = self.store.blockers_of(number).len();

        match self.store.kind(number) {
            Some(ItemKind::Completed) => {
                computed.is_completed = true;
                computed.duration_days = self.estimates.days(item.fields.estimate);
                computed.end_for_dependents = item.end_for_dependents();
            }
            Some(ItemKind::Summary) => {
                computed.is_summary = true;
            }
            Some(ItemKind::Leaf) | None => {
                let start = self.start_candidate(number, dates);
                let duration = self.estimates.days(item.fields.estimate);
                let buffer = self.confidence.buffer_days(item.fields.confidence);
                let target = self.calendar.add_working_days(start, duration + buffer);

                computed.start_date = Some(start);
                computed.target_date = Some(target);
                computed.end_for_dependents = Some(target);
                computed.duration_days = duration;
                computed.buffer_days = buffer;
            }
        }

        Some(computed)
    }

    /// Latest predecessor end + 1 calendar day, snapped to a working day;
    /// items without a usable predecessor start at the next working day
    /// from today
    fn start_candidate(&self, number: u64, dates: &HashMap<u64, ComputedDates>) -> NaiveDate {
        let latest_end = self
            .store
            .blockers_of(number)
            .iter()
            .filter_map(|blocker| self.predecessor_end(*blocker, dates))
            .max();

        match latest_end {
            Some(end) => self.calendar.next_working_day(end + Days::new(1)),
            None => self.calendar.next_working_day(self.today),
        }
    }

    /// End date a blocker contributes: its computed end, else its computed
    /// target, else the target loaded from upstream. A blocker with none
    /// of these contributes nothing.
    fn predecessor_end(&self, blocker: u64, dates: &HashMap<u64, ComputedDates>) -> Option<NaiveDate> {
        if let Some(computed) = dates.get(&blocker) {
            if let Some(end) = computed.end_for_dependents.or(computed.target_date) {
                return Some(end);
            }
        }
        self.store.get(blocker)?.fields.target_date
    }

    /// Summary dates are min(child start) / max(child target), rolled up
    /// bottom-up so nested summaries see their children's roll-ups
    fn roll_up_parents(&self, dates: &mut HashMap<u64, ComputedDates>) {
        let mut done = HashSet::new();
        for &number in self.store.numbers_in_order() {
            self.roll_up(number, dates, &mut done);
        }
    }

    fn roll_up(&self, number: u64, dates: &mut HashMap<u64, ComputedDates>, done: &mut HashSet<u64>) {
        if !done.insert(number) {
            return;
        }

        let children = self.store.children_of(number).to_vec();
        if children.is_empty() || self.store.get(number).is_none() {
            return;
        }

        for &child in &children {
            self.roll_up(child, dates, done);
        }

        let mut starts = Vec::new();
        let mut targets = Vec::new();
        for &child in &children {
            if let Some(child_dates) = dates.get(&child) {
                if let (Some(start), Some(target)) =
                    (child_dates.start_date, child_dates.target_date)
                {
                    starts.push(start);
                    targets.push(target);
                }
            }
        }

        if starts.is_empty() {
            return;
        }

        if let Some(parent) = dates.get_mut(&number) {
            if !parent.is_completed {
                parent.start_date = starts.iter().min().copied();
                parent.target_date = targets.iter().max().copied();
                parent.child_count = Some(starts.len());
                if parent.end_for_dependents.is_none() {
                    parent.end_for_dependents = parent.target_date;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{IssueState, Item};
    use crate::domain::value_objects::{Confidence, Estimate};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leaf(number: u64) -> Item {
        let mut item = Item::new(format!("I{number}"), number, format!("Item {number}"));
        item.fields.estimate = Some(Estimate::M);
        item.fields.confidence = Some(Confidence::Medium);
        item
    }

    fn engine_fixture(items: Vec<Item>, calendar: WorkingCalendar, today: NaiveDate) -> ScheduleComputation {
        let store = ItemStore::from_items(items);
        let estimates = EstimateTable::default();
        let confidence = ConfidenceTable::default();
        let engine = DateEngine::new(&store, &calendar, &estimates, &confidence, today);
        engine.compute()
    }

    #[test]
    fn test_linear_chain_with_weekend_snap() {
        let a = leaf(1);
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let result = engine_fixture(vec![a, b], WorkingCalendar::default(), date(2024, 1, 1));

        let a_dates = &result.dates[&1];
        assert_eq!(a_dates.start_date, Some(date(2024, 1, 1)));
        assert_eq!(a_dates.target_date, Some(date(2024, 1, 17)));

        let b_dates = &result.dates[&2];
        assert_eq!(b_dates.start_date, Some(date(2024, 1, 18)));
        assert_eq!(b_dates.target_date, Some(date(2024, 2, 5)));
    }

    #[test]
    fn test_holiday_skip_shifts_chain() {
        let a = leaf(1);
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let mut calendar = WorkingCalendar::default();
        calendar.add_holiday(date(2024, 1, 15), false);

        let result = engine_fixture(vec![a, b], calendar, date(2024, 1, 1));

        assert_eq!(result.dates[&1].start_date, Some(date(2024, 1, 1)));
        assert_eq!(result.dates[&1].target_date, Some(date(2024, 1, 18)));
        assert_eq!(result.dates[&2].start_date, Some(date(2024, 1, 19)));
        assert_eq!(result.dates[&2].target_date, Some(date(2024, 2, 6)));
    }

    #[test]
    fn test_parent_roll_up_min_start_max_target() {
        let mut parent = leaf(1);
        parent.sub_issues = vec![2, 3];
        let mut c1 = leaf(2);
        c1.parent = Some(1);
        let mut c2 = leaf(3);
        c2.parent = Some(1);
        // C2 starts after C1 via a dependency
        c2.blocked_by = vec![2];

        let result = engine_fixture(
            vec![parent, c1, c2],
            WorkingCalendar::default(),
            date(2024, 3, 4),
        );

        let p = &result.dates[&1];
        assert!(p.is_summary);
        assert_eq!(p.start_date, result.dates[&2].start_date);
        assert_eq!(p.target_date, result.dates[&3].target_date);
        assert_eq!(p.child_count, Some(2));
    }

    #[test]
    fn test_completed_predecessor_anchors_on_closed_date() {
        let mut a = leaf(1);
        a.state = IssueState::Closed;
        a.closed_at = Some(chrono::Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap());
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let result = engine_fixture(vec![a, b], WorkingCalendar::default(), date(2024, 1, 1));

        // Next working day after 2024-02-03 (Sat) is Monday 2024-02-05
        assert_eq!(result.dates[&2].start_date, Some(date(2024, 2, 5)));
        assert!(result.dates[&1].is_completed);
        assert_eq!(result.dates[&1].start_date, None);
    }

    #[test]
    fn test_blocker_without_dates_contributes_nothing() {
        let mut a = Item::new("I1".to_string(), 1, "No dates".to_string());
        a.state = IssueState::Closed;
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        // A is completed with no closedAt, no actual end, no target
        let result = engine_fixture(vec![a, b], WorkingCalendar::default(), date(2024, 1, 1));

        assert_eq!(result.dates[&2].start_date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_missing_blocker_is_tolerated() {
        let mut b = leaf(2);
        b.blocked_by = vec![999];

        let result = engine_fixture(vec![b], WorkingCalendar::default(), date(2024, 1, 1));
        assert_eq!(result.dates[&2].start_date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_cycle_terminates_and_flags() {
        let mut a = leaf(1);
        a.blocked_by = vec![2];
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let result = engine_fixture(vec![a, b], WorkingCalendar::default(), date(2024, 1, 1));
        assert!(result.cycle_detected);
        assert_eq!(result.dates.len(), 2);
    }

    #[test]
    fn test_start_on_working_day_is_not_advanced() {
        let mut a = leaf(1);
        a.fields.target_date = Some(date(2024, 1, 9));
        a.state = IssueState::Closed;
        a.fields.actual_end_date = Some(date(2024, 1, 9));
        let mut b = leaf(2);
        b.blocked_by = vec![1];

        let result = engine_fixture(vec![a, b], WorkingCalendar::default(), date(2024, 1, 1));
        // 2024-01-09 is a Tuesday; the day after is a working Wednesday
        assert_eq!(result.dates[&2].start_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn test_deterministic_given_identical_inputs() {
        let build = || {
            let a = leaf(1);
            let mut b = leaf(2);
            b.blocked_by = vec![1];
            let mut c = leaf(3);
            c.blocked_by = vec![1, 2];
            engine_fixture(vec![a, b, c], WorkingCalendar::default(), date(2024, 1, 1))
        };

        let first = build();
        let second = build();
        assert_eq!(first.order, second.order);
        for (number, dates) in &first.dates {
            assert_eq!(Some(dates), second.dates.get(number).as_deref());
        }
    }

    #[test]
    fn test_nested_summary_rolls_up_bottom_up() {
        let mut grandparent = leaf(1);
        grandparent.sub_issues = vec![2];
        let mut parent = leaf(2);
        parent.parent = Some(1);
        parent.sub_issues = vec![3, 4];
        let mut c1 = leaf(3);
        c1.parent = Some(2);
        let mut c2 = leaf(4);
        c2.parent = Some(2);
        c2.blocked_by = vec![3];

        let result = engine_fixture(
            vec![grandparent, parent, c1, c2],
            WorkingCalendar::default(),
            date(2024, 1, 1),
        );

        let gp = &result.dates[&1];
        let p = &result.dates[&2];
        assert_eq!(gp.start_date, p.start_date);
        assert_eq!(gp.target_date, p.target_date);
        assert_eq!(p.start_date, result.dates[&3].start_date);
        assert_eq!(p.target_date, result.dates[&4].target_date);
    }
}
