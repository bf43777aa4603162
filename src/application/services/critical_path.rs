//! Critical path analyzer service module
//!
//! CPM forward/backward pass over the blocked-by DAG. Only leaf items carry
//! duration; summary and completed items participate as zero-duration nodes
//! so connectivity through them is preserved without double-counting.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::application::services::ItemStore;
use crate::domain::entities::{ComputedDates, ItemKind};
use crate::error::EngineError;

/// Slack below this magnitude counts as zero (critical)
const SLACK_EPSILON: f64 = 1e-3;

/// CPM metrics for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpmNode {
    pub number: u64,
    pub title: String,
    pub duration: f64,
    pub early_start: f64,
    pub early_finish: f64,
    pub late_start: f64,
    pub late_finish: f64,
    pub slack: f64,
    pub is_critical: bool,
}

/// Result of the critical-path analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpmAnalysis {
    /// Critical nodes sorted by early start
    pub critical_path: Vec<CpmNode>,
    /// Non-critical nodes sorted ascending by slack
    pub nodes_with_slack: Vec<CpmNode>,
    /// Max early finish over all items (working days)
    pub project_end: f64,
    /// Sum of durations along the critical path
    pub total_duration: f64,
}

/// CPM analyzer over one project snapshot
pub struct CriticalPathAnalyzer<'a> {
    store: &'a ItemStore,
    dates: &'a HashMap<u64, ComputedDates>,
}

impl<'a> CriticalPathAnalyzer<'a> {
    pub fn new(store: &'a ItemStore, dates: &'a HashMap<u64, ComputedDates>) -> Self {
        Self { store, dates }
    }

    /// Scheduled span of a node in working days; zero for non-leaves
    fn duration(&self, number: u64) -> f64 {
        match self.store.kind(number) {
            Some(ItemKind::Leaf) => self
                .dates
                .get(&number)
                .map(|d| f64::from(d.duration_days + d.buffer_days))
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Runs the forward and backward passes and buckets nodes by slack
    pub fn analyze(&self) -> Result<CpmAnalysis, EngineError> {
        let mut graph: DiGraph<u64, ()> = DiGraph::new();
        let mut indices: HashMap<u64, NodeIndex> = HashMap::new();

        for &number in self.store.numbers_in_order() {
            let idx = graph.add_node(number);
            indices.insert(number, idx);
        }
        for &number in self.store.numbers_in_order() {
            for &blocker in self.store.blockers_of(number) {
                if let (Some(&from), Some(&to)) = (indices.get(&blocker), indices.get(&number)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let order = toposort(&graph, None)
            .map_err(|_| EngineError::Validation("circular dependency detected".to_string()))?;

        let mut early_start: HashMap<u64, f64> = HashMap::new();
        let mut early_finish: HashMap<u64, f64> = HashMap::new();

        for &idx in &order {
            let number = graph[idx];
            let es = graph
                .neighbors_directed(idx, petgraph::Direction::Incoming)
                .map(|pred| early_finish[&graph[pred]])
                .fold(0.0, f64::max);
            early_start.insert(number, es);
            early_finish.insert(number, es + self.duration(number));
        }

        let project_end = early_finish.values().copied().fold(0.0, f64::max);

        let mut late_finish: HashMap<u64, f64> = HashMap::new();
        let mut late_start: HashMap<u64, f64> = HashMap::new();

        for &idx in order.iter().rev() {
            let number = graph[idx];
            let lf = graph
                .neighbors_directed(idx, petgraph::Direction::Outgoing)
                .map(|succ| late_start[&graph[succ]])
                .fold(f64::INFINITY, f64::min);
            let lf = if lf.is_infinite() { project_end } else { lf };
            late_finish.insert(number, lf);
            late_start.insert(number, lf - self.duration(number));
        }

        let mut critical = Vec::new();
        let mut slack_nodes = Vec::new();

        for &number in self.store.numbers_in_order() {
            let title = self
                .store
                .get(number)
                .map(|item| item.title.clone())
                .unwrap_or_default();
            let slack = late_start[&number] - early_start[&number];
            let node = CpmNode {
                number,
                title,
                duration: self.duration(number),
                early_start: early_start[&number],
                early_finish: early_finish[&number],
                late_start: late_start[&number],
                late_finish: late_finish[&number],
                slack,
                is_critical: slack.abs() < SLACK_EPSILON,
            };
            if node.is_critical {
                critical.push(node);
            } else {
                slack_nodes.push(node);
            }
        }

        critical.sort_by(|a, b| {
            a.early_start
                .partial_cmp(&b.early_start)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.number.cmp(&b.number))
        });
        slack_nodes.sort_by(|a, b| {
            a.slack
                .partial_cmp(&b.slack)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.number.cmp(&b.number))
        });

        let total_duration = critical.iter().map(|n| n.duration).sum();

        Ok(CpmAnalysis {
            critical_path: critical,
            nodes_with_slack: slack_nodes,
            project_end,
            total_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{DateEngine, WorkingCalendar};
    use crate::domain::entities::Item;
    use crate::domain::value_objects::{Confidence, ConfidenceTable, Estimate, EstimateTable};
    use chrono::NaiveDate;

    fn leaf(number: u64, estimate: Estimate) -> Item {
        let mut item = Item::new(format!("I{number}"), number, format!("Item {number}"));
        item.fields.estimate = Some(estimate);
        item.fields.confidence = Some(Confidence::High);
        item
    }

    fn analyze(items: Vec<Item>) -> CpmAnalysis {
        let store = ItemStore::from_items(items);
        let calendar = WorkingCalendar::default();
        let estimates = EstimateTable::default();
        let confidence = ConfidenceTable::default();
        let engine = DateEngine::new(
            &store,
            &calendar,
            &estimates,
            &confidence,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let computation = engine.compute();
        CriticalPathAnalyzer::new(&store, &computation.dates)
            .analyze()
            .unwrap()
    }

    #[test]
    fn test_longest_chain_is_critical() {
        // 1 -> 2 -> 4 (5 + 10 days) vs 3 -> 4 (2 days)
        let a = leaf(1, Estimate::S);
        let mut b = leaf(2, Estimate::M);
        b.blocked_by = vec![1];
        let c = leaf(3, Estimate::Xs);
        let mut d = leaf(4, Estimate::S);
        d.blocked_by = vec![2, 3];

        let analysis = analyze(vec![a, b, c, d]);

        let critical: Vec<u64> = analysis.critical_path.iter().map(|n| n.number).collect();
        assert_eq!(critical, vec![1, 2, 4]);
        assert_eq!(analysis.project_end, 20.0);
        assert_eq!(analysis.total_duration, analysis.project_end);

        let slack_only: Vec<u64> = analysis.nodes_with_slack.iter().map(|n| n.number).collect();
        assert_eq!(slack_only, vec![3]);
        // Node 3 can slip by the difference of the two chains into node 4
        assert_eq!(analysis.nodes_with_slack[0].slack, 13.0);
    }

    #[test]
    fn test_critical_nodes_have_zero_slack() {
        let a = leaf(1, Estimate::M);
        let mut b = leaf(2, Estimate::M);
        b.blocked_by = vec![1];

        let analysis = analyze(vec![a, b]);
        assert!(analysis
            .critical_path
            .iter()
            .all(|n| n.slack.abs() < SLACK_EPSILON));
        assert!(analysis.nodes_with_slack.is_empty());
    }

    #[test]
    fn test_independent_items_all_critical_or_slack() {
        let a = leaf(1, Estimate::M);
        let b = leaf(2, Estimate::S);

        let analysis = analyze(vec![a, b]);
        // The longer item defines project end and is critical
        assert_eq!(analysis.project_end, 10.0);
        assert_eq!(analysis.critical_path.len(), 1);
        assert_eq!(analysis.critical_path[0].number, 1);
        assert_eq!(analysis.nodes_with_slack[0].number, 2);
        assert_eq!(analysis.nodes_with_slack[0].slack, 5.0);
    }

    #[test]
    fn test_node_duration_includes_confidence_buffer() {
        // A leaf's CPM span is its scheduled span: estimate plus buffer
        let mut a = leaf(1, Estimate::S);
        a.fields.confidence = Some(Confidence::Medium);
        let mut b = leaf(2, Estimate::S);
        b.fields.confidence = Some(Confidence::Low);
        b.blocked_by = vec![1];

        let analysis = analyze(vec![a, b]);

        // S (5) + Medium buffer (2), then S (5) + Low buffer (5)
        assert_eq!(analysis.critical_path[0].duration, 7.0);
        assert_eq!(analysis.critical_path[1].duration, 10.0);
        assert_eq!(analysis.critical_path[1].early_start, 7.0);
        assert_eq!(analysis.project_end, 17.0);
        assert_eq!(analysis.total_duration, 17.0);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut a = leaf(1, Estimate::S);
        a.blocked_by = vec![2];
        let mut b = leaf(2, Estimate::S);
        b.blocked_by = vec![1];

        let store = ItemStore::from_items(vec![a, b]);
        let dates = HashMap::new();
        let result = CriticalPathAnalyzer::new(&store, &dates).analyze();
        assert!(result.is_err());
    }
}
