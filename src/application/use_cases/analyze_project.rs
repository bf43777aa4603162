//! Project analysis use case module
//!
//! On-demand analysis views over a freshly loaded snapshot: the dependency
//! graph with its critical path, per-assignee workload, milestone roll-ups,
//! and the computed risk report combined with the stored risk register.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::services::{
    CpmAnalysis, CriticalPathAnalyzer, DateEngine, MilestoneAggregator, MilestoneReport,
    ResourceAggregator, ResourceReport, RiskReport, RiskScorer,
};
use crate::application::use_cases::load_snapshot::load_snapshot;
use crate::domain::entities::{ItemKind, RiskRecord};
use crate::domain::repositories::ProjectSource;
use crate::error::EngineError;
use crate::infrastructure::persistence::SqliteStore;

/// One node of the dependency graph view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub number: u64,
    pub title: String,
    pub kind: ItemKind,
    pub dependency_count: usize,
}

/// One blocked-by edge (blocker -> dependent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: u64,
    pub to: u64,
}

/// Aggregate graph statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_items: usize,
    pub total_edges: usize,
    pub items_with_dependencies: usize,
}

/// Dependency endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphReport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub critical_path: CpmAnalysis,
    pub stats: GraphStats,
}

/// Risk endpoint payload: computed assessments plus the stored register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRisksReport {
    #[serde(flatten)]
    pub computed: RiskReport,
    pub register: Vec<RiskRecord>,
}

/// Use case: read-only analysis views for one project
pub struct AnalyzeProject<'a> {
    db: &'a SqliteStore,
    source: &'a dyn ProjectSource,
}

impl<'a> AnalyzeProject<'a> {
    pub fn new(db: &'a SqliteStore, source: &'a dyn ProjectSource) -> Self {
        Self { db, source }
    }

    pub async fn dependencies(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        today: NaiveDate,
    ) -> Result<DependencyGraphReport, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;
        let settings = &snapshot.context.installation.settings;

        let engine = DateEngine::new(
            &snapshot.store,
            &snapshot.context.calendar,
            &settings.estimate_days,
            &settings.confidence_buffer,
            today,
        );
        let computation = engine.compute();

        let critical_path =
            CriticalPathAnalyzer::new(&snapshot.store, &computation.dates).analyze()?;

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for item in snapshot.store.items() {
            nodes.push(GraphNode {
                number: item.number,
                title: item.title.clone(),
                kind: snapshot.store.kind(item.number).unwrap_or(ItemKind::Leaf),
                dependency_count: snapshot.store.blockers_of(item.number).len(),
            });
            for &blocker in snapshot.store.blockers_of(item.number) {
                if snapshot.store.get(blocker).is_some() {
                    edges.push(GraphEdge {
                        from: blocker,
                        to: item.number,
                    });
                }
            }
        }

        let items_with_dependencies = nodes.iter().filter(|n| n.dependency_count > 0).count();
        let stats = GraphStats {
            total_items: nodes.len(),
            total_edges: edges.len(),
            items_with_dependencies,
        };

        Ok(DependencyGraphReport {
            nodes,
            edges,
            critical_path,
            stats,
        })
    }

    pub async fn resources(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
    ) -> Result<ResourceReport, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;
        let settings = &snapshot.context.installation.settings;
        Ok(ResourceAggregator::new(&snapshot.store, &settings.estimate_days).aggregate())
    }

    pub async fn milestones(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        today: NaiveDate,
    ) -> Result<MilestoneReport, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;
        let settings = &snapshot.context.installation.settings;
        Ok(MilestoneAggregator::new(&snapshot.store, &settings.estimate_days, today).aggregate())
    }

    pub async fn risks(
        &self,
        installation_id: i64,
        owner: &str,
        project_number: u64,
        today: NaiveDate,
    ) -> Result<ProjectRisksReport, EngineError> {
        let snapshot =
            load_snapshot(self.db, self.source, installation_id, owner, project_number).await?;

        let computed = RiskScorer::new(&snapshot.store, today).assess_project();
        let register = self.db.list_risks(installation_id, project_number)?;

        Ok(ProjectRisksReport { computed, register })
    }
}
