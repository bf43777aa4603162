//! Risk scorer service module
//!
//! Weighted per-item risk evaluation over the current snapshot, plus the
//! project-level aggregation consumed by the risk report endpoint.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::application::services::ItemStore;
use crate::domain::entities::Item;
use crate::domain::value_objects::{Confidence, RiskAssessment, RiskFinding, RiskLevel};

/// Days ahead within which an unfinished item counts as approaching its
/// deadline
const APPROACHING_WINDOW_DAYS: u64 = 5;

/// Project-level risk summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRiskSummary {
    pub total_items: usize,
    pub by_level: HashMap<RiskLevel, usize>,
    pub by_finding: HashMap<RiskFinding, usize>,
    /// Mean score over open items
    pub average_score: f64,
    pub highest_score: u32,
}

/// Full risk report for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub assessments: Vec<RiskAssessment>,
    pub summary: ProjectRiskSummary,
}

/// Evaluates weighted risk findings per item
pub struct RiskScorer<'a> {
    store: &'a ItemStore,
    today: NaiveDate,
}

impl<'a> RiskScorer<'a> {
    pub fn new(store: &'a ItemStore, today: NaiveDate) -> Self {
        Self { store, today }
    }

    /// Scores every item and aggregates the project summary
    pub fn assess_project(&self) -> RiskReport {
        let mut assessments: Vec<RiskAssessment> = self
            .store
            .items()
            .map(|item| self.assess_item(item))
            .collect();
        assessments.sort_by(|a, b| b.score.cmp(&a.score).then(a.number.cmp(&b.number)));

        let mut by_level: HashMap<RiskLevel, usize> = HashMap::new();
        let mut by_finding: HashMap<RiskFinding, usize> = HashMap::new();
        let mut open_count = 0usize;
        let mut open_total = 0u64;
        let mut highest = 0u32;

        for assessment in &assessments {
            *by_level.entry(assessment.level).or_default() += 1;
            for finding in &assessment.findings {
                *by_finding.entry(*finding).or_default() += 1;
            }
            highest = highest.max(assessment.score);

            let completed = self
                .store
                .get(assessment.number)
                .is_some_and(|item| item.is_completed());
            if !completed {
                open_count += 1;
                open_total += u64::from(assessment.score);
            }
        }

        let average_score = if open_count == 0 {
            0.0
        } else {
            open_total as f64 / open_count as f64
        };

        RiskReport {
            summary: ProjectRiskSummary {
                total_items: assessments.len(),
                by_level,
                by_finding,
                average_score,
                highest_score: highest,
            },
            assessments,
        }
    }

    /// Scores one item; completed items are clean by definition
    pub fn assess_item(&self, item: &Item) -> RiskAssessment {
        if item.is_completed() {
            return RiskAssessment::completed(item.number, item.title.clone());
        }

        let mut findings = Vec::new();
        let fields = &item.fields;

        if let Some(target) = fields.target_date {
            if target < self.today {
                findings.push(RiskFinding::Overdue);
            } else if target <= self.today + Days::new(APPROACHING_WINDOW_DAYS)
                && fields.percent_complete.unwrap_or(0) < 80
            {
                findings.push(RiskFinding::ApproachingDeadline);
            }
        } else {
            findings.push(RiskFinding::NoTargetDate);
        }

        if fields.confidence == Some(Confidence::Low) {
            findings.push(RiskFinding::LowConfidence);
        }
        if fields.estimate.is_none() {
            findings.push(RiskFinding::NoEstimate);
        }

        let blocked = self
            .store
            .blockers_of(item.number)
            .iter()
            .filter_map(|blocker| self.store.get(*blocker))
            .any(|blocker| !blocker.is_completed());
        if blocked {
            findings.push(RiskFinding::Blocked);
        }

        if let (Some(baseline), Some(target)) = (fields.baseline_target, fields.target_date) {
            if target > baseline {
                findings.push(RiskFinding::BehindBaseline);
            }
        }

        if fields.target_date.is_some() && fields.start_date.is_none() {
            findings.push(RiskFinding::NoStartDate);
        }

        RiskAssessment::from_findings(item.number, item.title.clone(), findings)
    }
}
