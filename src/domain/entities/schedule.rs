//! Schedule entity module
//!
//! Transient per-recomputation outputs of the Date Engine: computed dates
//! per item and the outcome summary of a recalculation pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Computed schedule for one item, valid for a single recomputation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedDates {
    pub number: u64,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    /// The date dependents chain from; differs from `target_date` for
    /// completed items (actual end or closed date)
    pub end_for_dependents: Option<NaiveDate>,
    /// Working days of estimated effort
    pub duration_days: u32,
    /// Working days of confidence buffer
    pub buffer_days: u32,
    pub dependency_count: usize,
    pub is_completed: bool,
    pub is_summary: bool,
    /// Number of children contributing to a summary roll-up
    pub child_count: Option<usize>,
}

impl ComputedDates {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            start_date: None,
            target_date: None,
            end_for_dependents: None,
            duration_days: 0,
            buffer_days: 0,
            dependency_count: 0,
            is_completed: false,
            is_summary: false,
            child_count: None,
        }
    }
}

/// Outcome of one recalculation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationOutcome {
    /// Items whose dates were written upstream
    pub updated: usize,
    /// Items left unchanged or whose writes failed
    pub skipped: usize,
    /// True when the plan cap truncated the processed set
    pub limit_reached: bool,
    pub total_items: usize,
    pub processed_items: usize,
    /// Display names of fields created by the setup pass, if requested
    pub fields_created: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computed_dates_is_empty() {
        let dates = ComputedDates::new(12);
        assert_eq!(dates.number, 12);
        assert!(dates.start_date.is_none());
        assert!(!dates.is_summary);
        assert_eq!(dates.child_count, None);
    }
}
