//! Workload value object module

use serde::{Deserialize, Serialize};

/// Normal per-assignee capacity in remaining working days
pub const NORMAL_CAPACITY_DAYS: u32 = 50;
/// Normal per-assignee capacity in open items
pub const NORMAL_CAPACITY_ITEMS: usize = 5;

/// Workload bucket for one assignee
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadBucket {
    Overloaded,
    High,
    Low,
    Normal,
}

impl WorkloadBucket {
    /// Buckets an assignee by remaining working days and open item count
    pub fn classify(remaining_days: u32, open_items: usize) -> Self {
        if remaining_days > 75 || open_items > 7 {
            WorkloadBucket::Overloaded
        } else if remaining_days > NORMAL_CAPACITY_DAYS || open_items > NORMAL_CAPACITY_ITEMS {
            WorkloadBucket::High
        } else if remaining_days < 15 && open_items < 2 {
            WorkloadBucket::Low
        } else {
            WorkloadBucket::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadBucket::Overloaded => "overloaded",
            WorkloadBucket::High => "high",
            WorkloadBucket::Low => "low",
            WorkloadBucket::Normal => "normal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(WorkloadBucket::classify(76, 0), WorkloadBucket::Overloaded);
        assert_eq!(WorkloadBucket::classify(0, 8), WorkloadBucket::Overloaded);
        assert_eq!(WorkloadBucket::classify(51, 0), WorkloadBucket::High);
        assert_eq!(WorkloadBucket::classify(20, 6), WorkloadBucket::High);
        assert_eq!(WorkloadBucket::classify(14, 1), WorkloadBucket::Low);
        assert_eq!(WorkloadBucket::classify(30, 3), WorkloadBucket::Normal);
        assert_eq!(WorkloadBucket::classify(14, 2), WorkloadBucket::Normal);
    }
}
