pub mod estimate;
pub mod confidence;
pub mod risk;
pub mod workload;

pub use estimate::{Estimate, EstimateTable, DEFAULT_ESTIMATE_DAYS};
pub use confidence::{Confidence, ConfidenceTable};
pub use risk::{RiskAssessment, RiskFinding, RiskLevel};
pub use workload::{WorkloadBucket, NORMAL_CAPACITY_DAYS, NORMAL_CAPACITY_ITEMS};
