pub mod working_calendar;
pub mod item_store;
pub mod date_engine;
pub mod risk_scorer;
pub mod critical_path;
pub mod resource_aggregator;
pub mod milestone_aggregator;
pub mod baseline;

pub use working_calendar::WorkingCalendar;
pub use item_store::ItemStore;
pub use date_engine::{DateEngine, ScheduleComputation};
pub use risk_scorer::{ProjectRiskSummary, RiskReport, RiskScorer};
pub use critical_path::{CpmAnalysis, CpmNode, CriticalPathAnalyzer};
pub use resource_aggregator::{ResourceAggregator, ResourceReport, ResourceSummary};
pub use milestone_aggregator::{MilestoneAggregator, MilestoneReport, MilestoneSummary};
pub use baseline::{BaselineService, BaselineWrite, ItemVariance, VarianceReport, VarianceStatus};
