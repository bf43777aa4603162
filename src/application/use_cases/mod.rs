pub mod load_snapshot;
pub mod recalculate_project;
pub mod save_baseline;
pub mod variance_report;
pub mod adjust_schedule;
pub mod analyze_project;

pub use load_snapshot::{load_context, load_snapshot, LoadedSnapshot, ProjectContext};
pub use recalculate_project::RecalculateProject;
pub use save_baseline::{SaveBaseline, SaveBaselineOutcome};
pub use variance_report::GenerateVarianceReport;
pub use adjust_schedule::AdjustSchedule;
pub use analyze_project::{AnalyzeProject, DependencyGraphReport, ProjectRisksReport};
