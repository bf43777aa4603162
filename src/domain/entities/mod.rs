pub mod item;
pub mod installation;
pub mod project;
pub mod schedule;
pub mod audit;
pub mod risk_record;

pub use item::{Assignee, FieldValues, IssueState, Item, ItemKind, Milestone};
pub use installation::{Installation, InstallationSettings, OwnerKind, PlanTier};
pub use project::{FieldIdCache, LogicalField, Project};
pub use schedule::{ComputedDates, RecalculationOutcome};
pub use audit::AuditEntry;
pub use risk_record::{RiskRecord, RiskSeverity, RiskStatus};
