//! Field setup module
//!
//! Ensures the fields the engine writes exist on an upstream project.
//! Existence is checked with a trimmed, case-folded comparison; creation
//! uses the exact display names. Single-select options get colors from a
//! fixed eight-color palette, cycled deterministically.

use std::collections::HashMap;
use tracing::info;

use crate::domain::entities::{FieldIdCache, LogicalField, PlanTier};
use crate::domain::repositories::{ProjectRef, ProjectSource, SelectOption};
use crate::domain::value_objects::{Confidence, Estimate};
use crate::error::EngineError;

/// Upstream single-select color palette, cycled by option index
const COLOR_PALETTE: [&str; 8] = [
    "GRAY", "BLUE", "GREEN", "YELLOW", "ORANGE", "RED", "PINK", "PURPLE",
];

/// Fields the setup pass can provision; Status and Percent Complete are
/// expected to exist upstream already
const CREATABLE_FIELDS: [LogicalField; 7] = [
    LogicalField::StartDate,
    LogicalField::TargetDate,
    LogicalField::ActualEndDate,
    LogicalField::BaselineStart,
    LogicalField::BaselineTarget,
    LogicalField::Estimate,
    LogicalField::Confidence,
];

/// Result of one setup pass
#[derive(Debug, Default)]
pub struct FieldSetupOutcome {
    pub field_ids: FieldIdCache,
    /// Display names of fields created by this pass
    pub created: Vec<String>,
}

fn folded(name: &str) -> String {
    name.trim().to_lowercase()
}

fn select_options(names: &[&str]) -> Vec<SelectOption> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| SelectOption {
            name: (*name).to_string(),
            color: COLOR_PALETTE[i % COLOR_PALETTE.len()].to_string(),
        })
        .collect()
}

/// Resolves field ids for all nine logical fields, creating missing ones
///
/// Pro-tier fields (Baseline Start, Baseline Target, Confidence) are only
/// created when the installation is on the Pro plan; existing ones are
/// still resolved regardless of plan.
pub async fn ensure_fields(
    source: &dyn ProjectSource,
    project: &ProjectRef,
    plan: PlanTier,
) -> Result<FieldSetupOutcome, EngineError> {
    let existing = source.list_fields(project).await?;
    let by_folded_name: HashMap<String, &crate::domain::repositories::FieldDef> = existing
        .iter()
        .map(|field| (folded(&field.name), field))
        .collect();

    let mut outcome = FieldSetupOutcome::default();

    for field in LogicalField::ALL {
        let display_name = field.display_name();

        if let Some(found) = by_folded_name.get(&folded(display_name)) {
            outcome.field_ids.set(field, found.id.clone());
            continue;
        }

        if !CREATABLE_FIELDS.contains(&field) {
            continue;
        }
        if field.is_pro_only() && plan != PlanTier::Pro {
            continue;
        }

        let created = match field {
            LogicalField::Estimate => {
                let names: Vec<&str> = Estimate::ALL.iter().map(|e| e.as_str()).collect();
                source
                    .create_single_select_field(project, display_name, &select_options(&names))
                    .await?
            }
            LogicalField::Confidence => {
                let names: Vec<&str> = Confidence::ALL.iter().map(|c| c.as_str()).collect();
                source
                    .create_single_select_field(project, display_name, &select_options(&names))
                    .await?
            }
            _ => source.create_date_field(project, display_name).await?,
        };

        info!(
            "created field '{}' on {}/{}",
            display_name, project.owner, project.project_number
        );
        outcome.field_ids.set(field, created.id);
        outcome.created.push(display_name.to_string());
    }

    Ok(outcome)
}

/// Resolves field ids by exact display-name match without creating anything
pub async fn resolve_field_ids(
    source: &dyn ProjectSource,
    project: &ProjectRef,
) -> Result<FieldIdCache, EngineError> {
    let existing = source.list_fields(project).await?;
    let mut cache = FieldIdCache::default();

    for field in LogicalField::ALL {
        if let Some(found) = existing
            .iter()
            .find(|def| def.name == field.display_name())
        {
            cache.set(field, found.id.clone());
        }
    }

    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::OwnerKind;
    use crate::domain::repositories::{FieldDef, MockProjectSource};

    fn project_ref() -> ProjectRef {
        ProjectRef {
            owner: "acme".to_string(),
            owner_kind: OwnerKind::Organization,
            project_number: 1,
            project_node_id: "PVT_1".to_string(),
            installation_id: 42,
        }
    }

    fn field(id: &str, name: &str, data_type: &str) -> FieldDef {
        FieldDef {
            id: id.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
        }
    }

    #[tokio::test]
    async fn test_existing_fields_resolved_case_folded() {
        let mut source = MockProjectSource::new();
        source.expect_list_fields().returning(|_| {
            Ok(vec![
                // Different casing still counts as existing
                field("F1", "start date", "DATE"),
                field("F2", "Target Date", "DATE"),
                field("F3", "Actual End Date", "DATE"),
                field("F4", "Estimate", "SINGLE_SELECT"),
                field("F5", "Status", "SINGLE_SELECT"),
                field("F6", "Percent Complete", "TEXT"),
            ])
        });
        // Free plan: only pro-gated fields stay missing, nothing else to create
        source.expect_create_date_field().never();

        let outcome = ensure_fields(&source, &project_ref(), PlanTier::Free)
            .await
            .unwrap();

        assert_eq!(outcome.field_ids.get(LogicalField::StartDate), Some("F1"));
        assert_eq!(outcome.field_ids.get(LogicalField::Estimate), Some("F4"));
        assert!(outcome.created.is_empty());
        assert!(outcome.field_ids.get(LogicalField::BaselineStart).is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_created_on_pro() {
        let mut source = MockProjectSource::new();
        source.expect_list_fields().returning(|_| {
            Ok(vec![
                field("F5", "Status", "SINGLE_SELECT"),
                field("F6", "Percent Complete", "TEXT"),
            ])
        });
        source
            .expect_create_date_field()
            .times(5)
            .returning(|_, name| Ok(field(&format!("NEW_{name}"), name, "DATE")));
        source
            .expect_create_single_select_field()
            .times(2)
            .returning(|_, name, options| {
                assert!(!options.is_empty());
                Ok(field(&format!("NEW_{name}"), name, "SINGLE_SELECT"))
            });

        let outcome = ensure_fields(&source, &project_ref(), PlanTier::Pro)
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 7);
        assert!(outcome.field_ids.get(LogicalField::BaselineStart).is_some());
        assert!(outcome.field_ids.get(LogicalField::Confidence).is_some());
    }

    #[tokio::test]
    async fn test_free_plan_skips_pro_fields() {
        let mut source = MockProjectSource::new();
        source.expect_list_fields().returning(|_| Ok(vec![]));
        // Start, Target, Actual End are free-tier dates; Estimate is the
        // only free-tier select
        source
            .expect_create_date_field()
            .times(3)
            .returning(|_, name| Ok(field(&format!("NEW_{name}"), name, "DATE")));
        source
            .expect_create_single_select_field()
            .times(1)
            .returning(|_, name, _| Ok(field(&format!("NEW_{name}"), name, "SINGLE_SELECT")));

        let outcome = ensure_fields(&source, &project_ref(), PlanTier::Free)
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 4);
        assert!(outcome.field_ids.get(LogicalField::BaselineTarget).is_none());
    }

    #[test]
    fn test_color_cycle_is_deterministic() {
        let options = select_options(&["A", "B", "C", "D", "E", "F", "G", "H", "I"]);
        assert_eq!(options[0].color, "GRAY");
        assert_eq!(options[7].color, "PURPLE");
        // Ninth option wraps back to the start of the palette
        assert_eq!(options[8].color, "GRAY");
    }
}
