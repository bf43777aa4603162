//! Estimate value object module
//!
//! T-shirt size estimates and the per-installation mapping from size to
//! working days of effort.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Working days assumed when an item has no estimate
pub const DEFAULT_ESTIMATE_DAYS: u32 = 10;

/// T-shirt size estimate of an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Estimate {
    #[serde(rename = "XS")]
    Xs,
    S,
    M,
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
}

impl Estimate {
    /// Parses an upstream single-select value; unknown values are None
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "XS" => Some(Estimate::Xs),
            "S" => Some(Estimate::S),
            "M" => Some(Estimate::M),
            "L" => Some(Estimate::L),
            "XL" => Some(Estimate::Xl),
            "XXL" => Some(Estimate::Xxl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Estimate::Xs => "XS",
            Estimate::S => "S",
            Estimate::M => "M",
            Estimate::L => "L",
            Estimate::Xl => "XL",
            Estimate::Xxl => "XXL",
        }
    }

    pub const ALL: [Estimate; 6] = [
        Estimate::Xs,
        Estimate::S,
        Estimate::M,
        Estimate::L,
        Estimate::Xl,
        Estimate::Xxl,
    ];
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from estimate size to working days, operator-editable per
/// installation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateTable(HashMap<Estimate, u32>);

impl Default for EstimateTable {
    fn default() -> Self {
        Self(HashMap::from([
            (Estimate::Xs, 2),
            (Estimate::S, 5),
            (Estimate::M, 10),
            (Estimate::L, 15),
            (Estimate::Xl, 25),
            (Estimate::Xxl, 40),
        ]))
    }
}

impl EstimateTable {
    /// Working days for an item's estimate; missing estimate or missing
    /// table entry falls back to the default
    pub fn days(&self, estimate: Option<Estimate>) -> u32 {
        estimate
            .and_then(|e| self.0.get(&e).copied())
            .unwrap_or(DEFAULT_ESTIMATE_DAYS)
    }

    pub fn set(&mut self, estimate: Estimate, days: u32) {
        self.0.insert(estimate, days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = EstimateTable::default();
        assert_eq!(table.days(Some(Estimate::Xs)), 2);
        assert_eq!(table.days(Some(Estimate::M)), 10);
        assert_eq!(table.days(Some(Estimate::Xxl)), 40);
    }

    #[test]
    fn test_missing_estimate_defaults() {
        let table = EstimateTable::default();
        assert_eq!(table.days(None), DEFAULT_ESTIMATE_DAYS);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Estimate::parse("XL"), Some(Estimate::Xl));
        assert_eq!(Estimate::parse(" M "), Some(Estimate::M));
        assert_eq!(Estimate::parse("xl"), None);
        assert_eq!(Estimate::parse("Huge"), None);
    }

    #[test]
    fn test_operator_override() {
        let mut table = EstimateTable::default();
        table.set(Estimate::M, 8);
        assert_eq!(table.days(Some(Estimate::M)), 8);
    }
}
