//! Confidence value object module
//!
//! Qualitative estimate confidence and the mapping from confidence to
//! buffer working days added on top of an item's estimate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Confidence in an item's estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Parses an upstream single-select value; unknown values are None
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "High" => Some(Confidence::High),
            "Medium" => Some(Confidence::Medium),
            "Low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }

    pub const ALL: [Confidence; 3] = [Confidence::High, Confidence::Medium, Confidence::Low];
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from confidence to buffer working days
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceTable(HashMap<Confidence, u32>);

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self(HashMap::from([
            (Confidence::High, 0),
            (Confidence::Medium, 2),
            (Confidence::Low, 5),
        ]))
    }
}

impl ConfidenceTable {
    /// Buffer days for an item's confidence; a missing confidence falls
    /// back to the Medium buffer
    pub fn buffer_days(&self, confidence: Option<Confidence>) -> u32 {
        let confidence = confidence.unwrap_or(Confidence::Medium);
        self.0
            .get(&confidence)
            .copied()
            .unwrap_or_else(|| *Self::default().0.get(&Confidence::Medium).unwrap_or(&2))
    }

    pub fn set(&mut self, confidence: Confidence, days: u32) {
        self.0.insert(confidence, days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffers() {
        let table = ConfidenceTable::default();
        assert_eq!(table.buffer_days(Some(Confidence::High)), 0);
        assert_eq!(table.buffer_days(Some(Confidence::Medium)), 2);
        assert_eq!(table.buffer_days(Some(Confidence::Low)), 5);
    }

    #[test]
    fn test_missing_confidence_uses_medium() {
        let table = ConfidenceTable::default();
        assert_eq!(table.buffer_days(None), 2);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Confidence::parse("Low"), Some(Confidence::Low));
        assert_eq!(Confidence::parse("low"), None);
    }
}
