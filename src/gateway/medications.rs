//! Medication interaction screening.

use serde::{Deserialize, Serialize};

/// Substrings that flag a medication as a likely interaction
const INTERACTION_KEYWORDS: [&str; 4] = ["metformin", "contrast", "alcohol", "nsaids"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResult {
    pub risky: Vec<String>,
    pub safe: Vec<String>,
}

/// Split a comma-separated medication list into risky and safe entries
pub fn check_medications(medications: &str) -> InteractionResult {
    let mut result = InteractionResult::default();

    for entry in medications.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        let lowered = entry.to_lowercase();
        if INTERACTION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            result.risky.push(entry.to_string());
        } else {
            result.safe.push(entry.to_string());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(check_medications(""), InteractionResult::default());
        assert_eq!(check_medications(" , ,"), InteractionResult::default());
    }

    #[test]
    fn test_case_insensitive_split() {
        let result = check_medications("metformin 500mg, Lisinopril ,IV contrast,ibuprofen (NSAIDs)");
        assert_eq!(
            result.risky,
            vec!["metformin 500mg", "IV contrast", "ibuprofen (NSAIDs)"]
        );
        assert_eq!(result.safe, vec!["Lisinopril"]);
    }
}
