/// Placeholder used when a label field is missing
pub const NOT_AVAILABLE: &str = "N/A";
/// Warning text used when a lookup produced nothing
pub const NO_DATA_WARNING: &str = "No data found due to search or network error.";

/// Safety information for one drug from the external label database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugSafetyReport {
    pub drug_name: String,
    pub brand: String,
    pub generic: String,
    pub warnings: String,
    pub found: bool,
}

impl DrugSafetyReport {
    /// The typed "nothing found" result
    pub fn not_found(drug_name: impl Into<String>) -> Self {
        Self {
            drug_name: drug_name.into(),
            brand: NOT_AVAILABLE.to_string(),
            generic: NOT_AVAILABLE.to_string(),
            warnings: NO_DATA_WARNING.to_string(),
            found: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_report() {
        let report = DrugSafetyReport::not_found("warfarin");
        assert_eq!(report.drug_name, "warfarin");
        assert_eq!(report.brand, "N/A");
        assert_eq!(report.generic, "N/A");
        assert_eq!(report.warnings, NO_DATA_WARNING);
        assert!(!report.found);
    }
}
