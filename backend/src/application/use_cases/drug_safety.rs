use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::application::dto::DrugSafetyReport;
use crate::application::ports::DrugLabelSource;

/// Drugs always checked when mentioned anywhere in the text
pub const KNOWN_DRUGS: [&str; 11] = [
    "metformin",
    "insulin",
    "ibuprofen",
    "aspirin",
    "atorvastatin",
    "amlodipine",
    "lisinopril",
    "paracetamol",
    "amoxicillin",
    "ciprofloxacin",
    "warfarin",
];

/// Heading placed between a treatment plan and its safety notes
pub const SAFETY_NOTES_HEADER: &str = "\n\n---\n\nSafety Notes (FDA-augmented):\n";
pub const NO_CANDIDATES_NOTE: &str = "No drug candidates found for FDA safety checks.";

fn drug_name_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    // Words ending in common drug-name suffixes
    INSTANCE.get_or_init(|| {
        Regex::new(r"\b([a-z]{3,20}(?:in|ol|ide|ene|ine|cillin))\b")
            .expect("drug name pattern is valid")
    })
}

/// Likely drug names in free text, lower-cased, sorted and de-duplicated.
///
/// Suffix matching is a heuristic and picks up ordinary words such as
/// "routine"; the label lookup filters those out by finding nothing.
pub fn extract_drug_candidates(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: BTreeSet<String> = KNOWN_DRUGS
        .iter()
        .filter(|drug| lower.contains(*drug))
        .map(|drug| drug.to_string())
        .collect();

    for capture in drug_name_regex().captures_iter(&lower) {
        found.insert(capture[1].to_string());
    }

    found.into_iter().collect()
}

fn title_case(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut previous_is_letter = false;
    for c in word.chars() {
        if previous_is_letter {
            result.extend(c.to_lowercase());
        } else {
            result.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    result
}

/// Render label lookups as the safety-notes block
pub fn render_safety_notes(reports: &[DrugSafetyReport]) -> String {
    if reports.is_empty() {
        return NO_CANDIDATES_NOTE.to_string();
    }

    reports
        .iter()
        .map(|report| {
            format!(
                "🔹 {}\n- FDA Warnings (brand/generic): {}/{}\n  * Summary: {}\n",
                title_case(&report.drug_name),
                report.brand,
                report.generic,
                report.warnings
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Use case for checking every drug mentioned in a text against label data
pub struct CheckDrugSafety<'a> {
    source: &'a dyn DrugLabelSource,
}

impl<'a> CheckDrugSafety<'a> {
    pub fn new(source: &'a dyn DrugLabelSource) -> Self {
        Self { source }
    }

    /// Look up each candidate in turn, keeping candidate order
    pub async fn execute(&self, text: &str) -> Vec<DrugSafetyReport> {
        let candidates = extract_drug_candidates(text);
        debug!("Checking {} drug candidates", candidates.len());

        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            reports.push(self.source.lookup_drug(&candidate).await);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticLabels;

    #[async_trait]
    impl DrugLabelSource for StaticLabels {
        async fn lookup_drug(&self, name: &str) -> DrugSafetyReport {
            if name == "warfarin" {
                DrugSafetyReport {
                    drug_name: name.to_string(),
                    brand: "Coumadin".to_string(),
                    generic: "WARFARIN SODIUM".to_string(),
                    warnings: "Bleeding risk".to_string(),
                    found: true,
                }
            } else {
                DrugSafetyReport::not_found(name)
            }
        }
    }

    #[test]
    fn test_extract_known_and_suffix_matches() {
        let candidates =
            extract_drug_candidates("Start Metformin 500mg and paracetamol; give chloroquine, avoid warfarin.");
        assert_eq!(
            candidates,
            vec!["chloroquine", "metformin", "paracetamol", "warfarin"]
        );
    }

    #[test]
    fn test_extract_deduplicates() {
        let candidates = extract_drug_candidates("Aspirin daily. Stop aspirin if bleeding. ASPIRIN.");
        assert_eq!(candidates, vec!["aspirin"]);
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_drug_candidates("Rest and fluids.").is_empty());
        assert!(extract_drug_candidates("").is_empty());
    }

    #[test]
    fn test_render_safety_notes() {
        let reports = vec![
            DrugSafetyReport {
                drug_name: "warfarin".to_string(),
                brand: "Coumadin".to_string(),
                generic: "WARFARIN SODIUM".to_string(),
                warnings: "Bleeding risk".to_string(),
                found: true,
            },
            DrugSafetyReport::not_found("chloroquine"),
        ];

        assert_eq!(
            render_safety_notes(&reports),
            "🔹 Warfarin\n- FDA Warnings (brand/generic): Coumadin/WARFARIN SODIUM\n  * Summary: Bleeding risk\n\n\n🔹 Chloroquine\n- FDA Warnings (brand/generic): N/A/N/A\n  * Summary: No data found due to search or network error.\n"
        );
        assert_eq!(render_safety_notes(&[]), NO_CANDIDATES_NOTE);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("amoxicillin"), "Amoxicillin");
        assert_eq!(title_case("co-trimoxazole"), "Co-Trimoxazole");
    }

    #[tokio::test]
    async fn test_check_drug_safety() {
        let labels = StaticLabels;
        let reports = CheckDrugSafety::new(&labels)
            .execute("Warfarin 5mg and metformin")
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].drug_name, "metformin");
        assert!(!reports[0].found);
        assert_eq!(reports[1].drug_name, "warfarin");
        assert!(reports[1].found);
    }
}
