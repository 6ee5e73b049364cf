use crate::application::dto::GuidelineHit;

pub const NO_GUIDELINES_FOUND: &str = "No guideline passages found in KB.";

/// Excerpts of the hits separated by blank lines, or `None` when there are none
pub fn guideline_context(hits: &[GuidelineHit]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }

    Some(
        hits.iter()
            .map(GuidelineHit::excerpt)
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}
