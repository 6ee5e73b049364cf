/// Passages longer than this many characters are shortened for prompts
pub const EXCERPT_TRIGGER_CHARS: usize = 1000;
/// Shortened passages keep at most this many leading characters
pub const EXCERPT_CUT_CHARS: usize = 950;

/// A guideline passage returned by a knowledge-base lookup
#[derive(Debug, Clone, PartialEq)]
pub struct GuidelineHit {
    /// Full stored passage text
    pub passage: String,
    /// Squared Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

impl GuidelineHit {
    pub fn new(passage: impl Into<String>, distance: f32) -> Self {
        Self {
            passage: passage.into(),
            distance,
        }
    }

    /// Passage text as handed to downstream prompts.
    ///
    /// Long passages are cut back to the last word boundary inside the first
    /// `EXCERPT_CUT_CHARS` characters and marked with `...`.
    pub fn excerpt(&self) -> String {
        let passage = self.passage.trim();
        if passage.chars().count() <= EXCERPT_TRIGGER_CHARS {
            return passage.to_string();
        }

        let cut_at = passage
            .char_indices()
            .nth(EXCERPT_CUT_CHARS)
            .map(|(i, _)| i)
            .unwrap_or(passage.len());
        let prefix = &passage[..cut_at];
        let head = prefix.rfind(' ').map(|i| &prefix[..i]).unwrap_or(prefix);

        format!("{}...", head)
    }
}
