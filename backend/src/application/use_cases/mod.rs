pub mod drug_safety;
pub mod guideline_context;

pub use drug_safety::{
    extract_drug_candidates, render_safety_notes, CheckDrugSafety, KNOWN_DRUGS,
    NO_CANDIDATES_NOTE, SAFETY_NOTES_HEADER,
};
pub use guideline_context::{guideline_context, NO_GUIDELINES_FOUND};
