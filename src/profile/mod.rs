//! Structured profile extraction
//!
//! Turns a candidate's or job's raw document into a compact structured
//! [`Profile`](crate::models::Profile) with one LLM call, cached on the owning
//! entity. Extraction runs at most once per owner: the presence of
//! `profile_extracted_at` is the cache key and nothing in this subsystem
//! re-extracts automatically when the owner's raw data later changes.

mod extractor;
mod render;

pub use extractor::profile_summary_text;
pub use extractor::ExtractBackfillStats;
pub use extractor::ExtractionOutcome;
pub use extractor::ProfileExtractor;
pub use render::render_candidate_text;
pub use render::render_job_text;
pub use render::MIN_EXTRACTION_INPUT_LEN;
