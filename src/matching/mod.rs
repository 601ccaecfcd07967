//! The staged matching funnel: retrieve -> evaluate -> upsert
//!
//! `CandidateRetriever` narrows the pool with vector similarity plus the hard
//! geo bound, `DeepEvaluator` scores each short-listed pair with one full-
//! context LLM call, and `MatchEngine` drives the funnel and persists results
//! through the match store.

mod engine;
mod evaluator;
mod retriever;

pub use engine::MatchAllReport;
pub use engine::MatchEngine;
pub use engine::MatchJobReport;
pub use engine::MatchedCandidate;
pub use evaluator::DeepEvaluator;
pub use evaluator::EvaluationResult;
pub use retriever::CandidateRetriever;
pub use retriever::RankedCandidate;

/// Round to a fixed number of decimal places
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Clamp a similarity or score into [0, 1]
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_places() {
        assert!((round_to(0.912_345, 4) - 0.9123).abs() < 1e-12);
        assert!((round_to(12.349, 1) - 12.3).abs() < 1e-12);
        assert!((round_to(12.35, 1) - 12.4).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_unit_bounds() {
        assert!((clamp_unit(1.4) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_unit(-0.2) - 0.0).abs() < f64::EPSILON);
        assert!((clamp_unit(0.5) - 0.5).abs() < f64::EPSILON);
    }
}
