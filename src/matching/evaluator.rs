//! Deep evaluation: one full-context LLM call per candidate-job pair

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::clamp_unit;
use crate::config::LlmConfig;
use crate::cost::CostTracker;
use crate::embeddings::text::render_candidate_document;
use crate::embeddings::text::render_job_document;
use crate::llm::prompts::MatchPrompts;
use crate::llm::strip_code_fences;
use crate::llm::LlmClient;
use crate::models::Candidate;
use crate::models::Job;
use crate::profile::profile_summary_text;

const MAX_LIST_ENTRIES: usize = 3;

/// Calibrated compatibility verdict for one pair.
///
/// A failed call still yields a result (zero score, `success: false`) so the
/// caller can persist "we tried and failed" instead of silently dropping the
/// pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub success: bool,
    pub score: f64,
    pub explanation: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub risks: Vec<String>,
    pub error: Option<String>,
}

impl EvaluationResult {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            score: 0.0,
            explanation: format!("Evaluation failed: {error}"),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            risks: Vec::new(),
            error: Some(error),
        }
    }
}

/// Scores retrieved pairs with the complete, untruncated documents of both
/// sides. No retry at this layer; retries are a batch-level concern.
pub struct DeepEvaluator {
    llm: Arc<LlmClient>,
    costs: Arc<CostTracker>,
    llm_config: LlmConfig,
}

impl DeepEvaluator {
    pub fn new(llm: Arc<LlmClient>, costs: Arc<CostTracker>, llm_config: LlmConfig) -> Self {
        Self {
            llm,
            costs,
            llm_config,
        }
    }

    /// Evaluate one candidate against one job
    pub async fn evaluate(&self, job: &Job, candidate: &Candidate) -> EvaluationResult {
        let user = build_evaluation_content(job, candidate);

        let completion = match self
            .llm
            .complete(&MatchPrompts::deep_evaluation_system(), &user)
            .await
        {
            Ok(completion) => completion,
            Err(e) => return EvaluationResult::failed(e.to_string()),
        };

        self.costs.record(
            completion.input_tokens,
            completion.output_tokens,
            self.llm_config.price_per_1k_input,
            self.llm_config.price_per_1k_output,
        );

        match parse_evaluation(&completion.content) {
            Ok(result) => result,
            Err(error) => EvaluationResult::failed(error),
        }
    }
}

/// Build the evaluation prompt content: full documents plus the cached
/// structured profiles when present.
fn build_evaluation_content(job: &Job, candidate: &Candidate) -> String {
    let mut job_text = render_job_document(job);
    if let Some(profile) = &job.profile {
        job_text.push_str("\n\nRecruiter analysis:\n");
        job_text.push_str(&profile_summary_text(&profile.0));
    }

    let mut candidate_text = render_candidate_document(candidate);
    if let Some(profile) = &candidate.profile {
        candidate_text.push_str("\n\nRecruiter analysis:\n");
        candidate_text.push_str(&profile_summary_text(&profile.0));
    }

    let mut values = HashMap::new();
    values.insert("job".to_string(), job_text);
    values.insert("candidate".to_string(), candidate_text);
    MatchPrompts::deep_evaluation_user().render(&values)
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    score: Option<f64>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
}

/// Parse and validate a model completion; clamps the score into [0, 1] and
/// truncates each rationale list to 3 entries.
fn parse_evaluation(content: &str) -> std::result::Result<EvaluationResult, String> {
    let raw: RawEvaluation = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| format!("malformed evaluation JSON: {e}"))?;

    let score = raw.score.ok_or_else(|| "missing score".to_string())?;
    if !score.is_finite() {
        return Err("non-finite score".to_string());
    }

    Ok(EvaluationResult {
        success: true,
        score: clamp_unit(score),
        explanation: raw.explanation.unwrap_or_default(),
        strengths: truncate_list(raw.strengths),
        weaknesses: truncate_list(raw.weaknesses),
        risks: truncate_list(raw.risks),
        error: None,
    })
}

fn truncate_list(mut list: Vec<String>) -> Vec<String> {
    list.truncate(MAX_LIST_ENTRIES);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_evaluation() {
        let content = r#"{
            "score": 0.82,
            "explanation": "Strong overlap on core accounting skills.",
            "strengths": ["SAP FI depth", "Team lead experience"],
            "weaknesses": ["No IFRS exposure"],
            "risks": []
        }"#;

        let result = parse_evaluation(content).unwrap();
        assert!(result.success);
        assert!((result.score - 0.82).abs() < 1e-12);
        assert_eq!(result.strengths.len(), 2);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let high = parse_evaluation(r#"{"score": 1.4, "explanation": "x"}"#).unwrap();
        assert!((high.score - 1.0).abs() < f64::EPSILON);

        let low = parse_evaluation(r#"{"score": -0.2, "explanation": "x"}"#).unwrap();
        assert!((low.score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lists_truncated_to_three() {
        let content = r#"{
            "score": 0.5,
            "strengths": ["a", "b", "c", "d", "e"],
            "weaknesses": ["a", "b", "c", "d"],
            "risks": ["a", "b", "c", "d"]
        }"#;

        let result = parse_evaluation(content).unwrap();
        assert_eq!(result.strengths.len(), 3);
        assert_eq!(result.weaknesses.len(), 3);
        assert_eq!(result.risks.len(), 3);
    }

    #[test]
    fn test_malformed_json_reports_failure() {
        assert!(parse_evaluation("the candidate looks great!").is_err());
        assert!(parse_evaluation(r#"{"explanation": "no score"}"#).is_err());

        let result = EvaluationResult::failed("malformed evaluation JSON".to_string());
        assert!(!result.success);
        assert!((result.score - 0.0).abs() < f64::EPSILON);
        assert!(result.explanation.contains("Evaluation failed"));
    }

    #[test]
    fn test_fenced_completion_parses() {
        let content = "```json\n{\"score\": 0.7}\n```";
        let result = parse_evaluation(content).unwrap();
        assert!((result.score - 0.7).abs() < 1e-12);
    }
}
