//! Prompt templates for profile extraction and deep evaluation

use std::collections::HashMap;

/// Template for generating prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template with variables
    #[must_use]
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut result = self.template.clone();
        for var in &self.variables {
            if let Some(value) = values.get(var) {
                result = result.replace(&format!("{{{{{var}}}}}"), value);
            }
        }
        result
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next(); // skip second '{'
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

/// Prompt templates used by the matching engine
pub struct MatchPrompts;

impl MatchPrompts {
    /// System instruction for candidate profile extraction
    #[must_use]
    pub fn candidate_profile_system() -> String {
        r#"You are an experienced recruiter analyzing a candidate's CV data.

Return STRICT JSON only, with this exact shape:
{
  "seniority_level": <integer 1-6, 1 = junior assistant, 6 = department head>,
  "trajectory": "<ascending|lateral|descending|entry>",
  "years_experience": <non-negative integer>,
  "summary": "<2-3 sentences describing the candidate's current role and focus>",
  "skills": [{"skill": "<name>", "proficiency": <integer 1-5>, "recency": "<current|recent|dated>", "category": "<short category>"}]
}

List at most 15 skills, most relevant first. No markdown, no commentary."#
            .to_string()
    }

    /// System instruction for job profile extraction
    #[must_use]
    pub fn job_profile_system() -> String {
        r#"You are an experienced recruiter analyzing a job posting.

Return STRICT JSON only, with this exact shape:
{
  "seniority_level": <integer 1-6, 1 = junior assistant, 6 = department head>,
  "years_experience": <required years, non-negative integer>,
  "summary": "<2-3 sentences describing what this role requires>",
  "skills": [{"skill": "<name>", "importance": <integer 1-5>, "category": "<short category>"}]
}

List at most 12 skills, most important first. No markdown, no commentary."#
            .to_string()
    }

    /// System instruction for candidate-job deep evaluation
    #[must_use]
    pub fn deep_evaluation_system() -> String {
        r#"You are an experienced recruiter scoring how well a candidate fits a job.

Score calibration:
- 0.9-1.0: exceptional fit, interview immediately
- 0.7-0.89: strong fit, minor gaps
- 0.5-0.69: plausible fit, notable gaps
- 0.3-0.49: weak fit
- 0.0-0.29: not a fit

Return STRICT JSON only, with this exact shape:
{
  "score": <float 0.0-1.0>,
  "explanation": "<3-5 sentences justifying the score>",
  "strengths": ["<up to 3 entries>"],
  "weaknesses": ["<up to 3 entries>"],
  "risks": ["<up to 3 entries>"]
}

No markdown, no commentary."#
            .to_string()
    }

    /// User-content template for deep evaluation
    #[must_use]
    pub fn deep_evaluation_user() -> PromptTemplate {
        PromptTemplate::new(
            r"=== JOB ===
{{job}}

=== CANDIDATE ===
{{candidate}}

Evaluate how well this candidate fits this job.",
        )
    }
}
