//! Profile extraction service: one LLM call per owner, cached on the entity

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use tracing::warn;

use super::render::render_candidate_text;
use super::render::render_job_text;
use super::render::MIN_EXTRACTION_INPUT_LEN;
use crate::config::LlmConfig;
use crate::cost::CostTracker;
use crate::database::Database;
use crate::llm::prompts::MatchPrompts;
use crate::llm::strip_code_fences;
use crate::llm::LlmClient;
use crate::models::Candidate;
use crate::models::Job;
use crate::models::OwnerKind;
use crate::models::Profile;
use crate::models::SkillEntry;
use crate::models::Trajectory;
use crate::models::MAX_CANDIDATE_SKILLS;
use crate::models::MAX_JOB_SKILLS;
use crate::models::SENIORITY_MAX;
use crate::models::SENIORITY_MIN;

/// Result of one extraction attempt.
///
/// Failures are values, not errors, so batch callers continue past bad items.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(Profile),
    /// Legitimate skip: the owner has too little text to profile
    Skipped { reason: String },
    /// Model timeout, HTTP error, malformed JSON or persistence failure;
    /// the owner's profile is left unset
    Failed { error: String },
}

/// Aggregate stats from a backfill run
#[derive(Debug, Default)]
pub struct ExtractBackfillStats {
    pub total: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub errors: usize,
    /// First N error messages, capped by config
    pub error_samples: Vec<String>,
}

/// Extracts structured profiles via a single role-specific LLM call per owner
pub struct ProfileExtractor {
    db: Arc<Database>,
    llm: Arc<LlmClient>,
    costs: Arc<CostTracker>,
    llm_config: LlmConfig,
    max_errors: usize,
}

impl ProfileExtractor {
    pub fn new(
        db: Arc<Database>,
        llm: Arc<LlmClient>,
        costs: Arc<CostTracker>,
        llm_config: LlmConfig,
        max_errors: usize,
    ) -> Self {
        Self {
            db,
            llm,
            costs,
            llm_config,
            max_errors,
        }
    }

    /// Extract and persist a candidate profile.
    ///
    /// Exactly one model call, no retry; on parse failure or timeout the
    /// candidate's profile fields stay unset.
    pub async fn extract_candidate(&self, candidate: &Candidate) -> ExtractionOutcome {
        let text = render_candidate_text(candidate);
        if text.trim().len() < MIN_EXTRACTION_INPUT_LEN {
            return ExtractionOutcome::Skipped {
                reason: "insufficient_data".to_string(),
            };
        }

        let profile = match self
            .call_model(&MatchPrompts::candidate_profile_system(), &text, OwnerKind::Candidate)
            .await
        {
            Ok(profile) => profile,
            Err(error) => return ExtractionOutcome::Failed { error },
        };

        match self.db.set_candidate_profile(candidate.id, &profile).await {
            Ok(()) => ExtractionOutcome::Extracted(profile),
            Err(e) => ExtractionOutcome::Failed {
                error: format!("failed to persist profile: {e}"),
            },
        }
    }

    /// Extract and persist a job profile
    pub async fn extract_job(&self, job: &Job) -> ExtractionOutcome {
        let text = render_job_text(job);
        if text.trim().len() < MIN_EXTRACTION_INPUT_LEN {
            return ExtractionOutcome::Skipped {
                reason: "insufficient_data".to_string(),
            };
        }

        let profile = match self
            .call_model(&MatchPrompts::job_profile_system(), &text, OwnerKind::Job)
            .await
        {
            Ok(profile) => profile,
            Err(error) => return ExtractionOutcome::Failed { error },
        };

        match self.db.set_job_profile(job.id, &profile).await {
            Ok(()) => ExtractionOutcome::Extracted(profile),
            Err(e) => ExtractionOutcome::Failed {
                error: format!("failed to persist profile: {e}"),
            },
        }
    }

    /// Backfill profiles for every owner lacking one.
    ///
    /// Runs over unprofiled candidates then unprofiled jobs, strictly
    /// sequentially. Failed items are simply picked up again on the next run
    /// since their `profile_extracted_at` stays unset.
    pub async fn extract_all_missing(&self, category: Option<&str>) -> crate::Result<ExtractBackfillStats> {
        let mut stats = ExtractBackfillStats::default();

        let candidates = self.db.list_candidates_missing_profile(category).await?;
        let jobs = self.db.list_jobs_missing_profile(category).await?;
        stats.total = candidates.len() + jobs.len();
        info!(
            "Profile backfill: {} candidates, {} jobs to process",
            candidates.len(),
            jobs.len()
        );

        for candidate in &candidates {
            let outcome = self.extract_candidate(candidate).await;
            record_outcome(&mut stats, outcome, self.max_errors, "candidate", candidate.id);
        }
        for job in &jobs {
            let outcome = self.extract_job(job).await;
            record_outcome(&mut stats, outcome, self.max_errors, "job", job.id);
        }

        info!(
            "Profile backfill complete: {} extracted, {} skipped, {} errors",
            stats.extracted, stats.skipped, stats.errors
        );
        Ok(stats)
    }

    async fn call_model(
        &self,
        system: &str,
        text: &str,
        kind: OwnerKind,
    ) -> std::result::Result<Profile, String> {
        let completion = self
            .llm
            .complete(system, text)
            .await
            .map_err(|e| e.to_string())?;

        self.costs.record(
            completion.input_tokens,
            completion.output_tokens,
            self.llm_config.price_per_1k_input,
            self.llm_config.price_per_1k_output,
        );

        parse_profile(&completion.content, kind)
    }
}

fn record_outcome(
    stats: &mut ExtractBackfillStats,
    outcome: ExtractionOutcome,
    max_errors: usize,
    kind: &str,
    id: uuid::Uuid,
) {
    match outcome {
        ExtractionOutcome::Extracted(_) => stats.extracted += 1,
        ExtractionOutcome::Skipped { .. } => stats.skipped += 1,
        ExtractionOutcome::Failed { error } => {
            warn!("Profile extraction failed for {} {}: {}", kind, id, error);
            stats.errors += 1;
            if stats.error_samples.len() < max_errors {
                stats.error_samples.push(format!("{kind} {id}: {error}"));
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    seniority_level: Option<i64>,
    #[serde(default)]
    trajectory: Option<String>,
    years_experience: Option<i64>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    skills: Vec<RawSkill>,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    skill: String,
    #[serde(alias = "proficiency", alias = "importance", alias = "weight")]
    weight: Option<i64>,
    #[serde(default)]
    recency: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parse and validate a model completion into a `Profile`.
///
/// Out-of-range values are clamped or defaulted on this boundary; malformed
/// JSON is a per-item failure.
fn parse_profile(content: &str, kind: OwnerKind) -> std::result::Result<Profile, String> {
    let raw: RawProfile = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| format!("malformed profile JSON: {e}"))?;

    let seniority_level = raw
        .seniority_level
        .unwrap_or(i64::from(SENIORITY_MIN))
        .clamp(i64::from(SENIORITY_MIN), i64::from(SENIORITY_MAX)) as u8;

    let trajectory = match kind {
        OwnerKind::Candidate => Some(Trajectory::parse_or_default(
            raw.trajectory.as_deref().unwrap_or(""),
        )),
        OwnerKind::Job => None,
    };

    let years_experience = raw.years_experience.unwrap_or(0).max(0) as u32;

    let max_skills = match kind {
        OwnerKind::Candidate => MAX_CANDIDATE_SKILLS,
        OwnerKind::Job => MAX_JOB_SKILLS,
    };
    let skills = raw
        .skills
        .into_iter()
        .take(max_skills)
        .map(|s| SkillEntry {
            skill: s.skill,
            weight: s.weight.unwrap_or(3).clamp(1, 5) as u8,
            recency: s.recency,
            category: s.category,
        })
        .collect();

    Ok(Profile {
        seniority_level,
        trajectory,
        years_experience,
        summary: raw.summary.unwrap_or_default(),
        skills,
    })
}

/// Render a cached profile into prompt text for deep evaluation
#[must_use]
pub fn profile_summary_text(profile: &Profile) -> String {
    let mut lines = vec![format!(
        "Seniority level: {} / 6, years of experience: {}",
        profile.seniority_level, profile.years_experience
    )];
    if let Some(trajectory) = profile.trajectory {
        lines.push(format!("Career trajectory: {trajectory:?}"));
    }
    if !profile.summary.is_empty() {
        lines.push(profile.summary.clone());
    }
    if !profile.skills.is_empty() {
        let skills: Vec<String> = profile
            .skills
            .iter()
            .map(|s| format!("{} ({}/5)", s.skill, s.weight))
            .collect();
        lines.push(format!("Key skills: {}", skills.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::PgPool;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_sparse_candidate_is_skipped_before_any_call() {
        // Lazy pool and an unroutable LLM endpoint: the skip path must
        // return before either is touched, so neither connects.
        let pool = PgPool::connect_lazy("postgresql://localhost/unused").unwrap();
        let llm = LlmClient::new(
            "http://127.0.0.1:9".to_string(),
            "none".to_string(),
            "gpt-4o-mini".to_string(),
            1,
        )
        .unwrap();
        let extractor = ProfileExtractor::new(
            Arc::new(Database::new(pool)),
            Arc::new(llm),
            Arc::new(CostTracker::new()),
            crate::config::AppConfig::default().llm,
            20,
        );

        let candidate = Candidate {
            id: Uuid::new_v4(),
            full_name: Some("Anna".to_string()),
            position: None,
            work_history: None,
            education: None,
            certifications: None,
            skills: None,
            languages: None,
            free_text: None,
            latitude: None,
            longitude: None,
            category: "finance".to_string(),
            hidden: false,
            deleted_at: None,
            updated_at: Utc::now(),
            profile: None,
            profile_extracted_at: None,
            embedding: None,
            embedding_generated_at: None,
        };

        let outcome = extractor.extract_candidate(&candidate).await;
        assert_eq!(
            outcome,
            ExtractionOutcome::Skipped {
                reason: "insufficient_data".to_string()
            }
        );
        assert_eq!(extractor.costs.total_tokens(), (0, 0));
    }

    #[test]
    fn test_parse_valid_candidate_profile() {
        let content = r#"{
            "seniority_level": 4,
            "trajectory": "ascending",
            "years_experience": 12,
            "summary": "Senior accountant moving into controlling.",
            "skills": [
                {"skill": "SAP FI", "proficiency": 5, "recency": "current", "category": "erp"},
                {"skill": "Excel", "proficiency": 4}
            ]
        }"#;

        let profile = parse_profile(content, OwnerKind::Candidate).unwrap();
        assert_eq!(profile.seniority_level, 4);
        assert_eq!(profile.trajectory, Some(Trajectory::Ascending));
        assert_eq!(profile.years_experience, 12);
        assert_eq!(profile.skills.len(), 2);
        assert_eq!(profile.skills[0].weight, 5);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let content = r#"{
            "seniority_level": 9,
            "trajectory": "rocket",
            "years_experience": -3,
            "summary": "",
            "skills": [{"skill": "SQL", "proficiency": 11}]
        }"#;

        let profile = parse_profile(content, OwnerKind::Candidate).unwrap();
        assert_eq!(profile.seniority_level, 6);
        assert_eq!(profile.trajectory, Some(Trajectory::Lateral));
        assert_eq!(profile.years_experience, 0);
        assert_eq!(profile.skills[0].weight, 5);
    }

    #[test]
    fn test_job_profile_has_no_trajectory_and_caps_skills() {
        let skills: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"skill": "Skill {i}", "importance": 3}}"#))
            .collect();
        let content = format!(
            r#"{{"seniority_level": 2, "years_experience": 3, "summary": "s", "skills": [{}]}}"#,
            skills.join(",")
        );

        let profile = parse_profile(&content, OwnerKind::Job).unwrap();
        assert_eq!(profile.trajectory, None);
        assert_eq!(profile.skills.len(), MAX_JOB_SKILLS);
    }

    #[test]
    fn test_candidate_skills_capped_at_fifteen() {
        let skills: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"skill": "Skill {i}", "proficiency": 3}}"#))
            .collect();
        let content = format!(
            r#"{{"seniority_level": 2, "years_experience": 3, "summary": "s", "skills": [{}]}}"#,
            skills.join(",")
        );

        let profile = parse_profile(&content, OwnerKind::Candidate).unwrap();
        assert_eq!(profile.skills.len(), MAX_CANDIDATE_SKILLS);
    }

    #[test]
    fn test_malformed_json_is_a_failure() {
        assert!(parse_profile("not json at all", OwnerKind::Candidate).is_err());
        assert!(parse_profile(r#"{"seniority_level": "#, OwnerKind::Job).is_err());
    }

    #[test]
    fn test_fenced_completion_still_parses() {
        let content = "```json\n{\"seniority_level\": 3, \"years_experience\": 5, \"summary\": \"ok\", \"skills\": []}\n```";
        let profile = parse_profile(content, OwnerKind::Job).unwrap();
        assert_eq!(profile.seniority_level, 3);
    }

    #[test]
    fn test_profile_summary_text_lists_skills() {
        let profile = Profile {
            seniority_level: 4,
            trajectory: Some(Trajectory::Ascending),
            years_experience: 10,
            summary: "Controller".to_string(),
            skills: vec![SkillEntry {
                skill: "SAP".to_string(),
                weight: 5,
                recency: None,
                category: None,
            }],
        };
        let text = profile_summary_text(&profile);
        assert!(text.contains("SAP (5/5)"));
        assert!(text.contains("4 / 6"));
    }
}
