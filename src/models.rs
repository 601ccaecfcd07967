use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of entity that owns a profile/embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Candidate,
    Job,
}

impl OwnerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Candidate => "candidate",
            OwnerKind::Job => "job",
        }
    }
}

/// Career trajectory extracted from a candidate's work history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Ascending,
    Lateral,
    Descending,
    Entry,
}

impl Trajectory {
    /// Parse a model-supplied trajectory string; invalid values default to `Lateral`
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ascending" => Trajectory::Ascending,
            "descending" => Trajectory::Descending,
            "entry" => Trajectory::Entry,
            _ => Trajectory::Lateral,
        }
    }
}

/// Seniority hierarchy bounds (1 = junior assistant ... 6 = department head)
pub const SENIORITY_MIN: u8 = 1;
pub const SENIORITY_MAX: u8 = 6;

/// Maximum structured skills kept per owner kind
pub const MAX_CANDIDATE_SKILLS: usize = 15;
pub const MAX_JOB_SKILLS: usize = 12;

/// One structured skill entry, most-relevant-first in `Profile::skills`.
///
/// `weight` is proficiency for candidates and importance for jobs, on a 1-5
/// scale; both JSON keys are accepted from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub skill: String,
    #[serde(alias = "proficiency", alias = "importance")]
    pub weight: u8,
    #[serde(default)]
    pub recency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Structured profile cached on the owning candidate or job.
///
/// Stored as JSONB on the owner row; the companion `profile_extracted_at`
/// column is the cache key (absence means "needs extraction").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub seniority_level: u8,
    /// Candidates only; jobs carry `None`
    #[serde(default)]
    pub trajectory: Option<Trajectory>,
    pub years_experience: u32,
    pub summary: String,
    pub skills: Vec<SkillEntry>,
}

/// One prior role in a candidate's structured work history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    pub position: String,
    #[serde(default)]
    pub company: Option<String>,
    /// Free-text task description for this role
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

/// Candidate row from the entity store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub work_history: Option<Json<Vec<WorkEntry>>>,
    pub education: Option<String>,
    pub certifications: Option<String>,
    pub skills: Option<String>,
    pub languages: Option<String>,
    pub free_text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: String,
    pub hidden: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub profile: Option<Json<Profile>>,
    pub profile_extracted_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vector>,
    pub embedding_generated_at: Option<DateTime<Utc>>,
}

/// Job row from the entity store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: String,
    pub hidden: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub profile: Option<Json<Profile>>,
    pub profile_extracted_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vector>,
    pub embedding_generated_at: Option<DateTime<Utc>>,
}

/// Match lifecycle status.
///
/// The funnel only ever moves NEW -> AI_CHECKED; the later states are owned
/// by the external feedback collaborator and are never reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
pub enum MatchStatus {
    New,
    AiChecked,
    Presented,
    Rejected,
    Placed,
}

impl MatchStatus {
    /// Monotonic rank used to forbid status downgrades on re-evaluation
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            MatchStatus::New => 0,
            MatchStatus::AiChecked => 1,
            MatchStatus::Presented => 2,
            MatchStatus::Rejected => 3,
            MatchStatus::Placed => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchStatus::New => "new",
            MatchStatus::AiChecked => "ai_checked",
            MatchStatus::Presented => "presented",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Placed => "placed",
        }
    }
}

/// Persisted match record, unique on `(candidate_id, job_id)`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub similarity: f64,
    pub distance_km: Option<f64>,
    pub ai_score: f64,
    pub explanation: Option<String>,
    pub strengths: Json<Vec<String>>,
    pub weaknesses: Json<Vec<String>>,
    pub risks: Json<Vec<String>>,
    pub status: MatchStatus,
    pub matching_method: String,
    pub stale: bool,
    pub stale_reason: Option<String>,
    pub stale_since: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    pub feedback_note: Option<String>,
    pub feedback_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile coverage counts for dashboards
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileStats {
    pub candidates_total: i64,
    pub candidates_profiled: i64,
    pub jobs_total: i64,
    pub jobs_profiled: i64,
}

impl ProfileStats {
    #[must_use]
    pub fn candidate_coverage(&self) -> f64 {
        coverage(self.candidates_profiled, self.candidates_total)
    }

    #[must_use]
    pub fn job_coverage(&self) -> f64 {
        coverage(self.jobs_profiled, self.jobs_total)
    }
}

/// Embedding coverage counts for dashboards
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingStats {
    pub candidates_total: i64,
    pub candidates_embedded: i64,
    pub jobs_total: i64,
    pub jobs_embedded: i64,
}

impl EmbeddingStats {
    #[must_use]
    pub fn candidate_coverage(&self) -> f64 {
        coverage(self.candidates_embedded, self.candidates_total)
    }

    #[must_use]
    pub fn job_coverage(&self) -> f64 {
        coverage(self.jobs_embedded, self.jobs_total)
    }
}

fn coverage(done: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trajectory_parse_defaults_to_lateral() {
        assert_eq!(Trajectory::parse_or_default("ascending"), Trajectory::Ascending);
        assert_eq!(Trajectory::parse_or_default("ENTRY"), Trajectory::Entry);
        assert_eq!(Trajectory::parse_or_default("sideways"), Trajectory::Lateral);
        assert_eq!(Trajectory::parse_or_default(""), Trajectory::Lateral);
    }

    #[test]
    fn test_status_rank_is_monotonic() {
        assert!(MatchStatus::New.rank() < MatchStatus::AiChecked.rank());
        assert!(MatchStatus::AiChecked.rank() < MatchStatus::Presented.rank());
        assert!(MatchStatus::Presented.rank() < MatchStatus::Rejected.rank());
        assert!(MatchStatus::Rejected.rank() < MatchStatus::Placed.rank());
    }

    #[test]
    fn test_skill_entry_accepts_proficiency_and_importance_keys() {
        let candidate: SkillEntry =
            serde_json::from_str(r#"{"skill": "Rust", "proficiency": 4}"#).unwrap();
        assert_eq!(candidate.weight, 4);

        let job: SkillEntry =
            serde_json::from_str(r#"{"skill": "Rust", "importance": 5, "category": "tech"}"#)
                .unwrap();
        assert_eq!(job.weight, 5);
        assert_eq!(job.category.as_deref(), Some("tech"));
    }

    #[test]
    fn test_coverage_handles_empty_totals() {
        let stats = ProfileStats::default();
        assert!((stats.candidate_coverage() - 0.0).abs() < f64::EPSILON);

        let stats = ProfileStats {
            candidates_total: 200,
            candidates_profiled: 50,
            ..Default::default()
        };
        assert!((stats.candidate_coverage() - 25.0).abs() < 1e-9);
    }
}
