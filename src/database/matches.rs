use sqlx::FromRow;
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::models::Match;
use crate::models::MatchStatus;
use crate::Result;
use crate::TalentMatchError;

/// Matching method recorded on funnel-produced rows; staleness detection
/// only ever considers rows with this marker.
pub const MATCHING_METHOD_FUNNEL: &str = "ai_funnel";

/// Scored fields written by the funnel on insert or update.
///
/// Feedback fields are deliberately absent: the funnel never writes them.
#[derive(Debug, Clone)]
pub struct MatchUpsert {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub similarity: f64,
    pub distance_km: Option<f64>,
    pub ai_score: f64,
    pub explanation: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub risks: Vec<String>,
}

impl Database {
    /// Idempotent insert-or-update keyed on `(candidate_id, job_id)`.
    ///
    /// Uses the store's unique-constraint-aware upsert so concurrent writers
    /// cannot create duplicate rows. Refreshes score fields, clears the
    /// staleness triplet, and promotes status NEW -> AI_CHECKED without ever
    /// downgrading a later status. Returns the row and whether it was newly
    /// inserted.
    pub async fn upsert_match(&self, upsert: &MatchUpsert) -> Result<(Match, bool)> {
        let row = sqlx::query(
            r"
            INSERT INTO matches (
                candidate_id, job_id, similarity, distance_km, ai_score,
                explanation, strengths, weaknesses, risks,
                status, matching_method, stale, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, false, now(), now())
            ON CONFLICT (candidate_id, job_id) DO UPDATE SET
                similarity = EXCLUDED.similarity,
                distance_km = EXCLUDED.distance_km,
                ai_score = EXCLUDED.ai_score,
                explanation = EXCLUDED.explanation,
                strengths = EXCLUDED.strengths,
                weaknesses = EXCLUDED.weaknesses,
                risks = EXCLUDED.risks,
                status = CASE
                    WHEN matches.status = 'new' THEN EXCLUDED.status
                    ELSE matches.status
                END,
                stale = false,
                stale_reason = NULL,
                stale_since = NULL,
                updated_at = now()
            RETURNING *, (xmax = 0) AS inserted
            ",
        )
        .bind(upsert.candidate_id)
        .bind(upsert.job_id)
        .bind(upsert.similarity)
        .bind(upsert.distance_km)
        .bind(upsert.ai_score)
        .bind(&upsert.explanation)
        .bind(sqlx::types::Json(&upsert.strengths))
        .bind(sqlx::types::Json(&upsert.weaknesses))
        .bind(sqlx::types::Json(&upsert.risks))
        .bind(MatchStatus::AiChecked)
        .bind(MATCHING_METHOD_FUNNEL)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        let m = Match::from_row(&row)?;
        Ok((m, inserted))
    }

    /// Get a match by its natural key
    pub async fn get_match(&self, candidate_id: Uuid, job_id: Uuid) -> Result<Option<Match>> {
        let m = sqlx::query_as("SELECT * FROM matches WHERE candidate_id = $1 AND job_id = $2")
            .bind(candidate_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(m)
    }

    /// List matches for a job, best first (pipeline collaborator)
    pub async fn list_matches_for_job(&self, job_id: Uuid, limit: i64) -> Result<Vec<Match>> {
        let matches = sqlx::query_as(
            r"
            SELECT * FROM matches
            WHERE job_id = $1
            ORDER BY ai_score DESC, similarity DESC
            LIMIT $2
            ",
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    /// List fresh matches above a score threshold (alerting collaborator)
    pub async fn list_top_matches(&self, min_score: f64, limit: i64) -> Result<Vec<Match>> {
        let matches = sqlx::query_as(
            r"
            SELECT * FROM matches
            WHERE ai_score >= $1 AND stale = false
            ORDER BY ai_score DESC
            LIMIT $2
            ",
        )
        .bind(min_score)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    /// Record feedback from the external collaborator.
    ///
    /// The only write path for feedback fields. Status moves forward only;
    /// a `new_status` that would rank below the current one is ignored.
    pub async fn record_feedback(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        feedback: &str,
        note: Option<&str>,
        rejection_reason: Option<&str>,
        new_status: Option<MatchStatus>,
    ) -> Result<Match> {
        let current = self
            .get_match(candidate_id, job_id)
            .await?
            .ok_or(TalentMatchError::MatchNotFound(candidate_id, job_id))?;

        let status = match new_status {
            Some(next) if next.rank() > current.status.rank() => next,
            _ => current.status,
        };

        let m = sqlx::query_as(
            r"
            UPDATE matches SET
                feedback = $3,
                feedback_note = $4,
                rejection_reason = $5,
                feedback_at = now(),
                status = $6,
                updated_at = now()
            WHERE candidate_id = $1 AND job_id = $2
            RETURNING *
            ",
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(feedback)
        .bind(note)
        .bind(rejection_reason)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(m)
    }

    /// Mark funnel-produced matches stale when their inputs changed.
    ///
    /// A match goes stale when the candidate's or job's `updated_at` is
    /// strictly after the match's `created_at`, or the job has expired.
    /// Already-stale rows are skipped, so repeated runs are idempotent.
    pub async fn detect_stale_matches(&self) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE matches m SET
                stale = true,
                stale_reason = sub.reason,
                stale_since = now()
            FROM (
                SELECT m2.id,
                    CASE
                        WHEN j.expires_at IS NOT NULL AND j.expires_at < now() THEN 'job_expired'
                        WHEN c.updated_at > m2.created_at THEN 'candidate_updated'
                        ELSE 'job_updated'
                    END AS reason
                FROM matches m2
                JOIN candidates c ON c.id = m2.candidate_id
                JOIN jobs j ON j.id = m2.job_id
                WHERE m2.stale = false
                    AND m2.matching_method = $1
                    AND (
                        c.updated_at > m2.created_at
                        OR j.updated_at > m2.created_at
                        OR (j.expires_at IS NOT NULL AND j.expires_at < now())
                    )
            ) sub
            WHERE m.id = sub.id
            ",
        )
        .bind(MATCHING_METHOD_FUNNEL)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Match counts per status, for the stats surface
    pub async fn match_status_counts(&self) -> Result<Vec<(MatchStatus, i64)>> {
        let counts = sqlx::query_as(
            "SELECT status, COUNT(*) FROM matches GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Count of matches currently flagged stale
    pub async fn count_stale_matches(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches WHERE stale = true")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
