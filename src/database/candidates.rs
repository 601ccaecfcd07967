use pgvector::Vector;
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::models::Candidate;
use crate::models::Profile;
use crate::Result;

/// One retrieval hit: similarity and geo distance as computed at query time
#[derive(Debug, Clone, FromRow)]
pub struct RetrievedCandidate {
    pub candidate_id: Uuid,
    pub similarity: f64,
    pub distance_km: Option<f64>,
}

impl Database {
    /// Get a candidate by id
    pub async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(candidate)
    }

    /// List visible candidates lacking an extracted profile
    pub async fn list_candidates_missing_profile(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        let candidates = sqlx::query_as(
            r"
            SELECT * FROM candidates
            WHERE hidden = false
                AND deleted_at IS NULL
                AND profile_extracted_at IS NULL
                AND ($1::text IS NULL OR category = $1)
            ORDER BY updated_at DESC
            ",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    /// List visible candidates lacking an embedding vector
    pub async fn list_candidates_missing_embedding(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        let candidates = sqlx::query_as(
            r"
            SELECT * FROM candidates
            WHERE hidden = false
                AND deleted_at IS NULL
                AND embedding IS NULL
                AND ($1::text IS NULL OR category = $1)
            ORDER BY updated_at DESC
            ",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    /// Persist an extracted profile on the candidate; sets the cache key
    pub async fn set_candidate_profile(&self, id: Uuid, profile: &Profile) -> Result<()> {
        sqlx::query(
            "UPDATE candidates SET profile = $1, profile_extracted_at = now() WHERE id = $2",
        )
        .bind(sqlx::types::Json(profile))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist an embedding vector on the candidate
    pub async fn set_candidate_embedding(&self, id: Uuid, vector: &Vector) -> Result<()> {
        sqlx::query(
            "UPDATE candidates SET embedding = $1, embedding_generated_at = now() WHERE id = $2",
        )
        .bind(vector)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Top-K candidate retrieval: cosine ranking with a hard geo filter.
    ///
    /// Candidates without coordinates pass the geo filter vacuously and rank
    /// purely by similarity; the same applies to every candidate when the job
    /// itself has no coordinates. Cosine distance maps to similarity as
    /// `1 - distance`; the caller clamps and rounds. Ordering is on the raw
    /// `<=>` distance so the ivfflat cosine index can serve it.
    pub async fn find_similar_candidates(
        &self,
        query_vector: &Vector,
        category: &str,
        job_latitude: Option<f64>,
        job_longitude: Option<f64>,
        max_distance_km: f64,
        limit: i64,
    ) -> Result<Vec<RetrievedCandidate>> {
        let rows = sqlx::query_as(
            r"
            WITH scored AS (
                SELECT
                    c.id AS candidate_id,
                    c.embedding <=> $1 AS cosine_distance,
                    1 - (c.embedding <=> $1) AS similarity,
                    CASE
                        WHEN $2::float8 IS NOT NULL AND $3::float8 IS NOT NULL
                             AND c.latitude IS NOT NULL AND c.longitude IS NOT NULL
                        THEN 6371.0 * acos(LEAST(1.0, GREATEST(-1.0,
                                 cos(radians($2)) * cos(radians(c.latitude))
                               * cos(radians(c.longitude) - radians($3))
                               + sin(radians($2)) * sin(radians(c.latitude)))))
                        ELSE NULL
                    END AS distance_km
                FROM candidates c
                WHERE c.hidden = false
                    AND c.deleted_at IS NULL
                    AND c.category = $4
                    AND c.embedding IS NOT NULL
            )
            SELECT candidate_id, similarity, distance_km
            FROM scored
            WHERE distance_km IS NULL OR distance_km <= $5
            ORDER BY cosine_distance ASC
            LIMIT $6
            ",
        )
        .bind(query_vector)
        .bind(job_latitude)
        .bind(job_longitude)
        .bind(category)
        .bind(max_distance_km)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Profile coverage counts for the stats surface
    pub async fn count_candidates(&self) -> Result<(i64, i64, i64)> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                COUNT(*),
                COUNT(profile_extracted_at),
                COUNT(embedding_generated_at)
            FROM candidates
            WHERE hidden = false AND deleted_at IS NULL
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
