use pgvector::Vector;
use uuid::Uuid;

use super::Database;
use crate::models::Job;
use crate::models::Profile;
use crate::Result;

impl Database {
    /// Get a job by id
    pub async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    /// List visible, unexpired jobs in a category, for batch matching
    pub async fn list_active_jobs(&self, category: &str) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as(
            r"
            SELECT * FROM jobs
            WHERE hidden = false
                AND deleted_at IS NULL
                AND (expires_at IS NULL OR expires_at > now())
                AND category = $1
            ORDER BY updated_at DESC
            ",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// List visible jobs lacking an extracted profile
    pub async fn list_jobs_missing_profile(&self, category: Option<&str>) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as(
            r"
            SELECT * FROM jobs
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

        Ok(jobs)
    }

    /// List visible jobs lacking an embedding vector
    pub async fn list_jobs_missing_embedding(&self, category: Option<&str>) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as(
            r"
            SELECT * FROM jobs
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

        Ok(jobs)
    }

    /// Persist an extracted profile on the job; sets the cache key
    pub async fn set_job_profile(&self, id: Uuid, profile: &Profile) -> Result<()> {
        sqlx::query("UPDATE jobs SET profile = $1, profile_extracted_at = now() WHERE id = $2")
            .bind(sqlx::types::Json(profile))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist an embedding vector on the job
    pub async fn set_job_embedding(&self, id: Uuid, vector: &Vector) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET embedding = $1, embedding_generated_at = now() WHERE id = $2",
        )
        .bind(vector)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Profile/embedding coverage counts for the stats surface
    pub async fn count_jobs(&self) -> Result<(i64, i64, i64)> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                COUNT(*),
                COUNT(profile_extracted_at),
                COUNT(embedding_generated_at)
            FROM jobs
            WHERE hidden = false AND deleted_at IS NULL
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
