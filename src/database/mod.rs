use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::EmbeddingStats;
use crate::models::OwnerKind;
use crate::models::ProfileStats;

// Re-export submodules
mod candidates;
mod jobs;
mod matches;
mod schema;

pub use candidates::RetrievedCandidate;
pub use matches::MatchUpsert;
pub use matches::MATCHING_METHOD_FUNNEL;

/// One buffered embedding write, flushed in batched transactions
#[derive(Debug, Clone)]
pub struct EmbeddingUpdate {
    pub kind: OwnerKind,
    pub id: Uuid,
    pub vector: Vector,
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new database instance from configuration
    pub async fn from_config(config: &crate::config::AppConfig) -> crate::Result<Self> {
        let pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections())
            .min_connections(config.min_connections())
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout()));

        let pool = pool_options.connect(config.database_url()).await?;

        tracing::info!(
            "Database pool configured: max_connections={}, min_connections={}",
            config.max_connections(),
            config.min_connections()
        );

        Ok(Self::new(pool))
    }

    /// Get a reference to the database pool for raw queries
    #[must_use]
    pub const fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Apply buffered embedding updates in one transaction.
    ///
    /// Batch backfills call this every N processed items instead of writing
    /// per item, bounding the work lost on a crash to one partial batch.
    pub async fn apply_embedding_updates(&self, updates: &[EmbeddingUpdate]) -> crate::Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for update in updates {
            let table = match update.kind {
                OwnerKind::Candidate => "candidates",
                OwnerKind::Job => "jobs",
            };
            let query = format!(
                "UPDATE {table} SET embedding = $1, embedding_generated_at = now() WHERE id = $2"
            );
            sqlx::query(&query)
                .bind(&update.vector)
                .bind(update.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!("Committed {} embedding updates", updates.len());
        Ok(())
    }

    /// Profile coverage across both owner tables (dashboard read path)
    pub async fn get_profile_stats(&self) -> crate::Result<ProfileStats> {
        let (candidates_total, candidates_profiled, _) = self.count_candidates().await?;
        let (jobs_total, jobs_profiled, _) = self.count_jobs().await?;

        Ok(ProfileStats {
            candidates_total,
            candidates_profiled,
            jobs_total,
            jobs_profiled,
        })
    }

    /// Embedding coverage across both owner tables (dashboard read path)
    pub async fn get_embedding_stats(&self) -> crate::Result<EmbeddingStats> {
        let (candidates_total, _, candidates_embedded) = self.count_candidates().await?;
        let (jobs_total, _, jobs_embedded) = self.count_jobs().await?;

        Ok(EmbeddingStats {
            candidates_total,
            candidates_embedded,
            jobs_total,
            jobs_embedded,
        })
    }
}
