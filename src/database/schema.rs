use super::Database;
use crate::Result;
use crate::TalentMatchError;

impl Database {
    /// Check if database schema is initialized.
    /// Returns true if all required tables exist.
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        let required_tables = vec!["candidates", "jobs", "matches"];

        for table_name in required_tables {
            let result = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS (
                    SELECT FROM information_schema.tables
                    WHERE table_schema = 'public'
                    AND table_name = $1
                )
                ",
            )
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

            if !result {
                tracing::debug!("Missing required table: {}", table_name);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Verify database schema or return helpful error
    pub async fn verify_schema_or_error(&self) -> Result<()> {
        if self.is_schema_initialized().await? {
            Ok(())
        } else {
            Err(TalentMatchError::Config(
                "Database schema not initialized. Run `talentmatch init` first.".to_string(),
            ))
        }
    }

    /// Create tables, the status enum and the pgvector extension.
    ///
    /// Idempotent; `dimension` must match the configured embedding model.
    pub async fn init_schema(&self, dimension: usize, skip_indexes: bool) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            DO $$ BEGIN
                CREATE TYPE match_status AS ENUM
                    ('new', 'ai_checked', 'presented', 'rejected', 'placed');
            EXCEPTION WHEN duplicate_object THEN NULL;
            END $$
            ",
        )
        .execute(&self.pool)
        .await?;

        let candidates = format!(
            r"
            CREATE TABLE IF NOT EXISTS candidates (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                full_name TEXT,
                position TEXT,
                work_history JSONB,
                education TEXT,
                certifications TEXT,
                skills TEXT,
                languages TEXT,
                free_text TEXT,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                category TEXT NOT NULL,
                hidden BOOLEAN NOT NULL DEFAULT false,
                deleted_at TIMESTAMPTZ,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                profile JSONB,
                profile_extracted_at TIMESTAMPTZ,
                embedding vector({dimension}),
                embedding_generated_at TIMESTAMPTZ
            )
            "
        );
        sqlx::query(&candidates).execute(&self.pool).await?;

        let jobs = format!(
            r"
            CREATE TABLE IF NOT EXISTS jobs (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT,
                requirements TEXT,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                category TEXT NOT NULL,
                hidden BOOLEAN NOT NULL DEFAULT false,
                deleted_at TIMESTAMPTZ,
                expires_at TIMESTAMPTZ,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                profile JSONB,
                profile_extracted_at TIMESTAMPTZ,
                embedding vector({dimension}),
                embedding_generated_at TIMESTAMPTZ
            )
            "
        );
        sqlx::query(&jobs).execute(&self.pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS matches (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                candidate_id UUID NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
                job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                similarity DOUBLE PRECISION NOT NULL,
                distance_km DOUBLE PRECISION,
                ai_score DOUBLE PRECISION NOT NULL DEFAULT 0,
                explanation TEXT,
                strengths JSONB NOT NULL DEFAULT '[]',
                weaknesses JSONB NOT NULL DEFAULT '[]',
                risks JSONB NOT NULL DEFAULT '[]',
                status match_status NOT NULL DEFAULT 'new',
                matching_method TEXT NOT NULL DEFAULT 'ai_funnel',
                stale BOOLEAN NOT NULL DEFAULT false,
                stale_reason TEXT,
                stale_since TIMESTAMPTZ,
                feedback TEXT,
                feedback_note TEXT,
                feedback_at TIMESTAMPTZ,
                rejection_reason TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (candidate_id, job_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        if !skip_indexes {
            // ivfflat needs data to build useful lists; harmless when empty
            for statement in [
                "CREATE INDEX IF NOT EXISTS candidates_embedding_idx
                     ON candidates USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
                "CREATE INDEX IF NOT EXISTS jobs_embedding_idx
                     ON jobs USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
                "CREATE INDEX IF NOT EXISTS candidates_category_idx ON candidates (category)",
                "CREATE INDEX IF NOT EXISTS jobs_category_idx ON jobs (category)",
                "CREATE INDEX IF NOT EXISTS matches_job_idx ON matches (job_id)",
                "CREATE INDEX IF NOT EXISTS matches_stale_idx ON matches (stale)",
            ] {
                sqlx::query(statement).execute(&self.pool).await?;
            }
        }

        tracing::info!("Schema initialized (embedding dimension {})", dimension);
        Ok(())
    }
}
