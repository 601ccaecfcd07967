//! Embedding indexer: per-owner vector generation and batch backfill

use std::sync::Arc;

use pgvector::Vector;
use tracing::info;
use tracing::warn;

use super::client::EmbeddingClient;
use super::normalize_for_embedding;
use super::text::render_candidate_document;
use super::text::render_job_document;
use crate::config::EmbeddingsConfig;
use crate::cost::CostTracker;
use crate::database::Database;
use crate::database::EmbeddingUpdate;
use crate::errors::Result;
use crate::errors::TalentMatchError;
use crate::models::Candidate;
use crate::models::Job;
use crate::models::OwnerKind;
use crate::tasks::TaskRegistry;

/// Result of one embed attempt; failures are values so batches continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOutcome {
    Embedded,
    /// Rendered text was empty; no API call was made
    SkippedEmpty,
    Failed(String),
}

/// Aggregate stats from an embedding backfill run
#[derive(Debug, Default)]
pub struct EmbedBackfillStats {
    pub total: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub errors: usize,
    pub error_samples: Vec<String>,
}

/// Generates and persists embedding vectors on candidates and jobs.
///
/// Vectors are created when missing and regenerated only through the explicit
/// `re_embed_*` calls; a failed generation leaves any prior vector untouched.
pub struct EmbeddingIndexer {
    db: Arc<Database>,
    client: Arc<EmbeddingClient>,
    costs: Arc<CostTracker>,
    config: EmbeddingsConfig,
    registry: TaskRegistry,
    commit_every: usize,
    max_errors: usize,
}

impl EmbeddingIndexer {
    pub fn new(
        db: Arc<Database>,
        client: Arc<EmbeddingClient>,
        costs: Arc<CostTracker>,
        config: EmbeddingsConfig,
        registry: TaskRegistry,
        commit_every: usize,
        max_errors: usize,
    ) -> Self {
        Self {
            db,
            client,
            costs,
            config,
            registry,
            commit_every: commit_every.max(1),
            max_errors,
        }
    }

    /// Embed one candidate, persisting the vector on success
    pub async fn embed_candidate(&self, candidate: &Candidate) -> EmbedOutcome {
        let text = normalize_for_embedding(&render_candidate_document(candidate));
        match self.generate(&text).await {
            GenerateResult::Empty => EmbedOutcome::SkippedEmpty,
            GenerateResult::Failed(error) => EmbedOutcome::Failed(error),
            GenerateResult::Vector(vector) => {
                match self.db.set_candidate_embedding(candidate.id, &vector).await {
                    Ok(()) => EmbedOutcome::Embedded,
                    Err(e) => EmbedOutcome::Failed(format!("failed to persist embedding: {e}")),
                }
            }
        }
    }

    /// Embed one job, persisting the vector on success
    pub async fn embed_job(&self, job: &Job) -> EmbedOutcome {
        let text = normalize_for_embedding(&render_job_document(job));
        match self.generate(&text).await {
            GenerateResult::Empty => EmbedOutcome::SkippedEmpty,
            GenerateResult::Failed(error) => EmbedOutcome::Failed(error),
            GenerateResult::Vector(vector) => {
                match self.db.set_job_embedding(job.id, &vector).await {
                    Ok(()) => EmbedOutcome::Embedded,
                    Err(e) => EmbedOutcome::Failed(format!("failed to persist embedding: {e}")),
                }
            }
        }
    }

    /// Ensure a job has a vector, generating one synchronously if missing.
    ///
    /// This is the retriever's precondition; a generation failure here is a
    /// hard error because matching cannot proceed without the query vector.
    pub async fn ensure_job_embedding(&self, job: &Job) -> Result<Vector> {
        if let Some(vector) = &job.embedding {
            return Ok(vector.clone());
        }

        let text = normalize_for_embedding(&render_job_document(job));
        match self.generate(&text).await {
            GenerateResult::Vector(vector) => {
                self.db.set_job_embedding(job.id, &vector).await?;
                Ok(vector)
            }
            GenerateResult::Empty => Err(TalentMatchError::InsufficientData(format!(
                "job {} has no text to embed",
                job.id
            ))),
            GenerateResult::Failed(error) => Err(TalentMatchError::Embedding(error)),
        }
    }

    /// Regenerate a candidate's vector, replacing any existing one
    pub async fn re_embed_candidate(&self, id: uuid::Uuid) -> Result<()> {
        let candidate = self
            .db
            .get_candidate(id)
            .await?
            .ok_or(TalentMatchError::CandidateNotFound(id))?;
        match self.embed_candidate(&candidate).await {
            EmbedOutcome::Embedded => Ok(()),
            EmbedOutcome::SkippedEmpty => Err(TalentMatchError::InsufficientData(format!(
                "candidate {id} has no text to embed"
            ))),
            EmbedOutcome::Failed(error) => Err(TalentMatchError::Embedding(error)),
        }
    }

    /// Regenerate a job's vector, replacing any existing one
    pub async fn re_embed_job(&self, id: uuid::Uuid) -> Result<()> {
        let job = self
            .db
            .get_job(id)
            .await?
            .ok_or(TalentMatchError::JobNotFound(id))?;
        match self.embed_job(&job).await {
            EmbedOutcome::Embedded => Ok(()),
            EmbedOutcome::SkippedEmpty => Err(TalentMatchError::InsufficientData(format!(
                "job {id} has no text to embed"
            ))),
            EmbedOutcome::Failed(error) => Err(TalentMatchError::Embedding(error)),
        }
    }

    /// Embed every owner matching the filter that lacks a vector.
    ///
    /// Single-flight under the "embeddings" key. Updates are committed every
    /// `commit_every` items rather than per item, so a crash loses at most
    /// one partial batch.
    pub async fn embed_all_missing(&self, category: Option<&str>) -> Result<EmbedBackfillStats> {
        let guard = self.registry.begin("embeddings")?;

        let candidates = self.db.list_candidates_missing_embedding(category).await?;
        let jobs = self.db.list_jobs_missing_embedding(category).await?;

        let mut stats = EmbedBackfillStats {
            total: candidates.len() + jobs.len(),
            ..Default::default()
        };
        info!(
            "Embedding backfill: {} candidates, {} jobs to process",
            candidates.len(),
            jobs.len()
        );

        let mut pending: Vec<EmbeddingUpdate> = Vec::new();
        let mut processed = 0usize;

        for candidate in &candidates {
            processed += 1;
            guard.step(&format!("candidate {processed}/{}", stats.total));

            let text = normalize_for_embedding(&render_candidate_document(candidate));
            match self.generate(&text).await {
                GenerateResult::Empty => stats.skipped += 1,
                GenerateResult::Failed(error) => {
                    record_error(&mut stats, self.max_errors, "candidate", candidate.id, &error);
                }
                GenerateResult::Vector(vector) => {
                    pending.push(EmbeddingUpdate {
                        kind: OwnerKind::Candidate,
                        id: candidate.id,
                        vector,
                    });
                    stats.embedded += 1;
                }
            }

            self.flush_if_due(&mut pending).await?;
        }

        for job in &jobs {
            processed += 1;
            guard.step(&format!("job {processed}/{}", stats.total));

            let text = normalize_for_embedding(&render_job_document(job));
            match self.generate(&text).await {
                GenerateResult::Empty => stats.skipped += 1,
                GenerateResult::Failed(error) => {
                    record_error(&mut stats, self.max_errors, "job", job.id, &error);
                }
                GenerateResult::Vector(vector) => {
                    pending.push(EmbeddingUpdate {
                        kind: OwnerKind::Job,
                        id: job.id,
                        vector,
                    });
                    stats.embedded += 1;
                }
            }

            self.flush_if_due(&mut pending).await?;
        }

        if !pending.is_empty() {
            self.db.apply_embedding_updates(&pending).await?;
        }

        info!(
            "Embedding backfill complete: {} embedded, {} skipped, {} errors",
            stats.embedded, stats.skipped, stats.errors
        );
        guard.succeed(&format!(
            "{} embedded, {} skipped, {} errors",
            stats.embedded, stats.skipped, stats.errors
        ));
        Ok(stats)
    }

    async fn flush_if_due(&self, pending: &mut Vec<EmbeddingUpdate>) -> Result<()> {
        if pending.len() >= self.commit_every {
            self.db.apply_embedding_updates(pending).await?;
            pending.clear();
        }
        Ok(())
    }

    async fn generate(&self, text: &str) -> GenerateResult {
        if text.trim().is_empty() {
            return GenerateResult::Empty;
        }

        match self.client.generate(text).await {
            Ok(response) => {
                self.costs.record(
                    response.input_tokens,
                    0,
                    self.config.price_per_1k_tokens,
                    0.0,
                );
                if response.vector.len() != self.config.dimension {
                    return GenerateResult::Failed(format!(
                        "dimension mismatch: expected {}, got {}",
                        self.config.dimension,
                        response.vector.len()
                    ));
                }
                GenerateResult::Vector(Vector::from(response.vector))
            }
            Err(e) => GenerateResult::Failed(e.to_string()),
        }
    }
}

enum GenerateResult {
    Vector(Vector),
    Empty,
    Failed(String),
}

fn record_error(
    stats: &mut EmbedBackfillStats,
    max_errors: usize,
    kind: &str,
    id: uuid::Uuid,
    error: &str,
) {
    warn!("Embedding generation failed for {} {}: {}", kind, id, error);
    stats.errors += 1;
    if stats.error_samples.len() < max_errors {
        stats.error_samples.push(format!("{kind} {id}: {error}"));
    }
}
