//! Coarse retrieval: top-K candidates by vector similarity within a geo bound

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::clamp_unit;
use super::round_to;
use crate::database::Database;
use crate::embeddings::EmbeddingIndexer;
use crate::errors::Result;
use crate::models::Job;

/// One short-listed candidate, ranked by similarity
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate_id: Uuid,
    /// Cosine similarity in [0, 1], rounded to 4 decimal places
    pub similarity: f64,
    /// Geographic distance rounded to 1 decimal place; `None` when either
    /// side lacks coordinates
    pub distance_km: Option<f64>,
}

/// Read-only retriever over the candidate pool.
///
/// Lazily triggers embedding generation for the job when its vector is
/// missing; everything else is a single ranked query.
pub struct CandidateRetriever {
    db: Arc<Database>,
    indexer: Arc<EmbeddingIndexer>,
}

impl CandidateRetriever {
    pub fn new(db: Arc<Database>, indexer: Arc<EmbeddingIndexer>) -> Self {
        Self { db, indexer }
    }

    /// Return the top-K most similar candidates within `max_distance_km`.
    ///
    /// Candidates without coordinates pass the geo filter vacuously and are
    /// ranked purely by similarity. Fails the whole call when the job's
    /// embedding is missing and cannot be generated.
    pub async fn find_top_k(
        &self,
        job: &Job,
        k: usize,
        max_distance_km: f64,
    ) -> Result<Vec<RankedCandidate>> {
        let query_vector = self.indexer.ensure_job_embedding(job).await?;

        debug!(
            "Retrieving top {} candidates for job {} (category {}, max {} km)",
            k, job.id, job.category, max_distance_km
        );

        let rows = self
            .db
            .find_similar_candidates(
                &query_vector,
                &job.category,
                job.latitude,
                job.longitude,
                max_distance_km,
                k as i64,
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| RankedCandidate {
                candidate_id: row.candidate_id,
                similarity: round_to(clamp_unit(row.similarity), 4),
                distance_km: row.distance_km.map(|d| round_to(d, 1)),
            })
            .collect())
    }
}
