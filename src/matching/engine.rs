//! Funnel driver: retrieve, evaluate, persist

use std::sync::Arc;

use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::CandidateRetriever;
use super::DeepEvaluator;
use crate::config::MatchingConfig;
use crate::cost::CostTracker;
use crate::database::Database;
use crate::database::MatchUpsert;
use crate::errors::Result;
use crate::models::Job;
use crate::tasks::TaskRegistry;
use crate::TalentMatchError;

const MATCHING_TASK_KEY: &str = "matching";

/// One scored pair from a `match_job` pass
#[derive(Debug, Clone)]
pub struct MatchedCandidate {
    pub candidate_id: Uuid,
    pub similarity: f64,
    pub distance_km: Option<f64>,
    pub ai_score: f64,
    /// False when the evaluation call failed and a zero score was persisted
    pub evaluated: bool,
}

/// Outcome of matching one job against the candidate pool
#[derive(Debug, Clone, Default)]
pub struct MatchJobReport {
    pub job_id: Uuid,
    pub candidates: Vec<MatchedCandidate>,
    pub matches_created: usize,
    pub matches_updated: usize,
    pub total_cost_usd: f64,
    pub errors: Vec<String>,
}

/// Aggregate outcome of a batch `match_all` run
#[derive(Debug, Clone, Default)]
pub struct MatchAllReport {
    pub jobs_total: usize,
    pub jobs_matched: usize,
    pub matches_created: usize,
    pub matches_updated: usize,
    pub total_cost_usd: f64,
    pub errors: Vec<String>,
}

/// Drives the retrieve -> evaluate -> upsert funnel.
///
/// Per-candidate failures are recorded and skipped over; only a missing job
/// or an unproducible job embedding fails a `match_job` call outright.
pub struct MatchEngine {
    db: Arc<Database>,
    retriever: CandidateRetriever,
    evaluator: DeepEvaluator,
    costs: Arc<CostTracker>,
    registry: TaskRegistry,
    config: MatchingConfig,
}

impl MatchEngine {
    pub fn new(
        db: Arc<Database>,
        retriever: CandidateRetriever,
        evaluator: DeepEvaluator,
        costs: Arc<CostTracker>,
        registry: TaskRegistry,
        config: MatchingConfig,
    ) -> Self {
        Self {
            db,
            retriever,
            evaluator,
            costs,
            registry,
            config,
        }
    }

    /// Match one job against the candidate pool.
    ///
    /// `top_k` and `max_distance_km` default to the configured values.
    /// Candidates are evaluated strictly sequentially; a failed evaluation
    /// still persists a zero-score match so "tried and failed" stays visible.
    pub async fn match_job(
        &self,
        job_id: Uuid,
        top_k: Option<usize>,
        max_distance_km: Option<f64>,
    ) -> Result<MatchJobReport> {
        let job = self
            .db
            .get_job(job_id)
            .await?
            .ok_or(TalentMatchError::JobNotFound(job_id))?;

        self.match_job_inner(&job, top_k, max_distance_km).await
    }

    async fn match_job_inner(
        &self,
        job: &Job,
        top_k: Option<usize>,
        max_distance_km: Option<f64>,
    ) -> Result<MatchJobReport> {
        let top_k = top_k.unwrap_or(self.config.top_k);
        let max_distance_km = max_distance_km.unwrap_or(self.config.max_distance_km);
        let cost_before = self.costs.total_cost();

        let ranked = self.retriever.find_top_k(job, top_k, max_distance_km).await?;
        info!(
            "Matching job {} ({}): {} candidates retrieved",
            job.id, job.title, ranked.len()
        );

        let mut report = MatchJobReport {
            job_id: job.id,
            ..MatchJobReport::default()
        };

        for entry in ranked {
            let candidate = match self.db.get_candidate(entry.candidate_id).await {
                Ok(Some(candidate)) => candidate,
                Ok(None) => {
                    self.push_error(
                        &mut report.errors,
                        format!("candidate {} vanished during matching", entry.candidate_id),
                    );
                    continue;
                }
                Err(e) => {
                    self.push_error(
                        &mut report.errors,
                        format!("candidate {}: {e}", entry.candidate_id),
                    );
                    continue;
                }
            };

            let evaluation = self.evaluator.evaluate(job, &candidate).await;
            if let Some(error) = &evaluation.error {
                warn!(
                    "Evaluation failed for candidate {} on job {}: {}",
                    candidate.id, job.id, error
                );
                self.push_error(
                    &mut report.errors,
                    format!("candidate {}: {error}", candidate.id),
                );
            }

            let upsert = MatchUpsert {
                candidate_id: candidate.id,
                job_id: job.id,
                similarity: entry.similarity,
                distance_km: entry.distance_km,
                ai_score: evaluation.score,
                explanation: evaluation.explanation,
                strengths: evaluation.strengths,
                weaknesses: evaluation.weaknesses,
                risks: evaluation.risks,
            };
            match self.db.upsert_match(&upsert).await {
                Ok((_, inserted)) => {
                    if inserted {
                        report.matches_created += 1;
                    } else {
                        report.matches_updated += 1;
                    }
                    report.candidates.push(MatchedCandidate {
                        candidate_id: candidate.id,
                        similarity: entry.similarity,
                        distance_km: entry.distance_km,
                        ai_score: evaluation.score,
                        evaluated: evaluation.success,
                    });
                }
                Err(e) => {
                    self.push_error(
                        &mut report.errors,
                        format!("candidate {}: upsert failed: {e}", candidate.id),
                    );
                }
            }
        }

        report.total_cost_usd = self.costs.total_cost() - cost_before;
        info!(
            "Job {} matched: {} created, {} updated, {} errors, ${:.4}",
            job.id,
            report.matches_created,
            report.matches_updated,
            report.errors.len(),
            report.total_cost_usd
        );
        Ok(report)
    }

    /// Match every active job in a category, sequentially.
    ///
    /// Single-flight: refuses to start while another matching batch is
    /// running. A per-job failure is recorded and the batch moves on;
    /// `progress` is invoked before each job with a step label and detail.
    pub async fn match_all<F>(
        &self,
        category: &str,
        top_k: Option<usize>,
        max_distance_km: Option<f64>,
        mut progress: F,
    ) -> Result<MatchAllReport>
    where
        F: FnMut(&str, &str),
    {
        let guard = self.registry.begin(MATCHING_TASK_KEY)?;
        let cost_before = self.costs.total_cost();

        let jobs = match self.db.list_active_jobs(category).await {
            Ok(jobs) => jobs,
            Err(e) => {
                guard.fail(&e.to_string());
                return Err(e);
            }
        };

        let mut report = MatchAllReport {
            jobs_total: jobs.len(),
            ..MatchAllReport::default()
        };
        info!(
            "Batch matching {} active jobs in category {}",
            jobs.len(),
            category
        );

        for (index, job) in jobs.iter().enumerate() {
            let detail = format!("{}/{}: {}", index + 1, jobs.len(), job.title);
            progress("matching_job", &detail);
            guard.step(&detail);

            match self.match_job_inner(job, top_k, max_distance_km).await {
                Ok(job_report) => {
                    report.jobs_matched += 1;
                    report.matches_created += job_report.matches_created;
                    report.matches_updated += job_report.matches_updated;
                    for error in job_report.errors {
                        self.push_error(&mut report.errors, format!("job {}: {error}", job.id));
                    }
                }
                Err(e) => {
                    warn!("Matching failed for job {}: {}", job.id, e);
                    self.push_error(&mut report.errors, format!("job {}: {e}", job.id));
                }
            }
        }

        report.total_cost_usd = self.costs.total_cost() - cost_before;
        progress("done", &format!("{} jobs matched", report.jobs_matched));
        guard.succeed(&format!(
            "{}/{} jobs, {} created, {} updated, ${:.4}",
            report.jobs_matched,
            report.jobs_total,
            report.matches_created,
            report.matches_updated,
            report.total_cost_usd
        ));
        Ok(report)
    }

    fn push_error(&self, errors: &mut Vec<String>, error: String) {
        if errors.len() < self.config.max_errors {
            errors.push(error);
        }
    }
}
