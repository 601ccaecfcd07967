//! Single-flight task registry for background runs
//!
//! At most one embedding-generation run and one matching-batch run may be
//! active at a time. Instead of module-level mutable run-status state, runs
//! are tracked in a keyed registry: `begin` refuses a duplicate trigger while
//! a run with the same key is active, and the returned guard records progress
//! and outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::errors::Result;
use crate::TalentMatchError;

/// Status snapshot of one keyed run
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub step: String,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Keyed store of background-run state
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<String, TaskStatus>>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run under `key`, failing with `AlreadyRunning` if one is active.
    ///
    /// The returned guard marks the run finished when dropped; call
    /// `succeed`/`fail` first to record the outcome.
    pub fn begin(&self, key: &str) -> Result<TaskGuard> {
        let mut entry = self
            .tasks
            .entry(key.to_string())
            .or_insert_with(|| TaskStatus {
                running: false,
                started_at: Utc::now(),
                finished_at: None,
                step: String::new(),
                result: None,
                error: None,
            });

        if entry.running {
            return Err(TalentMatchError::AlreadyRunning(key.to_string()));
        }

        *entry.value_mut() = TaskStatus {
            running: true,
            started_at: Utc::now(),
            finished_at: None,
            step: "starting".to_string(),
            result: None,
            error: None,
        };
        drop(entry);

        Ok(TaskGuard {
            registry: self.clone(),
            key: key.to_string(),
            finished: false,
        })
    }

    /// Snapshot the status of a keyed run, if it was ever started
    #[must_use]
    pub fn status(&self, key: &str) -> Option<TaskStatus> {
        self.tasks.get(key).map(|entry| entry.value().clone())
    }

    fn update<F: FnOnce(&mut TaskStatus)>(&self, key: &str, f: F) {
        if let Some(mut entry) = self.tasks.get_mut(key) {
            f(entry.value_mut());
        }
    }
}

/// RAII guard for one active run
#[derive(Debug)]
pub struct TaskGuard {
    registry: TaskRegistry,
    key: String,
    finished: bool,
}

impl TaskGuard {
    /// Record the current step for progress inspection
    pub fn step(&self, step: &str) {
        self.registry.update(&self.key, |status| {
            status.step = step.to_string();
        });
    }

    /// Mark the run successfully finished with a result summary
    pub fn succeed(mut self, result: &str) {
        self.registry.update(&self.key, |status| {
            status.running = false;
            status.finished_at = Some(Utc::now());
            status.result = Some(result.to_string());
        });
        self.finished = true;
    }

    /// Mark the run failed
    pub fn fail(mut self, error: &str) {
        self.registry.update(&self.key, |status| {
            status.running = false;
            status.finished_at = Some(Utc::now());
            status.error = Some(error.to_string());
        });
        self.finished = true;
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.finished {
            // Dropped without an explicit outcome (early return or panic
            // unwinding) - release the single-flight slot either way.
            self.registry.update(&self.key, |status| {
                status.running = false;
                status.finished_at = Some(Utc::now());
                if status.error.is_none() {
                    status.error = Some("aborted".to_string());
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_trigger_short_circuits() {
        let registry = TaskRegistry::new();
        let guard = registry.begin("matching").unwrap();

        let err = registry.begin("matching").unwrap_err();
        assert!(matches!(err, TalentMatchError::AlreadyRunning(_)));

        // A different key is independent
        let other = registry.begin("embeddings").unwrap();
        other.succeed("done");
        guard.succeed("done");
    }

    #[test]
    fn test_key_reusable_after_completion() {
        let registry = TaskRegistry::new();
        registry.begin("matching").unwrap().succeed("5 jobs");

        let status = registry.status("matching").unwrap();
        assert!(!status.running);
        assert_eq!(status.result.as_deref(), Some("5 jobs"));

        // Same key can run again
        let guard = registry.begin("matching").unwrap();
        guard.fail("boom");

        let status = registry.status("matching").unwrap();
        assert_eq!(status.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_dropped_guard_releases_slot() {
        let registry = TaskRegistry::new();
        {
            let guard = registry.begin("matching").unwrap();
            guard.step("halfway");
            // dropped without succeed/fail
        }

        let status = registry.status("matching").unwrap();
        assert!(!status.running);
        assert_eq!(status.error.as_deref(), Some("aborted"));

        assert!(registry.begin("matching").is_ok());
    }
}
