//! Bulk lifecycle operations
//!
//! Applies one action to a batch of units, strictly one call at a time,
//! tallying successes and failures without stopping on the first error.

use std::sync::Arc;

use thiserror::Error;

use crate::model::UnitId;
use crate::runtime::{LifecycleAction, RuntimeClient};

pub type BulkAction = LifecycleAction;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BulkError {
    #[error("no units selected")]
    EmptySelection,
}

/// Outcome of a finished batch. `succeeded + failed == total`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkOperationResult {
    pub action: BulkAction,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failing ids in processing order with the runtime's message
    pub failures: Vec<(UnitId, String)>,
}

impl BulkOperationResult {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            format!(
                "Successfully {} {} unit(s)",
                self.action.done_label(),
                self.succeeded
            )
        } else {
            format!(
                "{}: {} succeeded, {} failed",
                self.action.label(),
                self.succeeded,
                self.failed
            )
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkProgress {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Unit being worked on, if any
    pub current: Option<UnitId>,
}

impl BulkProgress {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64
    }
}

/// Where the dashboard's bulk operation stands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BulkPhase {
    #[default]
    Idle,
    Running(BulkProgress),
    Done(BulkOperationResult),
}

impl BulkPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, BulkPhase::Running(_))
    }
}

pub struct BulkExecutor {
    client: Arc<dyn RuntimeClient>,
}

impl BulkExecutor {
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        Self { client }
    }

    /// Apply `action` to every id in order.
    ///
    /// `on_progress` is called once before the first call and once after
    /// each id. Failures are recorded and the batch carries on; every id is
    /// attempted exactly once.
    pub async fn run<F>(
        &self,
        ids: &[UnitId],
        action: BulkAction,
        mut on_progress: F,
    ) -> Result<BulkOperationResult, BulkError>
    where
        F: FnMut(&BulkProgress),
    {
        if ids.is_empty() {
            return Err(BulkError::EmptySelection);
        }

        tracing::info!(action = action.verb(), total = ids.len(), "bulk operation started");

        let mut progress = BulkProgress {
            total: ids.len(),
            current: ids.first().cloned(),
            ..Default::default()
        };
        on_progress(&progress);

        let mut failures = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            progress.current = Some(id.clone());
            match action.apply(self.client.as_ref(), id).await {
                Ok(()) => progress.succeeded += 1,
                Err(e) => {
                    tracing::warn!(unit = %id, action = action.verb(), error = %e, "bulk item failed");
                    progress.failed += 1;
                    failures.push((id.clone(), e.to_string()));
                }
            }
            progress.processed += 1;
            progress.current = ids.get(i + 1).cloned();
            on_progress(&progress);
        }

        let result = BulkOperationResult {
            action,
            total: ids.len(),
            succeeded: progress.succeeded,
            failed: progress.failed,
            failures,
        };
        tracing::info!(
            action = action.verb(),
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            "bulk operation finished"
        );
        Ok(result)
    }
}
