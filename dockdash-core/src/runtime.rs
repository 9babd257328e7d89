//! Runtime client trait
//!
//! The container runtime is an external collaborator. The dashboard only
//! needs the calls below; each one is awaited from a background task, never
//! from the render loop.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::model::{UnitDetail, UnitId, UnitSnapshot, UnitStats};

/// A live log stream. Dropping it closes the underlying connection.
pub type LogStream = BoxStream<'static, Result<String, RuntimeError>>;

/// Errors reported by a runtime call
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime could not be reached at all
    #[error("runtime unreachable: {message}")]
    Unreachable { message: String },
    /// The unit does not exist (anymore)
    #[error("unit not found: {id}")]
    NotFound { id: UnitId },
    /// The runtime refused the request
    #[error("{id}: {message}")]
    Rejected { id: UnitId, message: String },
    /// A command run inside the unit failed
    #[error("exec in {id} failed: {message}")]
    Exec { id: UnitId, message: String },
    /// A log or stats stream broke mid-read
    #[error("stream error: {message}")]
    Stream { message: String },
}

/// Lifecycle actions that can be applied to a single unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
    Remove,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 4] = [
        LifecycleAction::Start,
        LifecycleAction::Stop,
        LifecycleAction::Restart,
        LifecycleAction::Remove,
    ];

    /// Apply this action to one unit
    pub async fn apply(self, client: &dyn RuntimeClient, id: &str) -> Result<(), RuntimeError> {
        match self {
            LifecycleAction::Start => client.start(id).await,
            LifecycleAction::Stop => client.stop(id).await,
            LifecycleAction::Restart => client.restart(id).await,
            LifecycleAction::Remove => client.remove(id).await,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "Start",
            LifecycleAction::Stop => "Stop",
            LifecycleAction::Restart => "Restart",
            LifecycleAction::Remove => "Delete",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
            LifecycleAction::Remove => "delete",
        }
    }

    /// Past tense, for completion messages
    pub fn done_label(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "started",
            LifecycleAction::Stop => "stopped",
            LifecycleAction::Restart => "restarted",
            LifecycleAction::Remove => "deleted",
        }
    }

    /// Removing a unit cannot be undone and asks for confirmation first
    pub fn is_destructive(&self) -> bool {
        matches!(self, LifecycleAction::Remove)
    }
}

/// The runtime backend the dashboard observes and drives.
///
/// Implementations:
/// - `DockerRuntime` (dockdash-cli): talks to the Docker Engine API
/// - `DemoRuntime` (dockdash-cli): simulated containers for `--demo`
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Human-readable name of this runtime
    fn name(&self) -> &'static str;

    /// List all units, running and stopped, in runtime order
    async fn list_units(&self) -> Result<Vec<UnitSnapshot>, RuntimeError>;

    /// Sample resource usage for one unit
    async fn get_stats(&self, id: &str) -> Result<UnitStats, RuntimeError>;

    async fn start(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop(&self, id: &str) -> Result<(), RuntimeError>;

    async fn restart(&self, id: &str) -> Result<(), RuntimeError>;

    /// Force-remove a unit and its anonymous volumes
    async fn remove(&self, id: &str) -> Result<(), RuntimeError>;

    /// Follow the unit's stdout/stderr
    async fn stream_logs(&self, id: &str) -> Result<LogStream, RuntimeError>;

    /// Run a shell command inside the unit and collect its output
    async fn exec(&self, id: &str, command: &str) -> Result<String, RuntimeError>;

    async fn inspect(&self, id: &str) -> Result<UnitDetail, RuntimeError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted runtime for tests: canned listings/stats, per-id failures,
    //! and a call log.

    use std::collections::{BTreeMap, BTreeSet, VecDeque};

    use futures_util::StreamExt;
    use parking_lot::Mutex;

    use super::*;
    use crate::model::UnitState;

    #[derive(Default)]
    pub struct MockRuntime {
        pub units: Mutex<Vec<UnitSnapshot>>,
        /// Listings returned (in order) before falling back to `units`
        pub listings: Mutex<VecDeque<Result<Vec<UnitSnapshot>, RuntimeError>>>,
        pub stats: Mutex<BTreeMap<UnitId, UnitStats>>,
        pub failing: Mutex<BTreeSet<UnitId>>,
        pub unreachable: Mutex<bool>,
        pub calls: Mutex<Vec<String>>,
        pub log_lines: Mutex<Vec<String>>,
        /// Simulated latency for `list_units` and `get_stats`
        pub delay: Mutex<Option<std::time::Duration>>,
    }

    impl MockRuntime {
        pub fn with_units(units: Vec<UnitSnapshot>) -> Self {
            let mock = Self::default();
            *mock.units.lock() = units;
            mock
        }

        pub fn fail_for(&self, id: &str) {
            self.failing.lock().insert(id.to_string());
        }

        pub fn set_unreachable(&self, unreachable: bool) {
            *self.unreachable.lock() = unreachable;
        }

        pub fn set_stats(&self, id: &str, cpu: f64, mem: f64) {
            self.stats.lock().insert(
                id.to_string(),
                UnitStats {
                    cpu_percent: cpu,
                    mem_percent: mem,
                    ..Default::default()
                },
            );
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub fn set_delay(&self, delay: std::time::Duration) {
            *self.delay.lock() = Some(delay);
        }

        async fn latency(&self) {
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().push(call);
        }

        fn check(&self, id: &str) -> Result<(), RuntimeError> {
            if *self.unreachable.lock() {
                return Err(RuntimeError::Unreachable {
                    message: "connection refused".into(),
                });
            }
            if self.failing.lock().contains(id) {
                return Err(RuntimeError::Rejected {
                    id: id.to_string(),
                    message: "scripted failure".into(),
                });
            }
            Ok(())
        }
    }

    pub fn unit(id: &str, state: UnitState) -> UnitSnapshot {
        UnitSnapshot {
            id: id.to_string(),
            name: format!("{}-name", id),
            image: "busybox:latest".into(),
            status: state.label().to_string(),
            state,
            ports: Vec::new(),
            created: None,
        }
    }

    pub fn units(ids: &[&str]) -> Vec<UnitSnapshot> {
        ids.iter().map(|id| unit(id, UnitState::Running)).collect()
    }

    #[async_trait]
    impl RuntimeClient for MockRuntime {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn list_units(&self) -> Result<Vec<UnitSnapshot>, RuntimeError> {
            self.record("list".into());
            self.latency().await;
            if let Some(scripted) = self.listings.lock().pop_front() {
                return scripted;
            }
            if *self.unreachable.lock() {
                return Err(RuntimeError::Unreachable {
                    message: "connection refused".into(),
                });
            }
            Ok(self.units.lock().clone())
        }

        async fn get_stats(&self, id: &str) -> Result<UnitStats, RuntimeError> {
            self.record(format!("stats:{}", id));
            self.latency().await;
            self.check(id)?;
            self.stats
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })
        }

        async fn start(&self, id: &str) -> Result<(), RuntimeError> {
            self.record(format!("start:{}", id));
            self.check(id)
        }

        async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
            self.record(format!("stop:{}", id));
            self.check(id)
        }

        async fn restart(&self, id: &str) -> Result<(), RuntimeError> {
            self.record(format!("restart:{}", id));
            self.check(id)
        }

        async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
            self.record(format!("remove:{}", id));
            self.check(id)
        }

        async fn stream_logs(&self, id: &str) -> Result<LogStream, RuntimeError> {
            self.record(format!("logs:{}", id));
            self.check(id)?;
            let lines: Vec<Result<String, RuntimeError>> =
                self.log_lines.lock().iter().cloned().map(Ok).collect();
            Ok(futures_util::stream::iter(lines).boxed())
        }

        async fn exec(&self, id: &str, command: &str) -> Result<String, RuntimeError> {
            self.record(format!("exec:{}:{}", id, command));
            self.check(id)?;
            Ok(format!("ran {}", command))
        }

        async fn inspect(&self, id: &str) -> Result<UnitDetail, RuntimeError> {
            self.record(format!("inspect:{}", id));
            self.check(id)?;
            Ok(UnitDetail {
                id: id.to_string(),
                name: format!("/{}-name", id),
                running: true,
                ..Default::default()
            })
        }
    }
}
