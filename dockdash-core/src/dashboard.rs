//! Dashboard controller
//!
//! Owns the shared state, the runtime client and the background tasks.
//! [`Dashboard::handle`] is the keystroke entry point: it mutates state
//! synchronously and hands anything that talks to the runtime to a spawned
//! task, so the render loop never waits on I/O.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bulk::{BulkAction, BulkExecutor, BulkPhase, BulkProgress};
use crate::config::DashboardConfig;
use crate::log_filter::LogSession;
use crate::model::UnitId;
use crate::runtime::{LifecycleAction, RuntimeClient, RuntimeError};
use crate::state::{DashboardState, DetailView, Notice};
use crate::workers::{RefreshWorker, StatsWorker, refresh_once};

pub const EMPTY_SELECTION_HINT: &str =
    "Please select at least one container first. Press SPACE to select containers.";

/// User intents, already decoded from key events
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    FocusNext,
    FocusPrev,
    Focus(usize),
    ToggleBulkMode,
    /// Select or deselect the focused unit
    ToggleMember,
    OpenBulkMenu,
    RunBulk(BulkAction),
    /// Dismiss a finished bulk result
    AcknowledgeBulk,
    /// Stop the focused unit if it runs, start it otherwise
    ToggleRunning,
    Restart,
    /// Ask to delete the focused unit; answered with [`Handled::ConfirmRemove`]
    PromptRemove,
    /// Delete the unit the user confirmed
    Remove(UnitId),
    Inspect,
    Exec(String),
    OpenLogs,
    CloseLogs,
    ResetHistory,
    TogglePause,
    Refresh,
    DismissNotice,
    CloseDetail,
    Quit,
}

/// What the caller should do after an intent was handled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    Continue,
    /// Show the bulk action menu
    BulkMenu,
    /// Show the delete confirmation for this unit
    ConfirmRemove { id: UnitId, name: String },
    Quit,
}

pub struct Dashboard {
    state: Arc<DashboardState>,
    client: Arc<dyn RuntimeClient>,
    config: DashboardConfig,
    cancel: CancellationToken,
    log_cancel: Option<CancellationToken>,
    workers: Vec<JoinHandle<()>>,
}

impl Dashboard {
    pub fn new(client: Arc<dyn RuntimeClient>, config: DashboardConfig) -> Self {
        let state = Arc::new(DashboardState::new(
            config.history_capacity,
            config.log_buffer_lines,
        ));
        Self {
            state,
            client,
            config,
            cancel: CancellationToken::new(),
            log_cancel: None,
            workers: Vec::new(),
        }
    }

    pub fn state(&self) -> &Arc<DashboardState> {
        &self.state
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn runtime_name(&self) -> &'static str {
        self.client.name()
    }

    /// First listing. Fails when the runtime cannot be reached.
    pub async fn initial_refresh(&self) -> Result<usize, RuntimeError> {
        let count = refresh_once(self.client.as_ref(), &self.state).await?;
        tracing::info!(runtime = self.client.name(), units = count, "initial listing");
        self.state.request_redraw();
        Ok(count)
    }

    pub fn start_workers(&mut self) {
        if !self.workers.is_empty() {
            return;
        }
        let refresh = RefreshWorker::new(
            Arc::clone(&self.client),
            Arc::clone(&self.state),
            self.config.refresh_interval(),
        );
        let stats = StatsWorker::new(
            Arc::clone(&self.client),
            Arc::clone(&self.state),
            self.config.stats_interval(),
        );
        self.workers.push(tokio::spawn(refresh.run(self.cancel.clone())));
        self.workers.push(tokio::spawn(stats.run(self.cancel.clone())));
        tracing::debug!(
            refresh_ms = self.config.refresh_interval_ms,
            stats_ms = self.config.stats_interval_ms,
            "workers started"
        );
    }

    /// Cancel every background task and wait for the workers to exit
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task failed");
            }
        }
    }

    pub fn handle(&mut self, intent: Intent) -> Handled {
        tracing::debug!(?intent, "handle");
        let handled = match intent {
            Intent::FocusNext => {
                self.state.focus_next();
                Handled::Continue
            }
            Intent::FocusPrev => {
                self.state.focus_prev();
                Handled::Continue
            }
            Intent::Focus(index) => {
                self.state.set_focus(index);
                Handled::Continue
            }
            Intent::ToggleBulkMode => {
                if self.state.bulk.lock().is_running() {
                    return Handled::Continue;
                }
                self.state.selection.toggle();
                Handled::Continue
            }
            Intent::ToggleMember => {
                if let Some(id) = self.state.focused_id() {
                    self.state.selection.toggle_member(&id);
                }
                Handled::Continue
            }
            Intent::OpenBulkMenu => self.open_bulk_menu(),
            Intent::RunBulk(action) => {
                self.run_bulk(action);
                Handled::Continue
            }
            Intent::AcknowledgeBulk => {
                self.acknowledge_bulk();
                Handled::Continue
            }
            Intent::ToggleRunning => {
                if let Some(unit) = self.state.snapshot().focused_unit() {
                    let action = if unit.state.is_running() {
                        LifecycleAction::Stop
                    } else {
                        LifecycleAction::Start
                    };
                    self.spawn_lifecycle(unit.id.clone(), action);
                }
                Handled::Continue
            }
            Intent::Restart => {
                if let Some(id) = self.state.focused_id() {
                    self.spawn_lifecycle(id, LifecycleAction::Restart);
                }
                Handled::Continue
            }
            Intent::PromptRemove => match self.state.snapshot().focused_unit() {
                Some(unit) => Handled::ConfirmRemove {
                    id: unit.id.clone(),
                    name: unit.name.clone(),
                },
                None => Handled::Continue,
            },
            Intent::Remove(id) => {
                self.spawn_lifecycle(id, LifecycleAction::Remove);
                Handled::Continue
            }
            Intent::Inspect => {
                self.spawn_inspect();
                Handled::Continue
            }
            Intent::Exec(command) => {
                self.spawn_exec(command);
                Handled::Continue
            }
            Intent::OpenLogs => {
                self.open_logs();
                Handled::Continue
            }
            Intent::CloseLogs => {
                self.close_logs();
                Handled::Continue
            }
            Intent::ResetHistory => {
                self.state.reset_history();
                Handled::Continue
            }
            Intent::TogglePause => {
                let paused = self.state.toggle_stats_paused();
                tracing::debug!(paused, "stats sampling toggled");
                Handled::Continue
            }
            Intent::Refresh => {
                self.spawn_refresh();
                Handled::Continue
            }
            Intent::DismissNotice => {
                *self.state.notice.lock() = None;
                Handled::Continue
            }
            Intent::CloseDetail => {
                *self.state.detail.lock() = None;
                Handled::Continue
            }
            Intent::Quit => Handled::Quit,
        };
        self.state.request_redraw();
        handled
    }

    fn open_bulk_menu(&self) -> Handled {
        if !self.state.selection.is_enabled() {
            self.state.set_notice(Notice::error(
                "Bulk mode is off",
                "Press 'b' to enter bulk mode first.",
            ));
            return Handled::Continue;
        }
        if self.state.selection.count() == 0 {
            self.state
                .set_notice(Notice::error("No containers selected", EMPTY_SELECTION_HINT));
            return Handled::Continue;
        }
        Handled::BulkMenu
    }

    /// Selected ids in unit-list order, followed by any that are no longer
    /// listed (the runtime reports those as failures)
    fn bulk_targets(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .state
            .selected_in_display_order()
            .into_iter()
            .map(|u| u.id)
            .collect();
        for id in self.state.selection.members() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn run_bulk(&self, action: BulkAction) {
        if self.state.bulk.lock().is_running() {
            return;
        }
        let ids = self.bulk_targets();
        if ids.is_empty() {
            self.state
                .set_notice(Notice::error("No containers selected", EMPTY_SELECTION_HINT));
            return;
        }

        *self.state.bulk.lock() = BulkPhase::Running(BulkProgress {
            total: ids.len(),
            ..Default::default()
        });

        let executor = BulkExecutor::new(Arc::clone(&self.client));
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let progress_state = Arc::clone(&state);
            let outcome = executor
                .run(&ids, action, |progress| {
                    *progress_state.bulk.lock() = BulkPhase::Running(progress.clone());
                    progress_state.request_redraw();
                })
                .await;
            match outcome {
                Ok(result) => *state.bulk.lock() = BulkPhase::Done(result),
                Err(e) => {
                    *state.bulk.lock() = BulkPhase::Idle;
                    state.set_notice(Notice::error("Bulk operation", e.to_string()));
                }
            }
            state.request_redraw();
        });
    }

    fn acknowledge_bulk(&self) {
        {
            let mut phase = self.state.bulk.lock();
            if !matches!(*phase, BulkPhase::Done(_)) {
                return;
            }
            *phase = BulkPhase::Idle;
        }
        self.state.selection.set_enabled(false);
        self.spawn_refresh();
    }

    fn spawn_refresh(&self) {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = refresh_once(client.as_ref(), &state).await {
                tracing::warn!(error = %e, "refresh failed");
                state.set_notice(Notice::error("Refresh failed", e.to_string()));
            }
            state.request_redraw();
        });
    }

    fn spawn_lifecycle(&self, id: UnitId, action: LifecycleAction) {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tracing::info!(unit = %id, action = action.verb(), "lifecycle action");
            match action.apply(client.as_ref(), &id).await {
                Ok(()) => {
                    if let Err(e) = refresh_once(client.as_ref(), &state).await {
                        tracing::warn!(error = %e, "refresh after {} failed", action.verb());
                    }
                }
                Err(e) => {
                    tracing::warn!(unit = %id, action = action.verb(), error = %e, "lifecycle action failed");
                    state.set_notice(Notice::error(
                        format!("Failed to {} container", action.verb()),
                        e.to_string(),
                    ));
                }
            }
            state.request_redraw();
        });
    }

    fn spawn_inspect(&self) {
        let Some(id) = self.state.focused_id() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match client.inspect(&id).await {
                Ok(detail) => *state.detail.lock() = Some(DetailView::Inspect(detail)),
                Err(e) => state.set_notice(Notice::error("Inspect failed", e.to_string())),
            }
            state.request_redraw();
        });
    }

    fn spawn_exec(&self, command: String) {
        let command = command.trim().to_string();
        if command.is_empty() {
            return;
        }
        let Some(id) = self.state.focused_id() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match client.exec(&id, &command).await {
                Ok(output) => *state.detail.lock() = Some(DetailView::Exec { command, output }),
                Err(e) => state.set_notice(Notice::error("Exec failed", e.to_string())),
            }
            state.request_redraw();
        });
    }

    fn open_logs(&mut self) {
        let Some(id) = self.state.focused_id() else {
            return;
        };
        self.close_logs();

        let token = self.cancel.child_token();
        self.log_cancel = Some(token.clone());
        self.state.logs.lock().open(id.clone());

        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut stream = tokio::select! {
                biased;
                () = token.cancelled() => return,
                opened = client.stream_logs(&id) => match opened {
                    Ok(stream) => stream,
                    Err(e) => {
                        state.logs.lock().session = LogSession::Failed(e.to_string());
                        state.request_redraw();
                        return;
                    }
                },
            };
            state.logs.lock().session = LogSession::Streaming;
            state.request_redraw();

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    next = stream.next() => match next {
                        Some(Ok(chunk)) => {
                            state.logs.lock().push(&chunk);
                            state.request_redraw();
                        }
                        Some(Err(e)) => {
                            tracing::warn!(unit = %id, error = %e, "log stream failed");
                            state.logs.lock().session = LogSession::Failed(e.to_string());
                            state.request_redraw();
                            break;
                        }
                        None => {
                            state.logs.lock().session = LogSession::Ended;
                            state.request_redraw();
                            break;
                        }
                    },
                }
            }
            tracing::debug!(unit = %id, "log session closed");
        });
    }

    fn close_logs(&mut self) {
        if let Some(token) = self.log_cancel.take() {
            token.cancel();
        }
        self.state.logs.lock().close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitState;
    use crate::runtime::mock::{MockRuntime, unit, units};

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn dashboard(mock: &Arc<MockRuntime>) -> Dashboard {
        let dash = Dashboard::new(mock.clone(), DashboardConfig::default());
        dash.initial_refresh().await.unwrap();
        dash
    }

    fn calls_with(mock: &MockRuntime, prefix: &str) -> Vec<String> {
        mock.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    #[tokio::test]
    async fn test_initial_refresh_fails_when_unreachable() {
        let mock = Arc::new(MockRuntime::default());
        mock.set_unreachable(true);
        let dash = Dashboard::new(mock.clone(), DashboardConfig::default());
        assert!(dash.initial_refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_navigation_intents() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a", "b", "c"])));
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::FocusNext);
        dash.handle(Intent::FocusNext);
        dash.handle(Intent::FocusNext);
        assert_eq!(dash.state().snapshot().focused, Some(2));
        dash.handle(Intent::Focus(0));
        assert_eq!(dash.state().snapshot().focused, Some(0));
        dash.handle(Intent::Focus(9));
        assert_eq!(dash.state().snapshot().focused, Some(0));
        assert_eq!(dash.handle(Intent::Quit), Handled::Quit);
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected_without_runtime_calls() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a", "b"])));
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::ToggleBulkMode);
        assert_eq!(dash.handle(Intent::OpenBulkMenu), Handled::Continue);
        dash.handle(Intent::RunBulk(BulkAction::Stop));
        settle().await;

        let notice = dash.state().notice.lock().clone().unwrap();
        assert_eq!(notice.body, EMPTY_SELECTION_HINT);
        assert!(calls_with(&mock, "stop:").is_empty());
        assert_eq!(*dash.state().bulk.lock(), BulkPhase::Idle);
    }

    #[tokio::test]
    async fn test_bulk_menu_requires_bulk_mode() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a"])));
        let mut dash = dashboard(&mock).await;
        assert_eq!(dash.handle(Intent::OpenBulkMenu), Handled::Continue);
        assert!(dash.state().notice.lock().is_some());

        dash.handle(Intent::DismissNotice);
        dash.handle(Intent::ToggleBulkMode);
        dash.handle(Intent::ToggleMember);
        assert_eq!(dash.handle(Intent::OpenBulkMenu), Handled::BulkMenu);
        assert!(dash.state().notice.lock().is_none());
    }

    #[tokio::test]
    async fn test_bulk_run_then_acknowledge() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a", "b", "c"])));
        mock.fail_for("b");
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::ToggleBulkMode);
        dash.handle(Intent::Focus(2));
        dash.handle(Intent::ToggleMember);
        dash.handle(Intent::Focus(0));
        dash.handle(Intent::ToggleMember);
        dash.handle(Intent::Focus(1));
        dash.handle(Intent::ToggleMember);
        dash.handle(Intent::RunBulk(BulkAction::Stop));
        settle().await;

        let phase = dash.state().bulk.lock().clone();
        let BulkPhase::Done(result) = phase else {
            panic!("expected finished batch, got {:?}", phase);
        };
        assert_eq!((result.succeeded, result.failed), (2, 1));
        assert_eq!(calls_with(&mock, "stop:"), vec!["stop:a", "stop:b", "stop:c"]);
        // selection survives until the result is acknowledged
        assert_eq!(dash.state().selection.count(), 3);

        let lists_before = calls_with(&mock, "list").len();
        dash.handle(Intent::AcknowledgeBulk);
        settle().await;
        assert_eq!(*dash.state().bulk.lock(), BulkPhase::Idle);
        assert!(!dash.state().selection.is_enabled());
        assert_eq!(dash.state().selection.count(), 0);
        assert_eq!(calls_with(&mock, "list").len(), lists_before + 1);
    }

    #[tokio::test]
    async fn test_toggle_running_picks_action_from_state() {
        let mock = Arc::new(MockRuntime::with_units(vec![
            unit("up", UnitState::Running),
            unit("down", UnitState::Exited),
        ]));
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::ToggleRunning);
        dash.handle(Intent::FocusNext);
        dash.handle(Intent::ToggleRunning);
        settle().await;

        assert_eq!(calls_with(&mock, "stop:"), vec!["stop:up"]);
        assert_eq!(calls_with(&mock, "start:"), vec!["start:down"]);
    }

    #[tokio::test]
    async fn test_remove_targets_the_confirmed_unit_after_refocus() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a", "b", "c", "d", "e"])));
        let mut dash = dashboard(&mock).await;
        dash.handle(Intent::Focus(4));

        let confirm = dash.handle(Intent::PromptRemove);
        assert_eq!(
            confirm,
            Handled::ConfirmRemove {
                id: "e".into(),
                name: "e-name".into(),
            }
        );

        // a refresh shrinks the list while the dialog is open
        dash.state().replace_units(units(&["a", "b"]));
        assert_eq!(dash.state().focused_id().as_deref(), Some("b"));

        let Handled::ConfirmRemove { id, .. } = confirm else {
            unreachable!()
        };
        dash.handle(Intent::Remove(id));
        settle().await;

        assert_eq!(calls_with(&mock, "remove:"), vec!["remove:e"]);
    }

    #[tokio::test]
    async fn test_prompt_remove_without_units_does_nothing() {
        let mock = Arc::new(MockRuntime::default());
        let mut dash = dashboard(&mock).await;
        assert_eq!(dash.handle(Intent::PromptRemove), Handled::Continue);
        assert!(calls_with(&mock, "remove:").is_empty());
    }

    #[tokio::test]
    async fn test_failed_action_sets_notice_and_keeps_state() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a", "b"])));
        mock.fail_for("a");
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::Restart);
        settle().await;

        let notice = dash.state().notice.lock().clone().unwrap();
        assert_eq!(notice.title, "Failed to restart container");
        assert_eq!(dash.state().snapshot().units.len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_and_exec_fill_detail() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a"])));
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::Inspect);
        settle().await;
        assert!(matches!(
            dash.state().detail.lock().clone(),
            Some(DetailView::Inspect(d)) if d.id == "a"
        ));

        dash.handle(Intent::Exec("uname -a".into()));
        settle().await;
        assert_eq!(
            dash.state().detail.lock().clone(),
            Some(DetailView::Exec {
                command: "uname -a".into(),
                output: "ran uname -a".into()
            })
        );

        dash.handle(Intent::CloseDetail);
        assert!(dash.state().detail.lock().is_none());
    }

    #[tokio::test]
    async fn test_logs_stream_into_buffer() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a"])));
        *mock.log_lines.lock() = vec!["booting".into(), "ERROR oops".into()];
        let mut dash = dashboard(&mock).await;

        dash.handle(Intent::OpenLogs);
        settle().await;
        {
            let logs = dash.state().logs.lock();
            assert_eq!(logs.unit(), Some("a"));
            assert_eq!(logs.len(), 2);
            assert_eq!(logs.session, LogSession::Ended);
        }

        dash.handle(Intent::CloseLogs);
        assert_eq!(dash.state().logs.lock().session, LogSession::Closed);
    }

    #[tokio::test]
    async fn test_pause_and_reset_history() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a"])));
        let mut dash = dashboard(&mock).await;
        dash.state().record_stats("a", Default::default());

        dash.handle(Intent::TogglePause);
        assert!(dash.state().stats_paused());
        dash.handle(Intent::ResetHistory);
        assert!(dash.state().latest_stats().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_workers() {
        let mock = Arc::new(MockRuntime::with_units(units(&["a"])));
        mock.set_stats("a", 1.0, 1.0);
        let mut dash = dashboard(&mock).await;
        dash.start_workers();

        tokio::time::sleep(std::time::Duration::from_millis(5_500)).await;
        dash.shutdown().await;
        let calls = mock.calls().len();

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(mock.calls().len(), calls);
    }
}
