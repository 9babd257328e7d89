//! Shared dashboard state
//!
//! One `DashboardState` lives behind an `Arc` and is read by the render loop
//! while the refresh/stats workers, the bulk task and keystroke handling
//! mutate it. Each contended piece gets its own narrow lock; no guard is
//! ever held across an `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::bulk::BulkPhase;
use crate::log_filter::LogBuffer;
use crate::metrics::{MetricKind, MetricsHistory};
use crate::model::{UnitDetail, UnitId, UnitSnapshot, UnitStats};
use crate::selection::SelectionSet;

/// Unit list and focus, always swapped together
#[derive(Debug, Default)]
struct UnitsView {
    units: Arc<Vec<UnitSnapshot>>,
    focused: Option<usize>,
}

impl UnitsView {
    fn focused_id(&self) -> Option<UnitId> {
        self.focused
            .and_then(|i| self.units.get(i))
            .map(|u| u.id.clone())
    }
}

/// Consistent read of the unit list and focus, taken in one critical section
#[derive(Clone, Debug, Default)]
pub struct DashboardSnapshot {
    pub units: Arc<Vec<UnitSnapshot>>,
    pub focused: Option<usize>,
}

impl DashboardSnapshot {
    pub fn focused_unit(&self) -> Option<&UnitSnapshot> {
        self.focused.and_then(|i| self.units.get(i))
    }

    pub fn running_count(&self) -> usize {
        self.units.iter().filter(|u| u.state.is_running()).count()
    }

    pub fn stopped_count(&self) -> usize {
        self.units.len() - self.running_count()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message shown over the dashboard until dismissed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Result panels opened from the unit list
#[derive(Clone, Debug, PartialEq)]
pub enum DetailView {
    Inspect(UnitDetail),
    Exec { command: String, output: String },
}

pub struct DashboardState {
    units: Mutex<UnitsView>,
    history: Mutex<MetricsHistory>,
    latest_stats: Mutex<Option<(UnitId, UnitStats)>>,
    pub selection: SelectionSet,
    pub bulk: Mutex<BulkPhase>,
    pub notice: Mutex<Option<Notice>>,
    pub detail: Mutex<Option<DetailView>>,
    pub logs: Mutex<LogBuffer>,
    stats_paused: AtomicBool,
    redraw: Notify,
}

impl DashboardState {
    pub fn new(history_capacity: usize, log_buffer_lines: usize) -> Self {
        Self {
            units: Mutex::new(UnitsView::default()),
            history: Mutex::new(MetricsHistory::with_capacity(history_capacity)),
            latest_stats: Mutex::new(None),
            selection: SelectionSet::new(),
            bulk: Mutex::new(BulkPhase::Idle),
            notice: Mutex::new(None),
            detail: Mutex::new(None),
            logs: Mutex::new(LogBuffer::new(log_buffer_lines)),
            stats_paused: AtomicBool::new(false),
            redraw: Notify::new(),
        }
    }

    /// Swap in a fresh unit list and re-clamp the focus.
    ///
    /// Metrics follow the focused unit id, not the index: if clamping lands
    /// on a different unit (or on none) the history starts over.
    pub fn replace_units(&self, list: Vec<UnitSnapshot>) {
        let mut view = self.units.lock();
        let len = list.len();
        view.units = Arc::new(list);
        view.focused = match (len, view.focused) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(old)) => Some(old.min(len - 1)),
        };
        self.retarget(&view);
    }

    /// Focus the unit at `index`. Out-of-range indices are ignored.
    pub fn set_focus(&self, index: usize) {
        let mut view = self.units.lock();
        if index >= view.units.len() {
            return;
        }
        view.focused = Some(index);
        self.retarget(&view);
    }

    pub fn focus_next(&self) {
        let next = {
            let view = self.units.lock();
            match view.focused {
                Some(i) if i + 1 < view.units.len() => i + 1,
                _ => return,
            }
        };
        self.set_focus(next);
    }

    pub fn focus_prev(&self) {
        let prev = match self.units.lock().focused {
            Some(i) if i > 0 => i - 1,
            _ => return,
        };
        self.set_focus(prev);
    }

    /// Point the history at the focused unit of `view`.
    ///
    /// Lock order is units, then history, then latest stats. Callers hold
    /// the units guard so focus and history change together.
    fn retarget(&self, view: &UnitsView) {
        let focused_id = view.focused_id();
        let mut history = self.history.lock();
        if history.unit() == focused_id.as_deref() {
            return;
        }
        history.retarget(focused_id);
        *self.latest_stats.lock() = None;
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let view = self.units.lock();
        DashboardSnapshot {
            units: Arc::clone(&view.units),
            focused: view.focused,
        }
    }

    pub fn focused_id(&self) -> Option<UnitId> {
        self.units.lock().focused_id()
    }

    /// Append a sample for `id`. Dropped when focus has since moved away.
    pub fn record_stats(&self, id: &str, stats: UnitStats) -> bool {
        let view = self.units.lock();
        if view.focused_id().as_deref() != Some(id) {
            tracing::debug!(unit = %id, "discarding stats for unfocused unit");
            return false;
        }
        let mut history = self.history.lock();
        if history.unit() != Some(id) {
            return false;
        }
        history.append_sample(MetricKind::Cpu, stats.cpu_percent);
        history.append_sample(MetricKind::Memory, stats.mem_percent);
        *self.latest_stats.lock() = Some((id.to_string(), stats));
        true
    }

    /// Run `f` with the metrics history locked
    pub fn with_history<R>(&self, f: impl FnOnce(&MetricsHistory) -> R) -> R {
        f(&self.history.lock())
    }

    pub fn latest_stats(&self) -> Option<UnitStats> {
        let focused = self.focused_id()?;
        match &*self.latest_stats.lock() {
            Some((id, stats)) if *id == focused => Some(stats.clone()),
            _ => None,
        }
    }

    /// Clear samples for the focused unit without changing focus
    pub fn reset_history(&self) {
        self.history.lock().reset();
        *self.latest_stats.lock() = None;
    }

    pub fn stats_paused(&self) -> bool {
        self.stats_paused.load(Ordering::Relaxed)
    }

    /// Flip the pause flag; returns the new value
    pub fn toggle_stats_paused(&self) -> bool {
        !self.stats_paused.fetch_xor(true, Ordering::Relaxed)
    }

    /// Selected units in unit-list order. Ids that are no longer listed are
    /// left out here but stay in the selection.
    pub fn selected_in_display_order(&self) -> Vec<UnitSnapshot> {
        let units = self.snapshot().units;
        units
            .iter()
            .filter(|u| self.selection.is_selected(&u.id))
            .cloned()
            .collect()
    }

    pub fn set_notice(&self, notice: Notice) {
        *self.notice.lock() = Some(notice);
    }

    pub fn request_redraw(&self) {
        self.redraw.notify_one();
    }

    /// Resolves once a redraw has been requested since the last call
    pub async fn redraw_requested(&self) {
        self.redraw.notified().await;
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(crate::metrics::DEFAULT_CAPACITY, 5_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitState;
    use crate::runtime::mock::{unit, units};

    fn stats(cpu: f64, mem: f64) -> UnitStats {
        UnitStats {
            cpu_percent: cpu,
            mem_percent: mem,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_listing_focuses_first_unit() {
        let state = DashboardState::default();
        assert_eq!(state.snapshot().focused, None);

        state.replace_units(units(&["a", "b"]));
        let snap = state.snapshot();
        assert_eq!(snap.focused, Some(0));
        assert_eq!(snap.focused_unit().map(|u| u.id.as_str()), Some("a"));
    }

    #[test]
    fn test_shrinking_list_clamps_focus() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b", "c", "d", "e"]));
        state.set_focus(4);

        state.replace_units(units(&["a", "b"]));
        let snap = state.snapshot();
        assert_eq!(snap.focused, Some(1));
        assert_eq!(snap.focused_unit().map(|u| u.id.as_str()), Some("b"));
    }

    #[test]
    fn test_empty_list_clears_focus_and_metrics() {
        let state = DashboardState::default();
        state.replace_units(units(&["a"]));
        assert!(state.record_stats("a", stats(10.0, 5.0)));

        state.replace_units(Vec::new());
        assert_eq!(state.snapshot().focused, None);
        assert!(state.with_history(|h| h.series(MetricKind::Cpu).is_empty()));
        assert!(state.latest_stats().is_none());

        let (line, bar, trend, points) = state.with_history(|h| {
            (
                h.render(MetricKind::Cpu, 10),
                h.bar(MetricKind::Cpu, 5),
                h.trend(MetricKind::Cpu, 3, 10),
                h.chart_points(MetricKind::Memory),
            )
        });
        assert_eq!(line, "▁".repeat(10));
        assert_eq!(bar, "░".repeat(5));
        assert!(trend.is_empty());
        assert!(points.is_empty());
    }

    #[test]
    fn test_set_focus_out_of_bounds_is_ignored() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b"]));
        state.set_focus(1);
        state.set_focus(7);
        assert_eq!(state.snapshot().focused, Some(1));
    }

    #[test]
    fn test_focus_next_prev_stay_in_bounds() {
        let state = DashboardState::default();
        state.focus_next();
        assert_eq!(state.snapshot().focused, None);

        state.replace_units(units(&["a", "b"]));
        state.focus_prev();
        assert_eq!(state.snapshot().focused, Some(0));
        state.focus_next();
        state.focus_next();
        assert_eq!(state.snapshot().focused, Some(1));
    }

    #[test]
    fn test_focused_unit_sparkline() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b", "c"]));
        state.set_focus(2);
        for cpu in [10.0, 90.0, 50.0] {
            assert!(state.record_stats("c", stats(cpu, 1.0)));
        }
        let line = state.with_history(|h| h.render(MetricKind::Cpu, 3));
        assert_eq!(line, "▁█▄");
    }

    #[test]
    fn test_stale_stats_are_discarded() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b"]));
        assert!(!state.record_stats("b", stats(50.0, 50.0)));
        assert!(state.with_history(|h| h.series(MetricKind::Cpu).is_empty()));
    }

    #[test]
    fn test_focus_change_resets_history() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b"]));
        state.record_stats("a", stats(20.0, 20.0));
        assert_eq!(state.with_history(|h| h.series(MetricKind::Cpu).len()), 1);

        state.set_focus(1);
        assert!(state.with_history(|h| h.series(MetricKind::Cpu).is_empty()));
        assert_eq!(state.with_history(|h| h.unit().map(String::from)), Some("b".into()));
    }

    #[test]
    fn test_refresh_keeping_same_focus_keeps_history() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b"]));
        state.record_stats("a", stats(20.0, 20.0));

        state.replace_units(vec![unit("a", UnitState::Exited), unit("b", UnitState::Running)]);
        assert_eq!(state.with_history(|h| h.series(MetricKind::Cpu).len()), 1);
        assert!(state.latest_stats().is_some());
    }

    #[test]
    fn test_history_follows_focus_under_concurrent_refresh_and_navigation() {
        let state = DashboardState::default();
        state.replace_units(units(&["a", "b", "c", "d", "e"]));

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..2_000 {
                    if i % 2 == 0 {
                        state.replace_units(units(&["a", "b"]));
                    } else {
                        state.replace_units(units(&["c", "d", "e", "a", "b"]));
                    }
                }
            });
            s.spawn(|| {
                for i in 0..2_000 {
                    state.set_focus(i % 5);
                }
            });
        });

        let focused = state.focused_id();
        let tracked = state.with_history(|h| h.unit().map(str::to_string));
        assert_eq!(tracked, focused);
        let id = focused.unwrap();
        assert!(state.record_stats(&id, stats(1.0, 1.0)));
    }

    #[test]
    fn test_counts_and_display_order_selection() {
        let state = DashboardState::default();
        state.replace_units(vec![
            unit("a", UnitState::Running),
            unit("b", UnitState::Exited),
            unit("c", UnitState::Running),
        ]);
        let snap = state.snapshot();
        assert_eq!(snap.running_count(), 2);
        assert_eq!(snap.stopped_count(), 1);

        state.selection.toggle();
        state.selection.toggle_member("c");
        state.selection.toggle_member("a");
        state.selection.toggle_member("gone");
        let ids: Vec<_> = state
            .selected_in_display_order()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(state.selection.count(), 3);
    }

    #[test]
    fn test_toggle_stats_paused() {
        let state = DashboardState::default();
        assert!(!state.stats_paused());
        assert!(state.toggle_stats_paused());
        assert!(state.stats_paused());
        assert!(!state.toggle_stats_paused());
    }

    #[tokio::test]
    async fn test_redraw_signal_is_stored_until_awaited() {
        let state = DashboardState::default();
        state.request_redraw();
        tokio::time::timeout(std::time::Duration::from_millis(50), state.redraw_requested())
            .await
            .expect("redraw should already be pending");
    }
}
