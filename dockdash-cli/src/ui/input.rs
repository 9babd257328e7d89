//! Key handling
//!
//! Decodes key events into dashboard [`Intent`]s. Overlays that only
//! exist on screen (menus, confirmations, text prompts) live here; anything
//! that touches units goes through the dashboard.

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use dockdash_core::bulk::BulkAction;
use dockdash_core::log_filter::LogFilter;
use dockdash_core::model::UnitId;
use dockdash_core::runtime::LifecycleAction;
use dockdash_core::Intent;

/// Main screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    List,
    Stats,
    Logs,
}

/// Modal layered over the current view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Overlay {
    #[default]
    None,
    Help,
    BulkMenu,
    ConfirmBulk(BulkAction),
    /// Delete confirmation, bound to the unit focused when it opened
    ConfirmRemove { id: UnitId, name: String },
    ExecPrompt(String),
    LogSearch(String),
}

/// What the dashboard is showing that takes over the keyboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyContext {
    pub bulk_running: bool,
    pub bulk_done: bool,
    pub notice: bool,
    pub detail: bool,
    pub bulk_enabled: bool,
}

/// Commands entered at the exec prompt, recalled with Up/Down
#[derive(Debug)]
pub struct ExecHistory {
    commands: VecDeque<String>,
    cap: usize,
    /// `commands.len()` means "past the newest entry"
    cursor: usize,
}

const EXEC_HISTORY_CAP: usize = 100;

impl ExecHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            commands: VecDeque::new(),
            cap: cap.max(1),
            cursor: 0,
        }
    }

    /// Record a submitted command. Blank input and a repeat of the newest
    /// entry are not stored.
    pub fn push(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if self.commands.back().map(String::as_str) != Some(command) {
            if self.commands.len() == self.cap {
                self.commands.pop_front();
            }
            self.commands.push_back(command.to_string());
        }
        self.rewind();
    }

    /// Move the cursor past the newest entry
    pub fn rewind(&mut self) {
        self.cursor = self.commands.len();
    }

    /// One step older; stays on the oldest entry
    pub fn older(&mut self) -> Option<&str> {
        if self.commands.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.commands.get(self.cursor).map(String::as_str)
    }

    /// One step newer. Stepping past the newest entry yields `None`, which
    /// the prompt shows as an empty line.
    pub fn newer(&mut self) -> Option<&str> {
        if self.cursor + 1 < self.commands.len() {
            self.cursor += 1;
            return self.commands.get(self.cursor).map(String::as_str);
        }
        self.rewind();
        None
    }
}

impl Default for ExecHistory {
    fn default() -> Self {
        Self::new(EXEC_HISTORY_CAP)
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    pub view: View,
    pub overlay: Overlay,
    pub log_filter: LogFilter,
    pub detail_scroll: u16,
    pub exec_history: ExecHistory,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one key press. Returns the intents to hand to the
    /// dashboard, in order.
    pub fn on_key(&mut self, key: KeyEvent, ctx: KeyContext) -> Vec<Intent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Intent::Quit];
        }

        // a finished batch swallows the next key
        if ctx.bulk_done {
            return vec![Intent::AcknowledgeBulk];
        }
        if ctx.bulk_running {
            return Vec::new();
        }
        if ctx.notice {
            return vec![Intent::DismissNotice];
        }
        if ctx.detail {
            return self.on_detail_key(key);
        }

        match std::mem::take(&mut self.overlay) {
            Overlay::None => {}
            Overlay::Help => return Vec::new(),
            Overlay::BulkMenu => return self.on_bulk_menu_key(key),
            Overlay::ConfirmBulk(action) => {
                return match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        vec![Intent::RunBulk(action)]
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Vec::new(),
                    _ => {
                        self.overlay = Overlay::ConfirmBulk(action);
                        Vec::new()
                    }
                };
            }
            Overlay::ConfirmRemove { id, .. } => {
                return match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        vec![Intent::Remove(id)]
                    }
                    _ => Vec::new(),
                };
            }
            Overlay::ExecPrompt(buf) => return self.on_prompt_key(key, buf, true),
            Overlay::LogSearch(buf) => return self.on_prompt_key(key, buf, false),
        }

        match self.view {
            View::List => self.on_list_key(key, ctx),
            View::Stats => self.on_stats_key(key),
            View::Logs => self.on_logs_key(key),
        }
    }

    fn on_list_key(&mut self, key: KeyEvent, ctx: KeyContext) -> Vec<Intent> {
        let intent = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Intent::FocusPrev,
            KeyCode::Down | KeyCode::Char('j') => Intent::FocusNext,
            KeyCode::Char('s') => Intent::ToggleRunning,
            KeyCode::Char('r') => Intent::Restart,
            KeyCode::Char('d') => Intent::PromptRemove,
            KeyCode::Char('i') => {
                self.detail_scroll = 0;
                Intent::Inspect
            }
            KeyCode::Char('l') => {
                self.view = View::Logs;
                Intent::OpenLogs
            }
            KeyCode::Char('e') => {
                self.exec_history.rewind();
                self.overlay = Overlay::ExecPrompt(String::new());
                return Vec::new();
            }
            KeyCode::Char('t') => {
                self.view = View::Stats;
                return Vec::new();
            }
            KeyCode::Char('b') => Intent::ToggleBulkMode,
            KeyCode::Char(' ') => Intent::ToggleMember,
            KeyCode::Char('a') => Intent::OpenBulkMenu,
            KeyCode::Backspace if ctx.bulk_enabled => Intent::ToggleBulkMode,
            KeyCode::F(5) => Intent::Refresh,
            KeyCode::Char('?') => {
                self.overlay = Overlay::Help;
                return Vec::new();
            }
            KeyCode::Char('q') => Intent::Quit,
            _ => return Vec::new(),
        };
        vec![intent]
    }

    fn on_stats_key(&mut self, key: KeyEvent) -> Vec<Intent> {
        match key.code {
            KeyCode::Char('r') => vec![Intent::ResetHistory],
            KeyCode::Char('p') => vec![Intent::TogglePause],
            KeyCode::Up | KeyCode::Char('k') => vec![Intent::FocusPrev],
            KeyCode::Down | KeyCode::Char('j') => vec![Intent::FocusNext],
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('t') | KeyCode::Backspace => {
                self.view = View::List;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn on_logs_key(&mut self, key: KeyEvent) -> Vec<Intent> {
        match key.code {
            KeyCode::Char('f') => {
                self.log_filter.cycle_level();
                Vec::new()
            }
            KeyCode::Char('/') => {
                let current = self.log_filter.search().unwrap_or_default().to_string();
                self.overlay = Overlay::LogSearch(current);
                Vec::new()
            }
            KeyCode::Char('c') => {
                self.log_filter.set_search("");
                Vec::new()
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('l') | KeyCode::Backspace => {
                self.view = View::List;
                vec![Intent::CloseLogs]
            }
            _ => Vec::new(),
        }
    }

    fn on_detail_key(&mut self, key: KeyEvent) -> Vec<Intent> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
                Vec::new()
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Backspace => {
                self.detail_scroll = 0;
                vec![Intent::CloseDetail]
            }
            _ => Vec::new(),
        }
    }

    fn on_bulk_menu_key(&mut self, key: KeyEvent) -> Vec<Intent> {
        let pick = match key.code {
            KeyCode::Char(c @ '1'..='4') => c as usize - '1' as usize,
            KeyCode::Esc | KeyCode::Char('q') => return Vec::new(),
            _ => {
                self.overlay = Overlay::BulkMenu;
                return Vec::new();
            }
        };
        self.overlay = Overlay::ConfirmBulk(LifecycleAction::ALL[pick]);
        Vec::new()
    }

    fn on_prompt_key(&mut self, key: KeyEvent, mut buf: String, exec: bool) -> Vec<Intent> {
        match key.code {
            KeyCode::Esc => return Vec::new(),
            KeyCode::Enter => {
                if exec {
                    self.exec_history.push(&buf);
                    return vec![Intent::Exec(buf)];
                }
                self.log_filter.set_search(&buf);
                return Vec::new();
            }
            KeyCode::Up if exec => {
                if let Some(cmd) = self.exec_history.older() {
                    buf = cmd.to_string();
                }
            }
            KeyCode::Down if exec => {
                buf = self.exec_history.newer().unwrap_or_default().to_string();
            }
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
        self.overlay = if exec {
            Overlay::ExecPrompt(buf)
        } else {
            Overlay::LogSearch(buf)
        };
        Vec::new()
    }
}

/// Names shown in the bulk confirmation: all of them up to five, otherwise
/// the first three and a count of the rest
pub fn confirm_names(names: &[String]) -> Vec<String> {
    if names.len() <= 5 {
        return names.iter().map(|n| format!("  • {}", n)).collect();
    }
    let mut out: Vec<String> = names[..3].iter().map(|n| format!("  • {}", n)).collect();
    out.push(format!("  ... and {} more", names.len() - 3));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    #[test]
    fn test_navigation_keys() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        assert_eq!(ui.on_key(ch('j'), ctx), vec![Intent::FocusNext]);
        assert_eq!(ui.on_key(key(KeyCode::Up), ctx), vec![Intent::FocusPrev]);
        assert_eq!(ui.on_key(ch('q'), ctx), vec![Intent::Quit]);
        assert_eq!(
            ui.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), ctx),
            vec![Intent::Quit]
        );
    }

    #[test]
    fn test_bulk_menu_then_confirm() {
        let mut ui = UiState::new();
        let ctx = KeyContext {
            bulk_enabled: true,
            ..Default::default()
        };
        ui.overlay = Overlay::BulkMenu;
        assert!(ui.on_key(ch('2'), ctx).is_empty());
        assert_eq!(ui.overlay, Overlay::ConfirmBulk(LifecycleAction::Stop));

        assert!(ui.on_key(ch('x'), ctx).is_empty());
        assert_eq!(ui.overlay, Overlay::ConfirmBulk(LifecycleAction::Stop));

        assert_eq!(
            ui.on_key(ch('y'), ctx),
            vec![Intent::RunBulk(LifecycleAction::Stop)]
        );
        assert_eq!(ui.overlay, Overlay::None);
    }

    #[test]
    fn test_remove_requires_confirmation() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        assert_eq!(ui.on_key(ch('d'), ctx), vec![Intent::PromptRemove]);

        ui.overlay = Overlay::ConfirmRemove {
            id: "e".into(),
            name: "web".into(),
        };
        assert!(ui.on_key(ch('n'), ctx).is_empty());
        assert_eq!(ui.overlay, Overlay::None);

        ui.overlay = Overlay::ConfirmRemove {
            id: "e".into(),
            name: "web".into(),
        };
        assert_eq!(ui.on_key(ch('y'), ctx), vec![Intent::Remove("e".into())]);
    }

    #[test]
    fn test_finished_batch_takes_any_key() {
        let mut ui = UiState::new();
        let ctx = KeyContext {
            bulk_done: true,
            bulk_enabled: true,
            ..Default::default()
        };
        assert_eq!(ui.on_key(ch('z'), ctx), vec![Intent::AcknowledgeBulk]);
    }

    #[test]
    fn test_keys_ignored_while_batch_runs() {
        let mut ui = UiState::new();
        let ctx = KeyContext {
            bulk_running: true,
            ..Default::default()
        };
        assert!(ui.on_key(ch('s'), ctx).is_empty());
    }

    #[test]
    fn test_backspace_leaves_bulk_mode_only_when_enabled() {
        let mut ui = UiState::new();
        assert!(ui.on_key(key(KeyCode::Backspace), KeyContext::default()).is_empty());
        let ctx = KeyContext {
            bulk_enabled: true,
            ..Default::default()
        };
        assert_eq!(
            ui.on_key(key(KeyCode::Backspace), ctx),
            vec![Intent::ToggleBulkMode]
        );
    }

    #[test]
    fn test_exec_prompt_collects_command() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        ui.on_key(ch('e'), ctx);
        for c in "ls -la".chars() {
            ui.on_key(ch(c), ctx);
        }
        ui.on_key(key(KeyCode::Backspace), ctx);
        assert_eq!(
            ui.on_key(key(KeyCode::Enter), ctx),
            vec![Intent::Exec("ls -l".into())]
        );
    }

    #[test]
    fn test_exec_history_skips_repeat_of_newest() {
        let mut history = ExecHistory::default();
        history.push("ls");
        history.push("ls");
        history.push("  ");
        history.push("df -h");
        history.push("ls");
        assert_eq!(history.commands.len(), 3);
    }

    #[test]
    fn test_exec_history_stops_at_both_ends() {
        let mut history = ExecHistory::default();
        assert_eq!(history.older(), None);
        assert_eq!(history.newer(), None);

        history.push("one");
        history.push("two");
        assert_eq!(history.older(), Some("two"));
        assert_eq!(history.older(), Some("one"));
        assert_eq!(history.older(), Some("one"));

        assert_eq!(history.newer(), Some("two"));
        assert_eq!(history.newer(), None);
        assert_eq!(history.newer(), None);
        assert_eq!(history.older(), Some("two"));
    }

    #[test]
    fn test_exec_history_is_bounded() {
        let mut history = ExecHistory::new(2);
        for cmd in ["a", "b", "c"] {
            history.push(cmd);
        }
        assert_eq!(history.commands.len(), 2);
        assert_eq!(history.older(), Some("c"));
        assert_eq!(history.older(), Some("b"));
        assert_eq!(history.older(), Some("b"));
    }

    #[test]
    fn test_exec_prompt_recalls_previous_commands() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        for cmd in ["uptime", "ps aux"] {
            ui.on_key(ch('e'), ctx);
            for c in cmd.chars() {
                ui.on_key(ch(c), ctx);
            }
            ui.on_key(key(KeyCode::Enter), ctx);
        }

        ui.on_key(ch('e'), ctx);
        ui.on_key(key(KeyCode::Up), ctx);
        ui.on_key(key(KeyCode::Up), ctx);
        assert_eq!(ui.overlay, Overlay::ExecPrompt("uptime".into()));
        ui.on_key(key(KeyCode::Down), ctx);
        assert_eq!(ui.overlay, Overlay::ExecPrompt("ps aux".into()));
        ui.on_key(key(KeyCode::Down), ctx);
        assert_eq!(ui.overlay, Overlay::ExecPrompt(String::new()));

        ui.on_key(key(KeyCode::Up), ctx);
        assert_eq!(
            ui.on_key(key(KeyCode::Enter), ctx),
            vec![Intent::Exec("ps aux".into())]
        );
        assert_eq!(ui.exec_history.commands.len(), 2);
    }

    #[test]
    fn test_stats_view_keys() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        ui.on_key(ch('t'), ctx);
        assert_eq!(ui.view, View::Stats);
        assert_eq!(ui.on_key(ch('r'), ctx), vec![Intent::ResetHistory]);
        assert_eq!(ui.on_key(ch('p'), ctx), vec![Intent::TogglePause]);
        ui.on_key(key(KeyCode::Esc), ctx);
        assert_eq!(ui.view, View::List);
    }

    #[test]
    fn test_log_search_sets_filter() {
        let mut ui = UiState::new();
        let ctx = KeyContext::default();
        assert_eq!(ui.on_key(ch('l'), ctx), vec![Intent::OpenLogs]);
        ui.on_key(ch('/'), ctx);
        for c in "GET".chars() {
            ui.on_key(ch(c), ctx);
        }
        ui.on_key(key(KeyCode::Enter), ctx);
        assert_eq!(ui.log_filter.search(), Some("get"));
        assert_eq!(ui.on_key(ch('q'), ctx), vec![Intent::CloseLogs]);
        assert_eq!(ui.view, View::List);
    }

    #[test]
    fn test_confirm_names_truncates() {
        let few: Vec<String> = (1..=5).map(|i| format!("c{}", i)).collect();
        assert_eq!(confirm_names(&few).len(), 5);

        let many: Vec<String> = (1..=8).map(|i| format!("c{}", i)).collect();
        let shown = confirm_names(&many);
        assert_eq!(shown.len(), 4);
        assert_eq!(shown[3], "  ... and 5 more");
    }
}
