use std::io::{self, stdout};
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    ExecutableCommand,
    cursor,
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};

use dockdash_core::bulk::BulkPhase;
use dockdash_core::{Dashboard, Handled};

use crate::ui::input::{KeyContext, Overlay, UiState};
use crate::ui::render::{self, FrameInfo};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Repaint at least this often so elapsed times stay current
const IDLE_REPAINT: Duration = Duration::from_secs(1);

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Install panic and error hooks that restore the terminal before printing.
/// Must run before raw mode is entered.
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = stdout().execute(cursor::Show);
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
        panic_hook(info);
    }));
    Ok(())
}

fn key_context(dash: &Dashboard) -> KeyContext {
    let state = dash.state();
    let phase = state.bulk.lock();
    KeyContext {
        bulk_running: matches!(*phase, BulkPhase::Running(_)),
        bulk_done: matches!(*phase, BulkPhase::Done(_)),
        notice: state.notice.lock().is_some(),
        detail: state.detail.lock().is_some(),
        bulk_enabled: state.selection.is_enabled(),
    }
}

/// Run the interactive dashboard until the user quits
pub async fn run(mut dash: Dashboard) -> Result<()> {
    let mut terminal = setup_terminal().wrap_err("failed to enter raw mode")?;
    let result = event_loop(&mut terminal, &mut dash).await;

    dash.shutdown().await;
    restore_terminal(terminal).wrap_err("failed to restore terminal")?;
    result
}

async fn event_loop(terminal: &mut Term, dash: &mut Dashboard) -> Result<()> {
    let mut ui = UiState::new();
    let mut events = EventStream::new();
    let mut repaint = tokio::time::interval(IDLE_REPAINT);
    repaint.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let runtime = dash.runtime_name();
    let sparkline_width = dash.config().sparkline_width;
    let state = dash.state().clone();

    loop {
        terminal.draw(|f| {
            let info = FrameInfo {
                runtime,
                sparkline_width,
            };
            render::draw(f, &state, &ui, &info);
        })?;

        tokio::select! {
            () = state.redraw_requested() => {}
            _ = repaint.tick() => {}
            maybe = events.next() => {
                let Some(event) = maybe else { break };
                match event.wrap_err("failed to read terminal event")? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        let ctx = key_context(dash);
                        for intent in ui.on_key(key, ctx) {
                            match dash.handle(intent) {
                                Handled::Continue => {}
                                Handled::BulkMenu => ui.overlay = Overlay::BulkMenu,
                                Handled::ConfirmRemove { id, name } => {
                                    ui.overlay = Overlay::ConfirmRemove { id, name };
                                }
                                Handled::Quit => return Ok(()),
                            }
                        }
                    }
                    // resize and everything else just repaints
                    _ => {}
                }
            }
        }
    }
    Ok(())
}
