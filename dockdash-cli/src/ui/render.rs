use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Clear, Dataset, Gauge, GraphType, List, ListItem, ListState,
        Paragraph, Wrap,
    },
};

use dockdash_core::bulk::{BulkPhase, BulkProgress};
use dockdash_core::log_filter::LogSession;
use dockdash_core::metrics::MetricKind;
use dockdash_core::model::UnitSnapshot;
use dockdash_core::state::{DashboardSnapshot, DashboardState, DetailView, NoticeLevel};

use super::input::{Overlay, UiState, View, confirm_names};
use super::styles;

/// Static inputs for a frame
pub struct FrameInfo<'a> {
    pub runtime: &'a str,
    pub sparkline_width: usize,
}

pub fn draw(f: &mut Frame, state: &DashboardState, ui: &UiState, info: &FrameInfo) {
    let area = f.area();
    let snap = state.snapshot();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, outer[0], state, &snap, info);
    match ui.view {
        View::List => draw_list_view(f, outer[1], state, &snap, info),
        View::Stats => draw_stats_view(f, outer[1], state, &snap),
        View::Logs => draw_logs_view(f, outer[1], state, ui),
    }
    draw_footer(f, outer[2], state, ui);

    if let Some(detail) = state.detail.lock().clone() {
        draw_detail(f, area, &detail, ui.detail_scroll);
    }
    draw_overlay(f, area, state, ui, &snap);

    // bulk progress and results sit above everything but notices
    let phase = state.bulk.lock().clone();
    match phase {
        BulkPhase::Idle => {}
        BulkPhase::Running(progress) => draw_bulk_progress(f, area, &progress, &snap),
        BulkPhase::Done(result) => {
            let mut lines = vec![Line::from(result.summary()), Line::from("")];
            for (id, err) in result.failures.iter().take(8) {
                lines.push(Line::from(Span::styled(
                    format!("  ✗ {}: {}", unit_label(&snap, id), err),
                    styles::error(),
                )));
            }
            if result.failures.len() > 8 {
                lines.push(Line::from(format!(
                    "  ... and {} more",
                    result.failures.len() - 8
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Press any key to continue",
                styles::text_dim(),
            )));
            let border = if result.is_clean() {
                styles::success()
            } else {
                styles::warn()
            };
            draw_modal(f, area, " Bulk operation complete ", lines, border, 60);
        }
    }

    if let Some(notice) = state.notice.lock().clone() {
        let border = match notice.level {
            NoticeLevel::Info => styles::border_focused(),
            NoticeLevel::Error => styles::error(),
        };
        let lines = vec![
            Line::from(notice.body),
            Line::from(""),
            Line::from(Span::styled("Press any key to dismiss", styles::text_dim())),
        ];
        draw_modal(f, area, &format!(" {} ", notice.title), lines, border, 60);
    }
}

fn unit_label(snap: &DashboardSnapshot, id: &str) -> String {
    snap.units
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| dockdash_core::model::short_id(id).to_string())
}

fn draw_header(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    snap: &DashboardSnapshot,
    info: &FrameInfo,
) {
    let mut spans = vec![
        Span::styled(" dockdash ", styles::accent_bold()),
        Span::styled(format!("[{}]  ", info.runtime), styles::text_dim()),
        Span::styled(format!("{} containers", snap.units.len()), styles::text()),
        Span::styled(" │ ", styles::text_muted()),
        Span::styled(format!("{} running", snap.running_count()), styles::success()),
        Span::styled(" │ ", styles::text_muted()),
        Span::styled(format!("{} stopped", snap.stopped_count()), styles::text_dim()),
    ];
    if state.selection.is_enabled() {
        spans.push(Span::styled(" │ ", styles::text_muted()));
        spans.push(Span::styled(
            format!("BULK MODE: {} selected", state.selection.count()),
            styles::bulk(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_list_view(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    snap: &DashboardSnapshot,
    info: &FrameInfo,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(area);

    let bulk = state.selection.is_enabled();
    let items: Vec<ListItem> = snap
        .units
        .iter()
        .map(|u| {
            let mut spans = Vec::new();
            if bulk {
                let (mark, style) = if state.selection.is_selected(&u.id) {
                    ("[x] ", styles::bulk())
                } else {
                    ("[ ] ", styles::text_dim())
                };
                spans.push(Span::styled(mark, style));
            }
            spans.push(Span::styled(
                format!("{} ", styles::state_icon(&u.state)),
                styles::state(&u.state),
            ));
            spans.push(Span::styled(format!("{:<20} ", truncate(&u.name, 20)), styles::text()));
            spans.push(Span::styled(
                format!("{:<24} ", truncate(&u.image, 24)),
                styles::text_dim(),
            ));
            spans.push(Span::styled(u.status.clone(), styles::state(&u.state)));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if bulk {
        " Containers (bulk) ".to_string()
    } else {
        " Containers ".to_string()
    };
    let border = if bulk {
        styles::bulk()
    } else {
        styles::border_focused()
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(border))
        .highlight_style(styles::selection())
        .highlight_symbol("▶ ");

    let mut list_state = ListState::default();
    list_state.select(snap.focused);
    f.render_stateful_widget(list, cols[0], &mut list_state);

    draw_focus_panel(f, cols[1], state, snap.focused_unit(), info);
}

fn draw_focus_panel(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    unit: Option<&UnitSnapshot>,
    info: &FrameInfo,
) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(styles::border_subtle());

    let Some(unit) = unit else {
        let empty = Paragraph::new("No containers found").style(styles::text_dim());
        f.render_widget(empty.block(block), area);
        return;
    };

    let width = info
        .sparkline_width
        .min(area.width.saturating_sub(14) as usize)
        .max(1);
    let (cpu_line, mem_line, cpu_bar, mem_bar, cpu_now, mem_now) = state.with_history(|h| {
        (
            h.render(MetricKind::Cpu, width),
            h.render(MetricKind::Memory, width),
            h.bar(MetricKind::Cpu, width),
            h.bar(MetricKind::Memory, width),
            h.latest(MetricKind::Cpu).unwrap_or(0.0),
            h.latest(MetricKind::Memory).unwrap_or(0.0),
        )
    });

    let mut lines = vec![
        field("Name", unit.name.clone()),
        field("ID", unit.short_id().to_string()),
        field("Image", unit.image.clone()),
        Line::from(vec![
            Span::styled(format!("{:<9}", "State"), styles::text_dim()),
            Span::styled(
                format!("{} {}", styles::state_icon(&unit.state), unit.state),
                styles::state(&unit.state),
            ),
        ]),
        field("Status", unit.status.clone()),
        field("Ports", unit.ports_label()),
        field("Created", unit.created_label()),
        Line::from(""),
        Line::from(Span::styled("Resources", styles::section_header())),
    ];

    if unit.state.is_running() {
        lines.push(Line::from(vec![
            Span::styled(format!("CPU {:>5.1}% ", cpu_now), styles::cpu()),
            Span::styled(cpu_line, styles::cpu()),
        ]));
        lines.push(Line::from(Span::styled(format!("           {}", cpu_bar), styles::cpu())));
        lines.push(Line::from(vec![
            Span::styled(format!("MEM {:>5.1}% ", mem_now), styles::mem()),
            Span::styled(mem_line, styles::mem()),
        ]));
        lines.push(Line::from(Span::styled(format!("           {}", mem_bar), styles::mem())));
        if let Some(stats) = state.latest_stats() {
            lines.push(field("Memory", stats.mem_label()));
            lines.push(field("Net I/O", stats.net_label()));
            lines.push(field("Block", stats.block_label()));
            lines.push(field("PIDs", stats.pids.to_string()));
        }
        if state.stats_paused() {
            lines.push(Line::from(Span::styled("sampling paused", styles::warn())));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "not running, no live stats",
            styles::text_muted(),
        )));
    }

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<9}", label), styles::text_dim()),
        Span::styled(value, styles::text()),
    ])
}

fn draw_stats_view(f: &mut Frame, area: Rect, state: &DashboardState, snap: &DashboardSnapshot) {
    let Some(unit) = snap.focused_unit() else {
        f.render_widget(
            Paragraph::new("No container selected").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Min(5),
        ])
        .split(area);

    let (cpu_data, mem_data, summary, cap) = state.with_history(|h| {
        (
            h.chart_points(MetricKind::Cpu),
            h.chart_points(MetricKind::Memory),
            h.summary().clone(),
            h.capacity(),
        )
    });
    let x_max = (cap.max(2) - 1) as f64;

    let paused = if state.stats_paused() { " (paused)" } else { "" };
    draw_chart(f, rows[0], &format!(" CPU % · {}{} ", unit.name, paused), &cpu_data, x_max, styles::cpu());
    draw_chart(f, rows[1], &format!(" Memory % · {}{} ", unit.name, paused), &mem_data, x_max, styles::mem());

    let elapsed = summary.started.elapsed().as_secs();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("CPU  ", styles::cpu()),
            Span::raw(format!("avg {:>5.1}%  max {:>5.1}%", summary.cpu_avg, summary.cpu_max)),
        ]),
        Line::from(vec![
            Span::styled("MEM  ", styles::mem()),
            Span::raw(format!("avg {:>5.1}%  max {:>5.1}%", summary.mem_avg, summary.mem_max)),
        ]),
        Line::from(Span::styled(
            format!("{} samples over {}m{:02}s", summary.samples, elapsed / 60, elapsed % 60),
            styles::text_dim(),
        )),
    ];
    if let Some(stats) = state.latest_stats() {
        lines.push(Line::from(format!(
            "Net {}   Block {}",
            stats.net_label(),
            stats.block_label()
        )));
    }
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Summary ")
                .borders(Borders::ALL)
                .border_style(styles::border_subtle()),
        ),
        rows[2],
    );
}

fn draw_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    data: &[(f64, f64)],
    x_max: f64,
    style: ratatui::style::Style,
) {
    let y_max = data.iter().map(|(_, v)| *v).fold(100.0_f64, f64::max);
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(style)
        .data(data);
    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(styles::border_subtle()),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(
            Axis::default()
                .bounds([0.0, y_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", y_max))]),
        );
    f.render_widget(chart, area);
}

fn draw_logs_view(f: &mut Frame, area: Rect, state: &DashboardState, ui: &UiState) {
    let logs = state.logs.lock();
    let visible = logs.visible(&ui.log_filter);
    let height = area.height.saturating_sub(2) as usize;
    let start = visible.len().saturating_sub(height);

    let lines: Vec<Line> = visible[start..]
        .iter()
        .map(|l| Line::from(l.to_string()))
        .collect();

    let session = match &logs.session {
        LogSession::Closed => "closed".to_string(),
        LogSession::Connecting => "connecting".to_string(),
        LogSession::Streaming => "live".to_string(),
        LogSession::Ended => "ended".to_string(),
        LogSession::Failed(e) => format!("error: {}", e),
    };
    let title = format!(
        " Logs · {} · {} · {} ",
        logs.unit().map(dockdash_core::model::short_id).unwrap_or("-"),
        session,
        ui.log_filter.label()
    );
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(styles::border_focused()),
        ),
        area,
    );
}

fn draw_footer(f: &mut Frame, area: Rect, state: &DashboardState, ui: &UiState) {
    let hints: &[(&str, &str)] = match ui.view {
        View::Stats => &[("r", "reset"), ("p", "pause"), ("j/k", "switch"), ("esc", "back")],
        View::Logs => &[("f", "level"), ("/", "search"), ("c", "clear"), ("esc", "back")],
        View::List if state.selection.is_enabled() => &[
            ("space", "select"),
            ("a", "actions"),
            ("⌫", "exit bulk"),
            ("j/k", "move"),
            ("q", "quit"),
        ],
        View::List => &[
            ("s", "start/stop"),
            ("r", "restart"),
            ("d", "delete"),
            ("i", "inspect"),
            ("l", "logs"),
            ("e", "exec"),
            ("t", "stats"),
            ("b", "bulk"),
            ("F5", "refresh"),
            ("?", "help"),
            ("q", "quit"),
        ],
    };
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), styles::key_hint()));
        spans.push(Span::styled(format!("{} ", label), styles::text_dim()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_detail(f: &mut Frame, area: Rect, detail: &DetailView, scroll: u16) {
    let (title, lines): (String, Vec<Line>) = match detail {
        DetailView::Inspect(d) => (
            format!(" Inspect · {} ", d.name.trim_start_matches('/')),
            d.lines()
                .into_iter()
                .map(|l| {
                    if !l.is_empty() && !l.starts_with(' ') {
                        Line::from(Span::styled(l, styles::section_header()))
                    } else {
                        Line::from(l)
                    }
                })
                .collect(),
        ),
        DetailView::Exec { command, output } => (
            format!(" Exec · {} ", command),
            output.lines().map(|l| Line::from(l.to_string())).collect(),
        ),
    };
    let rect = centered_rect(80, 80, area);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(styles::border_focused()),
            )
            .scroll((scroll, 0))
            .wrap(Wrap { trim: false }),
        rect,
    );
}

fn draw_overlay(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    ui: &UiState,
    snap: &DashboardSnapshot,
) {
    match &ui.overlay {
        Overlay::None => {}
        Overlay::Help => {
            let keys = [
                ("↑/↓ j/k", "navigate"),
                ("s", "start / stop"),
                ("r", "restart"),
                ("d", "delete (confirm)"),
                ("i", "inspect"),
                ("l", "logs"),
                ("e", "exec command"),
                ("t", "stats (r reset, p pause)"),
                ("b", "toggle bulk mode"),
                ("space", "select container"),
                ("a", "bulk actions"),
                ("F5", "refresh"),
                ("⌫", "leave bulk mode"),
                ("q", "quit"),
            ];
            let lines = keys
                .iter()
                .map(|(k, v)| {
                    Line::from(vec![
                        Span::styled(format!("  {:<10}", k), styles::key_hint()),
                        Span::raw(*v),
                    ])
                })
                .collect();
            draw_modal(f, area, " Keys ", lines, styles::border_focused(), 50);
        }
        Overlay::BulkMenu => {
            let mut lines = vec![Line::from(format!(
                "{} container(s) selected",
                state.selection.count()
            ))];
            lines.push(Line::from(""));
            for (i, action) in dockdash_core::LifecycleAction::ALL.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {} ", i + 1), styles::key_hint()),
                    Span::raw(format!("{} selected", action.label())),
                ]));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("esc to cancel", styles::text_dim())));
            draw_modal(f, area, " Bulk actions ", lines, styles::bulk(), 44);
        }
        Overlay::ConfirmBulk(action) => {
            let mut names: Vec<String> = state
                .selected_in_display_order()
                .into_iter()
                .map(|u| u.name)
                .collect();
            for id in state.selection.members() {
                if !snap.units.iter().any(|u| u.id == id) {
                    names.push(dockdash_core::model::short_id(&id).to_string());
                }
            }
            let mut lines = vec![
                Line::from(format!(
                    "{} {} container(s)?",
                    action.label(),
                    names.len()
                )),
                Line::from(""),
            ];
            lines.extend(confirm_names(&names).into_iter().map(Line::from));
            lines.push(Line::from(""));
            if action.is_destructive() {
                lines.push(Line::from(Span::styled(
                    "This cannot be undone.",
                    styles::error(),
                )));
            }
            lines.push(Line::from(Span::styled("y confirm · n cancel", styles::text_dim())));
            let border = if action.is_destructive() {
                styles::error()
            } else {
                styles::bulk()
            };
            draw_modal(f, area, " Confirm ", lines, border, 56);
        }
        Overlay::ConfirmRemove { name, .. } => {
            let lines = vec![
                Line::from(format!("Delete container {}?", name)),
                Line::from(Span::styled("Volumes are removed too.", styles::error())),
                Line::from(""),
                Line::from(Span::styled("y confirm · n cancel", styles::text_dim())),
            ];
            draw_modal(f, area, " Confirm delete ", lines, styles::error(), 50);
        }
        Overlay::ExecPrompt(buf) => {
            let lines = vec![
                Line::from(Span::styled("Runs via /bin/sh -c · ↑/↓ history", styles::text_dim())),
                Line::from(vec![
                    Span::styled("$ ", styles::accent_bold()),
                    Span::raw(buf.clone()),
                    Span::styled("█", styles::text_dim()),
                ]),
            ];
            draw_modal(f, area, " Exec ", lines, styles::border_focused(), 60);
        }
        Overlay::LogSearch(buf) => {
            let lines = vec![Line::from(vec![
                Span::styled("/ ", styles::accent_bold()),
                Span::raw(buf.clone()),
                Span::styled("█", styles::text_dim()),
            ])];
            draw_modal(f, area, " Search logs ", lines, styles::border_focused(), 50);
        }
    }
}

fn draw_bulk_progress(f: &mut Frame, area: Rect, progress: &BulkProgress, snap: &DashboardSnapshot) {
    let rect = centered_fixed(56, 7, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .title(" Bulk operation ")
        .borders(Borders::ALL)
        .border_style(styles::bulk());
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(2)])
        .split(inner);

    let current = progress
        .current
        .as_deref()
        .map(|id| unit_label(snap, id))
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(format!(
            "Processing {}/{}: {}",
            (progress.processed + 1).min(progress.total),
            progress.total,
            current
        )),
        parts[0],
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("✓ {}  ", progress.succeeded), styles::success()),
            Span::styled(format!("✗ {}", progress.failed), styles::error()),
        ])),
        parts[1],
    );
    f.render_widget(
        Gauge::default()
            .gauge_style(styles::bulk())
            .ratio(progress.ratio().clamp(0.0, 1.0)),
        parts[2],
    );
}

fn draw_modal(
    f: &mut Frame,
    area: Rect,
    title: &str,
    lines: Vec<Line>,
    border: ratatui::style::Style,
    width: u16,
) {
    let rect = centered_fixed(width, lines.len() as u16 + 2, area);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(title.to_string())
                    .borders(Borders::ALL)
                    .border_style(border),
            )
            .wrap(Wrap { trim: false }),
        rect,
    );
}

fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    centered_fixed(
        area.width * percent_x / 100,
        area.height * percent_y / 100,
        area,
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("redis", 8), "redis");
        assert_eq!(truncate("very-long-name", 6), "very-…");
    }

    #[test]
    fn test_centered_fixed_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        let r = centered_fixed(60, 4, area);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 3, 40, 4));
    }
}
