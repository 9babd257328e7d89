//! UI Theme Module - color palette and style helpers
//!
//! Palette tokens instead of hard-coded colors. The palette is picked once
//! at startup from `theme:` in `dockdash.yml`.

use ratatui::style::{Color, Modifier, Style};

use dockdash_core::config::ThemeName;
use dockdash_core::model::UnitState;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (tertiary info, disabled)
    pub text_muted: Color,
    /// Accent color (highlights, focus)
    pub accent: Color,
    /// Running units, successful results
    pub success: Color,
    /// Transitional states, partial failures
    pub warn: Color,
    pub error: Color,
    /// Selection background
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Bulk mode badge and checked boxes
    pub bulk: Color,
    /// Key hint text
    pub key_hint: Color,
    pub cpu: Color,
    pub mem: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),      // Light blue
            success: Color::Rgb(78, 201, 176),     // Teal green
            warn: Color::Rgb(220, 180, 100),       // Amber
            error: Color::Rgb(244, 135, 113),      // Coral red
            selection_bg: Color::Rgb(38, 79, 120), // Dark blue
            selection_fg: Color::White,
            bulk: Color::Rgb(197, 134, 192), // Orchid
            key_hint: Color::Rgb(206, 145, 120),
            cpu: Color::Cyan,
            mem: Color::Green,
        }
    }

    pub fn high_contrast() -> Self {
        Self {
            panel_border: Color::White,
            text: Color::White,
            text_dim: Color::Rgb(200, 200, 200),
            text_muted: Color::Rgb(150, 150, 150),
            accent: Color::Cyan,
            success: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            bulk: Color::Magenta,
            key_hint: Color::Yellow,
            cpu: Color::Cyan,
            mem: Color::LightGreen,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        let palette = match name {
            ThemeName::Dark => Palette::dark(),
            ThemeName::HighContrast => Palette::high_contrast(),
        };
        Self { palette }
    }

    pub fn state_style(&self, state: &UnitState) -> Style {
        let color = match state {
            UnitState::Running => self.palette.success,
            UnitState::Created | UnitState::Restarting | UnitState::Removing => self.palette.warn,
            UnitState::Paused => self.palette.accent,
            UnitState::Exited => self.palette.text_muted,
            UnitState::Dead => self.palette.error,
            UnitState::Other(_) => self.palette.text_muted,
        };
        Style::default().fg(color)
    }

    pub fn state_icon(&self, state: &UnitState) -> &'static str {
        match state {
            UnitState::Running => "●",
            UnitState::Created => "◌",
            UnitState::Paused => "◐",
            UnitState::Restarting => "⟲",
            UnitState::Removing => "◍",
            UnitState::Exited => "○",
            UnitState::Dead => "✗",
            UnitState::Other(_) => "?",
        }
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn accent_bold_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.palette.success)
    }

    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.palette.error)
    }

    pub fn bulk_style(&self) -> Style {
        Style::default()
            .fg(self.palette.bulk)
            .add_modifier(Modifier::BOLD)
    }

    pub fn cpu_style(&self) -> Style {
        Style::default().fg(self.palette.cpu)
    }

    pub fn mem_style(&self) -> Style {
        Style::default().fg(self.palette.mem)
    }

    pub fn section_header_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }
}

static THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

/// Pick the palette. Only the first call has an effect.
pub fn init(name: ThemeName) {
    let _ = THEME.set(Theme::from_name(name));
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

/// Shorthands over the global theme
pub mod styles {
    use super::*;

    pub fn state(state: &UnitState) -> Style {
        theme().state_style(state)
    }

    pub fn state_icon(state: &UnitState) -> &'static str {
        theme().state_icon(state)
    }

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn border_subtle() -> Style {
        theme().subtle_border_style()
    }

    pub fn border_focused() -> Style {
        theme().focused_border_style()
    }

    pub fn selection() -> Style {
        theme().selection_style()
    }

    pub fn text() -> Style {
        theme().text_style()
    }

    pub fn text_dim() -> Style {
        theme().text_dim_style()
    }

    pub fn text_muted() -> Style {
        theme().text_muted_style()
    }

    pub fn accent_bold() -> Style {
        theme().accent_bold_style()
    }

    pub fn success() -> Style {
        theme().success_style()
    }

    pub fn warn() -> Style {
        theme().warn_style()
    }

    pub fn error() -> Style {
        theme().error_style()
    }

    pub fn bulk() -> Style {
        theme().bulk_style()
    }

    pub fn cpu() -> Style {
        theme().cpu_style()
    }

    pub fn mem() -> Style {
        theme().mem_style()
    }

    pub fn section_header() -> Style {
        theme().section_header_style()
    }
}
