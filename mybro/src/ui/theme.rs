//! Colors and styles for the TUI

use mybro_core::{Emotion, Urgency};
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct ChatTheme {
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,

    pub user_text: Color,
    pub companion_text: Color,
    pub crisis_text: Color,
    pub system_text: Color,
    pub warning_text: Color,

    pub mood_positive: Color,
    pub mood_neutral: Color,
    pub mood_negative: Color,
}

impl Default for ChatTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            user_text: Color::Cyan,
            companion_text: Color::White,
            crisis_text: Color::LightRed,
            system_text: Color::DarkGray,
            warning_text: Color::Yellow,

            mood_positive: Color::Green,
            mood_neutral: Color::Gray,
            mood_negative: Color::LightMagenta,
        }
    }
}

impl ChatTheme {
    pub fn companion_style(&self) -> Style {
        Style::default().fg(self.companion_text)
    }

    pub fn user_style(&self) -> Style {
        Style::default()
            .fg(self.user_text)
            .add_modifier(Modifier::ITALIC)
    }

    /// Replies carrying crisis resources stand out.
    pub fn crisis_style(&self) -> Style {
        Style::default()
            .fg(self.crisis_text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning_text)
    }

    pub fn mood_style(&self, emotion: Emotion) -> Style {
        let color = match emotion {
            Emotion::Neutral => self.mood_neutral,
            e if e.is_negative() => self.mood_negative,
            _ => self.mood_positive,
        };
        Style::default().fg(color)
    }

    pub fn urgency_style(&self, urgency: Urgency) -> Style {
        match urgency.get() {
            5 => self.crisis_style(),
            4 => Style::default().fg(self.crisis_text),
            3 => self.warning_style(),
            _ => Style::default().fg(self.mood_neutral),
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.foreground)
            .add_modifier(Modifier::BOLD)
    }
}
