//! Layout calculations for the TUI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main screen areas
pub struct AppLayout {
    pub title_area: Rect,
    pub conversation_area: Rect,
    pub sidebar_area: Rect,
    pub status_bar: Rect,
    pub input_area: Rect,
}

impl AppLayout {
    pub fn calculate(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Min(8),    // Conversation + sidebar
                Constraint::Length(1), // Status bar
                Constraint::Length(3), // Input
            ])
            .split(area);

        // Narrow terminals get the whole width for the conversation.
        let sidebar_width = if area.width >= 80 { 28 } else { 0 };
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(sidebar_width)])
            .split(rows[1]);

        Self {
            title_area: rows[0],
            conversation_area: columns[0],
            sidebar_area: columns[1],
            status_bar: rows[2],
            input_area: rows[3],
        }
    }
}

/// A popup of fixed size centered in `area`, shrunk to fit.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
