//! Conversation display widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use crate::ui::theme::ChatTheme;

/// Who or what produced a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    User,
    Companion,
    /// A reply with crisis resources attached.
    Crisis,
    System,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ChatItem {
    pub content: String,
    pub kind: ChatKind,
}

pub struct ConversationWidget<'a> {
    items: &'a [ChatItem],
    scroll: usize,
    theme: &'a ChatTheme,
    focused: bool,
    streaming_text: Option<&'a str>,
    waiting: bool,
    frame: u8,
}

impl<'a> ConversationWidget<'a> {
    pub fn new(items: &'a [ChatItem], theme: &'a ChatTheme) -> Self {
        Self {
            items,
            scroll: 0,
            theme,
            focused: false,
            streaming_text: None,
            waiting: false,
            frame: 0,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn streaming(mut self, text: Option<&'a str>) -> Self {
        self.streaming_text = text;
        self
    }

    /// Show a typing indicator until text starts streaming.
    pub fn waiting(mut self, waiting: bool, frame: u8) -> Self {
        self.waiting = waiting;
        self.frame = frame;
        self
    }

    fn style_for(&self, kind: ChatKind) -> Style {
        match kind {
            ChatKind::User => self.theme.user_style(),
            ChatKind::Companion => self.theme.companion_style(),
            ChatKind::Crisis => self.theme.crisis_style(),
            ChatKind::System => self.theme.system_style(),
            ChatKind::Warning => self.theme.warning_style(),
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for item in self.items {
            let style = self.style_for(item.kind);
            let label = match item.kind {
                ChatKind::User => Some("You"),
                ChatKind::Companion | ChatKind::Crisis => Some("Bro"),
                ChatKind::Warning => Some("!"),
                ChatKind::System => None,
            };

            if let Some(label) = label {
                lines.push(Line::from(Span::styled(
                    format!("{label}:"),
                    style.add_modifier(Modifier::BOLD),
                )));
            }
            for line in item.content.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
            lines.push(Line::from(""));
        }

        if let Some(streaming) = self.streaming_text {
            let style = self.theme.companion_style().add_modifier(Modifier::DIM);
            lines.push(Line::from(Span::styled(
                "Bro:",
                style.add_modifier(Modifier::BOLD),
            )));
            for line in streaming.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
            lines.push(Line::from(Span::styled("▌", style)));
        } else if self.waiting {
            let dots = ".".repeat(usize::from(self.frame / 3 % 3) + 1);
            lines.push(Line::from(Span::styled(
                format!("Bro is typing{dots}"),
                self.theme.system_style(),
            )));
        }

        lines
    }
}

impl Widget for ConversationWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Conversation [j/k scroll] "
        } else {
            " Conversation "
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.lines();
        let visible_height = inner.height as usize;
        let total_lines = lines.len();
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let mut state = ScrollbarState::new(max_scroll).position(scroll);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(scrollbar_area, buf, &mut state);

            if scroll < max_scroll {
                let hint = format!(" ↓{} more ", max_scroll - scroll);
                let y = inner.y + inner.height.saturating_sub(1);
                let style = Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM);
                buf.set_stringn(inner.x, y, hint, inner.width.saturating_sub(2) as usize, style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_to_string(widget: ConversationWidget<'_>, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_renders_labels_and_text() {
        let theme = ChatTheme::default();
        let items = vec![
            ChatItem {
                content: "rough day".into(),
                kind: ChatKind::User,
            },
            ChatItem {
                content: "I'm sorry to hear".into(),
                kind: ChatKind::Companion,
            },
        ];
        let text = render_to_string(ConversationWidget::new(&items, &theme), 40, 10);
        assert!(text.contains("You:"));
        assert!(text.contains("rough day"));
        assert!(text.contains("Bro:"));
    }

    #[test]
    fn test_streaming_text_shows_cursor() {
        let theme = ChatTheme::default();
        let text = render_to_string(
            ConversationWidget::new(&[], &theme).streaming(Some("Half a")),
            40,
            8,
        );
        assert!(text.contains("Half a"));
        assert!(text.contains('▌'));
    }

    #[test]
    fn test_waiting_indicator() {
        let theme = ChatTheme::default();
        let text = render_to_string(ConversationWidget::new(&[], &theme).waiting(true, 0), 40, 6);
        assert!(text.contains("Bro is typing."));
    }
}
