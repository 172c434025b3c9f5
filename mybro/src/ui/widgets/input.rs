//! Message input widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::ChatTheme;

pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a ChatTheme,
    placeholder: &'a str,
    is_active: bool,
    is_command_mode: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a ChatTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            placeholder: "",
            is_active: true,
            is_command_mode: false,
        }
    }

    /// Cursor position in characters.
    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn command_mode(mut self, is_command: bool) -> Self {
        self.is_command_mode = is_command;
        self
    }

    fn line(&self) -> Line<'a> {
        if self.content.is_empty() && !self.is_command_mode {
            return Line::from(vec![
                Span::styled("> ", self.theme.user_style()),
                Span::styled(self.placeholder, Style::default().add_modifier(Modifier::DIM)),
            ]);
        }

        // The ':' is drawn as the prompt, not as content.
        let (prompt, content, cursor) = match self.content.strip_prefix(':') {
            Some(rest) if self.is_command_mode => {
                (":", rest, self.cursor_position.saturating_sub(1))
            }
            _ => ("> ", self.content, self.cursor_position),
        };

        let before: String = content.chars().take(cursor).collect();
        let at: String = content
            .chars()
            .nth(cursor)
            .map_or_else(|| " ".to_string(), String::from);
        let after: String = content.chars().skip(cursor + 1).collect();

        let mut spans = vec![Span::styled(prompt, self.theme.user_style()), Span::raw(before)];
        if self.is_active {
            spans.push(Span::styled(
                at,
                Style::default()
                    .fg(self.theme.user_text)
                    .add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(at));
        }
        spans.push(Span::raw(after));
        Line::from(spans)
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));

        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new(self.line()).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(widget: &InputWidget<'_>) -> String {
        widget
            .line()
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    #[test]
    fn test_placeholder_when_empty() {
        let theme = ChatTheme::default();
        let widget = InputWidget::new("", &theme).placeholder("Say something");
        assert_eq!(text(&widget), "> Say something");
    }

    #[test]
    fn test_command_prompt_strips_colon() {
        let theme = ChatTheme::default();
        let widget = InputWidget::new(":quit", &theme)
            .command_mode(true)
            .cursor_position(5);
        assert_eq!(text(&widget), ":quit ");
    }

    #[test]
    fn test_cursor_in_middle_of_unicode() {
        let theme = ChatTheme::default();
        let widget = InputWidget::new("héllo", &theme).cursor_position(1);
        let line = widget.line();
        assert_eq!(line.spans[1].content, "h");
        assert_eq!(line.spans[2].content, "é");
        assert_eq!(line.spans[3].content, "llo");
    }
}
