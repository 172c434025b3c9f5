//! Sidebar showing what the companion knows about the user

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::ChatTheme;
use crate::worker::SessionView;

pub struct ProfilePanelWidget<'a> {
    view: &'a SessionView,
    theme: &'a ChatTheme,
    focused: bool,
}

impl<'a> ProfilePanelWidget<'a> {
    pub fn new(view: &'a SessionView, theme: &'a ChatTheme) -> Self {
        Self {
            view,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn heading(&self, text: &'static str) -> Line<'static> {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let view = self.view;
        let dim = self.theme.system_style();
        let mut lines = vec![
            Line::from(Span::styled(view.name.clone(), self.theme.title_style())),
            Line::from(Span::styled(view.user_id.clone(), dim)),
            Line::from(""),
        ];

        lines.push(self.heading("Mood"));
        match &view.last_mood {
            Some(mood) => {
                lines.push(Line::from(vec![
                    Span::raw("Feeling: "),
                    Span::styled(mood.emotion.to_string(), self.theme.mood_style(mood.emotion)),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("Urgency: "),
                    Span::styled(
                        format!("{}/5", mood.urgency),
                        self.theme.urgency_style(mood.urgency),
                    ),
                ]));
            }
            None => lines.push(Line::from(Span::styled("Not sure yet", dim))),
        }
        lines.push(Line::from(""));

        lines.push(self.heading("On their mind"));
        if view.concerns.is_empty() {
            lines.push(Line::from(Span::styled("Nothing noted", dim)));
        }
        for concern in &view.concerns {
            lines.push(Line::from(format!("• {concern}")));
        }

        if !view.events.is_empty() {
            lines.push(Line::from(""));
            lines.push(self.heading("Coming up"));
            for event in &view.events {
                lines.push(Line::from(format!("• {event}")));
            }
        }

        if !view.suggestions.is_empty() {
            lines.push(Line::from(""));
            lines.push(self.heading("Might help"));
            for suggestion in &view.suggestions {
                lines.push(Line::from(format!("• {suggestion}")));
            }
        }

        if !view.follow_up_questions.is_empty() {
            lines.push(Line::from(""));
            lines.push(self.heading("Worth thinking about"));
            for question in &view.follow_up_questions {
                lines.push(Line::from(Span::styled(format!("• {question}"), dim)));
            }
        }

        if !view.preferences.is_empty() {
            lines.push(Line::from(""));
            lines.push(self.heading("Preferences"));
            for (key, value) in &view.preferences {
                lines.push(Line::from(format!("{key}: {value}")));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} messages", view.turns),
            dim,
        )));
        if !view.persistent {
            lines.push(Line::from(Span::styled(
                "Not saving this session",
                self.theme.warning_style(),
            )));
        }
        lines
    }
}

impl Widget for ProfilePanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 {
            return;
        }

        let block = Block::default()
            .title(" Profile ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mybro_core::{Classification, Emotion, Urgency};

    fn joined(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .flat_map(|line| line.spans.iter().map(|s| s.content.to_string()))
            .collect::<Vec<_>>()
            .join("|")
    }

    #[test]
    fn test_new_session_panel() {
        let view = SessionView {
            name: "friend".into(),
            user_id: "user_1234abcd".into(),
            persistent: true,
            ..SessionView::default()
        };
        let theme = ChatTheme::default();
        let text = joined(&ProfilePanelWidget::new(&view, &theme).lines());
        assert!(text.contains("friend"));
        assert!(text.contains("Not sure yet"));
        assert!(text.contains("Nothing noted"));
        assert!(!text.contains("Not saving"));
        assert!(!text.contains("Might help"));
        assert!(!text.contains("Coming up"));
    }

    #[test]
    fn test_panel_shows_suggestions_and_events() {
        let view = SessionView {
            name: "Sam".into(),
            events: vec!["exam (Fri Jun 6)".into()],
            suggestions: vec!["Take a short break away from screens.".into()],
            follow_up_questions: vec!["What's taking up most of your energy right now?".into()],
            persistent: true,
            ..SessionView::default()
        };
        let theme = ChatTheme::default();
        let text = joined(&ProfilePanelWidget::new(&view, &theme).lines());
        assert!(text.contains("Coming up|• exam (Fri Jun 6)"));
        assert!(text.contains("Might help|• Take a short break"));
        assert!(text.contains("• What's taking up most of your energy"));
    }

    #[test]
    fn test_panel_shows_mood_and_concerns() {
        let view = SessionView {
            name: "Sam".into(),
            concerns: vec!["anxious".into()],
            last_mood: Some(Classification {
                emotion: Emotion::Anxious,
                urgency: Urgency::new(4),
                matched: None,
            }),
            persistent: false,
            ..SessionView::default()
        };
        let theme = ChatTheme::default();
        let text = joined(&ProfilePanelWidget::new(&view, &theme).lines());
        assert!(text.contains("anxious"));
        assert!(text.contains("4/5"));
        assert!(text.contains("Not saving this session"));
    }
}
