//! Render orchestration for the TUI

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::ui::layout::{centered_rect_fixed, AppLayout};
use crate::ui::widgets::{ConversationWidget, InputWidget, ProfilePanelWidget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    #[default]
    Conversation,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Help,
}

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let layout = AppLayout::calculate(area);

    render_title_bar(frame, app, layout.title_area);

    let conversation = ConversationWidget::new(&app.conversation, &app.theme)
        .scroll(app.scroll)
        .focused(app.focused_panel == FocusedPanel::Conversation)
        .streaming(app.streaming_text.as_deref())
        .waiting(app.waiting, app.animation_frame);
    frame.render_widget(conversation, layout.conversation_area);

    let profile = ProfilePanelWidget::new(&app.view, &app.theme)
        .focused(app.focused_panel == FocusedPanel::Profile);
    frame.render_widget(profile, layout.sidebar_area);

    render_status_bar(frame, app, layout.status_bar);
    render_input(frame, app, layout.input_area);

    if let Some(Overlay::Help) = app.overlay() {
        render_help_overlay(frame, app, area);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" MyBro | talking with {} ", app.view.name);
    let line = Line::from(Span::styled(title, app.theme.title_style()));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Insert => "INSERT",
        InputMode::Command => "COMMAND",
    };

    let mut spans = vec![Span::styled(
        format!(" {mode} "),
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD),
    )];
    match app.status_message() {
        Some(message) => spans.push(Span::raw(format!(" {message}"))),
        None => spans.push(Span::styled(
            " ? help  :q quit  c check-in  p profile",
            app.theme.system_style(),
        )),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let placeholder = if app.waiting {
        "Bro is thinking..."
    } else if app.input_mode == InputMode::Normal {
        "Press i to type"
    } else {
        "Type a message, or 'help'"
    };

    let input = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .active(app.input_mode != InputMode::Normal)
        .command_mode(app.input_mode == InputMode::Command)
        .placeholder(placeholder);
    frame.render_widget(input, area);
}

fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(56, 24, area);
    frame.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    };

    let help_text = vec![
        section("Modes:"),
        Line::from("  i / Enter   Type a message"),
        Line::from("  :           Enter a command"),
        Line::from("  Esc         Back to NORMAL mode"),
        Line::from(""),
        section("NORMAL mode:"),
        Line::from("  j/k ↑/↓     Scroll"),
        Line::from("  Ctrl+u/d    Scroll faster"),
        Line::from("  g/G         Top / bottom"),
        Line::from("  c           Daily check-in"),
        Line::from("  p           Show profile"),
        Line::from("  Tab         Switch panel"),
        Line::from("  q           Save and quit"),
        Line::from(""),
        section("Commands (type, or prefix with :):"),
        Line::from("  profile name <name>   profile concern <text>"),
        Line::from("  profile pref <k>=<v>  checkin  clear  quit"),
        Line::from(""),
        Line::from("If you're in crisis, call or text 988 (US)."),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(help_text)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}
