//! TUI application state.

use std::collections::VecDeque;

use mybro_core::Disposition;
use tokio::sync::mpsc;

use crate::commands::{Command, HELP_TEXT};
use crate::ui::theme::ChatTheme;
use crate::ui::widgets::conversation::{ChatItem, ChatKind};
use crate::ui::{FocusedPanel, Overlay};
use crate::worker::{SessionView, WorkerRequest, WorkerResponse};

const HISTORY_LIMIT: usize = 100;

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Navigation and hotkeys
    #[default]
    Normal,
    /// Typing a message
    Insert,
    /// Entering a : command
    Command,
}

pub struct App {
    request_tx: mpsc::Sender<WorkerRequest>,
    response_rx: mpsc::UnboundedReceiver<WorkerResponse>,

    /// Latest profile snapshot from the worker.
    pub view: SessionView,

    pub theme: ChatTheme,
    pub focused_panel: FocusedPanel,
    overlay: Option<Overlay>,

    pub conversation: Vec<ChatItem>,
    pub scroll: usize,
    pub streaming_text: Option<String>,
    /// Follow new content as it arrives.
    pub scroll_locked_to_bottom: bool,

    pub input_mode: InputMode,
    input_buffer: String,
    cursor_position: usize,
    pub input_history: VecDeque<String>,
    pub history_index: Option<usize>,
    pub saved_input: Option<String>,

    status_message: Option<String>,
    /// A request is with the worker.
    pub waiting: bool,
    /// Shutdown was requested; waiting for the save to finish.
    pub shutting_down: bool,
    /// The worker has saved and stopped.
    pub finished: bool,
    pub animation_frame: u8,
}

impl App {
    pub fn new(
        request_tx: mpsc::Sender<WorkerRequest>,
        response_rx: mpsc::UnboundedReceiver<WorkerResponse>,
    ) -> Self {
        let mut app = Self {
            request_tx,
            response_rx,
            view: SessionView::default(),
            theme: ChatTheme::default(),
            focused_panel: FocusedPanel::default(),
            overlay: None,
            conversation: Vec::new(),
            scroll: 0,
            streaming_text: None,
            scroll_locked_to_bottom: true,
            input_mode: InputMode::Insert,
            input_buffer: String::new(),
            cursor_position: 0,
            input_history: VecDeque::with_capacity(HISTORY_LIMIT),
            history_index: None,
            saved_input: None,
            status_message: None,
            waiting: false,
            shutting_down: false,
            finished: false,
            animation_frame: 0,
        };

        app.add_item(
            "Hey, I'm Bro. I'm here to listen. Type whatever's on your mind and press Enter.",
            ChatKind::Companion,
        );
        app.add_item(
            "Esc for normal mode, '?' for help, ':q' to save and quit.",
            ChatKind::System,
        );
        app
    }

    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.input_buffer.starts_with(':') {
            self.clear_input();
        }
    }

    pub fn add_item(&mut self, content: impl Into<String>, kind: ChatKind) {
        self.conversation.push(ChatItem {
            content: content.into(),
            kind,
        });
        if self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    pub fn append_streaming_text(&mut self, text: &str) {
        match &mut self.streaming_text {
            Some(existing) => existing.push_str(text),
            None => self.streaming_text = Some(text.to_string()),
        }
        if self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        // The widget caps this to the real maximum.
        self.scroll = usize::MAX / 2;
        self.scroll_locked_to_bottom = true;
    }

    /// Rough line count assuming ~60 columns, used before the widget has clamped.
    fn estimate_max_scroll(&self) -> usize {
        const ESTIMATED_WIDTH: usize = 60;
        const ESTIMATED_VISIBLE_HEIGHT: usize = 20;

        let lines: usize = self
            .conversation
            .iter()
            .map(|item| {
                item.content
                    .lines()
                    .map(|line| (line.len() / ESTIMATED_WIDTH).max(1))
                    .sum::<usize>()
                    + 1
            })
            .sum();
        lines.saturating_sub(ESTIMATED_VISIBLE_HEIGHT)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        self.scroll = self.scroll.min(max_scroll).saturating_sub(lines);
        self.scroll_locked_to_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        self.scroll = self.scroll.saturating_add(lines).min(max_scroll + 100);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.scroll_locked_to_bottom = false;
    }

    /// Take the input buffer, recording chat lines in history.
    pub fn submit_input(&mut self) -> Option<String> {
        if self.input_buffer.trim().is_empty() {
            return None;
        }

        let input = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;

        if !input.starts_with(':') {
            self.input_history.push_front(input.clone());
            self.input_history.truncate(HISTORY_LIMIT);
        }
        self.history_index = None;
        self.saved_input = None;
        Some(input)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input_buffer
            .char_indices()
            .nth(char_index)
            .map_or(self.input_buffer.len(), |(i, _)| i)
    }

    pub fn type_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_position);
        self.input_buffer.insert(at, c);
        self.cursor_position += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            self.remove_at_cursor();
        }
    }

    pub fn delete(&mut self) {
        self.remove_at_cursor();
    }

    fn remove_at_cursor(&mut self) {
        if self.cursor_position < self.input_buffer.chars().count() {
            let at = self.byte_index(self.cursor_position);
            self.input_buffer.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let len = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(len);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    pub fn history_prev(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        if self.history_index.is_none() && !self.input_buffer.is_empty() {
            self.saved_input = Some(self.input_buffer.clone());
        }

        let index = match self.history_index {
            None => 0,
            Some(i) => (i + 1).min(self.input_history.len() - 1),
        };
        if let Some(entry) = self.input_history.get(index).cloned() {
            self.set_input(entry);
            self.history_index = Some(index);
        }
    }

    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                let saved = self.saved_input.take().unwrap_or_default();
                self.set_input(saved);
                self.history_index = None;
            }
            Some(i) => {
                if let Some(entry) = self.input_history.get(i - 1).cloned() {
                    self.set_input(entry);
                    self.history_index = Some(i - 1);
                }
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.overlay = match self.overlay {
            Some(Overlay::Help) => None,
            _ => Some(Overlay::Help),
        };
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    /// Handle a submitted line: either a command or a chat message.
    pub fn submit_line(&mut self, line: &str) {
        match Command::parse(line) {
            Some(Ok(command)) => self.run_command(command),
            Some(Err(usage)) => self.set_status(usage.0),
            None if line.starts_with(':') => {
                self.set_status(format!("Unknown command: {}", line.trim_start_matches(':')));
            }
            None => self.send_message(line.trim().to_string()),
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Help => {
                self.add_item(HELP_TEXT, ChatKind::System);
            }
            Command::Quit => self.request_shutdown(),
            Command::CheckIn => self.send_request(WorkerRequest::CheckIn, "Checking in..."),
            Command::Clear => {
                self.conversation.clear();
                self.send_request(WorkerRequest::Clear, "Clearing...");
            }
            Command::Profile(profile) => {
                self.send_request(WorkerRequest::Profile(profile), "Updating profile...")
            }
        }
    }

    pub fn send_message(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if self.waiting {
            self.set_status("Still thinking about your last message...");
            return;
        }
        self.add_item(text.clone(), ChatKind::User);
        self.send_request(WorkerRequest::Message(text), "Thinking...");
    }

    fn send_request(&mut self, request: WorkerRequest, status: &str) {
        if self.shutting_down {
            return;
        }
        match self.request_tx.try_send(request) {
            Ok(()) => {
                self.waiting = true;
                self.set_status(status);
            }
            Err(_) => self.set_status("Busy, please wait..."),
        }
    }

    /// Ask the worker to save and stop. The app exits once it reports back.
    pub fn request_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.set_status("Saving...");
        if self.request_tx.try_send(WorkerRequest::Shutdown).is_err() {
            // Worker already gone; nothing left to save.
            self.finished = true;
        }
    }

    /// Apply everything the worker has sent since the last frame.
    pub fn drain_responses(&mut self) {
        loop {
            match self.response_rx.try_recv() {
                Ok(response) => self.apply_response(response),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.finished = true;
                    break;
                }
            }
        }
    }

    pub fn apply_response(&mut self, response: WorkerResponse) {
        match response {
            WorkerResponse::Delta(text) => self.append_streaming_text(&text),
            WorkerResponse::Reply {
                text,
                disposition,
                crisis_resources,
            } => {
                self.streaming_text = None;
                let kind = if crisis_resources {
                    ChatKind::Crisis
                } else {
                    ChatKind::Companion
                };
                self.add_item(text, kind);
                self.waiting = false;
                match disposition {
                    Disposition::Fallback => self.set_status("Couldn't reach the model"),
                    Disposition::Refused | Disposition::Answered => self.clear_status(),
                }
            }
            WorkerResponse::CheckIn(text) => {
                self.waiting = false;
                self.clear_status();
                match text {
                    Some(text) => self.add_item(text, ChatKind::Companion),
                    None => self.set_status("Already checked in today"),
                }
            }
            WorkerResponse::Notice(text) => {
                self.waiting = false;
                self.clear_status();
                self.add_item(text, ChatKind::System);
            }
            WorkerResponse::Warning(text) => self.add_item(text, ChatKind::Warning),
            WorkerResponse::View(view) => self.view = view,
            WorkerResponse::Finished => self.finished = true,
        }
    }

    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn cycle_focus(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Conversation => FocusedPanel::Profile,
            FocusedPanel::Profile => FocusedPanel::Conversation,
        };
    }

    pub fn set_input(&mut self, content: impl Into<String>) {
        self.input_buffer = content.into();
        self.cursor_position = self.input_buffer.chars().count();
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
}
