//! TUI widgets

pub mod conversation;
pub mod input;
pub mod profile_panel;

pub use conversation::ConversationWidget;
pub use input::InputWidget;
pub use profile_panel::ProfilePanelWidget;
