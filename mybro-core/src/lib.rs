//! Supportive chat companion with conversation memory.
//!
//! This crate provides:
//! - Rules-based emotion and urgency classification
//! - A topic filter keeping conversations on mental-health ground
//! - Bounded conversation history with summarization
//! - Per-user profiles persisted as JSON
//! - A response orchestrator that talks to an LLM and gates crisis resources
//! - Follow-ups on events the user mentioned, and per-reply coping suggestions
//!
//! # Quick Start
//!
//! ```ignore
//! use mybro_core::{ChatSession, CompanionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CompanionConfig::load(None)?;
//!     let mut session = ChatSession::open_with_gemini(config, "user_1a2b3c4d").await?;
//!
//!     let reply = session.send("work has me really stressed").await;
//!     println!("{}", reply.text);
//!
//!     for warning in session.end().await {
//!         eprintln!("{warning}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod companion;
pub mod config;
pub mod crisis;
pub mod events;
pub mod llm;
pub mod log;
pub mod persist;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod suggestions;
pub mod testing;
pub mod topic;
pub mod transcript;

mod text;

// Primary public API
pub use classifier::{Classification, Classifier, Emotion, Urgency};
pub use companion::{Companion, Disposition, Reply};
pub use config::{CompanionConfig, ConfigError, HistoryConfig};
pub use events::{EventNote, FollowUp};
pub use llm::{LanguageModel, LlmError, OnDelta};
pub use log::{ConversationLog, LlmSummarizer, LocalSummarizer, Speaker, Summarizer, Turn};
pub use persist::PersistError;
pub use profile::{ProfileStore, UserProfile};
pub use session::{ChatSession, PersistWarning, SessionError};
pub use testing::{MockModel, MockResponse, TestHarness};
pub use topic::{TopicFilter, TopicVerdict, REFUSAL_MESSAGE};
