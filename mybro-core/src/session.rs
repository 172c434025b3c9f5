//! ChatSession - the primary public API for a conversation.
//!
//! A session owns one [`Companion`] plus the profile and transcript stores.
//! Stored state is loaded when the session opens and written back when it
//! ends. Storage problems never stop a conversation: they become
//! [`PersistWarning`]s and the affected store is dropped for the rest of the
//! run, so nothing is written over a file that could not be read.

use crate::companion::{Companion, Reply};
use crate::config::{CompanionConfig, ConfigError};
use crate::llm::{LanguageModel, LlmError};
use crate::persist::PersistError;
use crate::profile::{ProfileStore, UserProfile};
use crate::transcript::TranscriptStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from ChatSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Llm(#[from] LlmError),
}

/// A storage problem the session recovered from.
#[derive(Debug, Error)]
pub enum PersistWarning {
    #[error("Couldn't load your profile ({0}); this session won't be saved to it")]
    ProfileLoad(PersistError),

    #[error("Couldn't load the previous conversation ({0}); starting fresh")]
    TranscriptLoad(PersistError),

    #[error("Couldn't save your profile: {0}")]
    ProfileSave(PersistError),

    #[error("Couldn't save the conversation: {0}")]
    TranscriptSave(PersistError),
}

/// One user's conversation, from open to end.
pub struct ChatSession {
    companion: Companion,
    profiles: Option<ProfileStore>,
    transcripts: Option<TranscriptStore>,
    warnings: Vec<PersistWarning>,
}

impl ChatSession {
    /// Open a session for `user_id`, loading any stored state.
    pub async fn open(
        config: CompanionConfig,
        model: Arc<dyn LanguageModel>,
        user_id: &str,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let config = Arc::new(config);
        let mut warnings = Vec::new();

        let profile_store = ProfileStore::new(config.profiles_dir());
        let (profiles, profile) = match profile_store.load(user_id).await {
            Ok(profile) => (Some(profile_store), profile),
            Err(e) => {
                warn!(user_id, error = %e, "Profile load failed, keeping profile in memory");
                warnings.push(PersistWarning::ProfileLoad(e));
                (None, UserProfile::new(user_id))
            }
        };

        let (transcripts, turns) = if config.transcripts {
            let store = TranscriptStore::new(config.transcripts_dir());
            match store.load(user_id).await {
                Ok(turns) => (Some(store), turns),
                Err(e) => {
                    warn!(user_id, error = %e, "Transcript load failed, keeping conversation in memory");
                    warnings.push(PersistWarning::TranscriptLoad(e));
                    (None, Vec::new())
                }
            }
        } else {
            (None, Vec::new())
        };

        let companion = Companion::new(config, model, profile).with_history(turns);
        info!(
            user_id,
            restored_turns = companion.log().len(),
            warnings = warnings.len(),
            "Session opened"
        );

        Ok(Self {
            companion,
            profiles,
            transcripts,
            warnings,
        })
    }

    /// Open a session backed by the Gemini API, using `GEMINI_API_KEY`.
    pub async fn open_with_gemini(
        config: CompanionConfig,
        user_id: &str,
    ) -> Result<Self, SessionError> {
        let client = gemini::Gemini::from_env()
            .map_err(LlmError::from)?
            .with_model(config.model.as_str());
        Self::open(config, Arc::new(client), user_id).await
    }

    /// Warnings raised while opening, drained on read.
    pub fn take_warnings(&mut self) -> Vec<PersistWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub async fn send(&mut self, text: &str) -> Reply {
        self.companion.respond(text).await
    }

    /// Send a message, handing model text to `on_delta` as it arrives.
    pub async fn send_streaming<F>(&mut self, text: &str, mut on_delta: F) -> Reply
    where
        F: FnMut(&str) + Send,
    {
        self.companion.respond_streaming(text, &mut on_delta).await
    }

    pub async fn daily_check_in(&mut self) -> Option<String> {
        self.companion.daily_check_in().await
    }

    pub fn clear_history(&mut self) {
        self.companion.clear_history();
    }

    pub fn companion(&self) -> &Companion {
        &self.companion
    }

    pub fn companion_mut(&mut self) -> &mut Companion {
        &mut self.companion
    }

    pub fn profile(&self) -> &UserProfile {
        self.companion.profile()
    }

    /// Whether profile changes will be written back.
    pub fn is_persistent(&self) -> bool {
        self.profiles.is_some()
    }

    /// Write profile and transcript to disk.
    pub async fn save(&self) -> Vec<PersistWarning> {
        let mut warnings = Vec::new();
        let user_id = self.profile().user_id.as_str();

        if let Some(store) = &self.profiles {
            if let Err(e) = store.save(self.profile()).await {
                warn!(user_id, error = %e, "Profile save failed");
                warnings.push(PersistWarning::ProfileSave(e));
            }
        }

        if let Some(store) = &self.transcripts {
            if let Err(e) = store.save(user_id, &self.companion.log().to_vec()).await {
                warn!(user_id, error = %e, "Transcript save failed");
                warnings.push(PersistWarning::TranscriptSave(e));
            }
        }

        warnings
    }

    /// Persist and close the session.
    pub async fn end(self) -> Vec<PersistWarning> {
        let warnings = self.save().await;
        info!(
            user_id = %self.profile().user_id,
            turns = self.companion.log().len(),
            warnings = warnings.len(),
            "Session ended"
        );
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::Disposition;
    use crate::testing::MockModel;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_send_end_roundtrip() {
        let dir = tempdir().unwrap();
        let config = CompanionConfig::default().with_data_dir(dir.path());
        let model = Arc::new(MockModel::with_replies(["Hey! Good to meet you."]));

        let mut session = ChatSession::open(config.clone(), model.clone(), "u1")
            .await
            .unwrap();
        assert!(session.take_warnings().is_empty());
        session.companion_mut().set_name("Morgan");
        let reply = session.send("hi there").await;
        assert_eq!(reply.disposition, Disposition::Answered);
        assert!(session.end().await.is_empty());

        let session = ChatSession::open(config, model, "u1").await.unwrap();
        assert_eq!(session.profile().name.as_deref(), Some("Morgan"));
        assert_eq!(session.companion().log().len(), 2);
    }

    #[tokio::test]
    async fn test_transcripts_disabled() {
        let dir = tempdir().unwrap();
        let config = CompanionConfig::default()
            .with_data_dir(dir.path())
            .with_transcripts(false);
        let model = Arc::new(MockModel::new());

        let mut session = ChatSession::open(config.clone(), model.clone(), "u1")
            .await
            .unwrap();
        session.send("hello").await;
        assert!(session.end().await.is_empty());
        assert!(!dir.path().join("transcripts").exists());

        let session = ChatSession::open(config, model, "u1").await.unwrap();
        assert!(session.companion().log().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = CompanionConfig::default().with_max_tokens(0);
        let result = ChatSession::open(config, Arc::new(MockModel::new()), "u1").await;
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
