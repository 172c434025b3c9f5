//! Conversation transcripts, one file per user.

use crate::log::Turn;
use crate::persist::{file_stem_for, read_envelope, write_envelope, PersistError};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, PersistError> {
        Ok(self.dir.join(format!("{}.json", file_stem_for(user_id)?)))
    }

    /// Stored turns for a user, empty if there are none.
    pub async fn load(&self, user_id: &str) -> Result<Vec<Turn>, PersistError> {
        let turns = read_envelope::<Vec<Turn>>(&self.path_for(user_id)?)
            .await?
            .unwrap_or_default();
        debug!(user_id, turns = turns.len(), "Loaded transcript");
        Ok(turns)
    }

    pub async fn save(&self, user_id: &str, turns: &[Turn]) -> Result<(), PersistError> {
        write_envelope(&self.path_for(user_id)?, &turns).await?;
        debug!(user_id, turns = turns.len(), "Saved transcript");
        Ok(())
    }
}
