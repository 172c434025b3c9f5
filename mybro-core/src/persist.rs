//! JSON files on disk, wrapped in a versioned envelope.
//!
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write leaves the previous file intact.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("Stored file belongs to {found:?}, not {expected:?}")]
    UserMismatch { expected: String, found: String },
}

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn<T> {
    version: u32,
    data: T,
}

#[derive(Deserialize)]
struct VersionOnly {
    version: u32,
}

/// Write `value` to `path` inside an envelope, creating parent directories.
pub(crate) async fn write_envelope<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(&EnvelopeOut {
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        data: value,
    })?;

    let tmp = temp_path(path);
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read an envelope from `path`. A missing file is `Ok(None)`.
pub(crate) async fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    // Check the version before committing to the full shape.
    let VersionOnly { version } = serde_json::from_str(&content)?;
    if version != FORMAT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: version,
        });
    }

    let envelope: EnvelopeIn<T> = serde_json::from_str(&content)?;
    debug_assert_eq!(envelope.version, FORMAT_VERSION);
    Ok(Some(envelope.data))
}

/// Turn a user id into a safe file stem.
///
/// ASCII letters, digits, `-` and `_` are kept. Every other byte of the UTF-8
/// encoding becomes `%XX`, so distinct ids always get distinct stems.
pub fn file_stem_for(user_id: &str) -> Result<String, PersistError> {
    if user_id.trim().is_empty() {
        return Err(PersistError::InvalidUserId(user_id.to_string()));
    }
    let mut stem = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    Ok(stem)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("note.json");
        let note = Note {
            text: "hello".into(),
        };

        write_envelope(&path, &note).await.unwrap();
        let loaded: Option<Note> = read_envelope(&path).await.unwrap();
        assert_eq!(loaded, Some(note));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let loaded: Option<Note> = read_envelope(&dir.path().join("nope.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.json");
        std::fs::write(&path, r#"{"version": 99, "data": {"text": "x"}}"#).unwrap();

        let result: Result<Option<Note>, _> = read_envelope(&path).await;
        assert!(matches!(
            result,
            Err(PersistError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: 99
            })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: Result<Option<Note>, _> = read_envelope(&path).await;
        assert!(matches!(result, Err(PersistError::Json(_))));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem_for("user_1a2b").unwrap(), "user_1a2b");
        assert_eq!(file_stem_for("../etc/passwd").unwrap(), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(file_stem_for("Jo Smith").unwrap(), "Jo%20Smith");
        assert_eq!(file_stem_for("..").unwrap(), "%2E%2E");
        assert!(file_stem_for("   ").is_err());
        assert!(file_stem_for("").is_err());
    }

    #[test]
    fn test_distinct_ids_get_distinct_stems() {
        let ids = ["李", "王", "Jo Smith", "Jo_Smith", "Jo%20Smith", "Jo", "Jo ", "a/b", "a_b"];
        let stems: std::collections::HashSet<String> =
            ids.iter().map(|id| file_stem_for(id).unwrap()).collect();
        assert_eq!(stems.len(), ids.len());
    }
}
