//! Per-user profile and its file-backed store.

use crate::events::{EventNote, FollowUp, MAX_EVENTS};
use crate::persist::{file_stem_for, read_envelope, write_envelope, PersistError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// What the companion remembers about a user between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub known_concerns: BTreeSet<String>,
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_interaction: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_in: Option<NaiveDate>,
    /// Events to ask about, oldest mention first.
    #[serde(default)]
    pub events: Vec<EventNote>,
}

impl UserProfile {
    /// A fresh profile with nothing known.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            known_concerns: BTreeSet::new(),
            preferences: BTreeMap::new(),
            created_at: Utc::now(),
            last_interaction: None,
            last_check_in: None,
            events: Vec::new(),
        }
    }

    /// Name to address the user by.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("friend")
    }

    /// Same user, name, concerns and preferences. Timestamps are ignored.
    pub fn is_equivalent(&self, other: &UserProfile) -> bool {
        self.user_id == other.user_id
            && self.name == other.name
            && self.known_concerns == other.known_concerns
            && self.preferences == other.preferences
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        let name = name.trim();
        self.name = (!name.is_empty()).then(|| name.to_string());
    }

    /// Record a concern. Returns true if it was new.
    pub fn add_concern(&mut self, concern: impl AsRef<str>) -> bool {
        let concern = concern.as_ref().trim().to_lowercase();
        if concern.is_empty() {
            return false;
        }
        self.known_concerns.insert(concern)
    }

    pub fn set_preference(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = key.as_ref().trim().to_lowercase();
        if !key.is_empty() {
            self.preferences.insert(key, value.into().trim().to_string());
        }
    }

    /// Remember an event. A second mention of the same kind on the same date
    /// replaces the first. Returns true if the event was new.
    pub fn note_event(&mut self, note: EventNote) -> bool {
        if let Some(existing) = self
            .events
            .iter_mut()
            .find(|e| e.kind == note.kind && e.date == note.date)
        {
            existing.description = note.description;
            existing.mentioned_at = note.mentioned_at;
            return false;
        }
        self.events.push(note);
        if self.events.len() > MAX_EVENTS {
            self.events.remove(0);
        }
        true
    }

    /// The first event not yet asked about that falls in the follow-up window.
    pub fn due_event(&self, today: NaiveDate) -> Option<(&EventNote, FollowUp)> {
        self.events
            .iter()
            .filter(|e| !e.followed_up)
            .find_map(|e| FollowUp::for_date(e.date, today).map(|timing| (e, timing)))
    }

    /// Mark every event of this kind and date as asked about.
    pub fn mark_followed_up(&mut self, kind: &str, date: NaiveDate) {
        for event in self
            .events
            .iter_mut()
            .filter(|e| e.kind == kind && e.date == date)
        {
            event.followed_up = true;
        }
    }

    /// Drop events that are done with: followed up, or more than a day past.
    pub fn prune_events(&mut self, today: NaiveDate) {
        self.events
            .retain(|e| !e.followed_up && (e.date - today).num_days() >= -1);
    }

    /// True until a check-in has happened on `today`.
    pub fn needs_check_in(&self, today: NaiveDate) -> bool {
        self.last_check_in.map_or(true, |last| last < today)
    }
}

/// A fresh id of the form `user_1a2b3c4d`.
pub fn new_user_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("user_{}", &id[..8])
}

/// Stores one JSON file per profile under a directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, PersistError> {
        Ok(self.dir.join(format!("{}.json", file_stem_for(user_id)?)))
    }

    /// Load a profile, or a fresh one if none is stored.
    pub async fn load(&self, user_id: &str) -> Result<UserProfile, PersistError> {
        let path = self.path_for(user_id)?;
        match read_envelope::<UserProfile>(&path).await? {
            Some(profile) if profile.user_id != user_id => Err(PersistError::UserMismatch {
                expected: user_id.to_string(),
                found: profile.user_id,
            }),
            Some(profile) => {
                debug!(user_id, path = %path.display(), "Loaded profile");
                Ok(profile)
            }
            None => {
                debug!(user_id, "No stored profile, starting fresh");
                Ok(UserProfile::new(user_id))
            }
        }
    }

    /// Persist a profile, replacing any earlier version.
    pub async fn save(&self, profile: &UserProfile) -> Result<(), PersistError> {
        let path = self.path_for(&profile.user_id)?;
        write_envelope(&path, profile).await?;
        debug!(user_id = %profile.user_id, path = %path.display(), "Saved profile");
        Ok(())
    }

    /// Every readable stored profile, ordered by user id.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<UserProfile>, PersistError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut profiles = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_envelope::<UserProfile>(&path).await {
                Ok(Some(profile)) => profiles.push(profile),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable profile"),
            }
        }
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(profiles)
    }

    /// Case-insensitive lookup by name. The most recently active match wins.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<UserProfile>, PersistError> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| {
                p.name
                    .as_deref()
                    .is_some_and(|n| n.trim().to_lowercase() == wanted)
            })
            .max_by_key(|p| p.last_interaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_new_user_id_is_file_safe() {
        let id = new_user_id();
        assert!(id.starts_with("user_"));
        assert_eq!(id.len(), 13);
        assert_eq!(file_stem_for(&id).unwrap(), id);
        assert_ne!(id, new_user_id());
    }

    #[tokio::test]
    async fn test_save_then_load_is_equivalent() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut profile = UserProfile::new("user_1234abcd");
        profile.set_name("Sam");
        profile.add_concern("Anxious");
        profile.set_preference("tone", "casual");
        store.save(&profile).await.unwrap();

        let loaded = store.load("user_1234abcd").await.unwrap();
        assert!(loaded.is_equivalent(&profile));
        assert!(loaded.known_concerns.contains("anxious"));
    }

    #[test]
    fn test_event_notes() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
        let note = |kind: &str, days: i64| EventNote {
            kind: kind.to_string(),
            description: format!("{kind} coming up"),
            date: today + Duration::days(days),
            mentioned_at: Utc::now(),
            followed_up: false,
        };

        let mut profile = UserProfile::new("u");
        assert!(profile.note_event(note("party", 5)));
        assert!(profile.note_event(note("exam", 1)));
        assert!(!profile.note_event(note("exam", 1)));
        assert_eq!(profile.events.len(), 2);

        let (due, timing) = profile.due_event(today).unwrap();
        assert_eq!(due.kind, "exam");
        assert_eq!(timing, FollowUp::Upcoming(1));

        profile.mark_followed_up("exam", today + Duration::days(1));
        assert!(profile.due_event(today).is_none());
        profile.prune_events(today);
        assert_eq!(profile.events.len(), 1);
        assert_eq!(profile.events[0].kind, "party");

        for i in 0..(MAX_EVENTS as i64 + 3) {
            profile.note_event(note("meeting", 10 + i));
        }
        assert_eq!(profile.events.len(), MAX_EVENTS);
    }

    #[tokio::test]
    async fn test_similar_ids_keep_separate_profiles() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut li = UserProfile::new("李");
        li.set_name("Li");
        li.add_concern("depressed");
        store.save(&li).await.unwrap();
        let mut other = UserProfile::new("Jo_Smith");
        other.set_name("Other Jo");
        store.save(&other).await.unwrap();

        let wang = store.load("王").await.unwrap();
        assert_eq!(wang.user_id, "王");
        assert!(wang.name.is_none());
        assert!(wang.known_concerns.is_empty());
        assert!(store.load("Jo Smith").await.unwrap().name.is_none());
        assert_eq!(store.load("李").await.unwrap().name.as_deref(), Some("Li"));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_rejects_file_of_another_user() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&UserProfile::new("alice")).await.unwrap();
        std::fs::rename(dir.path().join("alice.json"), dir.path().join("bob.json")).unwrap();

        let result = store.load("bob").await;
        assert!(matches!(
            result,
            Err(PersistError::UserMismatch { expected, found }) if expected == "bob" && found == "alice"
        ));
    }

    #[tokio::test]
    async fn test_load_unknown_is_fresh() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));

        let profile = store.load("nobody").await.unwrap();
        assert_eq!(profile.user_id, "nobody");
        assert!(profile.name.is_none());
        assert!(profile.known_concerns.is_empty());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut profile = UserProfile::new("u1");
        profile.set_name("Before");
        store.save(&profile).await.unwrap();
        profile.set_name("After");
        store.save(&profile).await.unwrap();

        assert_eq!(store.load("u1").await.unwrap().name.as_deref(), Some("After"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut old = UserProfile::new("u_old");
        old.set_name("Alex");
        old.last_interaction = Some(Utc::now() - Duration::days(3));
        let mut recent = UserProfile::new("u_recent");
        recent.set_name("alex");
        recent.last_interaction = Some(Utc::now());
        let mut other = UserProfile::new("u_other");
        other.set_name("Jordan");

        for p in [&old, &recent, &other] {
            store.save(p).await.unwrap();
        }

        let found = store.find_by_name("ALEX ").await.unwrap().unwrap();
        assert_eq!(found.user_id, "u_recent");
        assert!(store.find_by_name("Casey").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_garbage() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        store.save(&UserProfile::new("good")).await.unwrap();
        std::fs::write(dir.path().join("bad.json"), "nope").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, "good");
    }

    #[test]
    fn test_check_in_once_per_day() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let mut profile = UserProfile::new("u");
        assert!(profile.needs_check_in(today));
        profile.last_check_in = Some(today);
        assert!(!profile.needs_check_in(today));
        assert!(profile.needs_check_in(today.succ_opt().unwrap()));
    }

    #[test]
    fn test_blank_inputs_ignored() {
        let mut profile = UserProfile::new("u");
        profile.set_name("   ");
        assert!(profile.name.is_none());
        assert_eq!(profile.display_name(), "friend");
        assert!(!profile.add_concern(" "));
        profile.set_preference("", "x");
        assert!(profile.preferences.is_empty());
    }
}
