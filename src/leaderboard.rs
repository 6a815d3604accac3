//! Local leaderboard persisted in a small key-value store.
//!
//! The stored value is a JSON array of `{name, score, ts}` records kept
//! sorted by descending score. Anything unreadable counts as empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_NAME, LEADERBOARD_KEY, LEADERBOARD_SHOWN, NAME_MAX_CHARS};
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    /// Can be negative for slow, wasteful games.
    pub score: i64,
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// `<data dir>/grid_shooter`, falling back to the working directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grid_shooter")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Trim, default blank names and cap the length in characters.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let name = if trimmed.is_empty() {
        DEFAULT_NAME
    } else {
        trimmed
    };
    name.chars().take(NAME_MAX_CHARS).collect()
}

/// All stored entries, best first. Absent, unreadable or malformed data
/// yields none.
pub fn load(store: &dyn KeyValueStore) -> Vec<LeaderboardEntry> {
    match store.get(LEADERBOARD_KEY) {
        Ok(raw) => parse(raw.as_deref()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read leaderboard");
            Vec::new()
        }
    }
}

fn parse(raw: Option<&str>) -> Vec<LeaderboardEntry> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<LeaderboardEntry>>(raw) {
        Ok(mut entries) => {
            sort_entries(&mut entries);
            entries
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed leaderboard");
            Vec::new()
        }
    }
}

/// Append an entry, re-sort and write back. Returns the new list.
///
/// A failed read is returned as an error and nothing is written, so stored
/// scores survive a transient storage fault.
pub fn record(
    store: &mut dyn KeyValueStore,
    name: &str,
    score: i64,
    ts: u64,
) -> Result<Vec<LeaderboardEntry>> {
    let mut entries = parse(store.get(LEADERBOARD_KEY)?.as_deref());
    entries.push(LeaderboardEntry {
        name: sanitize_name(name),
        score,
        ts,
    });
    sort_entries(&mut entries);
    store.set(LEADERBOARD_KEY, &serde_json::to_string(&entries)?)?;
    Ok(entries)
}

/// The slice shown on screen.
pub fn top(entries: &[LeaderboardEntry]) -> &[LeaderboardEntry] {
    &entries[..entries.len().min(LEADERBOARD_SHOWN)]
}

// Stable, so equal scores keep their insertion order.
fn sort_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
}
