//! Bounded conversation history and its durable mirror

use crate::db::{KeyValueStore, HISTORY_KEY};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

/// Most recent exchanges kept in memory and on disk
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Prior exchanges sent with each request
pub const CONTEXT_WINDOW: usize = 5;

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    pub bot: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Insertion-ordered history, oldest first, capped at a fixed length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(MAX_HISTORY_ENTRIES)
    }
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Build from stored entries, keeping only the newest `capacity`
    pub fn from_entries(entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append, evicting from the front past capacity
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The newest `n` entries, oldest first
    pub fn last(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Downloadable snapshot of the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub conversations: Vec<HistoryEntry>,
    /// ISO-8601, UTC
    pub export_date: String,
}

impl ExportSnapshot {
    pub fn file_name(at: DateTime<Utc>) -> String {
        format!("chat-history-{}.json", at.timestamp_millis())
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON into `dir`, returning the file's path
    pub fn write_to(&self, dir: &Path, at: DateTime<Utc>) -> io::Result<PathBuf> {
        let path = dir.join(Self::file_name(at));
        let json = self.to_pretty_json().map_err(io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// In-memory history mirrored to a key-value store.
///
/// Store failures are logged and swallowed; they never reach the caller.
pub struct HistoryPersistence<S: KeyValueStore> {
    store: S,
    history: ConversationHistory,
}

impl<S: KeyValueStore> HistoryPersistence<S> {
    /// Open the persisted history, falling back to empty on absence or
    /// malformed content.
    pub fn load(store: S, capacity: usize) -> Self {
        let history = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => ConversationHistory::from_entries(entries, capacity),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not load chat history");
                    ConversationHistory::new(capacity)
                }
            },
            Ok(None) => ConversationHistory::new(capacity),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load chat history");
                ConversationHistory::new(capacity)
            }
        };

        tracing::debug!(entries = history.len(), "Loaded chat history");
        Self { store, history }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Append a completed exchange and persist the full history
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        self.store();
    }

    /// Write the full history under the history key
    pub fn store(&self) {
        let result = serde_json::to_string(&self.history.entries())
            .map_err(crate::db::StoreError::from)
            .and_then(|raw| self.store.set(HISTORY_KEY, &raw));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not save chat history");
        }
    }

    /// Empty the history and delete the persisted key
    pub fn clear(&mut self) {
        self.history.clear();
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            tracing::warn!(error = %e, "Could not remove chat history");
        }
    }

    pub fn export(&self, at: DateTime<Utc>) -> ExportSnapshot {
        ExportSnapshot {
            conversations: self.history.entries(),
            export_date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
