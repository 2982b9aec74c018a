//! Downloaded chats.
//!
//! A downloaded chat is a titled copy of a conversation. The whole log is one
//! JSON array stored under [`CHAT_LOG_KEY`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use crate::types::Message;
use crate::utils;

/// Storage key for the chat log.
pub const CHAT_LOG_KEY: &str = "downloadedChats";

/// One row of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub id: String,
    pub title: String,
    #[serde(with = "crate::utils::time")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChat {
    #[serde(flatten)]
    entry: ChatLogEntry,
    #[serde(default)]
    messages: Vec<Message>,
}

/// The chat log, backed by a [`KeyValueStore`].
#[derive(Debug)]
pub struct ChatLog<S: KeyValueStore> {
    store: S,
    chats: Vec<StoredChat>,
}

impl<S: KeyValueStore> ChatLog<S> {
    /// Read the log from `store`. An absent entry is an empty log.
    pub fn load(store: S) -> Result<Self> {
        let chats = match store.get(CHAT_LOG_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                Error::serialization(
                    format!("invalid {CHAT_LOG_KEY} entry: {e}"),
                    Some(Box::new(e)),
                )
            })?,
            None => Vec::new(),
        };
        Ok(Self { store, chats })
    }

    /// Record a conversation under `title`, dated now.
    pub fn record(&mut self, title: impl Into<String>, messages: Vec<Message>) -> Result<ChatLogEntry> {
        self.record_at(title, messages, utils::time::now())
    }

    /// Record a conversation under `title` with an explicit date.
    pub fn record_at(
        &mut self,
        title: impl Into<String>,
        messages: Vec<Message>,
        date: OffsetDateTime,
    ) -> Result<ChatLogEntry> {
        let title = title.into();
        let title = if title.trim().is_empty() {
            "Untitled chat".to_string()
        } else {
            title.trim().to_string()
        };
        let entry = ChatLogEntry {
            id: self.next_id(),
            title,
            date,
        };

        let mut chats = self.chats.clone();
        chats.push(StoredChat {
            entry: entry.clone(),
            messages,
        });
        self.store.set(CHAT_LOG_KEY, serde_json::to_string(&chats)?)?;
        self.chats = chats;
        tracing::debug!(id = %entry.id, "chat recorded in log");
        Ok(entry)
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Vec<ChatLogEntry> {
        let mut entries: Vec<ChatLogEntry> = self.chats.iter().map(|c| c.entry.clone()).collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    /// The stored conversation for the entry `id`.
    pub fn transcript(&self, id: &str) -> Option<&[Message]> {
        self.chats
            .iter()
            .find(|c| c.entry.id == id)
            .map(|c| c.messages.as_slice())
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    fn next_id(&self) -> String {
        let max = self
            .chats
            .iter()
            .filter_map(|c| c.entry.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use time::macros::datetime;

    fn conversation() -> Vec<Message> {
        vec![
            Message::user("How do I treat a sprain?", None, 0),
            Message::assistant("Remember RICE.", 1),
        ]
    }

    #[test]
    fn entries_are_newest_first() {
        let mut log = ChatLog::load(MemoryStore::new()).unwrap();
        log.record_at("Sprain", conversation(), datetime!(2024-01-09 16:45:00 UTC))
            .unwrap();
        log.record_at("Burns", vec![], datetime!(2024-01-10 14:30:00 UTC))
            .unwrap();
        log.record_at("Choking", vec![], datetime!(2024-01-04 15:10:00 UTC))
            .unwrap();

        let titles: Vec<String> = log.entries().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Burns", "Sprain", "Choking"]);
    }

    #[test]
    fn ids_are_sequential_and_transcripts_retrievable() {
        let mut log = ChatLog::load(MemoryStore::new()).unwrap();
        let first = log.record("Sprain", conversation()).unwrap();
        let second = log.record("  ", vec![]).unwrap();
        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(second.title, "Untitled chat");

        let transcript = log.transcript("1").unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, "Remember RICE.");
        assert!(log.transcript("3").is_none());
    }

    #[test]
    fn log_reloads_from_store() {
        let store = MemoryStore::new();
        let mut log = ChatLog::load(store.clone()).unwrap();
        let entry = log
            .record_at("Sprain", conversation(), datetime!(2024-01-09 16:45:00 UTC))
            .unwrap();

        let reloaded = ChatLog::load(store.clone()).unwrap();
        assert_eq!(reloaded.entries(), vec![entry]);
        assert_eq!(reloaded.transcript("1").unwrap(), conversation().as_slice());

        let json: serde_json::Value =
            serde_json::from_str(&store.get(CHAT_LOG_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(json[0]["date"], "2024-01-09T16:45:00Z");
        assert_eq!(json[0]["title"], "Sprain");
    }

    #[test]
    fn corrupt_log_is_an_error() {
        let store = MemoryStore::new();
        store.set(CHAT_LOG_KEY, "{}".to_string()).unwrap();
        assert!(ChatLog::load(store).unwrap_err().is_serialization());
    }
}
