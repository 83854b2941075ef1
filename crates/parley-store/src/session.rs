//! Durable, session-scoped conversation history.
//!
//! Persists the finalized message log plus the session id under two
//! session-scoped keys, trimmed to the most recent entries, and restores
//! them on startup. Corrupt or absent data is never fatal: the store
//! falls back to a fresh session with a default greeting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use parley_core::types::{Message, RevealState, Role, Session};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// Key holding the serialized message log.
const MESSAGES_KEY: &str = "messages";
/// Key holding the opaque session identifier.
const SESSION_ID_KEY: &str = "session_id";

/// Wire form of one persisted message.
///
/// Field names follow the dashboard's browser-storage layout so an
/// existing history stays readable. Reveal state is never resumed, so
/// `isTyping` is always written as `false`.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedMessage {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    message: String,
    timestamp: String,
    #[serde(rename = "isTyping")]
    is_typing: bool,
}

/// Persists and restores the conversation log through an injectable
/// key-value backend.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    history_cap: usize,
    greeting: String,
}

impl SessionStore {
    /// Create a session store over the given backend.
    pub fn new(store: Arc<dyn KeyValueStore>, history_cap: usize, greeting: String) -> Self {
        Self {
            store,
            history_cap,
            greeting,
        }
    }

    /// Restore the persisted session, or build a fresh one.
    ///
    /// The session id is created once and reused across reloads. Restored
    /// messages are forced to `Complete`; a mid-reveal state is never
    /// resumed. Absent or corrupt history degrades to a single greeting.
    pub fn load(&self) -> Session {
        let session_id = self.load_or_create_session_id();

        let raw = match self.store.get(MESSAGES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.fresh_session(session_id),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted messages; starting fresh");
                return self.fresh_session(session_id);
            }
        };

        match self.restore_messages(&raw) {
            Ok(messages) => {
                debug!(count = messages.len(), "Session history restored");
                let mut session = Session::new(session_id);
                for message in messages {
                    session.push(message);
                }
                session
            }
            Err(e) => {
                warn!(error = %e, "Persisted messages corrupt; starting fresh");
                self.fresh_session(session_id)
            }
        }
    }

    /// Persist the finalized message log, trimmed to the newest entries.
    ///
    /// Only `Complete` messages are written; a message still revealing is
    /// excluded and picked up by the next persist after it finalizes.
    pub fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let finalized: Vec<&Message> = session
            .messages
            .iter()
            .filter(|m| m.reveal_state == RevealState::Complete)
            .collect();
        let start = finalized.len().saturating_sub(self.history_cap);

        let records: Vec<PersistedMessage> = finalized[start..]
            .iter()
            .map(|m| PersistedMessage {
                id: m.id.to_string(),
                kind: m.role.as_str().to_string(),
                message: m.text.clone(),
                timestamp: m.created_at.to_rfc3339(),
                is_typing: false,
            })
            .collect();

        let raw = serde_json::to_string(&records)?;
        self.store.set(MESSAGES_KEY, &raw)?;
        self.store.set(SESSION_ID_KEY, &session.session_id)?;
        debug!(count = records.len(), "Session history persisted");
        Ok(())
    }

    /// Clear all session keys and start over with a new session id.
    pub fn reset(&self) -> Result<Session, StoreError> {
        self.store.remove(MESSAGES_KEY)?;
        self.store.remove(SESSION_ID_KEY)?;

        let session_id = Uuid::new_v4().to_string();
        self.store.set(SESSION_ID_KEY, &session_id)?;
        Ok(self.fresh_session(session_id))
    }

    // -- Private helpers --

    fn load_or_create_session_id(&self) -> String {
        match self.store.get(SESSION_ID_KEY) {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = self.store.set(SESSION_ID_KEY, &id) {
                    warn!(error = %e, "Failed to persist new session id");
                }
                id
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session id; generating ephemeral one");
                Uuid::new_v4().to_string()
            }
        }
    }

    fn restore_messages(&self, raw: &str) -> Result<Vec<Message>, StoreError> {
        let records: Vec<PersistedMessage> = serde_json::from_str(raw)?;

        let mut messages = Vec::with_capacity(records.len());
        for record in records {
            let role = match record.kind.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                other => {
                    return Err(StoreError::Serialization(format!(
                        "unknown message type: {}",
                        other
                    )))
                }
            };
            let created_at = DateTime::parse_from_rfc3339(&record.timestamp)
                .map_err(|e| {
                    StoreError::Serialization(format!(
                        "bad timestamp {}: {}",
                        record.timestamp, e
                    ))
                })?
                .with_timezone(&Utc);
            let id = Uuid::parse_str(&record.id)
                .map_err(|e| StoreError::Serialization(format!("bad id {}: {}", record.id, e)))?;

            let mut message = match role {
                Role::User => Message::user(record.message),
                Role::Assistant => Message::assistant(record.message),
            };
            message.id = id;
            message.created_at = created_at;
            message.reveal_state = RevealState::Complete;
            messages.push(message);
        }
        Ok(messages)
    }

    fn fresh_session(&self, session_id: String) -> Session {
        let mut session = Session::new(session_id);
        let mut greeting = Message::assistant(self.greeting.clone());
        greeting.reveal_state = RevealState::Complete;
        session.push(greeting);
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn store() -> (Arc<MemoryStore>, SessionStore) {
        let kv = Arc::new(MemoryStore::new());
        let session_store = SessionStore::new(kv.clone(), 100, "Welcome!".to_string());
        (kv, session_store)
    }

    fn completed(mut message: Message) -> Message {
        message.reveal_state = RevealState::Complete;
        message
    }

    #[test]
    fn test_fresh_load_has_greeting() {
        let (_, sessions) = store();
        let session = sessions.load();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::Assistant);
        assert_eq!(session.messages[0].text, "Welcome!");
        assert_eq!(session.messages[0].reveal_state, RevealState::Complete);
    }

    #[test]
    fn test_session_id_survives_reload() {
        let (_, sessions) = store();
        let first = sessions.load();
        let second = sessions.load();
        assert_eq!(first.session_id, second.session_id);
    }

    #[test]
    fn test_persist_and_reload_roundtrip() {
        let (_, sessions) = store();
        let mut session = sessions.load();
        session.messages.clear();
        session.push(completed(Message::user("how many users?")));
        session.push(completed(Message::assistant("There are 42 users.")));

        sessions.persist(&session).unwrap();
        let restored = sessions.load();

        let pairs: Vec<(Role, &str)> = restored
            .messages
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Role::User, "how many users?"),
                (Role::Assistant, "There are 42 users."),
            ]
        );
        assert!(restored
            .messages
            .iter()
            .all(|m| m.reveal_state == RevealState::Complete));
        assert_eq!(restored.session_id, session.session_id);
    }

    #[test]
    fn test_revealing_messages_not_persisted() {
        let (_, sessions) = store();
        let mut session = sessions.load();
        session.push(completed(Message::user("q")));
        session.push(Message::assistant("still typing"));

        sessions.persist(&session).unwrap();
        let restored = sessions.load();
        assert!(restored.messages.iter().all(|m| m.text != "still typing"));
    }

    #[test]
    fn test_history_trimmed_to_cap() {
        let kv = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(kv, 100, "Welcome!".to_string());
        let mut session = sessions.load();
        session.messages.clear();
        for i in 0..150 {
            session.push(completed(Message::user(format!("message {}", i))));
        }

        sessions.persist(&session).unwrap();
        let restored = sessions.load();
        assert_eq!(restored.messages.len(), 100);
        assert_eq!(restored.messages[0].text, "message 50");
        assert_eq!(restored.messages[99].text, "message 149");
    }

    #[test]
    fn test_corrupt_messages_fall_back_to_greeting() {
        let (kv, sessions) = store();
        kv.set(MESSAGES_KEY, "not json at all").unwrap();
        let session = sessions.load();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].text, "Welcome!");
    }

    #[test]
    fn test_unknown_role_falls_back_to_greeting() {
        let (kv, sessions) = store();
        kv.set(
            MESSAGES_KEY,
            r#"[{"id":"not-a-uuid","type":"robot","message":"hi","timestamp":"x","isTyping":false}]"#,
        )
        .unwrap();
        let session = sessions.load();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].text, "Welcome!");
    }

    #[test]
    fn test_persisted_layout_fields() {
        let (kv, sessions) = store();
        let mut session = sessions.load();
        session.messages.clear();
        session.push(completed(Message::user("hello")));
        sessions.persist(&session).unwrap();

        let raw = kv.get(MESSAGES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &value.as_array().unwrap()[0];
        assert_eq!(record["type"], "user");
        assert_eq!(record["message"], "hello");
        assert_eq!(record["isTyping"], false);
        assert!(record["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_reset_regenerates_session_id() {
        let (kv, sessions) = store();
        let before = sessions.load();
        let after = sessions.reset().unwrap();
        assert_ne!(before.session_id, after.session_id);
        assert_eq!(after.messages.len(), 1);
        assert_eq!(after.messages[0].text, "Welcome!");
        // Messages key is gone until the next persist
        assert_eq!(kv.get(MESSAGES_KEY).unwrap(), None);
        // New id is durable
        assert_eq!(
            kv.get(SESSION_ID_KEY).unwrap(),
            Some(after.session_id.clone())
        );
    }
}
