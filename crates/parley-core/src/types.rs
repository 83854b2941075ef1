use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// String form used in the persisted record layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Progressive-reveal state of a message's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
    #[default]
    Idle,
    Revealing,
    Complete,
}

/// Presentation behavior selected by the query classifier.
///
/// Controls whether and how the results panel appears for a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    /// Simple/count question; the answer text is sufficient.
    NoSidebar,
    /// Superlative/identity question; panel opens briefly then auto-closes.
    BriefShow,
    /// Listing/analysis question; panel opens and stays open.
    ShowSidebar,
    /// No phrase matched; resolved later by result-row count.
    AutoDecide,
}

// =============================================================================
// Messages and sessions
// =============================================================================

/// A single row of a tabular result set, as returned by the backend.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// One entry in the conversation log.
///
/// Messages are created on submit (user) or on reply (assistant), mutated
/// only to advance `reveal_state`, and never deleted individually.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    /// Monotonic insertion index within the session. Display order and
    /// persistence trimming both follow this ordering.
    pub seq: u64,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub reveal_state: RevealState,
    pub result_count: usize,
    pub processing_time_secs: Option<f64>,
    pub success: bool,
    pub suggestions: Vec<String>,
}

impl Message {
    /// Create a user message. User text displays instantly, so it is
    /// born `Complete`.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            reveal_state: RevealState::Complete,
            result_count: 0,
            processing_time_secs: None,
            success: true,
            suggestions: Vec::new(),
        }
    }

    /// Create an assistant message in `Revealing` state.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
            reveal_state: RevealState::Revealing,
            result_count: 0,
            processing_time_secs: None,
            success: true,
            suggestions: Vec::new(),
        }
    }
}

/// An active conversation: an ordered message log under one opaque id.
///
/// Exactly one session is active per orchestrator instance. The id is
/// generated once and reused across reloads unless explicitly reset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with the given id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a message, assigning it the next insertion index.
    /// Returns the assigned message id.
    pub fn push(&mut self, mut message: Message) -> Uuid {
        message.seq = self.messages.last().map(|m| m.seq + 1).unwrap_or(0);
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// The message currently in `Revealing` state, if any.
    ///
    /// At most one message is revealing at a time; the orchestrator
    /// finalizes the previous reveal before appending a new one.
    pub fn revealing_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.reveal_state == RevealState::Revealing)
    }

    /// Look up a message by id.
    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

// =============================================================================
// Panel payload
// =============================================================================

/// The tabular payload behind the auxiliary results panel.
///
/// Exists only when the latest assistant reply produced at least one row
/// and the classifier/eligibility rules selected a visible behavior.
/// Replaced wholesale on each new query, never merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PanelPayload {
    pub title: String,
    pub rows: Vec<ResultRow>,
    pub origin_query: String,
    pub behavior: BehaviorClass,
    pub artifact_eligible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> ResultRow {
        let mut r = ResultRow::new();
        r.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        r
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_user_message_is_complete() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.reveal_state, RevealState::Complete);
        assert!(msg.success);
    }

    #[test]
    fn test_assistant_message_is_revealing() {
        let msg = Message::assistant("answer");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.reveal_state, RevealState::Revealing);
    }

    #[test]
    fn test_session_push_assigns_monotonic_seq() {
        let mut session = Session::new("s-1");
        session.push(Message::user("first"));
        session.push(Message::assistant("second"));
        session.push(Message::user("third"));
        let seqs: Vec<u64> = session.messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_session_push_returns_message_id() {
        let mut session = Session::new("s-1");
        let msg = Message::user("hello");
        let expected = msg.id;
        let id = session.push(msg);
        assert_eq!(id, expected);
    }

    #[test]
    fn test_revealing_mut_finds_single_revealing() {
        let mut session = Session::new("s-1");
        session.push(Message::user("q"));
        let id = session.push(Message::assistant("a"));
        let revealing = session.revealing_mut().unwrap();
        assert_eq!(revealing.id, id);
    }

    #[test]
    fn test_revealing_mut_none_when_all_complete() {
        let mut session = Session::new("s-1");
        session.push(Message::user("q"));
        assert!(session.revealing_mut().is_none());
    }

    #[test]
    fn test_find_mut() {
        let mut session = Session::new("s-1");
        let id = session.push(Message::user("q"));
        assert!(session.find_mut(id).is_some());
        assert!(session.find_mut(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_behavior_class_serde_snake_case() {
        let json = serde_json::to_string(&BehaviorClass::NoSidebar).unwrap();
        assert_eq!(json, "\"no_sidebar\"");
        let back: BehaviorClass = serde_json::from_str("\"brief_show\"").unwrap();
        assert_eq!(back, BehaviorClass::BriefShow);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let mut msg = Message::assistant("answer");
        msg.result_count = 12;
        msg.processing_time_secs = Some(0.42);
        msg.suggestions = vec!["next".to_string()];
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, msg.id);
        assert_eq!(back.result_count, 12);
        assert_eq!(back.suggestions, msg.suggestions);
    }

    #[test]
    fn test_panel_payload_roundtrip() {
        let payload = PanelPayload {
            title: "Users by country".to_string(),
            rows: vec![row("country", "India")],
            origin_query: "show me users by country".to_string(),
            behavior: BehaviorClass::ShowSidebar,
            artifact_eligible: false,
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: PanelPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, payload.title);
        assert_eq!(back.rows.len(), 1);
        assert_eq!(back.behavior, BehaviorClass::ShowSidebar);
    }
}
