//! Event types and wire-format messages.
//!
//! Both directions use the same JSON shape:
//! `{ "type": "...", "space_id": "...", "payload": <any json> }`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kinds recognized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ChatMessage,
    PomodoroStatus,
    UserJoined,
    UserLeft,
}

impl EventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatMessage => "chat_message",
            Self::PomodoroStatus => "pomodoro_status",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
        }
    }

    /// Parse a wire `type` value. Unknown values yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "chat_message" => Some(Self::ChatMessage),
            "pomodoro_status" => Some(Self::PomodoroStatus),
            "user_joined" => Some(Self::UserJoined),
            "user_left" => Some(Self::UserLeft),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A space-scoped event fanned out to every connection in the space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub space_id: String,
    pub payload: Value,
}

impl Event {
    pub fn new(space_id: &str, kind: EventType, payload: Value) -> Self {
        Self {
            kind,
            space_id: space_id.to_string(),
            payload,
        }
    }

    pub fn user_joined(space_id: &str, user_id: &str) -> Self {
        Self::new(space_id, EventType::UserJoined, serde_json::json!({ "user_id": user_id }))
    }

    pub fn user_left(space_id: &str, user_id: &str) -> Self {
        Self::new(space_id, EventType::UserLeft, serde_json::json!({ "user_id": user_id }))
    }

    /// Serialize once into a frame shared by every recipient.
    pub fn to_frame(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A message received from the client.
///
/// Any `space_id` the client sends is ignored; the session's own space is
/// authoritative for routing.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl ClientMessage {
    pub fn event_type(&self) -> Option<EventType> {
        EventType::from_wire(&self.kind)
    }

    /// Re-scope the message to `space_id`. `None` for unknown types.
    pub fn into_event(self, space_id: &str) -> Option<Event> {
        let kind = self.event_type()?;
        Some(Event::new(space_id, kind, self.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serializes_to_wire_shape() {
        let event = Event::new("spc_1", EventType::PomodoroStatus, json!({ "phase": "work" }));
        let value: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "type": "pomodoro_status", "space_id": "spc_1", "payload": { "phase": "work" } })
        );
    }

    #[test]
    fn wire_names_match_serde_names() {
        for kind in [
            EventType::ChatMessage,
            EventType::PomodoroStatus,
            EventType::UserJoined,
            EventType::UserLeft,
        ] {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, Value::String(kind.as_str().to_string()));
            assert_eq!(EventType::from_wire(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn client_space_id_is_overwritten() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "pomodoro_status",
            "space_id": "spc_somewhere_else",
            "payload": { "remaining": 300 }
        }))
        .unwrap();

        let event = msg.into_event("spc_mine").unwrap();
        assert_eq!(event.space_id, "spc_mine");
        assert_eq!(event.kind, EventType::PomodoroStatus);
        assert_eq!(event.payload, json!({ "remaining": 300 }));
    }

    #[test]
    fn unknown_type_is_accepted_but_unroutable() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"typing"}"#).unwrap();
        assert!(msg.event_type().is_none());
        assert!(msg.payload.is_null());
        assert!(msg.into_event("spc_mine").is_none());
    }

    #[test]
    fn membership_events_carry_user_id() {
        let joined = Event::user_joined("spc_1", "usr_1");
        assert_eq!(joined.kind, EventType::UserJoined);
        assert_eq!(joined.payload["user_id"], "usr_1");

        let left = Event::user_left("spc_1", "usr_1");
        assert_eq!(left.kind, EventType::UserLeft);
        assert_eq!(left.space_id, "spc_1");
    }
}
