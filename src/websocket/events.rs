use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::{Message, MessageKind};

/// Events delivered to clients over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    NewMessage {
        message: Message,
    },
    /// Send acknowledgment. `client_ref` echoes the sender's correlation
    /// token so an optimistically rendered message can be reconciled
    /// without relying on event ordering.
    MessageSent {
        message_id: Uuid,
        conversation_id: Uuid,
        created_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    MessageRecalled {
        message_id: Uuid,
        conversation_id: Uuid,
        content: String,
    },
    /// Content is not resent; the peer keeps their own view.
    MessageDeleted {
        message_id: Uuid,
        conversation_id: Uuid,
    },
    Typing {
        sender_id: Uuid,
    },
    StopTyping {
        sender_id: Uuid,
    },
    ParticipantOnline {
        participant_id: Uuid,
    },
    ParticipantOffline {
        participant_id: Uuid,
    },
    Error {
        message: String,
    },
}

/// Intents accepted from clients on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    SendMessage {
        receiver_id: Uuid,
        content: String,
        #[serde(default)]
        kind: MessageKind,
        #[serde(default)]
        client_ref: Option<String>,
    },
    Typing {
        receiver_id: Uuid,
    },
    StopTyping {
        receiver_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_events_use_kebab_case_tags() {
        let event = ServerEvent::ParticipantOnline {
            participant_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "participant-online");

        let event = ServerEvent::StopTyping {
            sender_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stop-typing");
    }

    #[test]
    fn ack_omits_absent_client_ref() {
        let event = ServerEvent::MessageSent {
            message_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            created_at: Utc::now(),
            client_ref: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message-sent");
        assert!(json.get("client_ref").is_none());
    }

    #[test]
    fn send_intent_defaults_to_text_kind() {
        let receiver = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"send-message","receiver_id":"{receiver}","content":"hi","client_ref":"temp-17"}}"#
        );
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                receiver_id: receiver,
                content: "hi".into(),
                kind: MessageKind::Text,
                client_ref: Some("temp-17".into()),
            }
        );
    }

    #[test]
    fn unknown_intent_fails_to_parse() {
        let raw = r#"{"type":"join-room","room":"general"}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }
}
