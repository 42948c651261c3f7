use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
    Forwarded,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
            MessageKind::Forwarded => "forwarded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "file" => Some(MessageKind::File),
            "forwarded" => Some(MessageKind::Forwarded),
            _ => None,
        }
    }
}

/// Monotonic: `sent -> recalled` or `sent -> deleted`; both terminal states
/// are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sent,
    Recalled,
    Deleted,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Sent => "sent",
            DeliveryState::Recalled => "recalled",
            DeliveryState::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(DeliveryState::Sent),
            "recalled" => Some(DeliveryState::Recalled),
            "deleted" => Some(DeliveryState::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub kind: MessageKind,
    /// Inline text, or a blob-store URL for file-kind messages.
    pub content: String,
    pub state: DeliveryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_state_round_trip_through_column_text() {
        for kind in [MessageKind::Text, MessageKind::File, MessageKind::Forwarded] {
            assert_eq!(MessageKind::parse(kind.as_str()), Some(kind));
        }
        for state in [
            DeliveryState::Sent,
            DeliveryState::Recalled,
            DeliveryState::Deleted,
        ] {
            assert_eq!(DeliveryState::parse(state.as_str()), Some(state));
        }
        assert_eq!(MessageKind::parse("audio"), None);
        assert_eq!(DeliveryState::parse(""), None);
    }
}
