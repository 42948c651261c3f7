use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deriving conversation ids from participant pairs.
const CONVERSATION_NAMESPACE: Uuid = Uuid::from_u128(0x8f1c_62d4_a5b3_4e79_9d20_6c48_51e3_07ab);

/// Direction-independent conversation id: the sorted pair hashed under a
/// fixed namespace, so both sides compute the same value.
pub fn conversation_id(a: Uuid, b: Uuid) -> Uuid {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Uuid::new_v5(&CONVERSATION_NAMESPACE, format!("{lo}_{hi}").as_bytes())
}

/// Denormalized snapshot of the most recent non-deleted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// One per participant per conversation; a pair shares `conversation_id`
/// and is expected to converge on the same `last_message` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub owner_id: Uuid,
    pub peer_id: Uuid,
    pub last_message: LastMessage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(conversation_id(a, b), conversation_id(b, a));
    }

    #[test]
    fn distinct_pairs_get_distinct_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert_ne!(conversation_id(a, b), conversation_id(a, c));
        assert_ne!(conversation_id(a, b), conversation_id(b, c));
    }

    #[test]
    fn conversation_id_is_stable_across_calls() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(conversation_id(a, b), conversation_id(a, b));
    }
}
