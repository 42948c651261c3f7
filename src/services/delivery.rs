use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics;
use crate::models::conversation::{conversation_id, LastMessage};
use crate::models::message::{DeliveryState, Message, MessageKind};
use crate::services::conversation_store::ConversationStore;
use crate::services::message_store::MessageStore;
use crate::state::AppState;
use crate::websocket::events::ServerEvent;

pub struct DeliveryService;

impl DeliveryService {
    /// Send: validate, persist, mirror the summary pair, push to the
    /// receiver when connected, return the finalized message for the ack.
    pub async fn send(
        state: &AppState,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        kind: MessageKind,
    ) -> Result<Message, AppError> {
        Self::validate_content(state, &content, kind)?;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation_id(sender_id, receiver_id),
            sender_id,
            receiver_id,
            kind,
            content,
            state: DeliveryState::Sent,
            original_message_id: None,
            created_at: Utc::now(),
        };
        Self::persist_and_fan_out(state, message).await
    }

    /// Recall: globally-visible retraction. The content of the stored row
    /// is replaced by the placeholder and the peer is notified. Recalling
    /// a message already in a terminal state is a no-op success with no
    /// second fan-out.
    pub async fn recall(
        state: &AppState,
        requester_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, AppError> {
        let placeholder = state.config.recall_placeholder.clone();
        let transition = MessageStore::update_message_state(
            &state.db,
            message_id,
            requester_id,
            DeliveryState::Recalled,
            Some(&placeholder),
        )
        .await?;
        let message = transition.message;
        if !transition.changed {
            return Ok(message);
        }

        Self::update_summaries(
            state,
            message.sender_id,
            message.receiver_id,
            LastMessage {
                content: placeholder,
                sender_id: message.sender_id,
                timestamp: Utc::now(),
            },
        )
        .await;

        if state.registry.push(
            message.receiver_id,
            ServerEvent::MessageRecalled {
                message_id: message.id,
                conversation_id: message.conversation_id,
                content: message.content.clone(),
            },
        ) {
            metrics::inc_push_event("message-recalled");
        }
        Ok(message)
    }

    /// Delete: suppression local to the deleting sender. The row survives
    /// for the peer; no content travels with the notification.
    pub async fn delete(
        state: &AppState,
        requester_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, AppError> {
        let transition = MessageStore::update_message_state(
            &state.db,
            message_id,
            requester_id,
            DeliveryState::Deleted,
            None,
        )
        .await?;
        let message = transition.message;
        if !transition.changed {
            return Ok(message);
        }

        if state.registry.push(
            message.receiver_id,
            ServerEvent::MessageDeleted {
                message_id: message.id,
                conversation_id: message.conversation_id,
            },
        ) {
            metrics::inc_push_event("message-deleted");
        }
        Ok(message)
    }

    /// Forward: a brand-new message carrying the source's content (or the
    /// override) and its lineage; the source row is never touched.
    pub async fn forward(
        state: &AppState,
        requester_id: Uuid,
        source_message_id: Uuid,
        receiver_id: Uuid,
        override_content: Option<String>,
    ) -> Result<Message, AppError> {
        let source = MessageStore::get_by_id(&state.db, source_message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let content = override_content.unwrap_or_else(|| source.content.clone());

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation_id(requester_id, receiver_id),
            sender_id: requester_id,
            receiver_id,
            kind: MessageKind::Forwarded,
            content,
            state: DeliveryState::Sent,
            original_message_id: Some(source.id),
            created_at: Utc::now(),
        };
        Self::persist_and_fan_out(state, message).await
    }

    /// Typing indicators are ephemeral: relayed only to a live connection,
    /// dropped silently otherwise, never persisted.
    pub fn typing(state: &AppState, sender_id: Uuid, receiver_id: Uuid, active: bool) {
        let (event, label) = if active {
            (ServerEvent::Typing { sender_id }, "typing")
        } else {
            (ServerEvent::StopTyping { sender_id }, "stop-typing")
        };
        if state.registry.push(receiver_id, event) {
            metrics::inc_push_event(label);
        }
    }

    fn validate_content(state: &AppState, content: &str, kind: MessageKind) -> Result<(), AppError> {
        match kind {
            MessageKind::Text => {
                if content.trim().is_empty() {
                    return Err(AppError::Validation("message content is required".into()));
                }
                let max = state.config.max_text_chars;
                if content.chars().count() > max {
                    return Err(AppError::Validation(format!(
                        "message exceeds {max} characters"
                    )));
                }
            }
            MessageKind::File => {
                if content.is_empty() {
                    return Err(AppError::Validation("file reference is required".into()));
                }
            }
            MessageKind::Forwarded => {
                return Err(AppError::Validation(
                    "forwarded messages go through the forward operation".into(),
                ));
            }
        }
        Ok(())
    }

    /// Steps shared by send and forward: durable write, summary mirror,
    /// receiver push. The message row is the source of truth; a failed
    /// summary write is tolerated, a missing receiver connection is normal.
    async fn persist_and_fan_out(state: &AppState, message: Message) -> Result<Message, AppError> {
        MessageStore::put_message(&state.db, &message).await?;
        metrics::MESSAGES_SENT_TOTAL.inc();

        Self::update_summaries(
            state,
            message.sender_id,
            message.receiver_id,
            LastMessage {
                content: message.content.clone(),
                sender_id: message.sender_id,
                timestamp: message.created_at,
            },
        )
        .await;

        if state.registry.push(
            message.receiver_id,
            ServerEvent::NewMessage {
                message: message.clone(),
            },
        ) {
            metrics::inc_push_event("new-message");
        } else {
            debug!(
                receiver_id = %message.receiver_id,
                "receiver offline; message syncs on next history fetch"
            );
        }
        Ok(message)
    }

    async fn update_summaries(state: &AppState, a: Uuid, b: Uuid, last_message: LastMessage) {
        if let Err(e) = ConversationStore::upsert_conversation_pair(
            &state.db,
            a,
            b,
            &last_message,
            state.config.atomic_summary_writes,
        )
        .await
        {
            warn!(error = %e, "conversation summary update failed; message is still delivered");
        }
    }
}
