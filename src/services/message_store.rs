use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::message::{DeliveryState, Message, MessageKind};
use crate::pagination::{Cursor, Page};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, kind, content, state, \
                               original_message_id, created_at";

fn message_from_row(row: &PgRow) -> Result<Message, AppError> {
    let kind_raw: String = row.get("kind");
    let state_raw: String = row.get("state");
    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        kind: MessageKind::parse(&kind_raw)
            .ok_or_else(|| AppError::StorageUnavailable(format!("unknown message kind: {kind_raw}")))?,
        content: row.get("content"),
        state: DeliveryState::parse(&state_raw)
            .ok_or_else(|| AppError::StorageUnavailable(format!("unknown delivery state: {state_raw}")))?,
        original_message_id: row.get("original_message_id"),
        created_at: row.get("created_at"),
    })
}

/// Outcome of a delivery-state transition. `changed` is false when the
/// message was already in a terminal state and nothing was written.
pub struct StateTransition {
    pub message: Message,
    pub changed: bool,
}

pub struct MessageStore;

impl MessageStore {
    pub async fn put_message(db: &Pool<Postgres>, msg: &Message) -> Result<(), AppError> {
        if msg.kind == MessageKind::Text && msg.content.is_empty() {
            return Err(AppError::Validation("text content must not be empty".into()));
        }
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, kind, content, \
             state, original_message_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(msg.id)
        .bind(msg.conversation_id)
        .bind(msg.sender_id)
        .bind(msg.receiver_id)
        .bind(msg.kind.as_str())
        .bind(&msg.content)
        .bind(msg.state.as_str())
        .bind(msg.original_message_id)
        .bind(msg.created_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Point lookup by primary key.
    pub async fn get_by_id(
        db: &Pool<Postgres>,
        message_id: Uuid,
    ) -> Result<Option<Message>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(message_id)
        .fetch_optional(db)
        .await?;
        row.map(|r| message_from_row(&r)).transpose()
    }

    /// Ascending history page for one conversation. Rows the reader deleted
    /// for themselves are filtered out; the peer still reads them. An empty
    /// conversation is an empty page, never an error.
    pub async fn get_messages_by_conversation(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        reader_id: Uuid,
        cursor: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<Message>, AppError> {
        let rows = match cursor {
            Some(after) => {
                sqlx::query(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE conversation_id = $1 \
                       AND NOT (state = 'deleted' AND sender_id = $2) \
                       AND (created_at, id) > ($3, $4) \
                     ORDER BY created_at ASC, id ASC \
                     LIMIT $5"
                ))
                .bind(conversation_id)
                .bind(reader_id)
                .bind(after.ts)
                .bind(after.id)
                .bind(limit)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE conversation_id = $1 \
                       AND NOT (state = 'deleted' AND sender_id = $2) \
                     ORDER BY created_at ASC, id ASC \
                     LIMIT $3"
                ))
                .bind(conversation_id)
                .bind(reader_id)
                .bind(limit)
                .fetch_all(db)
                .await?
            }
        };

        let items = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let next_cursor = if items.len() as i64 == limit {
            items.last().map(|m| {
                Cursor {
                    ts: m.created_at,
                    id: m.id,
                }
                .encode()
            })
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }

    /// Monotonic transition out of `sent`. Fails `Forbidden` unless the
    /// stored sender matches, `NotFound` for an unknown id; a message
    /// already in a terminal state is returned unchanged. The update is
    /// conditional on `state = 'sent'`, so concurrent transitions cannot
    /// both report `changed`.
    pub async fn update_message_state(
        db: &Pool<Postgres>,
        message_id: Uuid,
        expected_sender_id: Uuid,
        new_state: DeliveryState,
        replacement_content: Option<&str>,
    ) -> Result<StateTransition, AppError> {
        let mut message = Self::get_by_id(db, message_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if message.sender_id != expected_sender_id {
            return Err(AppError::Forbidden);
        }
        if message.state != DeliveryState::Sent {
            return Ok(StateTransition {
                message,
                changed: false,
            });
        }

        let result = sqlx::query(
            "UPDATE messages SET state = $1, content = COALESCE($2, content) \
             WHERE id = $3 AND state = 'sent'",
        )
        .bind(new_state.as_str())
        .bind(replacement_content)
        .bind(message_id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a race against another transition; report the winner's view.
            let message = Self::get_by_id(db, message_id)
                .await?
                .ok_or(AppError::NotFound)?;
            return Ok(StateTransition {
                message,
                changed: false,
            });
        }

        message.state = new_state;
        if let Some(content) = replacement_content {
            message.content = content.to_string();
        }
        Ok(StateTransition {
            message,
            changed: true,
        })
    }
}
