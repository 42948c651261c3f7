use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::conversation::{conversation_id, ConversationSummary, LastMessage};
use crate::pagination::{Cursor, Page};

fn summary_from_row(row: &PgRow) -> ConversationSummary {
    ConversationSummary {
        conversation_id: row.get("conversation_id"),
        owner_id: row.get("owner_id"),
        peer_id: row.get("peer_id"),
        last_message: LastMessage {
            content: row.get("last_message_content"),
            sender_id: row.get("last_message_sender_id"),
            timestamp: row.get("last_message_at"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct ConversationStore;

impl ConversationStore {
    /// Writes both owner rows for the pair with the same snapshot and
    /// creation stamp. With `atomic` unset the two upserts run
    /// sequentially: a failure after the first leaves the pair divergent
    /// until the next message in either direction repairs it.
    pub async fn upsert_conversation_pair(
        db: &Pool<Postgres>,
        a: Uuid,
        b: Uuid,
        last_message: &LastMessage,
        atomic: bool,
    ) -> Result<(), AppError> {
        let cid = conversation_id(a, b);
        let now = Utc::now();
        // First-write-wins creation stamp, shared by both rows.
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "SELECT created_at FROM conversation_summaries WHERE conversation_id = $1 LIMIT 1",
        )
        .bind(cid)
        .fetch_optional(db)
        .await?
        .unwrap_or(now);

        if atomic {
            let mut tx = db.begin().await?;
            Self::upsert_owner_row(&mut *tx, cid, a, b, last_message, created_at, now).await?;
            Self::upsert_owner_row(&mut *tx, cid, b, a, last_message, created_at, now).await?;
            tx.commit().await?;
        } else {
            Self::upsert_owner_row(db, cid, a, b, last_message, created_at, now).await?;
            if let Err(e) =
                Self::upsert_owner_row(db, cid, b, a, last_message, created_at, now).await
            {
                crate::metrics::SUMMARY_PAIR_DIVERGENCE_TOTAL.inc();
                tracing::warn!(
                    conversation_id = %cid,
                    error = %e,
                    "second summary write failed; pair left divergent until next write"
                );
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn upsert_owner_row<'e, E>(
        executor: E,
        cid: Uuid,
        owner_id: Uuid,
        peer_id: Uuid,
        last_message: &LastMessage,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO conversation_summaries \
             (conversation_id, owner_id, peer_id, last_message_content, \
              last_message_sender_id, last_message_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (conversation_id, owner_id) DO UPDATE SET \
                 last_message_content = EXCLUDED.last_message_content, \
                 last_message_sender_id = EXCLUDED.last_message_sender_id, \
                 last_message_at = EXCLUDED.last_message_at, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(cid)
        .bind(owner_id)
        .bind(peer_id)
        .bind(&last_message.content)
        .bind(last_message.sender_id)
        .bind(last_message.timestamp)
        .bind(created_at)
        .bind(updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Newest-first summaries owned by the participant.
    pub async fn get_conversations_for_participant(
        db: &Pool<Postgres>,
        owner_id: Uuid,
        cursor: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<ConversationSummary>, AppError> {
        let rows = match cursor {
            Some(after) => {
                sqlx::query(
                    "SELECT conversation_id, owner_id, peer_id, last_message_content, \
                            last_message_sender_id, last_message_at, created_at, updated_at \
                     FROM conversation_summaries \
                     WHERE owner_id = $1 AND (updated_at, conversation_id) < ($2, $3) \
                     ORDER BY updated_at DESC, conversation_id DESC \
                     LIMIT $4",
                )
                .bind(owner_id)
                .bind(after.ts)
                .bind(after.id)
                .bind(limit)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT conversation_id, owner_id, peer_id, last_message_content, \
                            last_message_sender_id, last_message_at, created_at, updated_at \
                     FROM conversation_summaries \
                     WHERE owner_id = $1 \
                     ORDER BY updated_at DESC, conversation_id DESC \
                     LIMIT $2",
                )
                .bind(owner_id)
                .bind(limit)
                .fetch_all(db)
                .await?
            }
        };

        let items: Vec<ConversationSummary> = rows.iter().map(summary_from_row).collect();
        let next_cursor = if items.len() as i64 == limit {
            items.last().map(|s| {
                Cursor {
                    ts: s.updated_at,
                    id: s.conversation_id,
                }
                .encode()
            })
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }
}
