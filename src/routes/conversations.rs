use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::conversation::ConversationSummary;
use crate::pagination::{Page, PageParams};
use crate::services::conversation_store::ConversationStore;
use crate::state::AppState;

/// GET /api/v1/conversations
/// Newest-first conversation summaries for the authenticated caller.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: User,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ConversationSummary>>, AppError> {
    let cursor = params.cursor()?;
    let limit = params.limit(20, state.config.conversations_page_limit);
    let page =
        ConversationStore::get_conversations_for_participant(&state.db, user.id, cursor, limit)
            .await?;
    Ok(Json(page))
}
