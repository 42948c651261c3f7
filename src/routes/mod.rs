use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod attachments;
pub mod conversations;
pub mod messages;

use attachments::upload_attachment;
use conversations::list_conversations;
use messages::{delete_message, forward_message, get_message_history, recall_message};

async fn metrics() -> String {
    crate::metrics::render()
}

pub fn build_router(state: AppState) -> Router {
    let introspection = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics));

    let api_v1 = Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/:peer_id/messages", get(get_message_history))
        .route("/messages/recall", post(recall_message))
        .route("/messages/forward", post(forward_message))
        .route("/messages/:message_id", delete(delete_message))
        .route("/attachments", post(upload_attachment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(introspection)
        // The push channel authenticates during its own handshake.
        .route("/ws", get(ws_handler))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn(crate::metrics::track_http_metrics))
        .with_state(state)
}
