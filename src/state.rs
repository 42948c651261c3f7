use crate::{config::Config, services::blob_store::BlobStore, websocket::PresenceRegistry};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: PresenceRegistry,
    pub config: Arc<Config>,
    pub blob: Option<Arc<BlobStore>>,
}
