use dm_service::{
    config::Config, db, error::AppError, logging, routes, services::blob_store::BlobStore,
    state::AppState, websocket::PresenceRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    db::MIGRATOR
        .run(&db)
        .await
        .map_err(|e| AppError::StartServer(format!("migrations: {e}")))?;

    let blob = match cfg.s3.clone() {
        Some(s3_cfg) => Some(Arc::new(BlobStore::from_env(s3_cfg).await)),
        None => {
            tracing::warn!("S3_BUCKET not set; file uploads disabled");
            None
        }
    };

    let state = AppState {
        db,
        registry: PresenceRegistry::new(),
        config: cfg.clone(),
        blob,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting dm-service");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;

    Ok(())
}
