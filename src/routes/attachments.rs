use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/v1/attachments
/// Uploads a file to the blob store and returns the reference to use as
/// content of a file-kind message. The bytes are never inspected here.
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: User,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let blob = state
        .blob
        .as_ref()
        .ok_or_else(|| AppError::StorageUnavailable("blob store not configured".into()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("malformed multipart body".into()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::Validation("unreadable file field".into()))?;
        if data.is_empty() {
            return Err(AppError::Validation("empty file".into()));
        }

        let url = blob.store(data.to_vec(), &content_type).await?;
        tracing::info!(
            participant_id = %user.id,
            %content_type,
            bytes = data.len(),
            "attachment stored"
        );
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::Validation("missing file field".into()))
}
