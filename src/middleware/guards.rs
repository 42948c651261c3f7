//! Typed extractors that keep handlers from bypassing authentication.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// The authenticated caller, resolved by the auth middleware.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        Ok(User { id: user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let result = User::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn identity_from_extensions_is_extracted() {
        let id = Uuid::new_v4();
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(id);
        let user = User::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, id);
    }
}
