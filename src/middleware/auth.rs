use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Participant id as a UUID string.
    pub sub: String,
    pub exp: i64,
}

/// Resolves a bearer credential to a participant id. Anything short of a
/// valid, unexpired token with a UUID subject is `Unauthenticated`.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthenticated)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthenticated)
}

/// Extracts the JWT, resolves the caller, and stores the participant id in
/// request extensions for the `User` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let participant_id = verify_token(token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(participant_id);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn issue(sub: &str, exp: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_participant() {
        let id = Uuid::new_v4();
        let token = issue(&id.to_string(), Utc::now().timestamp() + 3600, "secret");
        assert_eq!(verify_token(&token, "secret").unwrap(), id);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let id = Uuid::new_v4();
        let token = issue(&id.to_string(), Utc::now().timestamp() + 3600, "secret");
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let id = Uuid::new_v4();
        let token = issue(&id.to_string(), Utc::now().timestamp() - 3600, "secret");
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn non_uuid_subject_is_unauthenticated() {
        let token = issue("+84901234567", Utc::now().timestamp() + 3600, "secret");
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(AppError::Unauthenticated)
        ));
    }
}
