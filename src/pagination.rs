use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Store-native continuation point for a keyset page: the sort key of the
/// last row returned. Clients only ever see the encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub ts: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("cursor serialization");
        general_purpose::STANDARD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let bytes = general_purpose::STANDARD
            .decode(token)
            .map_err(|_| AppError::Validation("invalid cursor".into()))?;
        serde_json::from_slice(&bytes).map_err(|_| AppError::Validation("invalid cursor".into()))
    }
}

/// A page of rows plus the opaque token to resume after it. `next_cursor`
/// is absent when the page was not full.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Common query parameters for paginated reads.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn cursor(&self) -> Result<Option<Cursor>, AppError> {
        self.cursor.as_deref().map(Cursor::decode).transpose()
    }

    pub fn limit(&self, default: i64, cap: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            ts: Utc::now(),
            id: Uuid::new_v4(),
        };
        let token = cursor.encode();
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_a_validation_error() {
        for token in ["not-base64!!", "aGVsbG8=", ""] {
            match Cursor::decode(token) {
                Err(AppError::Validation(_)) => {}
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn limit_is_clamped_to_cap_and_floor() {
        let params = PageParams {
            cursor: None,
            limit: Some(10_000),
        };
        assert_eq!(params.limit(50, 200), 200);

        let params = PageParams {
            cursor: None,
            limit: Some(0),
        };
        assert_eq!(params.limit(50, 200), 1);

        let params = PageParams::default();
        assert_eq!(params.limit(50, 200), 50);
    }
}
