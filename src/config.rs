use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Base URL prepended to object keys in returned references. Falls back
    /// to the bucket's virtual-hosted S3 URL when unset.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Maximum character count for text-kind message content.
    pub max_text_chars: usize,
    /// Content written over a recalled message, visible to both parties.
    pub recall_placeholder: String,
    /// When set, both conversation-summary rows are written in one
    /// transaction instead of two sequential upserts.
    pub atomic_summary_writes: bool,
    pub history_page_limit: i64,
    pub conversations_page_limit: i64,
    pub s3: Option<S3Config>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;

        let s3 = match env::var("S3_BUCKET") {
            Ok(bucket) if !bucket.trim().is_empty() => Some(S3Config {
                bucket,
                public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port: env_parse("PORT", 3000),
            jwt_secret,
            max_text_chars: env_parse("MAX_TEXT_CHARS", 200),
            recall_placeholder: env::var("RECALL_PLACEHOLDER")
                .unwrap_or_else(|_| "This message was recalled".into()),
            atomic_summary_writes: env_bool("ATOMIC_SUMMARY_WRITES", false),
            history_page_limit: env_parse("HISTORY_PAGE_LIMIT", 200),
            conversations_page_limit: env_parse("CONVERSATIONS_PAGE_LIMIT", 100),
            s3,
        })
    }

    /// Fixed configuration for tests; never reads the environment.
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            max_text_chars: 200,
            recall_placeholder: "This message was recalled".into(),
            atomic_summary_writes: false,
            history_page_limit: 200,
            conversations_page_limit: 100,
            s3: None,
        }
    }
}
