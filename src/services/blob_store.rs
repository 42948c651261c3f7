use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use uuid::Uuid;

use crate::config::S3Config;
use crate::error::AppError;

/// File-kind message content lives behind this seam; the delivery engine
/// only ever sees the returned reference, never the bytes.
pub struct BlobStore {
    client: S3Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl BlobStore {
    pub async fn from_env(cfg: S3Config) -> Self {
        let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Ok(endpoint) = std::env::var("S3_ENDPOINT") {
            config_loader = config_loader.endpoint_url(endpoint);
        }
        let aws_config = config_loader.load().await;
        Self {
            client: S3Client::new(&aws_config),
            bucket: cfg.bucket,
            public_base_url: cfg.public_base_url,
        }
    }

    pub async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let key = format!("uploads/{}", Uuid::new_v4());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("blob upload: {e}")))?;

        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        })
    }
}
