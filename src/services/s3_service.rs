use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, info};

#[cfg(feature = "s3")]
use aws_credential_types::Credentials;
#[cfg(feature = "s3")]
use aws_sdk_s3::config::Region;
#[cfg(feature = "s3")]
use aws_sdk_s3::presigning::PresigningConfig;
#[cfg(feature = "s3")]
use aws_sdk_s3::primitives::ByteStream;
#[cfg(feature = "s3")]
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
#[cfg(feature = "s3")]
use aws_sdk_s3::Client;

use crate::config::Config;
use crate::errors::StoreError;
use crate::models::UploadProgress;
use crate::stores::{ObjectStore, ProgressSender};

/// Blobs at or above this size go through a multipart upload with per-part
/// progress; smaller blobs use a single put.
#[cfg(feature = "s3")]
const MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
    pub download_url_ttl_seconds: u64,
}

impl From<&Config> for S3Config {
    fn from(config: &Config) -> Self {
        Self {
            bucket_name: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
            access_key_id: config.s3_access_key_id.clone(),
            secret_access_key: config.s3_secret_access_key.clone(),
            endpoint_url: config.s3_endpoint_url.clone(),
            download_url_ttl_seconds: config.download_url_ttl_seconds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Service {
    #[cfg(feature = "s3")]
    client: Client,
    config: S3Config,
}

impl S3Service {
    pub async fn new(config: S3Config) -> Result<Self> {
        #[cfg(not(feature = "s3"))]
        {
            let _ = config;
            return Err(anyhow!(
                "S3 support not compiled in. Enable the 's3' feature to use S3 object storage."
            ));
        }

        #[cfg(feature = "s3")]
        {
            if config.bucket_name.is_empty() {
                return Err(anyhow!("Bucket name is required"));
            }
            if config.access_key_id.is_empty() {
                return Err(anyhow!("Access key ID is required"));
            }
            if config.secret_access_key.is_empty() {
                return Err(anyhow!("Secret access key is required"));
            }

            let credentials = Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None, // session token
                None, // expiry
                "storekit-s3",
            );

            let region = if config.region.is_empty() {
                "us-east-1".to_string()
            } else {
                config.region.clone()
            };

            let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
                .region(Region::new(region))
                .credentials_provider(credentials)
                .behavior_version_latest();

            // Custom endpoint for S3-compatible services
            if let Some(endpoint_url) = &config.endpoint_url {
                if !endpoint_url.is_empty() {
                    s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
                    info!("Using custom S3 endpoint: {}", endpoint_url);
                }
            }

            let s3_config = s3_config_builder.build();
            let client = Client::from_conf(s3_config);

            Ok(Self { client, config })
        }
    }

    pub fn get_config(&self) -> &S3Config {
        &self.config
    }

    #[cfg(feature = "s3")]
    async fn put_single(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        progress: &ProgressSender,
    ) -> Result<()> {
        let total_bytes = data.len() as u64;

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to upload S3 object {}: {}", key, e))?;

        let _ = progress.send(UploadProgress {
            bytes_transferred: total_bytes,
            total_bytes,
        });

        Ok(())
    }

    #[cfg(feature = "s3")]
    async fn put_multipart(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        progress: &ProgressSender,
    ) -> Result<()> {
        let total_bytes = data.len() as u64;

        let multipart = self
            .client
            .create_multipart_upload()
            .bucket(&self.config.bucket_name)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to start multipart upload for {}: {}", key, e))?;

        let upload_id = multipart
            .upload_id()
            .ok_or_else(|| anyhow!("S3 returned no upload id for {}", key))?
            .to_string();

        let mut completed_parts = Vec::new();
        let mut bytes_transferred = 0u64;

        for (index, chunk) in data.chunks(MULTIPART_THRESHOLD).enumerate() {
            let part_number = index as i32 + 1;

            let part = self
                .client
                .upload_part()
                .bucket(&self.config.bucket_name)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| anyhow!("Failed to upload part {} of {}: {}", part_number, key, e))?;

            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(part.e_tag().map(str::to_string))
                    .build(),
            );

            bytes_transferred += chunk.len() as u64;
            let _ = progress.send(UploadProgress {
                bytes_transferred,
                total_bytes,
            });
            debug!(
                "uploaded part {} of {} ({}/{} bytes)",
                part_number, key, bytes_transferred, total_bytes
            );
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.config.bucket_name)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| anyhow!("Failed to complete multipart upload for {}: {}", key, e))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Service {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        progress: &ProgressSender,
    ) -> Result<(), StoreError> {
        #[cfg(not(feature = "s3"))]
        {
            let _ = (key, data, content_type, progress);
            return Err(StoreError::Backend(anyhow!("S3 support not compiled in")));
        }

        #[cfg(feature = "s3")]
        {
            info!(
                "Uploading {} bytes to s3://{}/{}",
                data.len(),
                self.config.bucket_name,
                key
            );

            if data.len() >= MULTIPART_THRESHOLD {
                self.put_multipart(key, data, content_type, progress).await?;
            } else {
                self.put_single(key, data, content_type, progress).await?;
            }

            Ok(())
        }
    }

    async fn download_url(&self, key: &str) -> Result<String, StoreError> {
        #[cfg(not(feature = "s3"))]
        {
            let _ = key;
            return Err(StoreError::Backend(anyhow!("S3 support not compiled in")));
        }

        #[cfg(feature = "s3")]
        {
            let expires_in =
                std::time::Duration::from_secs(self.config.download_url_ttl_seconds);
            let presigning = PresigningConfig::expires_in(expires_in)
                .map_err(|e| anyhow!("Invalid presigning expiry: {}", e))?;

            let presigned = self
                .client
                .get_object()
                .bucket(&self.config.bucket_name)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|e| anyhow!("Failed to presign download URL for {}: {}", key, e))?;

            Ok(presigned.uri().to_string())
        }
    }
}
