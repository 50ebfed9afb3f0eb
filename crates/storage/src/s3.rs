//! S3-compatible object storage client for order document uploads.
//!
//! Files are validated against the core file policy before any bytes leave
//! the process. Uploaded objects are public-read so customers, experts, and
//! the OCR service can all fetch them by URL.

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use lawbridge_core::file_policy::{check_file, guess_extension, FilePolicyError};
use lawbridge_core::types::DbId;
use uuid::Uuid;

/// Why an upload failed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Rejected by the file policy before reaching the network.
    #[error(transparent)]
    Policy(#[from] FilePolicyError),

    /// Neither the content type nor the file name yielded an extension.
    #[error("could not determine a file extension for {0}")]
    UnknownExtension(String),

    /// The storage backend rejected or failed the request.
    #[error("object storage client error: {0}")]
    Client(String),
}

/// Configuration for the S3-compatible storage backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL of the S3-compatible service.
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl S3Config {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Required | Default                              |
    /// |------------------------|----------|--------------------------------------|
    /// | `S3_ENDPOINT`          | no       | `https://storage.yandexcloud.net`    |
    /// | `S3_REGION`            | no       | `ru-central1`                        |
    /// | `S3_BUCKET`            | **yes**  | --                                   |
    /// | `S3_ACCESS_KEY`        | **yes**  | --                                   |
    /// | `S3_SECRET_ACCESS_KEY` | **yes**  | --                                   |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is not set; storage misconfiguration
    /// should fail at startup, not on the first upload.
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("S3_ENDPOINT")
                .unwrap_or_else(|_| "https://storage.yandexcloud.net".into()),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "ru-central1".into()),
            bucket: std::env::var("S3_BUCKET").expect("S3_BUCKET must be set"),
            access_key: std::env::var("S3_ACCESS_KEY").expect("S3_ACCESS_KEY must be set"),
            secret_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .expect("S3_SECRET_ACCESS_KEY must be set"),
        }
    }
}

/// Uploads validated files to the configured bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    endpoint: String,
    bucket: String,
}

impl S3Storage {
    /// Build a client for the configured endpoint with static credentials.
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "lawbridge-env",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint: config.endpoint.clone(),
            bucket: config.bucket.clone(),
        }
    }

    /// Validate and upload a file on behalf of a user, returning its public
    /// URL.
    ///
    /// The object key is `{user_id}/{uuid}{ext}` so repeated uploads never
    /// overwrite each other (appended image lists reference distinct
    /// objects).
    pub async fn upload(
        &self,
        user_id: DbId,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let ext = guess_extension(content_type, file_name)
            .ok_or_else(|| StorageError::UnknownExtension(file_name.to_string()))?;
        check_file(&ext, bytes.len() as u64)?;

        let key = format!("{user_id}/{}{ext}", Uuid::new_v4());
        tracing::debug!(user_id, key = %key, size = bytes.len(), "uploading file");

        let mut request = self
            .client
            .put_object()
            .acl(ObjectCannedAcl::PublicRead)
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes));
        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }
        request.send().await.map_err(|e| {
            tracing::error!(user_id, key = %key, error = %e, "file upload failed");
            StorageError::Client(e.to_string())
        })?;

        tracing::debug!(user_id, key = %key, "file upload succeeded");
        Ok(self.url_for(&key))
    }

    /// Public download URL for an object key.
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}
