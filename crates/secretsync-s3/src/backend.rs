//! S3 blob store
//!
//! Stores one JSON object per secret at `{root}/{namespace}/{name}.json`.
//! Works against AWS S3 and S3-compatible storage (MinIO, Wasabi, DigitalOcean Spaces).

use crate::settings::S3Settings;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use secretsync_core::key::namespace_prefix;
use secretsync_core::{BlobKey, BlobStore, StoreError};
use tracing::debug;

/// Error codes meaning the bucket or our credentials are unusable, not the object
const UNAVAILABLE_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "NoSuchBucket",
    "AllAccessDisabled",
];

/// Blob store backed by an S3 bucket
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    root: String,
}

impl S3BlobStore {
    /// Connect using validated settings
    pub async fn new(settings: &S3Settings) -> Self {
        let client = Self::create_client(settings).await;
        Self {
            client,
            bucket: settings.bucket.clone(),
            root: settings.backup_root.trim_end_matches('/').to_string(),
        }
    }

    async fn create_client(settings: &S3Settings) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(creds) = &settings.credentials {
            debug!("Using static S3 credentials for {}", creds.access_key_id);
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "secretsync",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint_url) = &settings.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint_url);
            // MinIO and most S3-compatible services need path-style addressing
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        Client::from_conf(builder.build())
    }

    /// Check that the bucket exists and is reachable with our credentials
    pub async fn check_bucket(&self) -> Result<(), StoreError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                debug!("Bucket {} is accessible", self.bucket);
                Ok(())
            }
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(|se| se.is_not_found());
                if not_found {
                    Err(StoreError::Unavailable(format!(
                        "bucket {} does not exist",
                        self.bucket
                    )))
                } else {
                    Err(StoreError::Unavailable(format!(
                        "cannot access bucket {}: {}",
                        self.bucket,
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }

    fn make_key(&self, namespace: &str, name: &str) -> String {
        BlobKey::new(&self.root, namespace, name).to_string()
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StoreError> {
        let key = self.make_key(namespace, name);
        debug!("Checking if backup exists: s3://{}/{}", self.bucket, key);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(classify(&key, e)),
        }
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = self.make_key(namespace, name);
        debug!("Downloading backup: s3://{}/{}", self.bucket, key);

        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                debug!("No backup at s3://{}/{}", self.bucket, key);
                return Ok(None);
            }
            Err(e) => return Err(classify(&key, e)),
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::request(&key, format!("failed to read body: {}", e)))?;

        let data = body.into_bytes().to_vec();
        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket,
            key
        );
        Ok(Some(data))
    }

    async fn put(&self, namespace: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let key = self.make_key(namespace, name);
        debug!(
            "Uploading backup ({} bytes): s3://{}/{}",
            bytes.len(),
            self.bucket,
            key
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| classify(&key, e))?;

        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let prefix = namespace_prefix(&self.root, namespace);
        debug!("Listing backups in s3://{}/{}", self.bucket, prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let resp = request.send().await.map_err(|e| classify(&prefix, e))?;

            keys.extend(resp.contents().iter().filter_map(|o| o.key().map(String::from)));

            match (resp.is_truncated(), resp.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!("Found {} objects under {}", keys.len(), prefix);
        Ok(keys)
    }

    fn backup_root(&self) -> &str {
        &self.root
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("bucket", &self.bucket)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Turn an SDK failure into a store error
fn classify<E, R>(key: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let unreachable = matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    );
    if unreachable || is_unavailable_code(err.code()) {
        StoreError::Unavailable(format!("{}: {}", key, DisplayErrorContext(&err)))
    } else {
        StoreError::request(key, DisplayErrorContext(&err))
    }
}

fn is_unavailable_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| UNAVAILABLE_CODES.contains(&c))
}
