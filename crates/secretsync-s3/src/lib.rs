//! S3-compatible blob store for secretsync
//!
//! Implements [`secretsync_core::BlobStore`] over `aws-sdk-s3`. Blobs are
//! plain JSON objects; a custom endpoint switches to path-style addressing for
//! MinIO and similar services. Without static credentials the ambient AWS
//! chain (env, profile, IRSA, instance metadata) is used.

pub mod backend;
pub mod settings;

pub use backend::S3BlobStore;
pub use settings::{S3Credentials, S3Settings, DEFAULT_REGION};
