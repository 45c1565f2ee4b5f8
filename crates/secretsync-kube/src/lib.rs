//! Kubernetes secret source for secretsync
//!
//! [`KubectlSource`] implements [`secretsync_core::ResourceSource`] by driving
//! `kubectl get/create/replace` with JSON manifests on stdin. It uses whatever
//! credentials kubectl itself would: the kubeconfig (optionally a named
//! context) or the in-cluster service account.

pub mod kubectl;
pub mod manifest;
pub mod settings;

pub use kubectl::KubectlSource;
pub use settings::{KubeSettings, DEFAULT_KUBECTL};
