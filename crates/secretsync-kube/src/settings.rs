//! How to reach the cluster

use serde::{Deserialize, Serialize};

/// Binary invoked when none is configured
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// kubectl invocation settings
///
/// Credentials come from the ambient kubeconfig or the in-cluster service
/// account, exactly as a plain `kubectl` call would pick them up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeSettings {
    /// kubectl binary name or path
    pub kubectl: String,
    /// kubeconfig context; the current context when absent
    pub context: Option<String>,
}

impl Default for KubeSettings {
    fn default() -> Self {
        Self {
            kubectl: DEFAULT_KUBECTL.to_string(),
            context: None,
        }
    }
}

impl KubeSettings {
    pub fn with_kubectl(mut self, kubectl: impl Into<String>) -> Self {
        self.kubectl = kubectl.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = (!context.trim().is_empty()).then(|| context.trim().to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = KubeSettings::default();
        assert_eq!(settings.kubectl, "kubectl");
        assert!(settings.context.is_none());
    }

    #[test]
    fn test_blank_context_ignored() {
        assert!(KubeSettings::default().with_context("  ").context.is_none());
        assert_eq!(
            KubeSettings::default().with_context("kind-dev").context.as_deref(),
            Some("kind-dev")
        );
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let settings: KubeSettings = serde_yaml_ng::from_str("context: prod\n").unwrap();
        assert_eq!(settings.kubectl, DEFAULT_KUBECTL);
        assert_eq!(settings.context.as_deref(), Some("prod"));
    }
}
