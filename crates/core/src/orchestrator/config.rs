//! Orchestrator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the task orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Directory under which each task gets its own working directory.
    /// The per-task directory is removed when the task ends.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Template for an extra "mirror" link on completion.
    /// `{id}` is replaced with the URL-encoded remote file id.
    #[serde(default)]
    pub mirror_link_template: Option<String>,

    /// Capacity of the per-phase progress channel.
    #[serde(default = "default_channel_size")]
    pub progress_channel_size: usize,

    /// Failure reasons longer than this are truncated in the operator message.
    #[serde(default = "default_max_failure_chars")]
    pub max_failure_chars: usize,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("mediarelay")
}

fn default_channel_size() -> usize {
    32
}

fn default_max_failure_chars() -> usize {
    1000
}

impl OrchestratorConfig {
    /// Builds the mirror link for a remote file, if a template is configured.
    pub fn mirror_link(&self, remote_id: &str) -> Option<String> {
        self.mirror_link_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.replace("{id}", &urlencoding::encode(remote_id)))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            mirror_link_template: None,
            progress_channel_size: default_channel_size(),
            max_failure_chars: default_max_failure_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.mirror_link_template.is_none());
        assert_eq!(config.progress_channel_size, 32);
        assert_eq!(config.max_failure_chars, 1000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            work_dir = "/var/lib/mediarelay"
            mirror_link_template = "https://mirror.example/0:findpath?id={id}"
            progress_channel_size = 8
            max_failure_chars = 200
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/var/lib/mediarelay"));
        assert_eq!(config.progress_channel_size, 8);
        assert_eq!(config.max_failure_chars, 200);
    }

    #[test]
    fn test_mirror_link() {
        let mut config = OrchestratorConfig::default();
        assert_eq!(config.mirror_link("abc"), None);

        config.mirror_link_template = Some("https://mirror.example/0:findpath?id={id}".into());
        assert_eq!(
            config.mirror_link("a b/c").unwrap(),
            "https://mirror.example/0:findpath?id=a%20b%2Fc"
        );
    }
}
