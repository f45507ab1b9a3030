//! Manifest rendering through the kustomize CLI.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::settings::BuildSettings;

/// Errors from a manifest build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build command is empty")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stderr}")]
    Failed { code: i32, stderr: String },
}

/// Renders the manifest for one service/environment pair.
#[async_trait]
pub trait ManifestBuilder: Send + Sync {
    /// Return the rendered multi-document YAML.
    async fn build(&self, service: &str, environment: &str) -> Result<String, BuildError>;
}

/// Runs `kustomize build <root>/services/<service>/environments/<environment>`.
#[derive(Debug, Clone, Default)]
pub struct KustomizeBuilder {
    settings: BuildSettings,
}

impl KustomizeBuilder {
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    pub fn overlay_path(&self, service: &str, environment: &str) -> PathBuf {
        self.settings
            .manifests_root
            .join("services")
            .join(service)
            .join("environments")
            .join(environment)
    }
}

#[async_trait]
impl ManifestBuilder for KustomizeBuilder {
    async fn build(&self, service: &str, environment: &str) -> Result<String, BuildError> {
        let (exe, prefix) = self
            .settings
            .command
            .split_first()
            .ok_or(BuildError::EmptyCommand)?;
        let path = self.overlay_path(service, environment);
        debug!(path = %path.display(), "Building manifests");

        let output = Command::new(exe)
            .args(prefix)
            .arg("build")
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: exe.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
