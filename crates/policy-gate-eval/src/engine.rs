//! Policy engine invocation.
//!
//! The engine is OPA, run as
//! `opa eval --data <policy> --format json --stdin-input data.<package>.deny`
//! with the admission-style input document on stdin.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use policy_gate_core::{GateError, Result as GateResult};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::settings::EngineSettings;

/// Errors from a single engine call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine command is empty")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine timed out after {0} seconds")]
    Timeout(u64),

    #[error("engine exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("failed to parse engine output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("cannot build engine input: {0}")]
    Input(String),
}

/// A policy file and its Rego package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModule {
    pub path: PathBuf,
    pub package: String,
}

impl PolicyModule {
    /// Read the policy file and resolve its package declaration.
    pub fn load(path: &Path) -> GateResult<Self> {
        let source = std::fs::read_to_string(path)?;
        let package =
            package_name(&source).ok_or_else(|| GateError::MissingPackage(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
            package,
        })
    }

    /// Query path of the deny rule, `data.<package>.deny`.
    pub fn deny_query(&self) -> String {
        format!("data.{}.deny", self.package)
    }
}

/// Package name from the first line starting with `package `.
pub fn package_name(source: &str) -> Option<String> {
    source
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("package "))
        .map(|rest| rest.trim().to_string())
}

/// Input document handed to the engine for one resource.
pub fn admission_input(kind: &str, object: Value) -> Value {
    json!({
        "request": {
            "kind": {"kind": kind},
            "object": object,
        }
    })
}

/// Extract violation messages from engine output.
///
/// The deny set sits at `result[0].expressions[0].value` and may be a list
/// or a mapping. Falsy entries are dropped; missing paths mean no violations.
pub fn parse_engine_output(stdout: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    let doc: Value = serde_json::from_slice(stdout)?;

    let deny_set = doc
        .get("result")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("expressions"))
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("value"));

    let messages = match deny_set {
        Some(Value::Array(items)) => items.iter().filter(|v| is_truthy(v)).map(message).collect(),
        Some(Value::Object(map)) => map.values().filter(|v| is_truthy(v)).map(message).collect(),
        _ => Vec::new(),
    };
    Ok(messages)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Something that can evaluate a policy against an input document.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Return the violation messages for `input`; empty means pass.
    async fn evaluate(&self, policy: &PolicyModule, input: &Value)
        -> Result<Vec<String>, EngineError>;
}

/// OPA subprocess engine.
#[derive(Debug, Clone, Default)]
pub struct OpaEngine {
    settings: EngineSettings,
}

impl OpaEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn run(&self, policy: &PolicyModule, payload: Vec<u8>) -> Result<Vec<String>, EngineError> {
        let (exe, prefix) = self
            .settings
            .command
            .split_first()
            .ok_or(EngineError::EmptyCommand)?;

        let mut child = Command::new(exe)
            .args(prefix)
            .arg("eval")
            .arg("--data")
            .arg(&policy.path)
            .args(["--format", "json", "--stdin-input"])
            .arg(policy.deny_query())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: exe.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&payload).await {
                    // The engine may exit before reading; its exit status decides.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(EngineError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed?;

        Ok(parse_engine_output(&output.stdout)?)
    }
}

#[async_trait]
impl PolicyEngine for OpaEngine {
    async fn evaluate(
        &self,
        policy: &PolicyModule,
        input: &Value,
    ) -> Result<Vec<String>, EngineError> {
        let payload = serde_json::to_vec(input).map_err(|e| EngineError::Input(e.to_string()))?;

        if self.settings.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.settings.timeout_secs),
                self.run(policy, payload),
            )
            .await
            .map_err(|_| EngineError::Timeout(self.settings.timeout_secs))?
        } else {
            self.run(policy, payload).await
        }
    }
}
