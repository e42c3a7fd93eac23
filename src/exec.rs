//! External process execution
//!
//! The layer contributor runs the installed toolchain through an
//! [`Executor`] so tests can substitute canned output.

use crate::error::{ScarbError, ScarbResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A command to run
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub command: PathBuf,
    pub args: Vec<String>,
    /// Extra environment for the child, on top of the inherited one
    pub env: Vec<(String, OsString)>,
}

impl Execution {
    /// Shell-like rendering for error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.command.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Completed process: exit code and stdout followed by stderr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: Option<i32>,
    pub combined: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the command; spawn failures are errors, non-zero exits are not
    async fn execute(&self, execution: &Execution) -> ScarbResult<ExecOutput>;
}

/// Executor backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(&self, execution: &Execution) -> ScarbResult<ExecOutput> {
        debug!("Executing: {}", execution.display());

        let output = Command::new(&execution.command)
            .args(&execution.args)
            .envs(execution.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ScarbError::VersionCheck {
                command: execution.display(),
                output: String::new(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            code: output.status.code(),
            combined,
        })
    }
}
