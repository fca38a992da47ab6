//! Running the user command inside the finished container

use crate::request::LaunchRequest;
use crate::{BurrowError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Search path of the shell profile
pub const SHELL_PATH: &str = "/bin:/usr/bin:/sbin";

/// Prompt of the shell profile
pub const SHELL_PS1: &str = r"\u@\h:\w# ";

/// Fixed environment handed to the user command. Nothing else is inherited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "profile", rename_all = "lowercase")]
pub enum EnvProfile {
    /// Constrained `PATH` and a shell prompt
    #[default]
    Shell,
    /// A single marker variable
    Marker { key: String, value: String },
}

impl EnvProfile {
    #[must_use]
    pub fn vars(&self) -> Vec<(String, String)> {
        match self {
            Self::Shell => vec![
                ("PS1".into(), SHELL_PS1.into()),
                ("PATH".into(), SHELL_PATH.into()),
            ],
            Self::Marker { key, value } => vec![(key.clone(), value.clone())],
        }
    }
}

/// The command with inherited stdio and only `profile` as environment.
#[must_use]
pub fn build_command(request: &LaunchRequest, profile: &EnvProfile) -> Command {
    let mut cmd = Command::new(request.command());
    cmd.args(request.args())
        .env_clear()
        .envs(profile.vars())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Run the command to completion. A spawn failure or non-zero exit is an
/// `Execution` error.
pub async fn run_command(request: &LaunchRequest, profile: &EnvProfile) -> Result<()> {
    tracing::info!(command = request.command(), args = ?request.args(), "executing command");

    let status = build_command(request, profile)
        .status()
        .await
        .map_err(|e| {
            BurrowError::Execution(format!("failed to start {}: {e}", request.command()))
        })?;

    if !status.success() {
        return Err(BurrowError::Execution(format!(
            "{} exited with {status}",
            request.command()
        )));
    }
    Ok(())
}
