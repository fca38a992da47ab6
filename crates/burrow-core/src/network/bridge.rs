//! External helper that wires the child's network namespace to the host

use super::NetworkConfig;
use crate::{BurrowError, Result};
use nix::unistd::Pid;
use std::process::Stdio;
use tokio::process::Command;

/// Arguments for `<helper> --configure --mtu=<mtu> <pid> <interface>`.
#[must_use]
pub fn helper_args(pid: Pid, config: &NetworkConfig) -> Vec<String> {
    vec![
        "--configure".to_string(),
        format!("--mtu={}", config.mtu),
        pid.to_string(),
        config.interface.clone(),
    ]
}

/// Run the bridge helper against `pid`'s network namespace.
///
/// The helper normally lives as long as the namespace. Dropping the future
/// kills it.
pub async fn attach(pid: Pid, config: &NetworkConfig) -> Result<()> {
    tracing::info!(
        %pid,
        helper = %config.helper,
        interface = %config.interface,
        mtu = config.mtu,
        "attaching network"
    );

    let output = Command::new(&config.helper)
        .args(helper_args(pid, config))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BurrowError::Network(format!("failed to run {}: {e}", config.helper)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BurrowError::Network(format!(
            "{} exited with {}: {}",
            config.helper,
            output.status,
            stderr.trim()
        )));
    }

    tracing::debug!(%pid, "network helper finished");
    Ok(())
}
