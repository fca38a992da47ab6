//! Error types for burrow-core

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurrowError {
    #[error("namespace error: {0}")]
    Namespace(String),

    #[error("failed to start child: {0}")]
    Spawn(String),

    #[error("root setup error: {0}")]
    RootSetup(String),

    #[error("mount error: {0}")]
    Mount(String),

    #[error("isolation step out of order: {0}")]
    Ordering(String),

    #[error("cgroup error: {0}")]
    Cgroup(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout after {}s waiting for a network interface", .0.as_secs())]
    NetworkTimeout(Duration),

    #[error("hostname error: {0}")]
    Hostname(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nix error: {0}")]
    Nix(#[from] nix::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BurrowError {
    /// Whether this error must abort the process that hit it.
    ///
    /// Advisory errors degrade optional capabilities (resource accounting,
    /// connectivity, hostname) and are only logged by callers.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Cgroup(_) | Self::Network(_) | Self::NetworkTimeout(_) | Self::Hostname(_)
        )
    }
}
