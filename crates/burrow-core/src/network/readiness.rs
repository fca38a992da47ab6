//! Bounded wait for a non-loopback interface

use crate::{BurrowError, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Anything that can report how many network interfaces are visible
pub trait InterfaceSource {
    fn interface_count(&self) -> Result<usize>;
}

/// Interfaces of the current network namespace, via if_nameindex(3)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interface_count(&self) -> Result<usize> {
        let interfaces = nix::net::if_::if_nameindex()
            .map_err(|e| BurrowError::Network(format!("failed to list interfaces: {e}")))?;
        Ok(interfaces.iter().count())
    }
}

/// Outcome of polling for network readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Loopback plus at least one other interface
    Ready,
    /// Deadline passed with loopback only
    TimedOut,
}

/// Poll `source` every `interval` until more than one interface is seen or
/// `timeout` has elapsed.
pub async fn poll_readiness(
    source: &impl InterfaceSource,
    timeout: Duration,
    interval: Duration,
) -> Result<Readiness> {
    let started = Instant::now();

    loop {
        let count = source.interface_count()?;
        if count > 1 {
            tracing::debug!(interfaces = count, waited = ?started.elapsed(), "network ready");
            return Ok(Readiness::Ready);
        }
        if started.elapsed() >= timeout {
            return Ok(Readiness::TimedOut);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Like [`poll_readiness`], with a timeout reported as an error.
pub async fn wait_for_network(
    source: &impl InterfaceSource,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    match poll_readiness(source, timeout, interval).await? {
        Readiness::Ready => Ok(()),
        Readiness::TimedOut => Err(BurrowError::NetworkTimeout(timeout)),
    }
}
