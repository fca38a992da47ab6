//! # burrow-core
//!
//! Minimal container bootstrap built directly on kernel primitives.
//!
//! The launch happens in two phases:
//! - the parent clones a child into new namespaces (UTS, PID, mount, IPC,
//!   user, optionally network), maps container root to the caller's ids,
//!   and re-executes the current binary in `child` mode
//! - the child joins a cgroup, changes its root (chroot or pivot_root),
//!   mounts a fresh `/proc`, brings up loopback, optionally waits for the
//!   bridged interface, and runs the command
//!
//! Networking is delegated to an unprivileged helper (`slirp4netns`) that
//! the parent runs alongside the child.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod child;
pub mod config;
pub mod error;
pub mod exec;
pub mod handshake;
pub mod isolation;
pub mod launcher;
pub mod network;
pub mod request;

pub use config::ContainerConfig;
pub use error::BurrowError;
pub use launcher::ChildExit;
pub use request::{LaunchRequest, Mode};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, BurrowError>;
