//! Linux namespace selection and user namespace id mapping

use crate::{BurrowError, Result};
use nix::sched::CloneFlags;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaces created for the child at clone time
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Create new user namespace
    pub user: bool,
    /// Create new PID namespace
    pub pid: bool,
    /// Create new mount namespace
    pub mount: bool,
    /// Create new network namespace
    pub net: bool,
    /// Create new IPC namespace
    pub ipc: bool,
    /// Create new UTS namespace
    pub uts: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            user: true,
            pid: true,
            mount: true,
            net: true,
            ipc: true,
            uts: true,
        }
    }
}

impl NamespaceConfig {
    /// Convert to nix CloneFlags
    #[must_use]
    pub fn to_clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();

        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.net {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }

        flags
    }
}

/// One line of a `uid_map`/`gid_map` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    pub container_id: u32,
    pub host_id: u32,
    pub size: u32,
}

impl IdMapping {
    /// Map container root onto a single unprivileged host id.
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self {
            container_id: 0,
            host_id,
            size: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.container_id, self.host_id, self.size)
    }
}

/// UID and GID maps installed for a freshly cloned child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMaps {
    pub uid: IdMapping,
    pub gid: IdMapping,
}

impl IdMaps {
    /// Container root mapped to the real ids of the calling process.
    #[must_use]
    pub fn for_caller() -> Self {
        Self {
            uid: IdMapping::root_to(nix::unistd::getuid().as_raw()),
            gid: IdMapping::root_to(nix::unistd::getgid().as_raw()),
        }
    }

    /// Write the maps for `pid`.
    ///
    /// `setgroups` has to be denied before an unprivileged process may write
    /// `gid_map`, and each map file accepts exactly one write.
    pub fn write_for(&self, pid: Pid) -> Result<()> {
        let proc_dir = format!("/proc/{pid}");

        write_proc_file(&format!("{proc_dir}/setgroups"), "deny")?;
        write_proc_file(&format!("{proc_dir}/gid_map"), &self.gid.to_string())?;
        write_proc_file(&format!("{proc_dir}/uid_map"), &self.uid.to_string())?;

        tracing::debug!(%pid, uid = %self.uid.host_id, gid = %self.gid.host_id, "wrote id maps");
        Ok(())
    }
}

fn write_proc_file(path: &str, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| BurrowError::Namespace(format!("failed to write {path}: {e}")))
}

/// Set the hostname of the current UTS namespace.
pub fn set_hostname(name: &str) -> Result<()> {
    nix::unistd::sethostname(name)
        .map_err(|e| BurrowError::Hostname(format!("failed to set hostname {name:?}: {e}")))
}
