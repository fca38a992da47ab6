//! Joining a pre-existing cgroup v2 directory with a memory ceiling

use crate::{BurrowError, Result};
use std::path::PathBuf;

/// Memory ceiling control file
pub const MEMORY_MAX: &str = "memory.max";

/// Process membership control file
pub const CGROUP_PROCS: &str = "cgroup.procs";

/// Handle to an externally managed cgroup.
///
/// The directory is never created or removed here.
#[derive(Debug, Clone)]
pub struct CgroupHandle {
    path: PathBuf,
}

impl CgroupHandle {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(BurrowError::Cgroup(format!(
                "{} is not a cgroup directory",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Set `memory.max`.
    pub fn set_memory_max(&self, limit: &str) -> Result<()> {
        self.write_control(MEMORY_MAX, limit)?;
        tracing::debug!(cgroup = %self.path.display(), limit, "memory limit set");
        Ok(())
    }

    /// Add a process to this cgroup
    pub fn add_process(&self, pid: u32) -> Result<()> {
        self.write_control(CGROUP_PROCS, &pid.to_string())?;
        tracing::debug!(cgroup = %self.path.display(), pid, "process added to cgroup");
        Ok(())
    }

    /// Apply the memory limit, then move `pid` into the group.
    ///
    /// The limit goes first so the process is never accounted without it.
    pub fn enter(&self, memory_limit: &str, pid: u32) -> Result<()> {
        self.set_memory_max(memory_limit)?;
        self.add_process(pid)
    }

    fn write_control(&self, file: &str, value: &str) -> Result<()> {
        let target = self.path.join(file);
        std::fs::write(&target, value)
            .map_err(|e| BurrowError::Cgroup(format!("failed to write {}: {e}", target.display())))
    }
}
