//! Mounting a fresh procfs inside the new root

use crate::{BurrowError, Result};
use nix::mount::{MsFlags, mount};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// Mount point of the process-information filesystem
pub const PROC_DIR: &str = "/proc";

/// Create `path` with mode 0755 unless it already exists.
pub fn ensure_mount_point(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)
        .map_err(|e| BurrowError::Mount(format!("failed to create {}: {e}", path.display())))
}

/// Mount `proc` at `/proc` of the current root, no flags, no data.
///
/// Only meaningful once the root has been changed; go through
/// `IsolationContext::mount_proc` to have that checked.
pub(crate) fn mount_proc() -> Result<()> {
    let target = Path::new(PROC_DIR);
    ensure_mount_point(target)?;

    mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| BurrowError::Mount(format!("failed to mount proc at {PROC_DIR}: {e}")))?;

    tracing::debug!("proc mounted");
    Ok(())
}
