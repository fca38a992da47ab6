//! Making a prepared directory the process's filesystem root

use crate::{BurrowError, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Temporary mount point for the old root during a pivot
pub const PIVOT_DIR: &str = ".pivot_root";

/// How the root change is performed. One strategy per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootStrategy {
    /// chroot(2) followed by chdir("/")
    #[default]
    Chroot,
    /// Bind mount, pivot_root(2), detach and remove the old root
    Pivot,
}

impl FromStr for RootStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chroot" => Ok(Self::Chroot),
            "pivot" | "pivot_root" => Ok(Self::Pivot),
            other => Err(format!("unknown root strategy {other:?} (expected chroot or pivot)")),
        }
    }
}

impl fmt::Display for RootStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chroot => "chroot",
            Self::Pivot => "pivot",
        })
    }
}

/// Absolute path of an existing directory that will become `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPath(PathBuf);

impl RootPath {
    /// Resolve `path` against the current directory and check it is a directory.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resolved = path.canonicalize().map_err(|e| {
            BurrowError::RootSetup(format!("cannot resolve root {}: {e}", path.display()))
        })?;
        if !resolved.is_dir() {
            return Err(BurrowError::RootSetup(format!(
                "root {} is not a directory",
                resolved.display()
            )));
        }
        Ok(Self(resolved))
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// What is left to do after the root change itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) enum RootChange {
    /// Nothing from the old root is reachable
    Complete,
    /// `/` is the new root but the old one is still mounted at [`PIVOT_DIR`].
    /// Finish with [`detach_old_root`].
    OldRootAttached,
}

/// Switch the process root to `root` using `strategy`.
pub(crate) fn isolate(root: &RootPath, strategy: RootStrategy) -> Result<RootChange> {
    tracing::debug!(root = %root.as_path().display(), %strategy, "changing root");
    match strategy {
        RootStrategy::Chroot => {
            chroot_into(root)?;
            Ok(RootChange::Complete)
        }
        RootStrategy::Pivot => {
            pivot_into(root)?;
            Ok(RootChange::OldRootAttached)
        }
    }
}

fn chroot_into(root: &RootPath) -> Result<()> {
    nix::unistd::chroot(root.as_path()).map_err(|e| {
        BurrowError::RootSetup(format!("chroot to {} failed: {e}", root.as_path().display()))
    })?;
    chdir_root()
}

fn pivot_into(root: &RootPath) -> Result<()> {
    let new_root = root.as_path();

    // pivot_root refuses shared mounts, and the new mount namespace may still
    // propagate from the host
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| BurrowError::RootSetup(format!("failed to make / private: {e}")))?;

    mount(
        Some(new_root),
        new_root,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| {
        BurrowError::RootSetup(format!("failed to bind mount {}: {e}", new_root.display()))
    })?;

    let put_old = new_root.join(PIVOT_DIR);
    std::fs::DirBuilder::new()
        .mode(0o700)
        .create(&put_old)
        .map_err(|e| {
            BurrowError::RootSetup(format!("failed to create {}: {e}", put_old.display()))
        })?;

    if let Err(e) = nix::unistd::pivot_root(new_root, put_old.as_path()) {
        drop(std::fs::remove_dir(&put_old));
        return Err(BurrowError::RootSetup(format!("pivot_root failed: {e}")));
    }

    chdir_root()
}

/// Lazily unmount the old root left at `/.pivot_root` and remove the directory.
///
/// In a user namespace the kernel only allows a new procfs while a fully
/// visible one is still mounted, so this runs after proc is mounted.
pub(crate) fn detach_old_root() -> Result<()> {
    let old_root = Path::new("/").join(PIVOT_DIR);
    umount2(old_root.as_path(), MntFlags::MNT_DETACH)
        .map_err(|e| BurrowError::RootSetup(format!("failed to detach old root: {e}")))?;
    std::fs::remove_dir(&old_root).map_err(|e| {
        BurrowError::RootSetup(format!("failed to remove {}: {e}", old_root.display()))
    })?;
    tracing::debug!("old root detached");
    Ok(())
}

fn chdir_root() -> Result<()> {
    nix::unistd::chdir("/").map_err(|e| BurrowError::RootSetup(format!("chdir to / failed: {e}")))
}
