//! Explicit record of how far the child's isolation sequence has got

use super::mounts;
use super::rootfs::{self, RootChange, RootPath, RootStrategy};
use crate::{BurrowError, Result};

/// Isolation steps completed so far, in the order they must happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Still looking at the inherited root
    Inherited,
    /// Root changed, `/` is the container root
    RootIsolated,
    /// Fresh procfs mounted inside the new root, old root gone
    ProcMounted,
}

/// Threaded through the child's startup so each step can check that the
/// steps it depends on already ran.
#[derive(Debug)]
pub struct IsolationContext {
    stage: Stage,
    /// A pivot left the old root mounted at `/.pivot_root`
    old_root_attached: bool,
}

impl Default for IsolationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: Stage::Inherited,
            old_root_attached: false,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    pub fn isolate_root(&mut self, root: &RootPath, strategy: RootStrategy) -> Result<()> {
        if self.stage != Stage::Inherited {
            return Err(BurrowError::Ordering("root has already been changed".into()));
        }
        let change = rootfs::isolate(root, strategy)?;
        self.stage = Stage::RootIsolated;
        self.old_root_attached = change == RootChange::OldRootAttached;
        tracing::info!(root = %root.as_path().display(), %strategy, "root isolated");
        Ok(())
    }

    /// Mount procfs, then drop the old root if a pivot left it attached.
    ///
    /// Refused before the root change: a proc mounted under the inherited
    /// root would never show up in the new one.
    pub fn mount_proc(&mut self) -> Result<()> {
        match self.stage {
            Stage::Inherited => Err(BurrowError::Ordering(
                "proc must be mounted after the root change".into(),
            )),
            Stage::ProcMounted => Err(BurrowError::Ordering("proc is already mounted".into())),
            Stage::RootIsolated => {
                mounts::mount_proc()?;
                if self.old_root_attached {
                    rootfs::detach_old_root()?;
                    self.old_root_attached = false;
                }
                self.stage = Stage::ProcMounted;
                Ok(())
            }
        }
    }
}
