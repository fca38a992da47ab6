//! Linux isolation primitives
//!
//! This module contains the steps that build the container:
//! - `clone3` - clone3 syscall for creating the namespaced child
//! - `namespace` - namespace selection, UID/GID maps, hostname
//! - `cgroups` - joining a pre-existing cgroup with a memory ceiling
//! - `rootfs` - chroot or pivot_root into the prepared root
//! - `mounts` - fresh procfs inside the new root
//! - `context` - ordering checks across the steps above

pub mod cgroups;
pub mod clone3;
pub mod context;
pub mod mounts;
pub mod namespace;
pub mod rootfs;

pub use self::cgroups::CgroupHandle;
pub use self::context::{IsolationContext, Stage};
pub use self::namespace::{IdMapping, IdMaps, NamespaceConfig};
pub use self::rootfs::{RootPath, RootStrategy};
