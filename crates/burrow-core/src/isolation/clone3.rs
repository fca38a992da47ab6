//! clone3 syscall wrapper for creating the namespaced child

use crate::{BurrowError, Result};
use nix::sched::CloneFlags;
use nix::unistd::Pid;

/// clone3 clone_args structure (from linux/sched.h)
#[repr(C)]
#[derive(Debug, Default)]
pub struct CloneArgs {
    /// Flags for the new process
    pub flags: u64,
    /// File descriptor for pidfd
    pub pidfd: u64,
    /// Where to store the child's tid in the child's memory
    pub child_tid: u64,
    /// Where to store the child's tid in the parent's memory
    pub parent_tid: u64,
    /// Signal to deliver on child termination
    pub exit_signal: u64,
    /// Stack pointer (0 = copy parent stack)
    pub stack: u64,
    /// Stack size (0 if using parent stack)
    pub stack_size: u64,
    /// TLS pointer
    pub tls: u64,
}

/// Wrapper around the clone3 syscall
///
/// # Safety
/// The child returns from this call with only the calling thread. Until it
/// execs or exits it may only perform async-signal-safe operations.
#[allow(clippy::cast_possible_truncation)]
pub unsafe fn clone3(args: &CloneArgs) -> Result<libc::pid_t> {
    // SAFETY: args points to a fully initialised clone_args of the size we pass
    let ret = unsafe {
        libc::syscall(
            libc::SYS_clone3,
            std::ptr::from_ref(args),
            std::mem::size_of::<CloneArgs>(),
        )
    };

    if ret == -1 {
        return Err(BurrowError::Spawn(format!(
            "clone3 failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    Ok(ret as libc::pid_t)
}

/// Fork a child into new namespaces, fork-style (shared stack image).
///
/// `child_fn` runs in the child and its return value becomes the exit code.
/// It must stick to async-signal-safe calls: allocate everything it needs
/// before calling this function.
pub fn clone_into_namespaces(flags: CloneFlags, child_fn: impl FnOnce() -> i32) -> Result<Pid> {
    #[allow(clippy::cast_sign_loss)]
    let args = CloneArgs {
        flags: flags.bits() as u64,
        exit_signal: libc::SIGCHLD as u64,
        ..Default::default()
    };

    // SAFETY: the child branch only runs child_fn and then _exit
    let pid = unsafe { clone3(&args)? };

    if pid == 0 {
        let code = child_fn();
        // SAFETY: leave the child without running the parent's destructors
        unsafe { libc::_exit(code) };
    }

    Ok(Pid::from_raw(pid))
}
