//! One-shot pipe that holds the cloned child until its id maps are written

use crate::{BurrowError, Result};
use std::io::Write;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Both ends of the release pipe, created before the clone so that parent
/// and child each inherit a copy.
#[derive(Debug)]
pub struct Handshake {
    wait_end: OwnedFd,
    release_end: OwnedFd,
}

impl Handshake {
    pub fn new() -> Result<Self> {
        let mut fds = [0i32; 2];

        // SAFETY: pipe2 syscall; O_CLOEXEC keeps both ends out of the exec'd child
        let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

        if ret != 0 {
            return Err(BurrowError::Io(std::io::Error::last_os_error()));
        }

        // SAFETY: We just created these file descriptors
        let (wait_end, release_end) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

        Ok(Self {
            wait_end,
            release_end,
        })
    }

    /// Block the cloned child until the parent releases it.
    ///
    /// Returns `false` when the parent closed its end without releasing.
    /// Only async-signal-safe calls are made here. The descriptors are not
    /// dropped: the child execs or `_exit`s right after.
    #[must_use]
    pub fn wait_in_child(&self) -> bool {
        // SAFETY: our copy of the write end must go, or EOF never arrives
        unsafe { libc::close(self.release_end.as_raw_fd()) };
        read_release(self.wait_end.as_raw_fd())
    }

    /// Keep only the parent's end.
    #[must_use]
    pub fn into_parent(self) -> ReleaseHandle {
        drop(self.wait_end);
        ReleaseHandle {
            release_end: std::fs::File::from(self.release_end),
        }
    }
}

/// Parent end of the handshake. Dropping it without calling
/// [`ReleaseHandle::release`] makes the child give up.
#[derive(Debug)]
pub struct ReleaseHandle {
    release_end: std::fs::File,
}

impl ReleaseHandle {
    pub fn release(mut self) -> Result<()> {
        self.release_end
            .write_all(&[1])
            .map_err(|e| BurrowError::Spawn(format!("failed to release child: {e}")))
    }
}

fn read_release(fd: RawFd) -> bool {
    let mut byte = 0u8;
    loop {
        // SAFETY: reading a single byte into a valid stack buffer
        let ret = unsafe { libc::read(fd, std::ptr::from_mut(&mut byte).cast(), 1) };
        if ret == 1 {
            return true;
        }
        if ret == -1 && std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation::clone3::clone_into_namespaces;
    use nix::sched::CloneFlags;
    use nix::sys::wait::{WaitStatus, waitpid};

    #[test]
    fn released_child_proceeds() {
        let handshake = Handshake::new().expect("pipe");
        let pid = clone_into_namespaces(CloneFlags::empty(), || {
            if handshake.wait_in_child() { 7 } else { 1 }
        })
        .expect("clone");

        handshake.into_parent().release().expect("release");
        assert_eq!(waitpid(pid, None).expect("wait"), WaitStatus::Exited(pid, 7));
    }

    #[test]
    fn dropped_handle_aborts_child() {
        let handshake = Handshake::new().expect("pipe");
        let pid = clone_into_namespaces(CloneFlags::empty(), || {
            if handshake.wait_in_child() { 7 } else { 1 }
        })
        .expect("clone");

        drop(handshake.into_parent());
        assert_eq!(waitpid(pid, None).expect("wait"), WaitStatus::Exited(pid, 1));
    }
}
