//! Bringing up an interface with SIOCSIFFLAGS

use crate::{BurrowError, Result};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};

/// Loopback interface name
pub const LOOPBACK: &str = "lo";

/// Set `lo` up in the current network namespace.
pub fn bring_up_loopback() -> Result<()> {
    bring_up(LOOPBACK)
}

/// Set `IFF_UP` on interface `name`.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn bring_up(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= libc::IFNAMSIZ {
        return Err(BurrowError::Network(format!("invalid interface name {name:?}")));
    }

    // SAFETY: plain socket(2), ownership taken immediately below
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
    if fd < 0 {
        return Err(BurrowError::Network(format!(
            "failed to open control socket: {}",
            std::io::Error::last_os_error()
        )));
    }
    // SAFETY: fd was just returned by socket(2)
    let sock = unsafe { OwnedFd::from_raw_fd(fd) };
    let fd = sock.as_raw_fd();

    // SAFETY: ifreq is plain old data, all-zero is a valid value
    let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in req.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }

    // SAFETY: req is a valid ifreq with a NUL-terminated name
    let rc = unsafe { libc::ioctl(fd, libc::SIOCGIFFLAGS as _, std::ptr::from_mut(&mut req)) };
    if rc < 0 {
        return Err(BurrowError::Network(format!(
            "failed to read flags of {name}: {}",
            std::io::Error::last_os_error()
        )));
    }

    // SAFETY: SIOCGIFFLAGS filled the flags member of the union
    unsafe {
        req.ifr_ifru.ifru_flags |= libc::IFF_UP as libc::c_short;
    }

    // SAFETY: same ifreq, flags updated
    let rc = unsafe { libc::ioctl(fd, libc::SIOCSIFFLAGS as _, std::ptr::from_mut(&mut req)) };
    if rc < 0 {
        return Err(BurrowError::Network(format!(
            "failed to bring up {name}: {}",
            std::io::Error::last_os_error()
        )));
    }

    tracing::debug!(interface = name, "interface up");
    Ok(())
}
