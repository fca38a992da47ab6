//! Parent side of the launch: clone into namespaces, map ids, re-exec, wait

use crate::handshake::Handshake;
use crate::isolation::IdMaps;
use crate::isolation::clone3::clone_into_namespaces;
use crate::network::bridge;
use crate::request::{LaunchRequest, Mode};
use crate::{BurrowError, ContainerConfig, Result};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use std::ffi::{CString, c_char};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    Signaled(Signal),
}

impl ChildExit {
    /// Exit code to mirror in the parent; a signal death counts as 1.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Code(code) => code,
            Self::Signaled(_) => 1,
        }
    }

    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Spawn the child, attach networking alongside, and wait for the child.
///
/// Only a failure to start the child is an error. Bridge failures and the
/// child's own exit status are reported, not escalated.
pub async fn launch(
    config: &ContainerConfig,
    request: &LaunchRequest,
    log_filter: Option<&str>,
) -> Result<ChildExit> {
    request.ensure_mode(Mode::Parent)?;
    let pid = spawn_child(config, request, log_filter)?;
    tracing::info!(%pid, parent_pid = std::process::id(), "child started");

    let bridge = config.network.enabled.then(|| {
        let network = config.network.clone();
        tokio::spawn(async move {
            if let Err(e) = bridge::attach(pid, &network).await {
                tracing::warn!(%pid, error = %e, "network setup failed, continuing without it");
            }
        })
    });

    let exit = wait_child(pid).await;

    // the helper has nothing left to serve
    if let Some(task) = bridge {
        task.abort();
    }

    let exit = exit?;
    if exit.success() {
        tracing::info!(%pid, "child exited");
    } else {
        tracing::warn!(%pid, %exit, "child exited with error");
    }
    Ok(exit)
}

/// Clone a child into the configured namespaces and re-exec this binary in
/// child mode once its id maps are in place.
pub fn spawn_child(
    config: &ContainerConfig,
    request: &LaunchRequest,
    log_filter: Option<&str>,
) -> Result<Pid> {
    let exe = std::env::current_exe()
        .map_err(|e| BurrowError::Spawn(format!("cannot locate own executable: {e}")))?;
    let exe = to_cstring(exe.as_os_str().as_bytes())?;

    let mut argv = vec![exe.clone()];
    for arg in request.child_args(config, log_filter)? {
        argv.push(to_cstring(arg.as_bytes())?);
    }
    let envp = config
        .child_env
        .iter()
        .map(|(key, value)| to_cstring(format!("{key}={value}").as_bytes()))
        .collect::<Result<Vec<_>>>()?;

    // everything the forked child touches is built up front
    let argv_ptrs = null_terminated(&argv);
    let envp_ptrs = null_terminated(&envp);
    let handshake = Handshake::new()?;

    let flags = config.namespaces.to_clone_flags();
    tracing::debug!(?flags, command = request.command(), "cloning child");

    let pid = clone_into_namespaces(flags, || {
        if !handshake.wait_in_child() {
            return 1;
        }
        // SAFETY: pointer arrays are NULL-terminated and outlive the call;
        // execve only returns on failure
        unsafe { libc::execve(exe.as_ptr(), argv_ptrs.as_ptr(), envp_ptrs.as_ptr()) };
        1
    })?;

    let release = handshake.into_parent();

    if config.namespaces.user {
        if let Err(e) = IdMaps::for_caller().write_for(pid) {
            drop(release);
            reap(pid);
            return Err(BurrowError::Spawn(format!("failed to map ids for {pid}: {e}")));
        }
    }

    if let Err(e) = release.release() {
        reap(pid);
        return Err(e);
    }

    Ok(pid)
}

async fn wait_child(pid: Pid) -> Result<ChildExit> {
    tokio::task::spawn_blocking(move || blocking_wait(pid))
        .await
        .map_err(|e| BurrowError::Spawn(format!("wait task failed: {e}")))?
}

fn blocking_wait(pid: Pid) -> Result<ChildExit> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ChildExit::Code(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(ChildExit::Signaled(signal)),
            Ok(_) | Err(Errno::EINTR) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

fn reap(pid: Pid) {
    if let Err(e) = blocking_wait(pid) {
        tracing::debug!(%pid, error = %e, "failed to reap child");
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|e| BurrowError::Spawn(format!("argument contains NUL: {e}")))
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}
