//! Child entry point: the ordered isolation sequence run after re-exec

use crate::exec;
use crate::isolation::namespace::set_hostname;
use crate::isolation::{CgroupHandle, IsolationContext, RootPath};
use crate::network::loopback::bring_up_loopback;
use crate::network::readiness::{SystemInterfaces, wait_for_network};
use crate::request::{LaunchRequest, Mode};
use crate::{ContainerConfig, Result};

/// Isolate the current process and run the requested command.
///
/// cgroup → hostname → root → proc → loopback → network wait → exec.
/// The cgroup step runs first, while the process still sees the host
/// filesystem. Root and proc failures abort; the rest only warn.
pub async fn run(config: &ContainerConfig, request: &LaunchRequest) -> Result<()> {
    request.ensure_mode(Mode::Child)?;
    let pid = std::process::id();
    tracing::info!(pid, command = request.command(), "child starting isolation");

    if let Some(path) = &config.cgroup_path {
        advisory(
            "resource limits",
            CgroupHandle::open(path).and_then(|cgroup| cgroup.enter(&config.memory_limit, pid)),
        );
    }

    if config.namespaces.uts {
        advisory("hostname", set_hostname(&config.hostname));
    }

    let mut ctx = IsolationContext::new();
    let root = RootPath::resolve(&config.root_path)?;
    ctx.isolate_root(&root, config.root_strategy)?;
    ctx.mount_proc()?;

    if config.namespaces.net {
        advisory("loopback", bring_up_loopback());
    }

    if config.network.enabled && config.network.wait_for_interface {
        advisory(
            "network wait",
            wait_for_network(
                &SystemInterfaces,
                config.network.timeout,
                config.network.poll_interval,
            )
            .await,
        );
    }

    exec::run_command(request, &config.command_env).await
}

/// Log a failed optional step and carry on. Returns whether it succeeded.
fn advisory(step: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(step, error = %e, "optional step failed, continuing");
            false
        }
    }
}
