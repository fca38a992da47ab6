//! burrow CLI - launch a command in a minimal container

use anyhow::{Context, Result};
use burrow_core::isolation::RootStrategy;
use burrow_core::{ContainerConfig, LaunchRequest, Mode, child, launcher};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "burrow=info";

#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(author, version, about = "Minimal container bootstrap on Linux namespaces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch a command inside new namespaces
    #[command(alias = "run")]
    Parent {
        #[command(flatten)]
        overrides: Overrides,

        /// Command and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Re-entry point inside the new namespaces (used by `parent`)
    #[command(hide = true)]
    Child {
        /// Full container config, as JSON
        #[arg(long)]
        config_json: String,

        /// tracing filter inherited from the parent
        #[arg(long)]
        log_filter: Option<String>,

        /// Command and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// Config file plus per-field overrides
#[derive(Args, Debug, Default)]
struct Overrides {
    /// JSON config file; flags below take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prepared root filesystem directory
    #[arg(long)]
    root: Option<PathBuf>,

    /// Root change strategy (chroot or pivot)
    #[arg(long)]
    strategy: Option<RootStrategy>,

    /// Pre-existing cgroup directory to join
    #[arg(long)]
    cgroup: Option<PathBuf>,

    /// Value for memory.max, e.g. 2M
    #[arg(short, long)]
    memory: Option<String>,

    /// No network namespace and no bridge helper
    #[arg(long)]
    no_network: bool,

    /// Do not hold the command until the bridged interface shows up
    #[arg(long)]
    no_wait_network: bool,

    /// MTU passed to the bridge helper
    #[arg(long)]
    mtu: Option<u32>,

    /// Hostname inside the container
    #[arg(long)]
    hostname: Option<String>,
}

impl Overrides {
    fn into_config(self) -> Result<ContainerConfig> {
        let mut config = match &self.config {
            Some(path) => ContainerConfig::from_json_file(path)?,
            None => ContainerConfig::default(),
        };

        if let Some(root) = self.root {
            config.root_path = root;
        }
        if let Some(strategy) = self.strategy {
            config.root_strategy = strategy;
        }
        if let Some(cgroup) = self.cgroup {
            config.cgroup_path = Some(cgroup);
        }
        if let Some(memory) = self.memory {
            config.memory_limit = memory;
        }
        if self.no_network {
            config.network.enabled = false;
            config.namespaces.net = false;
        }
        if self.no_wait_network {
            config.network.wait_for_interface = false;
        }
        if let Some(mtu) = self.mtu {
            config.network.mtu = mtu;
        }
        if let Some(hostname) = self.hostname {
            config.hostname = hostname;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let inherited = match &cli.command {
        Commands::Child { log_filter, .. } => log_filter.clone(),
        Commands::Parent { .. } => std::env::var("RUST_LOG").ok(),
    };
    init_tracing(inherited.as_deref());

    match run(cli, inherited).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, log_filter: Option<String>) -> Result<i32> {
    match cli.command {
        Commands::Parent { overrides, command } => {
            let config = overrides.into_config()?;
            let request = LaunchRequest::new(Mode::Parent, command)?;
            tracing::info!(
                root = %config.root_path.display(),
                strategy = %config.root_strategy,
                network = config.network.enabled,
                "launching container"
            );

            let exit = launcher::launch(&config, &request, log_filter.as_deref()).await?;
            Ok(exit.code())
        }

        Commands::Child {
            config_json,
            command,
            ..
        } => {
            let config =
                ContainerConfig::from_json_str(&config_json).context("invalid child config")?;
            let request = LaunchRequest::new(Mode::Child, command)?;
            child::run(&config, &request).await?;
            Ok(0)
        }
    }
}

/// Log to stderr so the container's stdout stays clean.
fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
