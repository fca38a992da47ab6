//! Container configuration

use crate::exec::EnvProfile;
use crate::isolation::{NamespaceConfig, RootStrategy};
use crate::network::NetworkConfig;
use crate::{BurrowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a launch needs beyond the command itself.
///
/// The whole value is serialised into the child's argument list, so the
/// child sees exactly what the parent was configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Pre-populated directory that becomes `/` in the container
    pub root_path: PathBuf,

    /// How the root change is performed
    pub root_strategy: RootStrategy,

    /// Pre-existing cgroup directory to join, if any
    pub cgroup_path: Option<PathBuf>,

    /// Value written to `memory.max`
    pub memory_limit: String,

    /// Namespaces requested at clone time
    pub namespaces: NamespaceConfig,

    /// Bridge helper and readiness wait settings
    pub network: NetworkConfig,

    /// Hostname set inside the UTS namespace
    pub hostname: String,

    /// Environment of the re-executed child
    pub child_env: Vec<(String, String)>,

    /// Environment of the user command
    pub command_env: EnvProfile,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("rootfs"),
            root_strategy: RootStrategy::Chroot,
            cgroup_path: None,
            memory_limit: "2M".into(),
            namespaces: NamespaceConfig::default(),
            network: NetworkConfig::default(),
            hostname: "burrow".into(),
            child_env: vec![("container".into(), "burrow".into())],
            command_env: EnvProfile::default(),
        }
    }
}

impl ContainerConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::default()
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BurrowError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject combinations that cannot work at launch time.
    pub fn validate(&self) -> Result<()> {
        if self.root_path.as_os_str().is_empty() {
            return Err(BurrowError::Config("root_path must not be empty".into()));
        }
        if self.memory_limit.trim().is_empty() {
            return Err(BurrowError::Config("memory_limit must not be empty".into()));
        }
        if self.network.enabled && !self.namespaces.net {
            return Err(BurrowError::Config(
                "network bridge requires a network namespace".into(),
            ));
        }
        if self.network.mtu == 0 {
            return Err(BurrowError::Config("mtu must be positive".into()));
        }
        if self.network.poll_interval.is_zero() {
            return Err(BurrowError::Config("poll_interval must be positive".into()));
        }
        Ok(())
    }
}

/// Builder for `ContainerConfig`
#[derive(Debug, Default)]
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    #[must_use]
    pub fn root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_path = path.into();
        self
    }

    #[must_use]
    pub fn root_strategy(mut self, strategy: RootStrategy) -> Self {
        self.config.root_strategy = strategy;
        self
    }

    #[must_use]
    pub fn cgroup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cgroup_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.config.memory_limit = limit.into();
        self
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: NamespaceConfig) -> Self {
        self.config.namespaces = namespaces;
        self
    }

    /// Enable the bridge helper; this also requests a network namespace.
    #[must_use]
    pub fn network(mut self, enabled: bool) -> Self {
        self.config.network.enabled = enabled;
        if enabled {
            self.config.namespaces.net = true;
        }
        self
    }

    #[must_use]
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.config.network.mtu = mtu;
        self
    }

    #[must_use]
    pub fn wait_for_interface(mut self, wait: bool) -> Self {
        self.config.network.wait_for_interface = wait;
        self
    }

    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn command_env(mut self, profile: EnvProfile) -> Self {
        self.config.command_env = profile;
        self
    }

    pub fn build(self) -> Result<ContainerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn defaults_match_the_bootstrap_constants() {
        let config = ContainerConfig::default();
        assert_eq!(config.memory_limit, "2M");
        assert_eq!(config.network.mtu, 1500);
        assert_eq!(config.network.interface, "tap0");
        assert_eq!(config.network.helper, "slirp4netns");
        assert_eq!(config.network.timeout, Duration::from_secs(15));
        assert_eq!(config.network.poll_interval, Duration::from_secs(1));
        assert_eq!(config.root_strategy, RootStrategy::Chroot);
        assert_eq!(config.child_env.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = ContainerConfig::from_json_str(
            r#"{"root_path": "/srv/alpine", "root_strategy": "pivot", "memory_limit": "64M"}"#,
        )
        .expect("parse");
        assert_eq!(config.root_path, PathBuf::from("/srv/alpine"));
        assert_eq!(config.root_strategy, RootStrategy::Pivot);
        assert_eq!(config.memory_limit, "64M");
        assert_eq!(config.hostname, "burrow");
    }

    #[test]
    fn json_survives_the_child_argument_hop() {
        let config = ContainerConfig::builder()
            .root_path("/tmp/root")
            .cgroup_path("/sys/fs/cgroup/burrow")
            .network(true)
            .mtu(9000)
            .build()
            .expect("build");
        let json = config.to_json().expect("serialize");
        assert_eq!(ContainerConfig::from_json_str(&json).expect("parse"), config);
    }

    #[test]
    fn network_without_netns_is_rejected() {
        let mut config = ContainerConfig::default();
        config.network.enabled = true;
        config.namespaces.net = false;
        assert!(matches!(config.validate(), Err(BurrowError::Config(_))));
    }

    #[test]
    fn builder_rejects_empty_memory_limit() {
        let result = ContainerConfig::builder().memory_limit("  ").build();
        assert!(matches!(result, Err(BurrowError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"hostname": "box", "network": {{"mtu": 1400}}}}"#).expect("write");
        let config = ContainerConfig::from_json_file(file.path()).expect("load");
        assert_eq!(config.hostname, "box");
        assert_eq!(config.network.mtu, 1400);
        assert_eq!(config.network.interface, "tap0");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ContainerConfig::from_json_file("/nonexistent/burrow.json").unwrap_err();
        assert!(matches!(err, BurrowError::Config(_)));
    }
}
