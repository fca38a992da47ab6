//! Container networking: external bridge helper, loopback, readiness wait

pub mod bridge;
pub mod loopback;
pub mod readiness;

pub use self::readiness::{InterfaceSource, Readiness, SystemInterfaces};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the unprivileged network bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Run the bridge helper against the child's network namespace
    pub enabled: bool,

    /// Helper program, looked up in `PATH`
    pub helper: String,

    /// MTU of the attached interface
    pub mtu: u32,

    /// Name of the interface created inside the namespace
    pub interface: String,

    /// Hold the user command until a non-loopback interface shows up
    pub wait_for_interface: bool,

    /// Upper bound on that wait
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Delay between interface polls
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            helper: "slirp4netns".into(),
            mtu: 1500,
            interface: "tap0".into(),
            wait_for_interface: true,
            timeout: Duration::from_secs(15),
            poll_interval: Duration::from_secs(1),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_milliseconds_in_json() {
        let config = NetworkConfig {
            timeout: Duration::from_millis(2500),
            ..NetworkConfig::default()
        };
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["timeout_ms"], 2500);
        assert_eq!(json["poll_interval_ms"], 1000);

        let back: NetworkConfig = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.timeout, Duration::from_millis(2500));
    }
}
