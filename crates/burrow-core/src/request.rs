//! Launch requests and the re-execution argument contract

use crate::{BurrowError, ContainerConfig, Result};
use std::fmt;

/// Subcommand that re-enters the child entry point.
pub const CHILD_SUBCOMMAND: &str = "child";

/// Which side of the two-phase launch a process is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Host-namespace process that creates the namespaces
    Parent,
    /// Re-executed process running inside the new namespaces
    Child,
}

impl Mode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => CHILD_SUBCOMMAND,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The command to run in the container, tagged with the launch phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    mode: Mode,
    command: String,
    args: Vec<String>,
}

impl LaunchRequest {
    /// Build a request from `command` followed by its arguments.
    pub fn new(mode: Mode, argv: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let mut argv = argv.into_iter().map(Into::into);
        let command = argv
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BurrowError::Config("no command given".into()))?;
        Ok(Self {
            mode,
            command,
            args: argv.collect(),
        })
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Refuse a request built for the other side of the launch.
    pub fn ensure_mode(&self, expected: Mode) -> Result<()> {
        if self.mode == expected {
            return Ok(());
        }
        Err(BurrowError::Config(format!(
            "{} request handed to the {expected} entry point",
            self.mode
        )))
    }

    /// Arguments (after `argv[0]`) the parent re-executes itself with:
    ///
    /// ```text
    /// child --config-json <json> [--log-filter <filter>] -- <command> [args...]
    /// ```
    pub fn child_args(
        &self,
        config: &ContainerConfig,
        log_filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut out = vec![
            CHILD_SUBCOMMAND.to_string(),
            "--config-json".to_string(),
            config.to_json()?,
        ];
        if let Some(filter) = log_filter {
            out.push("--log-filter".to_string());
            out.push(filter.to_string());
        }
        out.push("--".to_string());
        out.push(self.command.clone());
        out.extend(self.args.iter().cloned());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_command_from_arguments() {
        let request =
            LaunchRequest::new(Mode::Parent, ["/bin/echo", "hello", "world"]).expect("request");
        assert_eq!(request.command(), "/bin/echo");
        assert_eq!(request.args(), ["hello", "world"]);
    }

    #[test]
    fn empty_argv_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(LaunchRequest::new(Mode::Parent, empty).is_err());
        assert!(LaunchRequest::new(Mode::Parent, [""]).is_err());
    }

    #[test]
    fn child_args_lead_with_the_child_subcommand() {
        let request =
            LaunchRequest::new(Mode::Parent, ["/bin/sh", "-c", "echo hi"]).expect("request");
        let config = ContainerConfig::default();
        let args = request.child_args(&config, Some("burrow=debug")).expect("args");

        assert_eq!(args[0], "child");
        assert_eq!(args[1], "--config-json");
        assert_eq!(ContainerConfig::from_json_str(&args[2]).expect("json"), config);
        assert_eq!(args[3..5], ["--log-filter", "burrow=debug"]);
        assert_eq!(args[5..], ["--", "/bin/sh", "-c", "echo hi"]);
    }

    #[test]
    fn request_for_the_wrong_side_is_refused() {
        let request = LaunchRequest::new(Mode::Parent, ["ls", "-la"]).expect("request");
        request.ensure_mode(Mode::Parent).expect("parent request");

        let err = request.ensure_mode(Mode::Child).unwrap_err();
        assert!(matches!(err, BurrowError::Config(_)));
        assert_eq!(
            err.to_string(),
            "configuration error: parent request handed to the child entry point"
        );
    }
}
