use crate::agents::command_runner::{CommandRunner, CommandSpec};
use crate::error::{FleetError, Result};

pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// One row of `docker ps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub name: String,
    pub service: Option<String>,
}

pub struct DockerCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> DockerCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub fn ps_command() -> CommandSpec {
        CommandSpec::new("docker").args([
            "ps".to_string(),
            "--format".to_string(),
            format!("{{{{.Names}}}}\t{{{{.Label \"{COMPOSE_SERVICE_LABEL}\"}}}}"),
        ])
    }

    /// Running containers in `docker ps` order.
    pub fn ps(&self) -> Result<Vec<ContainerEntry>> {
        let spec = Self::ps_command();
        let output = self.runner.run(&spec)?.into_success(&spec)?;
        Ok(parse_ps_output(&output.stdout))
    }

    pub fn is_running(&self, container: &str) -> Result<bool> {
        let spec = CommandSpec::new("docker").args(["inspect", "-f", "{{.State.Running}}", container]);
        let output = self.runner.run(&spec)?;
        if !output.success() {
            return Err(FleetError::RemoteCommand(format!(
                "container '{}' could not be inspected: {}",
                container,
                output.failure_message()
            )));
        }
        Ok(output.stdout.trim() == "true")
    }

    pub fn copy_command(source: &str, destination: &str) -> CommandSpec {
        CommandSpec::new("docker").args(["cp", source, destination])
    }

    /// `docker cp <source> <destination>`; either side may be `container:path`.
    pub fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let spec = Self::copy_command(source, destination);
        self.runner.run(&spec)?.into_success(&spec)?;
        Ok(())
    }
}

pub fn parse_ps_output(stdout: &str) -> Vec<ContainerEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(2, '\t');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let service = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some(ContainerEntry {
                name: name.to_string(),
                service,
            })
        })
        .collect()
}
