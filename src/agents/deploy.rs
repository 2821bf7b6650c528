use crate::agents::backup::PLUGINS_SUBPATH;
use crate::agents::command_runner::CommandRunner;
use crate::error::FleetError;
use crate::wordpress::{DockerCli, WpCli, WpExecutor};
use colored::Colorize;
use std::path::PathBuf;

/// What to push into each container.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub plugin_source: PathBuf,
    pub plugin_slug: String,
    /// WordPress root inside the container.
    pub wp_path: String,
    pub docker_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Activated(String),
    Planned,
    Failed(String),
}

impl DeployOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DeployOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub site: String,
    pub container: String,
    pub outcome: DeployOutcome,
}

/// Copies a plugin directory into site containers and activates it.
pub struct DeployAgent<'a> {
    runner: &'a dyn CommandRunner,
    request: &'a DeployRequest,
    dry_run: bool,
}

impl<'a> DeployAgent<'a> {
    pub fn new(runner: &'a dyn CommandRunner, request: &'a DeployRequest, dry_run: bool) -> Self {
        Self {
            runner,
            request,
            dry_run,
        }
    }

    fn wp(&self, container: &str) -> WpCli<'a> {
        WpCli::new(
            self.runner,
            WpExecutor::Docker {
                container: container.to_string(),
                user: self.request.docker_user.clone(),
                wp_path: Some(self.request.wp_path.clone()),
            },
        )
    }

    pub fn deploy(&self, site: &str, container: &str) -> DeployResult {
        let outcome = match self.deploy_inner(container) {
            Ok(outcome) => outcome,
            Err(e) => DeployOutcome::Failed(e.to_string()),
        };

        match &outcome {
            DeployOutcome::Activated(_) => println!("  {} {} ({})", "✓".green(), site, container),
            DeployOutcome::Planned => {}
            DeployOutcome::Failed(msg) => eprintln!("  {} {}: {}", "✗".red(), site, msg),
        }

        DeployResult {
            site: site.to_string(),
            container: container.to_string(),
            outcome,
        }
    }

    fn deploy_inner(&self, container: &str) -> crate::error::Result<DeployOutcome> {
        let source = self.request.plugin_source.display().to_string();
        let destination = format!(
            "{}:{}/{}",
            container,
            self.request.wp_path.trim_end_matches('/'),
            PLUGINS_SUBPATH
        );
        let wp = self.wp(container);

        if self.dry_run {
            println!(
                "   {} check that {} is running",
                "[DRY RUN] Would".dimmed(),
                container
            );
            println!(
                "   {} {}",
                "[DRY RUN] Would run:".dimmed(),
                DockerCli::copy_command(&source, &destination).display()
            );
            println!(
                "   {} {}",
                "[DRY RUN] Would run:".dimmed(),
                wp.command(&["plugin", "activate", self.request.plugin_slug.as_str()])
                    .display()
            );
            return Ok(DeployOutcome::Planned);
        }

        let docker = DockerCli::new(self.runner);
        if !docker.is_running(container)? {
            return Err(FleetError::Precondition(format!(
                "container '{container}' is not running"
            )));
        }
        docker.copy(&source, &destination)?;
        let message = wp.activate_plugin(&self.request.plugin_slug)?;
        Ok(DeployOutcome::Activated(message))
    }
}
