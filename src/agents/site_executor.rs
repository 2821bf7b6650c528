use crate::agents::backup::{BackupAgent, BackupFormat};
use crate::agents::command_runner::CommandRunner;
use crate::agents::health_check::{CheckSelection, HealthCheckAgent, UrlProbe};
use crate::agents::update::{UpdateContext, UpdateMode, apply_updates};
use crate::model::{PluginUpdateRecord, Target, TargetResult, UpdateOutcome};
use crate::utils::{console, status_file};
use crate::wordpress::{WpCli, WpExecutor};
use colored::Colorize;
use std::path::PathBuf;

pub const DEFAULT_WORK_DIR: &str = "wpfleet-reports";

/// Flags that shape the per-target pipeline. Shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub dry_run: bool,
    pub skip_backup: bool,
    pub skip_plugins: bool,
    pub skip_doctor: bool,
    pub update_mode: UpdateMode,
    pub priority: Vec<String>,
    pub checks: CheckSelection,
    pub backup_dir: PathBuf,
    pub backup_format: BackupFormat,
    /// WordPress root inside containers, used for `docker cp` backups.
    pub container_wp_path: String,
    /// Passed as `--path` to `wp` inside containers when set.
    pub wp_path: Option<String>,
    pub docker_user: Option<String>,
    pub ssh_host: Option<String>,
    /// Run directory targets through their derived container instead of local `wp`.
    pub via_docker: bool,
    pub report_dir: Option<PathBuf>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_backup: false,
            skip_plugins: false,
            skip_doctor: false,
            update_mode: UpdateMode::Individual,
            priority: Vec::new(),
            checks: CheckSelection::default(),
            backup_dir: PathBuf::from("backups"),
            backup_format: BackupFormat::Copy,
            container_wp_path: crate::agents::backup::DEFAULT_CONTAINER_WP_PATH.to_string(),
            wp_path: None,
            docker_user: None,
            ssh_host: None,
            via_docker: false,
            report_dir: None,
        }
    }
}

/// Runs backup, update check, updates, health checks and the HTTP probe
/// against one target. Step failures are recorded, never propagated.
pub struct SiteExecutor<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn UrlProbe,
    settings: &'a ExecutorSettings,
}

impl<'a> SiteExecutor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        probe: &'a dyn UrlProbe,
        settings: &'a ExecutorSettings,
    ) -> Self {
        Self {
            runner,
            probe,
            settings,
        }
    }

    pub fn wp_executor(&self, target: &Target) -> WpExecutor {
        wp_executor_for(target, self.settings)
    }

    pub fn work_dir(&self, target: &Target) -> PathBuf {
        if let Some(dir) = &self.settings.report_dir {
            return dir.join(&target.slug);
        }
        target
            .wp_root()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR).join(&target.slug))
    }

    pub fn run(&self, target: &Target) -> TargetResult {
        let settings = self.settings;
        let mut result = TargetResult::new(target.clone());
        let wp = WpCli::new(self.runner, self.wp_executor(target));
        let work_dir = self.work_dir(target);
        let tag = format!("[{}]", target.name).bold();

        println!("{} {}", tag, "starting".cyan());

        if settings.skip_backup {
            console::verbose(format!("{}: backup skipped", target.name));
        } else {
            let agent = BackupAgent::new(
                self.runner,
                &settings.backup_dir,
                settings.backup_format,
                settings.dry_run,
            );
            match agent.backup(target, &settings.container_wp_path) {
                Ok(Some(path)) => {
                    println!("{} {} {}", tag, "✓ backup".green(), path.display());
                    result.backup = Some(path);
                }
                Ok(None) => {}
                Err(e) => {
                    console::error(format!("{} backup failed: {}", target.name, e));
                    result.record_step_error("backup", e);
                }
            }
        }

        if !settings.skip_plugins {
            self.update_plugins(&wp, &work_dir, &mut result);
        }

        let checks = HealthCheckAgent::new(&wp, &settings.checks);
        if !settings.skip_doctor {
            result.checks.extend(checks.run_doctor());
        }
        result.checks.push(checks.run_http(self.probe, settings.dry_run));

        for check in &result.checks {
            if let Err(e) = status_file::append_health_result(&work_dir, check) {
                console::verbose(format!("cannot write health log: {e}"));
            }
        }

        let failed = result.failed().count();
        let check_errors = result.checks.iter().filter(|c| c.status.is_error()).count();
        if failed + check_errors + result.step_errors.len() == 0 {
            println!("{} {}", tag, "✓ done".green());
        } else {
            println!(
                "{} {}",
                tag,
                format!(
                    "done with {} failed update(s), {} check error(s), {} step error(s)",
                    failed,
                    check_errors,
                    result.step_errors.len()
                )
                .yellow()
            );
        }

        result
    }

    fn update_plugins(&self, wp: &WpCli, work_dir: &std::path::Path, result: &mut TargetResult) {
        let settings = self.settings;
        let names = match wp.plugin_names() {
            Ok(names) => names,
            Err(e) => {
                console::error(format!("{} plugin inventory failed: {}", result.target_name(), e));
                result.record_step_error("plugin inventory", e);
                return;
            }
        };

        let mut records = Vec::with_capacity(names.len());
        for slug in names {
            let record = match wp.probe_update(&slug) {
                Ok(probe) => PluginUpdateRecord {
                    slug,
                    needs_update: probe.needs_update,
                    current_version: probe.current_version,
                    available_version: probe.available_version,
                    outcome: if probe.needs_update {
                        UpdateOutcome::Pending
                    } else {
                        UpdateOutcome::UpToDate
                    },
                },
                Err(e) => PluginUpdateRecord {
                    outcome: UpdateOutcome::Failed(format!("update check failed: {e}")),
                    ..PluginUpdateRecord::up_to_date(slug)
                },
            };
            records.push(record);
        }

        let flags: Vec<(String, bool)> = records
            .iter()
            .map(|r| (r.slug.clone(), r.needs_update))
            .collect();
        // The status file decides what gets updated; in-memory flags are the fallback.
        match status_file::write_plugin_updates(work_dir, &flags)
            .and_then(|_| status_file::read_plugins_needing_update(work_dir))
        {
            Ok(flagged) => {
                for record in records.iter_mut() {
                    let listed = flagged.contains(&record.slug);
                    if record.needs_update && !listed {
                        record.needs_update = false;
                        record.outcome = UpdateOutcome::UpToDate;
                    }
                }
            }
            Err(e) => result.record_step_error("status file", e),
        }

        let pending = records.iter().filter(|r| r.needs_update).count();
        println!(
            "[{}] {} plugin(s), {} need an update",
            result.target_name(),
            records.len(),
            pending
        );

        let ctx = UpdateContext::new(wp, settings.dry_run, &settings.priority);
        apply_updates(&ctx, settings.update_mode, &mut records);
        result.plugins = records;
    }
}

/// Containers go through `docker exec`; directories through SSH, local `wp`,
/// or their derived container when `via_docker` is set.
pub fn wp_executor_for(target: &Target, settings: &ExecutorSettings) -> WpExecutor {
    let docker = |container: &str| WpExecutor::Docker {
        container: container.to_string(),
        user: settings.docker_user.clone(),
        wp_path: settings.wp_path.clone(),
    };

    match (target.wp_root(), target.container.as_deref()) {
        (None, Some(container)) => docker(container),
        (Some(_), Some(container)) if settings.via_docker => docker(container),
        (Some(root), _) => match &settings.ssh_host {
            Some(host) => WpExecutor::Ssh {
                host: host.clone(),
                wp_path: root.display().to_string(),
            },
            None => WpExecutor::Local { wp_path: root },
        },
        (None, None) => docker(&target.name),
    }
}
