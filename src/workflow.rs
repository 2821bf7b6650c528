use crate::agents::backup::{self, BackupFormat, DEFAULT_CONTAINER_WP_PATH};
use crate::agents::batch_runner::{progress_style, run_targets};
use crate::agents::command_runner::{SystemCommandRunner, ensure_tool};
use crate::agents::deploy::{DeployAgent, DeployRequest};
use crate::agents::health_check::{CheckSelection, HttpProbe};
use crate::agents::inventory::{self, ContainerInventory, InventoryStats};
use crate::agents::site_executor::{ExecutorSettings, SiteExecutor, wp_executor_for};
use crate::agents::site_urls::{self, SiteUrl};
use crate::agents::target_enumerator::{EnumeratorOptions, TargetEnumerator, TargetSource};
use crate::agents::update::{RunConfirmation, UpdateMode};
use crate::cli::{TargetArgs, UpdateArgs};
use crate::cloudflare::{self, CloudflareClient, DnsRecordRequest, UpsertOutcome};
use crate::config::{FleetConfig, split_list};
use crate::error::{FleetError, Result};
use crate::model::{CheckStatus, Target};
use crate::report::{self, ReportFormat, RunReport};
use crate::utils::{PathValidator, console, slug};
use crate::wordpress::WpCli;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget};
use jiff::Timestamp;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BACKUP_DIR: &str = "backups";
const DEFAULT_REPORTS_DIR: &str = "wpfleet-reports";

/// Execute the update workflow. Returns the process exit code.
pub fn execute_update(config: &FleetConfig, args: UpdateArgs) -> Result<i32> {
    println!("{}", "Starting WordPress fleet update...".cyan().bold());
    if args.dry_run {
        println!("{}", "DRY RUN: no changes will be made".yellow().bold());
    }

    let settings = update_settings(config, &args)?;
    let jobs = args.jobs.unwrap_or(config.jobs);
    if jobs == 0 {
        return Err(FleetError::Config("--jobs must be at least 1".to_string()));
    }
    let timeout = args.http_timeout.unwrap_or(config.http_timeout_secs);
    if timeout == 0 {
        return Err(FleetError::Config(
            "--http-timeout must be at least 1".to_string(),
        ));
    }

    // Step 1: Enumerate targets
    println!("\n{}", "1. Enumerating targets...".yellow());
    let runner = SystemCommandRunner;
    let targets = enumerate_targets(&runner, config, &args.targets)?;
    if targets.is_empty() {
        println!("{}", "No WordPress targets found".yellow());
        let report = RunReport::from_results(Vec::new(), args.dry_run, Timestamp::now());
        write_run_report(&report, args.print_results, &settings);
        return Ok(0);
    }
    print_targets(&targets);

    // Step 2: Check required tools
    println!("\n{}", "2. Checking required tools...".yellow());
    let mut tools: BTreeSet<&str> = targets
        .iter()
        .map(|t| wp_executor_for(t, &settings).required_tool())
        .collect();
    let needs_tar = settings.backup_format == BackupFormat::Tar
        && !settings.skip_backup
        && !settings.dry_run
        && targets.iter().any(|t| t.path.is_some());
    if needs_tar {
        tools.insert("tar");
    }
    for tool in &tools {
        ensure_tool(tool)?;
    }
    println!(
        "{}",
        format!(
            "✓ Found {}",
            tools.iter().copied().collect::<Vec<_>>().join(", ")
        )
        .green()
    );

    // Confirm before changing anything
    if !args.dry_run && !args.skip_plugins {
        let confirmation = RunConfirmation::new(!args.yes);
        match confirmation.confirm(targets.len()) {
            Ok(true) => {}
            Ok(false) => return Ok(0),
            Err(FleetError::UserCancelled) => {
                println!("\n{}", "Update cancelled by user.".yellow());
                return Ok(0);
            }
            Err(e) => return Err(e),
        }
    }

    // Step 3: Process targets
    println!(
        "\n{}",
        format!("3. Processing {} target(s) with {} job(s)...", targets.len(), jobs).yellow()
    );
    let probe = HttpProbe::new(Duration::from_secs(timeout))?;
    let executor = SiteExecutor::new(&runner, &probe, &settings);
    let results = run_targets(&targets, jobs, !console::verbose_enabled(), |target| {
        executor.run(target)
    });

    // Step 4: Summarize and report
    println!("\n{}", "4. Summarizing results...".yellow());
    let report = RunReport::from_results(results, args.dry_run, Timestamp::now());
    print_run_summary(&report);
    write_run_report(&report, args.print_results, &settings);

    let code = report.exit_code(args.ignore_check_errors);
    if code == 0 {
        println!(
            "\n{}",
            "✨ Update process completed successfully!".green().bold()
        );
    } else {
        println!(
            "\n{}",
            "Update process finished with errors".red().bold()
        );
    }
    Ok(code)
}

/// Writes `update-results.<ext>` when `--print-results` was given and echoes it.
/// A failed write is a warning.
fn write_run_report(report: &RunReport, format: Option<ReportFormat>, settings: &ExecutorSettings) {
    let Some(format) = format else {
        return;
    };
    let dir = settings
        .report_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    match report::write_report(report, format, &dir) {
        Ok(path) => {
            println!("\n{}", report.render(format));
            println!(
                "{}",
                format!("✓ Report written to {}", path.display()).green()
            );
        }
        Err(e) => console::warn(format!("{e}")),
    }
}

fn update_settings(config: &FleetConfig, args: &UpdateArgs) -> Result<ExecutorSettings> {
    let priority = args
        .priority_plugins
        .as_deref()
        .map(split_list)
        .unwrap_or_else(|| config.priority_plugins.clone());
    if args.update_mode == UpdateMode::Priority && priority.is_empty() {
        return Err(FleetError::Precondition(
            "--update-mode priority requires --priority-plugins".to_string(),
        ));
    }

    let exclude_checks = args
        .exclude_checks
        .as_deref()
        .map(split_list)
        .unwrap_or_else(|| config.exclude_checks.clone());
    let only_checks = args.checks.as_deref().map(split_list);

    Ok(ExecutorSettings {
        dry_run: args.dry_run,
        skip_backup: args.skip_backup,
        skip_plugins: args.skip_plugins,
        skip_doctor: args.skip_wp_doctor,
        update_mode: args.update_mode,
        priority,
        checks: CheckSelection::with_exclusions(only_checks, &exclude_checks),
        backup_dir: PathValidator::validate_output_dir(
            args.backup_dir
                .clone()
                .or_else(|| config.backup_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
        )?,
        backup_format: args.backup_format,
        report_dir: args
            .report_dir
            .clone()
            .or_else(|| config.report_dir.clone())
            .map(|dir| PathValidator::validate_output_dir(&dir))
            .transpose()?,
        ..base_settings(config, &args.targets)
    })
}

/// Settings that only decide where `wp` runs.
fn base_settings(config: &FleetConfig, targets: &TargetArgs) -> ExecutorSettings {
    ExecutorSettings {
        container_wp_path: config
            .wp_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINER_WP_PATH.to_string()),
        wp_path: config.wp_path.clone(),
        docker_user: config.docker_user.clone(),
        ssh_host: config.ssh_host.clone(),
        via_docker: targets.via_docker,
        ..ExecutorSettings::default()
    }
}

fn enumerate_targets(
    runner: &SystemCommandRunner,
    config: &FleetConfig,
    args: &TargetArgs,
) -> Result<Vec<Target>> {
    let source = if let Some(list) = &args.targets {
        TargetSource::Explicit(split_list(list))
    } else if let Some(dir) = &args.target_dir {
        TargetSource::Directory(dir.clone())
    } else {
        ensure_tool("docker")?;
        TargetSource::Containers
    };

    let options = EnumeratorOptions {
        container_prefix: args
            .container_prefix
            .clone()
            .unwrap_or_else(|| config.container_prefix.clone()),
        service_label: args
            .service_label
            .clone()
            .or_else(|| config.service_label.clone()),
        subdir: args.subdir.clone(),
        exclude: args
            .exclude_containers
            .as_deref()
            .map(split_list)
            .unwrap_or_else(|| config.exclude_containers.clone()),
    };
    console::verbose(format!("target source: {source:?}"));

    TargetEnumerator::new(runner, options).enumerate(&source)
}

fn print_targets(targets: &[Target]) {
    println!("   Found {} target(s):", targets.len());
    for target in targets {
        println!("   • {}", target.to_string().bright_cyan());
    }
    println!("{}", "✓ Targets enumerated".green());
}

fn print_run_summary(report: &RunReport) {
    let s = &report.summary;
    println!("   Targets processed:      {}", s.targets);
    println!("   Plugins needing update: {}", s.needing_update);
    println!(
        "   Updated:                {}",
        s.updated.to_string().green()
    );
    let failed = s.failed.to_string();
    println!(
        "   Failed:                 {}",
        if s.failed > 0 { failed.red() } else { failed.normal() }
    );
    if s.step_errors > 0 {
        println!(
            "   Step errors:            {}",
            s.step_errors.to_string().red()
        );
    }

    if s.total_checks() == 0 {
        println!("   {}", report::NO_CHECKS.dimmed());
    } else {
        let parts: Vec<String> = CheckStatus::ALL
            .iter()
            .filter(|status| s.checks_with(**status) > 0)
            .map(|status| format!("{} {}", s.checks_with(*status), status))
            .collect();
        println!("   Health checks:          {}", parts.join(", "));
    }

    for result in &report.results {
        for (slug, message) in result.failed() {
            println!(
                "   {} {} {}: {}",
                "✗".red(),
                result.target_name(),
                slug,
                message
            );
        }
        for error in &result.step_errors {
            println!("   {} {} {}", "✗".red(), result.target_name(), error);
        }
    }
}

/// Collect (or load) plugin lists and print distributions.
pub fn execute_list(
    config: &FleetConfig,
    targets: &TargetArgs,
    report_dir: Option<PathBuf>,
    use_existing: bool,
    dry_run: bool,
) -> Result<()> {
    println!("{}", "Collecting WordPress plugin inventory...".cyan().bold());
    let reports_dir = PathValidator::validate_output_dir(
        report_dir
            .or_else(|| config.report_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
    )?;

    println!("\n{}", "1. Enumerating containers...".yellow());
    let runner = SystemCommandRunner;
    let found = enumerate_targets(&runner, config, targets)?;
    let containers: Vec<Target> = found
        .into_iter()
        .filter(|t| {
            let has_container = t.container.is_some();
            if !has_container {
                console::warn(format!("{} has no container, skipping", t.name));
            }
            has_container
        })
        .collect();
    if containers.is_empty() {
        println!("{}", "No WordPress containers found".yellow());
        return Ok(());
    }
    print_targets(&containers);

    let settings = ExecutorSettings {
        via_docker: true,
        ..base_settings(config, targets)
    };

    let step = if use_existing {
        "2. Loading saved plugin lists..."
    } else {
        "2. Collecting plugin lists..."
    };
    println!("\n{}", step.yellow());
    if !use_existing && !dry_run {
        ensure_tool("docker")?;
    }

    let pb = ProgressBar::new(containers.len() as u64);
    if dry_run || console::verbose_enabled() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(progress_style());

    let mut inventories: Vec<ContainerInventory> = Vec::new();
    for target in &containers {
        let container = target.container.as_deref().unwrap_or(&target.name);
        pb.set_message(container.to_string());

        if use_existing {
            match inventory::load_saved(&reports_dir, container) {
                Ok(inv) => inventories.push(inv),
                Err(e) => console::warn(format!("{container}: no saved plugin list ({e})")),
            }
        } else {
            let wp = WpCli::new(&runner, wp_executor_for(target, &settings));
            if dry_run {
                println!(
                    "   {} {}",
                    "[DRY RUN] Would run:".dimmed(),
                    wp.command(&["plugin", "list", "--format=json"]).display()
                );
            } else {
                match inventory::collect(&wp, &reports_dir, container) {
                    Ok(inv) => inventories.push(inv),
                    Err(e) => console::error(format!("{container}: {e}")),
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if inventories.is_empty() {
        println!("{}", "No plugin data collected".yellow());
        return Ok(());
    }
    if !use_existing {
        println!(
            "{}",
            format!("✓ Saved plugin lists under {}", reports_dir.display()).green()
        );
    }

    println!("\n{}", "3. Plugin statistics".yellow());
    inventory::print_stats(&InventoryStats::from_inventories(&inventories));
    Ok(())
}

/// Summarize saved plugin lists under `reports_dir`.
pub fn execute_report(reports_dir: &Path) -> Result<()> {
    println!("{}", "Summarizing saved plugin reports...".cyan().bold());
    let reports_dir = PathValidator::validate_base_dir(reports_dir)?;

    let scan = inventory::scan_reports_dir(&reports_dir)?;
    for name in &scan.missing {
        console::warn(format!(
            "{} has no {}",
            name,
            inventory::PLUGIN_LIST_FILE
        ));
    }
    if scan.inventories.is_empty() {
        println!("{}", "No container reports found.".yellow());
        return Ok(());
    }

    println!();
    inventory::print_stats(&InventoryStats::from_inventories(&scan.inventories));
    Ok(())
}

/// Copy a plugin into every selected site container and activate it.
pub fn execute_deploy(
    config: &FleetConfig,
    plugin_source: PathBuf,
    plugin_slug: String,
    sites: Option<&str>,
    target_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<i32> {
    println!(
        "{}",
        format!("Deploying plugin '{plugin_slug}'...").cyan().bold()
    );
    if dry_run {
        println!("{}", "DRY RUN: no changes will be made".yellow().bold());
    }

    println!("\n{}", "1. Validating plugin source...".yellow());
    let plugin_source = PathValidator::validate_base_dir(&plugin_source)?;
    println!(
        "{}",
        format!("✓ {}", plugin_source.display()).green()
    );

    println!("\n{}", "2. Resolving sites...".yellow());
    let runner = SystemCommandRunner;
    let pairs: Vec<(String, String)> = match (sites, target_dir) {
        (Some(list), _) => split_list(list)
            .into_iter()
            .map(|site| {
                let container = slug::container_name_for_site(&site, &config.container_prefix);
                (site, container)
            })
            .collect(),
        (None, Some(dir)) => {
            let args = TargetArgs {
                target_dir: Some(dir),
                ..TargetArgs::default()
            };
            enumerate_targets(&runner, config, &args)?
                .into_iter()
                .map(|t| {
                    let container = t.container.clone().unwrap_or_else(|| {
                        slug::container_name_for_site(&t.name, &config.container_prefix)
                    });
                    (t.name, container)
                })
                .collect()
        }
        (None, None) => {
            return Err(FleetError::Precondition(
                "either --sites or --target-dir is required".to_string(),
            ));
        }
    };
    if pairs.is_empty() {
        println!("{}", "No sites to deploy to".yellow());
        return Ok(0);
    }
    for (site, container) in &pairs {
        println!("   • {} ({})", site.bright_cyan(), container.dimmed());
    }

    if !dry_run {
        ensure_tool("docker")?;
    }

    println!("\n{}", "3. Deploying...".yellow());
    let request = DeployRequest {
        plugin_source,
        plugin_slug,
        wp_path: config
            .wp_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINER_WP_PATH.to_string()),
        docker_user: config.docker_user.clone(),
    };
    let agent = DeployAgent::new(&runner, &request, dry_run);
    let results: Vec<_> = pairs
        .iter()
        .map(|(site, container)| agent.deploy(site, container))
        .collect();

    let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
    println!(
        "\n   Deployed: {}, failed: {}",
        (results.len() - failed).to_string().green(),
        failed.to_string().red()
    );
    Ok(if failed > 0 { 1 } else { 0 })
}

/// Print `container<TAB>home_url` (or JSON) for every target.
pub fn execute_urls(config: &FleetConfig, targets: &TargetArgs, json: bool) -> Result<()> {
    let runner = SystemCommandRunner;
    let found = enumerate_targets(&runner, config, targets)?;
    let settings = base_settings(config, targets);
    for tool in found
        .iter()
        .map(|t| wp_executor_for(t, &settings).required_tool())
        .collect::<BTreeSet<_>>()
    {
        ensure_tool(tool)?;
    }

    let urls: Vec<SiteUrl> = found
        .iter()
        .filter_map(|target| {
            let wp = WpCli::new(&runner, wp_executor_for(target, &settings));
            let name = target.container.as_deref().unwrap_or(&target.name);
            site_urls::lookup(&wp, name)
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&urls)?);
    } else {
        print!("{}", site_urls::render_tsv(&urls));
    }
    console::verbose(format!("{} of {} targets had a home URL", urls.len(), found.len()));
    Ok(())
}

/// Point a Cloudflare DNS record at new content.
pub fn execute_dns(
    config: &FleetConfig,
    zone: &str,
    record: DnsRecordRequest,
    dry_run: bool,
) -> Result<()> {
    println!(
        "{}",
        format!("Updating DNS record {} ({})...", record.name, record.record_type)
            .cyan()
            .bold()
    );

    let token = cloudflare::resolve_token(&config.cloudflare)?;
    let client = CloudflareClient::new(&config.cloudflare.api_base, token)?;

    match client.upsert(zone, &record, dry_run)? {
        UpsertOutcome::Created(r) => println!(
            "{}",
            format!("✓ Created {} {} -> {}", r.record_type, r.name, r.content).green()
        ),
        UpsertOutcome::Updated(r) => println!(
            "{}",
            format!("✓ Updated {} {} -> {}", r.record_type, r.name, r.content).green()
        ),
        UpsertOutcome::Unchanged(r) => println!(
            "{}",
            format!("✓ {} {} already points to {}", r.record_type, r.name, r.content).green()
        ),
        UpsertOutcome::Planned { existing } => match existing {
            Some(r) => println!(
                "   {} update {} from {} to {}",
                "[DRY RUN] Would".dimmed(),
                r.name,
                r.content,
                record.content
            ),
            None => println!(
                "   {} create {} {} -> {}",
                "[DRY RUN] Would".dimmed(),
                record.record_type,
                record.name,
                record.content
            ),
        },
    }
    Ok(())
}

/// Keep the newest `keep` backups per site and delete the rest.
pub fn execute_prune_backups(
    config: &FleetConfig,
    dir: Option<PathBuf>,
    keep: usize,
    prefix: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let dir = dir
        .or_else(|| config.backup_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
    let dir = PathValidator::validate_base_dir(&dir)?;
    println!(
        "{}",
        format!("Pruning backups in {} (keeping {keep} per site)...", dir.display())
            .cyan()
            .bold()
    );

    let report = backup::prune_backups(&dir, keep, prefix, dry_run)?;
    let verb = if dry_run { "[DRY RUN] Would remove" } else { "Removed" };
    for path in &report.removed {
        println!("   {} {}", verb.dimmed(), path.display());
    }
    println!(
        "{}",
        format!(
            "✓ Kept {}, {} {}",
            report.kept.len(),
            if dry_run { "would remove" } else { "removed" },
            report.removed.len()
        )
        .green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn update_args(extra: &[&str]) -> UpdateArgs {
        let argv: Vec<&str> = ["wpfleet", "update"].into_iter().chain(extra.iter().copied()).collect();
        let Commands::Update(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected update");
        };
        args
    }

    #[test]
    fn run_without_targets_still_writes_the_report() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let out_arg = out.display().to_string();
        let args = update_args(&[
            "--targets",
            "/definitely/missing/site",
            "--print-results",
            "--report-dir",
            &out_arg,
            "-y",
        ]);

        let code = execute_update(&FleetConfig::default(), args).unwrap();
        assert_eq!(code, 0);

        let body = fs::read_to_string(out.join("update-results.md")).unwrap();
        assert!(body.contains(report::NO_CHECKS));
    }

    #[test]
    fn run_without_targets_writes_nothing_unless_asked() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let out_arg = out.display().to_string();
        let args = update_args(&["--targets", "/definitely/missing/site", "--report-dir", &out_arg]);

        assert_eq!(execute_update(&FleetConfig::default(), args).unwrap(), 0);
        assert!(!out.join("update-results.md").exists());
    }

    #[test]
    fn system_output_directories_are_refused() {
        for flag in ["--backup-dir", "--report-dir"] {
            let args = update_args(&["--targets", "/definitely/missing/site", flag, "/etc/wpfleet"]);
            let err = execute_update(&FleetConfig::default(), args).unwrap_err();
            assert!(matches!(err, FleetError::Precondition(_)), "{flag}");
        }
    }

    #[test]
    fn system_directory_in_config_is_refused_too() {
        let config = FleetConfig {
            backup_dir: Some(PathBuf::from("/proc/backups")),
            ..FleetConfig::default()
        };
        let args = update_args(&["--targets", "/definitely/missing/site"]);
        assert!(matches!(
            execute_update(&config, args),
            Err(FleetError::Precondition(_))
        ));
    }
}
