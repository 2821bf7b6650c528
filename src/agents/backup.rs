use crate::agents::command_runner::{CommandRunner, CommandSpec};
use crate::error::{FleetError, Result};
use crate::model::Target;
use crate::utils::console;
use crate::wordpress::DockerCli;
use clap::ValueEnum;
use colored::Colorize;
use jiff::Zoned;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PLUGINS_SUBPATH: &str = "wp-content/plugins";
pub const DEFAULT_CONTAINER_WP_PATH: &str = "/var/www/html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackupFormat {
    /// Recursive directory copy
    Copy,
    /// Gzipped tarball
    Tar,
}

/// Snapshots a target's plugins directory before it is modified.
pub struct BackupAgent<'a> {
    runner: &'a dyn CommandRunner,
    backup_dir: PathBuf,
    format: BackupFormat,
    dry_run: bool,
}

impl<'a> BackupAgent<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        backup_dir: impl Into<PathBuf>,
        format: BackupFormat,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            backup_dir: backup_dir.into(),
            format,
            dry_run,
        }
    }

    /// Backs up the plugins directory and returns the created path.
    ///
    /// Returns `Ok(None)` in dry-run mode.
    pub fn backup(&self, target: &Target, container_wp_path: &str) -> Result<Option<PathBuf>> {
        let destination = self
            .backup_dir
            .join(backup_name(&target.slug, &timestamp()));

        match target.wp_root() {
            Some(root) => self.backup_host(&root.join(PLUGINS_SUBPATH), destination),
            None => {
                let container = target.container.as_deref().ok_or_else(|| {
                    FleetError::Precondition(format!("target '{}' has no path or container", target.name))
                })?;
                let source = format!(
                    "{}:{}/{}",
                    container,
                    container_wp_path.trim_end_matches('/'),
                    PLUGINS_SUBPATH
                );
                self.backup_container(&source, destination)
            }
        }
    }

    fn backup_host(&self, source: &Path, destination: PathBuf) -> Result<Option<PathBuf>> {
        if !source.is_dir() {
            return Err(FleetError::Precondition(format!(
                "plugins directory '{}' not found",
                source.display()
            )));
        }

        match self.format {
            BackupFormat::Copy => {
                if self.dry_run {
                    println!(
                        "   {} copy {} -> {}",
                        "[DRY RUN] Would".dimmed(),
                        source.display(),
                        destination.display()
                    );
                    return Ok(None);
                }
                fs::create_dir_all(&self.backup_dir)?;
                copy_dir_recursive(source, &destination)?;
                Ok(Some(destination))
            }
            BackupFormat::Tar => {
                let archive = tar_path(&destination);
                let parent = source.parent().unwrap_or(source);
                let spec = CommandSpec::new("tar").args([
                    "-czf".to_string(),
                    archive.display().to_string(),
                    "-C".to_string(),
                    parent.display().to_string(),
                    "plugins".to_string(),
                ]);
                if self.dry_run {
                    println!("   {} {}", "[DRY RUN] Would run:".dimmed(), spec.display());
                    return Ok(None);
                }
                fs::create_dir_all(&self.backup_dir)?;
                self.runner.run(&spec)?.into_success(&spec)?;
                Ok(Some(archive))
            }
        }
    }

    fn backup_container(&self, source: &str, destination: PathBuf) -> Result<Option<PathBuf>> {
        let dest = destination.display().to_string();
        if self.dry_run {
            println!(
                "   {} {}",
                "[DRY RUN] Would run:".dimmed(),
                DockerCli::copy_command(source, &dest).display()
            );
            return Ok(None);
        }
        if self.format == BackupFormat::Tar {
            console::verbose("container backups are stored as plain copies");
        }
        fs::create_dir_all(&self.backup_dir)?;
        DockerCli::new(self.runner).copy(source, &dest)?;
        Ok(Some(destination))
    }
}

fn timestamp() -> String {
    Zoned::now().strftime("%Y%m%d-%H%M%S").to_string()
}

pub fn backup_name(slug: &str, timestamp: &str) -> String {
    format!("{slug}-plugins-{timestamp}")
}

fn tar_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".tar.gz");
    PathBuf::from(name)
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = destination.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            console::verbose(format!("skipping symlink {}", entry.path().display()));
        }
    }
    Ok(())
}

fn backup_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<slug>.+)-plugins-(?P<ts>\d{8}-\d{6})(?:\.tar\.gz)?$")
            .expect("static regex")
    })
}

/// Outcome of a rotation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Keeps the `keep` newest backups per site slug and deletes the rest.
///
/// Entries that don't follow the `<slug>-plugins-<timestamp>` naming are left alone.
pub fn prune_backups(
    dir: &Path,
    keep: usize,
    slug_filter: Option<&str>,
    dry_run: bool,
) -> Result<PruneReport> {
    let mut groups: BTreeMap<String, Vec<(String, PathBuf)>> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = backup_pattern().captures(&name) else {
            continue;
        };
        let slug = caps["slug"].to_string();
        if slug_filter.is_some_and(|f| f != slug) {
            continue;
        }
        groups
            .entry(slug)
            .or_default()
            .push((caps["ts"].to_string(), entry.path()));
    }

    let mut report = PruneReport::default();
    for (_, mut backups) in groups {
        backups.sort_by(|a, b| b.0.cmp(&a.0));
        for (index, (_, path)) in backups.into_iter().enumerate() {
            if index < keep {
                report.kept.push(path);
                continue;
            }
            if !dry_run {
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
            report.removed.push(path);
        }
    }

    report.kept.sort();
    report.removed.sort();
    Ok(report)
}
