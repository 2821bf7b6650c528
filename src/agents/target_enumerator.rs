use crate::agents::command_runner::CommandRunner;
use crate::error::Result;
use crate::model::Target;
use crate::utils::{PathValidator, console, slug};
use crate::wordpress::DockerCli;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const WP_CONFIG: &str = "wp-config.php";
const MAX_DEPTH: usize = 3;

/// Where the list of targets comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Scan a parent directory for `wp-config.php`.
    Directory(PathBuf),
    /// `docker ps`, filtered by name prefix or compose service label.
    Containers,
    /// Paths or container names given on the command line.
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct EnumeratorOptions {
    pub container_prefix: String,
    pub service_label: Option<String>,
    pub subdir: Option<PathBuf>,
    pub exclude: Vec<String>,
}

/// Produces the ordered, de-duplicated list of sites or containers for a run.
pub struct TargetEnumerator<'a> {
    runner: &'a dyn CommandRunner,
    options: EnumeratorOptions,
}

impl<'a> TargetEnumerator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, options: EnumeratorOptions) -> Self {
        Self { runner, options }
    }

    /// Failing to obtain the list is fatal; an empty list is not.
    pub fn enumerate(&self, source: &TargetSource) -> Result<Vec<Target>> {
        let targets = match source {
            TargetSource::Directory(root) => self.from_directory(root)?,
            TargetSource::Containers => self.from_docker()?,
            TargetSource::Explicit(entries) => self.from_explicit(entries),
        };

        let mut seen = HashSet::new();
        let mut targets: Vec<Target> = targets
            .into_iter()
            .filter(|t| !self.is_excluded(t))
            .filter(|t| seen.insert(t.identity()))
            .collect();
        assign_unique_slugs(&mut targets);
        Ok(targets)
    }

    fn is_excluded(&self, target: &Target) -> bool {
        self.options.exclude.iter().any(|ex| {
            ex == &target.name
                || ex == &target.slug
                || target.container.as_deref() == Some(ex.as_str())
        })
    }

    fn from_directory(&self, root: &Path) -> Result<Vec<Target>> {
        let root = PathValidator::validate_base_dir(root)?;
        let mut sites = Vec::new();
        collect_wp_configs(&root, 1, &mut sites)?;

        let mut site_dirs: Vec<PathBuf> = sites.into_iter().map(normalize_site_dir).collect();
        site_dirs.sort();
        site_dirs.dedup();

        Ok(site_dirs
            .into_iter()
            .filter_map(|dir| self.directory_target(dir))
            .collect())
    }

    fn directory_target(&self, dir: PathBuf) -> Option<Target> {
        let basename = dir.file_name()?.to_string_lossy().into_owned();
        let container = slug::container_name_for_site(&basename, &self.options.container_prefix);
        let mut target = Target::directory(dir, Some(container));

        if let Some(subdir) = &self.options.subdir {
            let base = target.path.clone()?;
            match PathValidator::validate_subdir(&base, subdir) {
                Ok(_) => target.subdir = Some(subdir.clone()),
                Err(e) => {
                    console::warn(format!("Skipping {}: {}", base.display(), e));
                    return None;
                }
            }
        }

        Some(target)
    }

    fn from_docker(&self) -> Result<Vec<Target>> {
        let docker = DockerCli::new(self.runner);
        let entries = docker.ps()?;

        Ok(entries
            .into_iter()
            .filter(|entry| match &self.options.service_label {
                Some(label) => entry.service.as_deref() == Some(label.as_str()),
                None => entry.name.starts_with(&self.options.container_prefix),
            })
            .map(|entry| Target::container(entry.name))
            .collect())
    }

    fn from_explicit(&self, entries: &[String]) -> Vec<Target> {
        entries
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .filter_map(|entry| {
                if !entry.contains('/') {
                    return Some(Target::container(entry));
                }

                let path = Path::new(entry);
                match path.canonicalize() {
                    Ok(canonical) if canonical.is_dir() => self.directory_target(canonical),
                    _ => {
                        console::warn(format!("Skipping '{}': path does not exist", entry));
                        None
                    }
                }
            })
            .collect()
    }
}

/// Collects directories holding `wp-config.php`, like `find -maxdepth 3`.
fn collect_wp_configs(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_file() && entry.file_name() == WP_CONFIG {
            found.push(dir.to_path_buf());
        } else if file_type.is_dir() {
            if let Err(e) = collect_wp_configs(&path, depth + 1, found) {
                console::verbose(format!("cannot read {}: {}", path.display(), e));
            }
        }
    }

    Ok(())
}

/// Slugs name report and backup paths, so they must not collide.
///
/// Directory sites sharing a basename take their parent directory as a
/// qualifier (`clienta_blog_com`); anything still colliding gets a counter.
fn assign_unique_slugs(targets: &mut [Target]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for target in targets.iter() {
        *counts.entry(target.slug.clone()).or_default() += 1;
    }

    for target in targets.iter_mut() {
        if counts.get(&target.slug).copied().unwrap_or(0) < 2 {
            continue;
        }
        let parent = target
            .path
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::file_name);
        if let Some(parent) = parent {
            target.slug = slug::sanitize(&format!("{}_{}", parent.to_string_lossy(), target.name));
        }
    }

    let mut used = HashSet::new();
    for target in targets.iter_mut() {
        let base = target.slug.clone();
        let mut n = 2;
        while !used.insert(target.slug.clone()) {
            target.slug = format!("{base}_{n}");
            n += 1;
        }
    }
}

/// `/srv/example.com/www` and `/srv/example.com` name the same site.
fn normalize_site_dir(dir: PathBuf) -> PathBuf {
    if dir.file_name().is_some_and(|n| n == "www") {
        if let Some(parent) = dir.parent() {
            return parent.to_path_buf();
        }
    }
    dir
}
