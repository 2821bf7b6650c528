use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A single WordPress installation, addressed by host path, container, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub slug: String,
    pub path: Option<PathBuf>,
    pub container: Option<String>,
    pub subdir: Option<PathBuf>,
}

impl Target {
    pub fn container(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            slug: crate::utils::slug::sanitize(&name),
            container: Some(name.clone()),
            name,
            path: None,
            subdir: None,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, container: Option<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            slug: crate::utils::slug::sanitize(&name),
            name,
            path: Some(path),
            container,
            subdir: None,
        }
    }

    /// What makes two targets the same site: the host path for directories,
    /// otherwise the container name.
    pub fn identity(&self) -> String {
        match (&self.path, &self.container) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(container)) => container.clone(),
            (None, None) => self.name.clone(),
        }
    }

    /// Host path of the WordPress root (target path plus optional subdir).
    pub fn wp_root(&self) -> Option<PathBuf> {
        self.path.as_ref().map(|p| match &self.subdir {
            Some(sub) => p.join(sub),
            None => p.clone(),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.container, &self.path) {
            (Some(c), Some(p)) if c != &self.name => write!(f, "{} ({})", p.display(), c),
            _ => f.write_str(&self.name),
        }
    }
}

/// Closed set of health check outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    Warning,
    Error,
    Skipped,
    FailedToRun,
    Unknown,
}

impl CheckStatus {
    pub const ALL: [CheckStatus; 6] = [
        CheckStatus::Success,
        CheckStatus::Warning,
        CheckStatus::Error,
        CheckStatus::Skipped,
        CheckStatus::FailedToRun,
        CheckStatus::Unknown,
    ];

    /// Maps the `status` field emitted by `wp doctor check`.
    pub fn from_doctor(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => CheckStatus::Success,
            "warning" => CheckStatus::Warning,
            "error" => CheckStatus::Error,
            _ => CheckStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Warning => "warning",
            CheckStatus::Error => "error",
            CheckStatus::Skipped => "skipped",
            CheckStatus::FailedToRun => "failed_to_run",
            CheckStatus::Unknown => "unknown",
        }
    }

    /// Counts toward the run's error total.
    pub fn is_error(&self) -> bool {
        matches!(self, CheckStatus::Error | CheckStatus::FailedToRun)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl HealthCheckResult {
    pub fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Update needed but not attempted yet.
    Pending,
    UpToDate,
    Updated,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginUpdateRecord {
    pub slug: String,
    pub needs_update: bool,
    pub current_version: Option<String>,
    pub available_version: Option<String>,
    pub outcome: UpdateOutcome,
}

impl PluginUpdateRecord {
    pub fn up_to_date(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            needs_update: false,
            current_version: None,
            available_version: None,
            outcome: UpdateOutcome::UpToDate,
        }
    }
}

/// Everything the executor learned about one target, returned by value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetResult {
    pub target: Option<Target>,
    pub plugins: Vec<PluginUpdateRecord>,
    pub checks: Vec<HealthCheckResult>,
    pub step_errors: Vec<String>,
    pub backup: Option<PathBuf>,
}

impl TargetResult {
    pub fn new(target: Target) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn target_name(&self) -> &str {
        self.target.as_ref().map(|t| t.name.as_str()).unwrap_or("")
    }

    pub fn plugins_needing_update(&self) -> impl Iterator<Item = &PluginUpdateRecord> {
        self.plugins.iter().filter(|p| p.needs_update)
    }

    pub fn successful(&self) -> impl Iterator<Item = &PluginUpdateRecord> {
        self.plugins
            .iter()
            .filter(|p| p.outcome == UpdateOutcome::Updated)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.plugins.iter().filter_map(|p| match &p.outcome {
            UpdateOutcome::Failed(msg) => Some((p.slug.as_str(), msg.as_str())),
            _ => None,
        })
    }

    pub fn record_step_error(&mut self, step: &str, message: impl fmt::Display) {
        self.step_errors.push(format!("{step}: {message}"));
    }
}
