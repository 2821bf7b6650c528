// Run aggregation and the Markdown / HTML renderers.
//
// The renderers are pure functions of a RunReport; only `write_report`
// touches the filesystem.

pub mod html;
pub mod markdown;

use crate::error::{FleetError, Result};
use crate::model::{CheckStatus, TargetResult};
use clap::ValueEnum;
use jiff::Timestamp;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_BASENAME: &str = "update-results";
pub const NO_CHECKS: &str = "No checks were run.";
pub const NONE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    #[value(name = "md")]
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", REPORT_BASENAME, self.extension())
    }
}

/// Fleet-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub targets: usize,
    pub needing_update: usize,
    pub updated: usize,
    pub failed: usize,
    pub step_errors: usize,
    pub checks: BTreeMap<CheckStatus, usize>,
    pub error_count: usize,
}

impl RunSummary {
    pub fn total_checks(&self) -> usize {
        self.checks.values().sum()
    }

    pub fn checks_with(&self, status: CheckStatus) -> usize {
        self.checks.get(&status).copied().unwrap_or(0)
    }
}

/// Aggregated results of one `update` run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generated_at: Timestamp,
    pub dry_run: bool,
    pub results: Vec<TargetResult>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn from_results(results: Vec<TargetResult>, dry_run: bool, generated_at: Timestamp) -> Self {
        let mut summary = RunSummary {
            targets: results.len(),
            ..RunSummary::default()
        };

        for result in &results {
            summary.needing_update += result.plugins_needing_update().count();
            summary.updated += result.successful().count();
            summary.failed += result.failed().count();
            summary.step_errors += result.step_errors.len();
            for check in &result.checks {
                *summary.checks.entry(check.status).or_insert(0) += 1;
                if check.status.is_error() {
                    summary.error_count += 1;
                }
            }
        }

        Self {
            generated_at,
            dry_run,
            results,
            summary,
        }
    }

    /// 1 when an update failed, a step errored, or a check errored and
    /// check errors are not being ignored.
    pub fn exit_code(&self, ignore_check_errors: bool) -> i32 {
        let s = &self.summary;
        if s.failed > 0 || s.step_errors > 0 {
            return 1;
        }
        if s.error_count > 0 && !ignore_check_errors {
            return 1;
        }
        0
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => markdown::render(self),
            ReportFormat::Html => html::render(self),
        }
    }

    pub(crate) fn generated_label(&self) -> String {
        let mut label = self.generated_at.strftime("%Y-%m-%d %H:%M:%S UTC").to_string();
        if self.dry_run {
            label.push_str(" (dry run)");
        }
        label
    }
}

/// Writes `update-results.<ext>` into `dir`, creating it if needed.
pub fn write_report(report: &RunReport, format: ReportFormat, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| {
        FleetError::Report(format!("cannot create '{}': {}", dir.display(), e))
    })?;
    let path = dir.join(format.file_name());
    fs::write(&path, report.render(format))
        .map_err(|e| FleetError::Report(format!("cannot write '{}': {}", path.display(), e)))?;
    Ok(path)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{
        CheckStatus, HealthCheckResult, PluginUpdateRecord, Target, TargetResult, UpdateOutcome,
    };

    pub fn mixed_result() -> TargetResult {
        let mut result = TargetResult::new(Target::container("wp_blog"));
        result.plugins = vec![
            PluginUpdateRecord {
                slug: "akismet".into(),
                needs_update: true,
                current_version: Some("4.1".into()),
                available_version: Some("5.0".into()),
                outcome: UpdateOutcome::Updated,
            },
            PluginUpdateRecord {
                slug: "woocommerce".into(),
                needs_update: true,
                current_version: Some("7.0".into()),
                available_version: Some("8.0".into()),
                outcome: UpdateOutcome::Failed("Download failed <timeout>".into()),
            },
            PluginUpdateRecord::up_to_date("hello-dolly"),
        ];
        result.checks = vec![
            HealthCheckResult::new("core-update", CheckStatus::Success, "WordPress is up to date"),
            HealthCheckResult::new("cron-count", CheckStatus::Warning, "Too many crons"),
            HealthCheckResult::new("cache-flush", CheckStatus::Skipped, "excluded by --exclude-checks"),
        ];
        result
    }
}
