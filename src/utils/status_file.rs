use crate::error::Result;
use crate::model::HealthCheckResult;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const PLUGIN_UPDATES_FILE: &str = "plugin-updates.txt";
pub const HEALTH_LOG_FILE: &str = "health-check-results.log";

/// Writes `slug|flag` lines, one per probed plugin.
pub fn write_plugin_updates(dir: &Path, entries: &[(String, bool)]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let body: String = entries
        .iter()
        .map(|(slug, needs)| format!("{}|{}\n", slug, u8::from(*needs)))
        .collect();
    fs::write(dir.join(PLUGIN_UPDATES_FILE), body)?;
    Ok(())
}

/// Parses a status file body and returns the slugs flagged as needing an update.
///
/// Malformed lines are ignored.
pub fn plugins_needing_update(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let (slug, flag) = line.trim().split_once('|')?;
            let slug = slug.trim();
            (!slug.is_empty() && flag.trim() == "1").then(|| slug.to_string())
        })
        .collect()
}

pub fn append_health_result(dir: &Path, result: &HealthCheckResult) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(HEALTH_LOG_FILE))?;
    writeln!(
        file,
        "{}: {} - {}",
        result.name,
        result.status.as_str(),
        result.message
    )?;
    Ok(())
}

pub fn read_plugins_needing_update(dir: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(dir.join(PLUGIN_UPDATES_FILE))?;
    Ok(plugins_needing_update(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckStatus;
    use tempfile::tempdir;

    #[test]
    fn only_flagged_plugins_need_update() {
        let needing = plugins_needing_update("pluginA|1\npluginB|0");
        assert_eq!(needing, vec!["pluginA".to_string()]);
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let needing = plugins_needing_update("garbage\n|1\nakismet | 1 \n\n");
        assert_eq!(needing, vec!["akismet".to_string()]);
    }

    #[test]
    fn status_file_is_written_and_read_back() {
        let dir = tempdir().unwrap();
        let entries = vec![
            ("akismet".to_string(), true),
            ("hello-dolly".to_string(), false),
        ];
        write_plugin_updates(dir.path(), &entries).unwrap();

        let raw = fs::read_to_string(dir.path().join(PLUGIN_UPDATES_FILE)).unwrap();
        assert_eq!(raw, "akismet|1\nhello-dolly|0\n");
        assert_eq!(
            read_plugins_needing_update(dir.path()).unwrap(),
            vec!["akismet".to_string()]
        );
    }

    #[test]
    fn health_log_appends_lines() {
        let dir = tempdir().unwrap();
        let first = HealthCheckResult::new("core-update", CheckStatus::Success, "up to date");
        let second = HealthCheckResult::new("cron-count", CheckStatus::Warning, "too many");
        append_health_result(dir.path(), &first).unwrap();
        append_health_result(dir.path(), &second).unwrap();

        let log = fs::read_to_string(dir.path().join(HEALTH_LOG_FILE)).unwrap();
        assert_eq!(
            log,
            "core-update: success - up to date\ncron-count: warning - too many\n"
        );
    }
}
