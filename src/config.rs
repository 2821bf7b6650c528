use crate::error::{FleetError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "wpfleet.toml";
pub const DEFAULT_CONTAINER_PREFIX: &str = "wp_";
pub const DEFAULT_CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

/// Defaults shared by every subcommand, loaded from `wpfleet.toml`.
///
/// Command-line flags always win over values from the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    pub container_prefix: String,
    pub service_label: Option<String>,
    /// WordPress root inside the container, passed as `--path`.
    pub wp_path: Option<String>,
    pub docker_user: Option<String>,
    /// Run `wp` over SSH on this host for directory targets.
    pub ssh_host: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub jobs: usize,
    pub priority_plugins: Vec<String>,
    pub exclude_checks: Vec<String>,
    pub exclude_containers: Vec<String>,
    pub cloudflare: CloudflareConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            container_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
            service_label: None,
            wp_path: None,
            docker_user: None,
            ssh_host: None,
            backup_dir: None,
            report_dir: None,
            http_timeout_secs: 15,
            jobs: 1,
            priority_plugins: Vec::new(),
            exclude_checks: Vec::new(),
            exclude_containers: Vec::new(),
            cloudflare: CloudflareConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudflareConfig {
    pub api_token: Option<String>,
    pub api_base: String,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: DEFAULT_CLOUDFLARE_API.to_string(),
        }
    }
}

impl FleetConfig {
    /// Loads `explicit` if given (it must exist), otherwise `./wpfleet.toml`
    /// when present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(FleetError::Config(format!(
                        "config file '{}' not found",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FleetError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let config = Self::parse(&content)?;
        crate::utils::console::verbose(format!("loaded config from {}", path.display()));
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(FleetError::Config("jobs must be at least 1".to_string()));
        }
        if self.http_timeout_secs == 0 {
            return Err(FleetError::Config(
                "http_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Splits a `a,b|c` style list, trimming blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let config = FleetConfig::parse("jobs = 4\n").unwrap();
        assert_eq!(config.jobs, 4);
        assert_eq!(config.container_prefix, "wp_");
        assert_eq!(config.http_timeout_secs, 15);
        assert_eq!(config.cloudflare.api_base, DEFAULT_CLOUDFLARE_API);
    }

    #[test]
    fn parses_full_file() {
        let config = FleetConfig::parse(
            r#"
container_prefix = "site_"
service_label = "wordpress"
wp_path = "/var/www/html"
exclude_checks = ["core-update", "cache-flush"]
priority_plugins = ["woocommerce"]

[cloudflare]
api_token = "secret"
"#,
        )
        .unwrap();
        assert_eq!(config.service_label.as_deref(), Some("wordpress"));
        assert_eq!(config.exclude_checks, vec!["core-update", "cache-flush"]);
        assert_eq!(config.cloudflare.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_unknown_keys_and_zero_jobs() {
        assert!(matches!(
            FleetConfig::parse("bogus = 1").unwrap_err(),
            FleetError::Toml(_)
        ));
        assert!(matches!(
            FleetConfig::parse("jobs = 0").unwrap_err(),
            FleetError::Config(_)
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(FleetConfig::load(Some(&missing)).is_err());

        let present = dir.path().join("fleet.toml");
        fs::write(&present, "http_timeout_secs = 30").unwrap();
        assert_eq!(
            FleetConfig::load(Some(&present)).unwrap().http_timeout_secs,
            30
        );
    }

    #[test]
    fn split_list_accepts_commas_and_pipes() {
        assert_eq!(split_list(" a, b|c ,,"), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
