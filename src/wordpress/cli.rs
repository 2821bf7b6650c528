use crate::agents::command_runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{FleetError, Result};
use crate::wordpress::version;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use url::Url;

pub const WP_BINARY: &str = "wp";

/// Where `wp` runs for a given target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WpExecutor {
    /// `docker exec [-u user] <container> wp ...`
    Docker {
        container: String,
        user: Option<String>,
        wp_path: Option<String>,
    },
    /// `ssh <host> wp --path=<wp_path> ...`
    Ssh { host: String, wp_path: String },
    /// `wp --path=<wp_path> ...` on this host.
    Local { wp_path: PathBuf },
}

impl WpExecutor {
    pub fn command(&self, wp_args: &[&str]) -> CommandSpec {
        let spec = match self {
            WpExecutor::Docker {
                container, user, ..
            } => {
                let mut spec = CommandSpec::new("docker").arg("exec");
                if let Some(user) = user {
                    spec = spec.args(["-u", user.as_str()]);
                }
                spec.args([container.as_str(), WP_BINARY])
            }
            WpExecutor::Ssh { host, .. } => CommandSpec::new("ssh").args([host.as_str(), WP_BINARY]),
            WpExecutor::Local { .. } => CommandSpec::new(WP_BINARY),
        };

        let path_arg = match self {
            WpExecutor::Docker { wp_path, .. } => wp_path.as_ref().map(|p| format!("--path={p}")),
            WpExecutor::Ssh { wp_path, .. } => Some(format!("--path={wp_path}")),
            WpExecutor::Local { wp_path } => Some(format!("--path={}", wp_path.display())),
        };

        spec.args(path_arg)
            .args(wp_args.iter().copied())
            .arg("--allow-root")
    }

    /// External binary that must be present on this host.
    pub fn required_tool(&self) -> &'static str {
        match self {
            WpExecutor::Docker { .. } => "docker",
            WpExecutor::Ssh { .. } => "ssh",
            WpExecutor::Local { .. } => WP_BINARY,
        }
    }
}

/// `update` / `auto_update` fields appear as strings or booleans depending on the WP-CLI version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlagOrText {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstalledPlugin {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub update: Option<FlagOrText>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub auto_update: Option<FlagOrText>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpdateProbeRow {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    update_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpdateResultRow {
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DoctorListRow {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DoctorCheckRow {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Result of a `--dry-run` update probe for one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateProbe {
    pub needs_update: bool,
    pub current_version: Option<String>,
    pub available_version: Option<String>,
}

/// Per-slug outcome of a real `wp plugin update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedPlugin {
    pub slug: String,
    pub success: bool,
    pub status: String,
}

/// Typed wrapper around the WP-CLI commands the fleet tools rely on.
pub struct WpCli<'a> {
    runner: &'a dyn CommandRunner,
    executor: WpExecutor,
}

impl<'a> WpCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, executor: WpExecutor) -> Self {
        Self { runner, executor }
    }

    pub fn executor(&self) -> &WpExecutor {
        &self.executor
    }

    /// Command line for `wp <args>` against this target, without running it.
    pub fn command(&self, args: &[&str]) -> CommandSpec {
        self.executor.command(args)
    }

    fn run(&self, args: &[&str]) -> Result<(CommandSpec, CommandOutput)> {
        let spec = self.executor.command(args);
        let output = self.runner.run(&spec)?;
        Ok((spec, output))
    }

    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let (spec, output) = self.run(args)?;
        Ok(output.into_success(&spec)?.stdout)
    }

    /// `wp plugin list --field=name`
    pub fn plugin_names(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["plugin", "list", "--field=name"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// `wp plugin list --format=json`, raw stdout plus the parsed rows.
    pub fn plugin_list(&self) -> Result<(String, Vec<InstalledPlugin>)> {
        let stdout = self.run_checked(&["plugin", "list", "--format=json"])?;
        let plugins = parse_json_payload(&stdout)?.unwrap_or_default();
        Ok((stdout, plugins))
    }

    /// `wp plugin update <slug> --dry-run --format=json`
    ///
    /// WP-CLI prints nothing parseable when no update is available, which is
    /// treated as up to date.
    pub fn probe_update(&self, slug: &str) -> Result<UpdateProbe> {
        let stdout = self.run_checked(&["plugin", "update", slug, "--dry-run", "--format=json"])?;
        let rows: Vec<UpdateProbeRow> = parse_json_payload(&stdout)?.unwrap_or_default();

        let row = rows.into_iter().find(|r| r.name == slug);
        let Some(row) = row else {
            return Ok(UpdateProbe {
                needs_update: false,
                current_version: None,
                available_version: None,
            });
        };

        let needs_update = match (&row.version, &row.update_version) {
            (Some(current), Some(available)) => version::is_newer(available, current),
            (None, Some(available)) => !available.trim().is_empty(),
            _ => false,
        };

        Ok(UpdateProbe {
            needs_update,
            current_version: row.version,
            available_version: row.update_version,
        })
    }

    /// `wp plugin update <slugs...> --format=json`
    ///
    /// A nonzero exit with a readable JSON body still yields per-slug results;
    /// slugs missing from the body are reported as failed.
    pub fn update_plugins(&self, slugs: &[&str]) -> Result<Vec<UpdatedPlugin>> {
        let mut args = vec!["plugin", "update"];
        args.extend_from_slice(slugs);
        args.push("--format=json");

        let (spec, output) = self.run(&args)?;
        let rows: Option<Vec<UpdateResultRow>> = parse_json_payload(&output.stdout).ok().flatten();

        let Some(rows) = rows else {
            output.into_success(&spec)?;
            return Ok(slugs
                .iter()
                .map(|slug| UpdatedPlugin {
                    slug: slug.to_string(),
                    success: true,
                    status: "Updated".to_string(),
                })
                .collect());
        };

        Ok(slugs
            .iter()
            .map(|slug| match rows.iter().find(|r| r.name == *slug) {
                Some(row) => UpdatedPlugin {
                    slug: slug.to_string(),
                    success: row.status.eq_ignore_ascii_case("updated"),
                    status: row.status.clone(),
                },
                None => UpdatedPlugin {
                    slug: slug.to_string(),
                    success: false,
                    status: if output.success() {
                        "missing from update output".to_string()
                    } else {
                        output.failure_message()
                    },
                },
            })
            .collect())
    }

    /// `wp doctor list --format=json`
    pub fn doctor_list(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["doctor", "list", "--format=json"])?;
        let rows: Vec<DoctorListRow> = parse_json_payload(&stdout)?.ok_or_else(|| {
            FleetError::Parse("wp doctor list returned no JSON payload".to_string())
        })?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    /// `wp doctor check <name> --format=json`
    ///
    /// `wp doctor` exits nonzero when a check reports an error, so the JSON body
    /// is authoritative whenever it parses.
    pub fn doctor_check(&self, name: &str) -> Result<Vec<DoctorCheckRow>> {
        let (spec, output) = self.run(&["doctor", "check", name, "--format=json"])?;
        match parse_json_payload::<Vec<DoctorCheckRow>>(&output.stdout) {
            Ok(Some(rows)) if !rows.is_empty() => Ok(rows),
            Ok(_) => {
                output.clone().into_success(&spec)?;
                Err(FleetError::Parse(format!(
                    "wp doctor check {name} returned no results"
                )))
            }
            Err(e) => {
                output.into_success(&spec)?;
                Err(e)
            }
        }
    }

    /// `wp option get home`, validated as an http(s) URL.
    pub fn home_url(&self) -> Result<Url> {
        let stdout = self.run_checked(&[
            "option",
            "get",
            "home",
            "--skip-plugins",
            "--skip-themes",
        ])?;
        parse_home_url(&stdout)
    }

    /// `wp plugin activate <slug>`
    pub fn activate_plugin(&self, slug: &str) -> Result<String> {
        let stdout = self.run_checked(&["plugin", "activate", slug])?;
        Ok(stdout.trim().to_string())
    }
}

pub fn parse_home_url(raw: &str) -> Result<Url> {
    let value = raw.trim();
    let url = Url::parse(value)
        .map_err(|e| FleetError::Parse(format!("'{value}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FleetError::Parse(format!(
            "'{value}' has unsupported scheme '{other}'"
        ))),
    }
}

/// Deserializes the JSON document in WP-CLI stdout.
///
/// PHP notices are sometimes printed ahead of the payload, so parsing starts
/// at the first `[` or `{`. Returns `Ok(None)` when there is no payload at all.
pub fn parse_json_payload<T: DeserializeOwned>(stdout: &str) -> Result<Option<T>> {
    let Some(start) = stdout.find(['[', '{']) else {
        return Ok(None);
    };
    let payload = stdout[start..].trim();
    Ok(Some(serde_json::from_str(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command_runner::testing::FakeRunner;

    fn docker(container: &str) -> WpExecutor {
        WpExecutor::Docker {
            container: container.to_string(),
            user: None,
            wp_path: None,
        }
    }

    #[test]
    fn executors_build_expected_command_lines() {
        assert_eq!(
            docker("wp_blog").command(&["plugin", "list"]).display(),
            "docker exec wp_blog wp plugin list --allow-root"
        );

        let with_user = WpExecutor::Docker {
            container: "wp_blog".into(),
            user: Some("root".into()),
            wp_path: Some("/var/www/html".into()),
        };
        assert_eq!(
            with_user.command(&["option", "get", "home"]).display(),
            "docker exec -u root wp_blog wp --path=/var/www/html option get home --allow-root"
        );

        let local = WpExecutor::Local {
            wp_path: PathBuf::from("/srv/example.com"),
        };
        assert_eq!(
            local.command(&["plugin", "list"]).display(),
            "wp --path=/srv/example.com plugin list --allow-root"
        );

        let ssh = WpExecutor::Ssh {
            host: "web1".into(),
            wp_path: "/var/www/html".into(),
        };
        assert_eq!(
            ssh.command(&["doctor", "list"]).display(),
            "ssh web1 wp --path=/var/www/html doctor list --allow-root"
        );
    }

    #[test]
    fn plugin_names_skips_blank_lines() {
        let runner = FakeRunner::new().respond(
            "plugin list --field=name",
            CommandOutput::ok("akismet\n\nhello-dolly\n"),
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        assert_eq!(wp.plugin_names().unwrap(), vec!["akismet", "hello-dolly"]);
    }

    #[test]
    fn probe_detects_newer_update_version() {
        let runner = FakeRunner::new().respond(
            "plugin update akismet --dry-run",
            CommandOutput::ok(
                r#"[{"name":"akismet","status":"active","version":"4.1","update_version":"5.0"}]"#,
            ),
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        let probe = wp.probe_update("akismet").unwrap();
        assert!(probe.needs_update);
        assert_eq!(probe.available_version.as_deref(), Some("5.0"));
    }

    #[test]
    fn probe_without_payload_means_up_to_date() {
        let runner = FakeRunner::new().respond(
            "--dry-run",
            CommandOutput::ok("Success: Plugin already updated.\n"),
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        assert!(!wp.probe_update("akismet").unwrap().needs_update);
    }

    #[test]
    fn probe_fails_on_nonzero_exit() {
        let runner =
            FakeRunner::new().respond("--dry-run", CommandOutput::failed(1, "Error: db down"));
        let wp = WpCli::new(&runner, docker("wp_blog"));
        assert!(wp.probe_update("akismet").is_err());
    }

    #[test]
    fn batch_update_reads_per_slug_status() {
        let runner = FakeRunner::new().respond(
            "plugin update akismet jetpack --format=json",
            CommandOutput {
                status: Some(1),
                stdout: r#"[{"name":"akismet","old_version":"4.1","new_version":"5.0","status":"Updated"},{"name":"jetpack","status":"Error"}]"#.into(),
                stderr: "Error: Only updated 1 of 2 plugins.".into(),
            },
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        let results = wp.update_plugins(&["akismet", "jetpack"]).unwrap();
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].status, "Error");
    }

    #[test]
    fn doctor_check_prefers_json_over_exit_code() {
        let runner = FakeRunner::new().respond(
            "doctor check core-update",
            CommandOutput {
                status: Some(1),
                stdout: r#"[{"name":"core-update","status":"error","message":"WordPress is out of date"}]"#.into(),
                stderr: String::new(),
            },
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        let rows = wp.doctor_check("core-update").unwrap();
        assert_eq!(rows[0].status, "error");
    }

    #[test]
    fn doctor_check_without_payload_is_an_error() {
        let runner = FakeRunner::new().respond("doctor check", CommandOutput::ok("garbage"));
        let wp = WpCli::new(&runner, docker("wp_blog"));
        assert!(wp.doctor_check("core-update").is_err());
    }

    #[test]
    fn plugin_list_accepts_bool_and_string_flags() {
        let runner = FakeRunner::new().respond(
            "plugin list --format=json",
            CommandOutput::ok(
                r#"Notice: something
[{"name":"akismet","status":"active","update":"available","version":"4.1","auto_update":"off"},
 {"name":"jetpack","status":"inactive","update":false,"version":"12.0","auto_update":true}]"#,
            ),
        );
        let wp = WpCli::new(&runner, docker("wp_blog"));
        let (_, plugins) = wp.plugin_list().unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[1].update, Some(FlagOrText::Flag(false)));
    }

    #[test]
    fn home_url_must_be_http() {
        assert!(parse_home_url("https://example.com\n").is_ok());
        assert!(parse_home_url("ftp://example.com").is_err());
        assert!(parse_home_url("Error: not installed").is_err());
    }
}
