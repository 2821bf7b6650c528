use crate::error::{FleetError, Result};
use crate::model::{CheckStatus, HealthCheckResult};
use crate::wordpress::WpCli;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

pub const HTTP_CHECK_NAME: &str = "http-reachability";
pub const DOCTOR_CHECK_NAME: &str = "wp-doctor";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches a URL and reports the HTTP status code.
pub trait UrlProbe: Send + Sync {
    fn status(&self, url: &Url) -> Result<u16>;
}

/// Blocking GET with bounded timeouts. Redirects are not followed, so a
/// misconfigured `home` option shows up as a non-200 status.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .redirect(Policy::none())
            .user_agent(concat!("wpfleet/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl UrlProbe for HttpProbe {
    fn status(&self, url: &Url) -> Result<u16> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| FleetError::Http(format!("{url}: {e}")))?;
        Ok(response.status().as_u16())
    }
}

/// Which `wp doctor` checks to run and which to skip.
#[derive(Debug, Clone, Default)]
pub struct CheckSelection {
    /// Run exactly these instead of asking `wp doctor list`.
    pub only: Option<Vec<String>>,
    pub exclude: HashSet<String>,
}

impl CheckSelection {
    /// Parses `--exclude-checks`; `none` clears the list.
    pub fn with_exclusions(only: Option<Vec<String>>, exclude: &[String]) -> Self {
        let exclude = exclude
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
            .map(str::to_string)
            .collect();
        Self { only, exclude }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.contains(name)
    }
}

pub struct HealthCheckAgent<'w, 'r> {
    wp: &'w WpCli<'r>,
    selection: &'w CheckSelection,
}

impl<'w, 'r> HealthCheckAgent<'w, 'r> {
    pub fn new(wp: &'w WpCli<'r>, selection: &'w CheckSelection) -> Self {
        Self { wp, selection }
    }

    /// Runs every selected doctor check independently.
    ///
    /// Each attempted or excluded check yields at least one result line.
    pub fn run_doctor(&self) -> Vec<HealthCheckResult> {
        let names = match &self.selection.only {
            Some(names) => names.clone(),
            None => match self.wp.doctor_list() {
                Ok(names) => names,
                Err(e) => {
                    return vec![HealthCheckResult::new(
                        DOCTOR_CHECK_NAME,
                        CheckStatus::FailedToRun,
                        format!("could not list checks: {e}"),
                    )];
                }
            },
        };

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            if self.selection.is_excluded(&name) {
                results.push(HealthCheckResult::new(
                    name,
                    CheckStatus::Skipped,
                    "excluded by --exclude-checks",
                ));
                continue;
            }
            results.extend(self.run_one(&name));
        }
        results
    }

    fn run_one(&self, name: &str) -> Vec<HealthCheckResult> {
        match self.wp.doctor_check(name) {
            Ok(rows) => rows
                .into_iter()
                .map(|row| {
                    let status = CheckStatus::from_doctor(&row.status);
                    let message = if status == CheckStatus::Unknown && row.message.is_empty() {
                        format!("unrecognized status '{}'", row.status)
                    } else {
                        row.message
                    };
                    HealthCheckResult::new(row.name, status, message)
                })
                .collect(),
            Err(e) => vec![HealthCheckResult::new(
                name,
                CheckStatus::FailedToRun,
                e.to_string(),
            )],
        }
    }

    /// Requests the site's `home` URL and expects HTTP 200.
    pub fn run_http(&self, probe: &dyn UrlProbe, dry_run: bool) -> HealthCheckResult {
        if dry_run {
            return HealthCheckResult::new(HTTP_CHECK_NAME, CheckStatus::Skipped, "dry run");
        }

        let url = match self.wp.home_url() {
            Ok(url) => url,
            Err(e) => {
                return HealthCheckResult::new(
                    HTTP_CHECK_NAME,
                    CheckStatus::FailedToRun,
                    format!("could not determine home URL: {e}"),
                );
            }
        };

        match probe.status(&url) {
            Ok(200) => {
                HealthCheckResult::new(HTTP_CHECK_NAME, CheckStatus::Success, format!("HTTP 200 from {url}"))
            }
            Ok(code) => HealthCheckResult::new(
                HTTP_CHECK_NAME,
                CheckStatus::Error,
                format!("HTTP {code} from {url}"),
            ),
            Err(e) => HealthCheckResult::new(HTTP_CHECK_NAME, CheckStatus::Error, e.to_string()),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Answers every request with a fixed status and records the URLs.
    pub struct StaticProbe {
        pub code: u16,
        pub requested: Mutex<Vec<String>>,
    }

    impl StaticProbe {
        pub fn new(code: u16) -> Self {
            Self {
                code,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl UrlProbe for StaticProbe {
        fn status(&self, url: &Url) -> Result<u16> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticProbe;
    use super::*;
    use crate::agents::command_runner::CommandOutput;
    use crate::agents::command_runner::testing::FakeRunner;
    use crate::wordpress::WpExecutor;

    fn executor() -> WpExecutor {
        WpExecutor::Docker {
            container: "wp_blog".into(),
            user: None,
            wp_path: None,
        }
    }

    fn doctor_runner() -> FakeRunner {
        FakeRunner::new()
            .respond(
                "doctor list",
                CommandOutput::ok(
                    r#"[{"name":"core-update"},{"name":"cache-flush"},{"name":"cron-count"},{"name":"option-blog-public"}]"#,
                ),
            )
            .respond(
                "doctor check cron-count",
                CommandOutput::ok(r#"[{"name":"cron-count","status":"warning","message":"Too many crons"}]"#),
            )
            .respond(
                "doctor check option-blog-public",
                CommandOutput::failed(255, "PHP Fatal error"),
            )
    }

    #[test]
    fn exclusions_are_skipped_and_not_run() {
        let runner = doctor_runner();
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::with_exclusions(
            None,
            &["core-update".to_string(), "cache-flush".to_string()],
        );
        let results = HealthCheckAgent::new(&wp, &selection).run_doctor();

        let skipped: Vec<_> = results
            .iter()
            .filter(|r| r.status == CheckStatus::Skipped)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(skipped, vec!["core-update", "cache-flush"]);
        assert!(runner.calls_matching("doctor check core-update").is_empty());
        assert!(runner.calls_matching("doctor check cache-flush").is_empty());
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn check_that_cannot_run_fails_closed() {
        let runner = doctor_runner();
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::with_exclusions(None, &["none".to_string()]);
        let results = HealthCheckAgent::new(&wp, &selection).run_doctor();

        let blog_public = results
            .iter()
            .find(|r| r.name == "option-blog-public")
            .unwrap();
        assert_eq!(blog_public.status, CheckStatus::FailedToRun);

        let cron = results.iter().find(|r| r.name == "cron-count").unwrap();
        assert_eq!(cron.status, CheckStatus::Warning);
        assert!(selection.exclude.is_empty());
    }

    #[test]
    fn doctor_list_failure_yields_one_failed_line() {
        let runner =
            FakeRunner::new().respond("doctor list", CommandOutput::failed(1, "not installed"));
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::default();
        let results = HealthCheckAgent::new(&wp, &selection).run_doctor();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::FailedToRun);
    }

    #[test]
    fn explicit_check_list_skips_discovery() {
        let runner = doctor_runner();
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::with_exclusions(Some(vec!["cron-count".into()]), &[]);
        let results = HealthCheckAgent::new(&wp, &selection).run_doctor();
        assert_eq!(results.len(), 1);
        assert!(runner.calls_matching("doctor list").is_empty());
    }

    #[test]
    fn http_check_expects_200() {
        let runner = FakeRunner::new().respond(
            "option get home",
            CommandOutput::ok("https://blog.example.com\n"),
        );
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::default();
        let agent = HealthCheckAgent::new(&wp, &selection);

        let ok = agent.run_http(&StaticProbe::new(200), false);
        assert_eq!(ok.status, CheckStatus::Success);

        let broken = agent.run_http(&StaticProbe::new(503), false);
        assert_eq!(broken.status, CheckStatus::Error);
        assert!(broken.message.contains("503"));
    }

    #[test]
    fn http_check_is_skipped_in_dry_run() {
        let runner = FakeRunner::new();
        let wp = WpCli::new(&runner, executor());
        let selection = CheckSelection::default();
        let probe = StaticProbe::new(200);
        let result = HealthCheckAgent::new(&wp, &selection).run_http(&probe, true);
        assert_eq!(result.status, CheckStatus::Skipped);
        assert!(probe.requested.lock().unwrap().is_empty());
        assert!(runner.calls().is_empty());
    }
}
