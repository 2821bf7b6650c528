use crate::utils::console;
use crate::wordpress::WpCli;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteUrl {
    pub container: String,
    pub home_url: String,
}

/// Reads `home` for one target; failures and non-URL values are warned and skipped.
pub fn lookup(wp: &WpCli, name: &str) -> Option<SiteUrl> {
    match wp.home_url() {
        Ok(url) => Some(SiteUrl {
            container: name.to_string(),
            home_url: url.to_string(),
        }),
        Err(e) => {
            console::warn(format!("{name}: {e}"));
            None
        }
    }
}

pub fn render_tsv(urls: &[SiteUrl]) -> String {
    urls.iter()
        .map(|u| format!("{}\t{}\n", u.container, u.home_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command_runner::CommandOutput;
    use crate::agents::command_runner::testing::FakeRunner;
    use crate::wordpress::WpExecutor;

    fn wp<'a>(runner: &'a FakeRunner, container: &str) -> WpCli<'a> {
        WpCli::new(
            runner,
            WpExecutor::Docker {
                container: container.into(),
                user: None,
                wp_path: None,
            },
        )
    }

    #[test]
    fn non_url_values_are_skipped() {
        let runner = FakeRunner::new()
            .respond("wp_good", CommandOutput::ok("https://good.example.com\n"))
            .respond("wp_bad", CommandOutput::ok("Error: not installed\n"));

        let good = lookup(&wp(&runner, "wp_good"), "wp_good");
        let bad = lookup(&wp(&runner, "wp_bad"), "wp_bad");

        assert_eq!(bad, None);
        let urls: Vec<SiteUrl> = good.into_iter().collect();
        assert_eq!(render_tsv(&urls), "wp_good\thttps://good.example.com/\n");
        assert_eq!(
            serde_json::to_string(&urls).unwrap(),
            r#"[{"container":"wp_good","home_url":"https://good.example.com/"}]"#
        );
    }
}
