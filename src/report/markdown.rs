use super::{NO_CHECKS, NONE, RunReport};
use crate::model::{CheckStatus, PluginUpdateRecord, TargetResult};
use std::fmt::Write;

pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(out, "# WordPress Plugin Update Report\n");
    let _ = writeln!(out, "Generated: {}\n", report.generated_label());

    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "| Metric | Count |");
    let _ = writeln!(out, "| --- | --- |");
    let _ = writeln!(out, "| Targets processed | {} |", s.targets);
    let _ = writeln!(out, "| Plugins needing update | {} |", s.needing_update);
    let _ = writeln!(out, "| Updated | {} |", s.updated);
    let _ = writeln!(out, "| Failed | {} |", s.failed);
    let _ = writeln!(out, "| Step errors | {} |", s.step_errors);
    let _ = writeln!(out, "| Health check errors | {} |", s.error_count);
    out.push('\n');

    let _ = writeln!(out, "### Health checks\n");
    if s.total_checks() == 0 {
        let _ = writeln!(out, "{NO_CHECKS}\n");
    } else {
        let _ = writeln!(out, "| Status | Count |");
        let _ = writeln!(out, "| --- | --- |");
        for status in CheckStatus::ALL {
            let count = s.checks_with(status);
            if count > 0 {
                let _ = writeln!(out, "| {} | {} |", status, count);
            }
        }
        out.push('\n');
    }

    for result in &report.results {
        render_target(&mut out, result);
    }

    out
}

fn render_target(out: &mut String, result: &TargetResult) {
    let _ = writeln!(out, "## {}\n", cell(result.target_name()));

    if let Some(backup) = &result.backup {
        let _ = writeln!(out, "Backup: `{}`\n", backup.display());
    }

    let needing: Vec<String> = result.plugins_needing_update().map(describe_versions).collect();
    list_section(out, "Plugins needing update", &needing);

    let updated: Vec<String> = result.successful().map(|p| p.slug.clone()).collect();
    list_section(out, "Updated", &updated);

    let failed: Vec<String> = result
        .failed()
        .map(|(slug, msg)| format!("{slug}: {msg}"))
        .collect();
    list_section(out, "Failed", &failed);

    if !result.step_errors.is_empty() {
        list_section(out, "Step errors", &result.step_errors);
    }

    let _ = writeln!(out, "### Health checks\n");
    if result.checks.is_empty() {
        let _ = writeln!(out, "{NONE}\n");
        return;
    }
    let _ = writeln!(out, "| Check | Status | Message |");
    let _ = writeln!(out, "| --- | --- | --- |");
    for check in &result.checks {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            cell(&check.name),
            check.status,
            cell(&check.message)
        );
    }
    out.push('\n');
}

fn list_section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "### {title}\n");
    if items.is_empty() {
        let _ = writeln!(out, "{NONE}\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {}", item.replace('\n', " "));
    }
    out.push('\n');
}

pub(super) fn describe_versions(record: &PluginUpdateRecord) -> String {
    match (&record.current_version, &record.available_version) {
        (Some(from), Some(to)) => format!("{} ({} -> {})", record.slug, from, to),
        (None, Some(to)) => format!("{} (-> {})", record.slug, to),
        _ => record.slug.clone(),
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::mixed_result;
    use super::*;
    use crate::model::{HealthCheckResult, Target};
    use jiff::Timestamp;

    fn at() -> Timestamp {
        "2024-05-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn renders_sections_for_each_target() {
        let report = RunReport::from_results(vec![mixed_result()], false, at());
        let md = render(&report);

        assert!(md.contains("Generated: 2024-05-01 12:00:00 UTC"));
        assert!(md.contains("| Targets processed | 1 |"));
        assert!(md.contains("## wp_blog"));
        assert!(md.contains("- akismet (4.1 -> 5.0)"));
        assert!(md.contains("- woocommerce: Download failed <timeout>"));
        assert!(md.contains("| cron-count | warning | Too many crons |"));
        assert!(md.contains("| skipped | 1 |"));
        assert!(!md.contains(NO_CHECKS));
    }

    #[test]
    fn empty_sections_say_none() {
        let result = TargetResult::new(Target::container("wp_empty"));
        let report = RunReport::from_results(vec![result], true, at());
        let md = render(&report);

        assert!(md.contains(NO_CHECKS));
        assert!(md.contains("(dry run)"));
        assert_eq!(md.matches("\nNone\n").count(), 4);
    }

    #[test]
    fn pipes_in_messages_do_not_break_tables() {
        let mut result = TargetResult::new(Target::container("wp_blog"));
        result.checks = vec![HealthCheckResult::new(
            "autoload-options-size",
            CheckStatus::Error,
            "size a|b",
        )];
        let md = render(&RunReport::from_results(vec![result], false, at()));
        assert!(md.contains("size a\\|b"));
    }
}
