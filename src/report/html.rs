use super::markdown::describe_versions;
use super::{NO_CHECKS, NONE, RunReport};
use crate::model::{CheckStatus, TargetResult};
use std::fmt::Write;

const TABLE_STYLE: &str = "border-collapse:collapse;margin:0.5em 0";
const CELL_STYLE: &str = "border:1px solid #ccc;padding:4px 8px;text-align:left";

pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>WordPress Plugin Update Report</title>\n</head>\n");
    out.push_str("<body style=\"font-family:sans-serif\">\n");
    out.push_str("<h1>WordPress Plugin Update Report</h1>\n");
    let _ = writeln!(out, "<p>Generated: {}</p>", escape(&report.generated_label()));

    out.push_str("<h2>Summary</h2>\n");
    let rows = [
        ("Targets processed", s.targets),
        ("Plugins needing update", s.needing_update),
        ("Updated", s.updated),
        ("Failed", s.failed),
        ("Step errors", s.step_errors),
        ("Health check errors", s.error_count),
    ];
    open_table(&mut out, &["Metric", "Count"]);
    for (label, count) in rows {
        let _ = writeln!(
            out,
            "<tr><td style=\"{CELL_STYLE}\">{label}</td><td style=\"{CELL_STYLE}\">{count}</td></tr>"
        );
    }
    out.push_str("</table>\n");

    out.push_str("<h3>Health checks</h3>\n");
    if s.total_checks() == 0 {
        let _ = writeln!(out, "<p>{NO_CHECKS}</p>");
    } else {
        open_table(&mut out, &["Status", "Count"]);
        for status in CheckStatus::ALL {
            let count = s.checks_with(status);
            if count > 0 {
                let _ = writeln!(
                    out,
                    "<tr><td style=\"{CELL_STYLE}\">{}</td><td style=\"{CELL_STYLE}\">{count}</td></tr>",
                    status_badge(status)
                );
            }
        }
        out.push_str("</table>\n");
    }

    for result in &report.results {
        render_target(&mut out, result);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_target(out: &mut String, result: &TargetResult) {
    let _ = writeln!(out, "<h2>{}</h2>", escape(result.target_name()));
    if let Some(backup) = &result.backup {
        let _ = writeln!(
            out,
            "<p>Backup: <code>{}</code></p>",
            escape(&backup.display().to_string())
        );
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

    out.push_str("<h3>Health checks</h3>\n");
    if result.checks.is_empty() {
        let _ = writeln!(out, "<p>{NONE}</p>");
        return;
    }
    open_table(out, &["Check", "Status", "Message"]);
    for check in &result.checks {
        let _ = writeln!(
            out,
            "<tr><td style=\"{CELL_STYLE}\">{}</td><td style=\"{CELL_STYLE}\">{}</td><td style=\"{CELL_STYLE}\">{}</td></tr>",
            escape(&check.name),
            status_badge(check.status),
            escape(&check.message)
        );
    }
    out.push_str("</table>\n");
}

fn open_table(out: &mut String, headers: &[&str]) {
    let _ = write!(out, "<table style=\"{TABLE_STYLE}\"><tr>");
    for header in headers {
        let _ = write!(out, "<th style=\"{CELL_STYLE}\">{header}</th>");
    }
    out.push_str("</tr>\n");
}

fn list_section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "<h3>{title}</h3>");
    if items.is_empty() {
        let _ = writeln!(out, "<p>{NONE}</p>");
        return;
    }
    out.push_str("<ul>\n");
    for item in items {
        let _ = writeln!(out, "<li>{}</li>", escape(item));
    }
    out.push_str("</ul>\n");
}

fn status_colour(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Success => "#2e7d32",
        CheckStatus::Warning => "#f9a825",
        CheckStatus::Error | CheckStatus::FailedToRun => "#c62828",
        CheckStatus::Skipped | CheckStatus::Unknown => "#757575",
    }
}

fn status_badge(status: CheckStatus) -> String {
    format!(
        "<span style=\"color:{};font-weight:bold\">{}</span>",
        status_colour(status),
        status
    )
}

/// Escapes the five HTML-significant characters.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
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
    fn escapes_markup_in_messages() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );

        let report = RunReport::from_results(vec![mixed_result()], false, at());
        let html = render(&report);
        assert!(html.contains("woocommerce: Download failed &lt;timeout&gt;"));
        assert!(!html.contains("<timeout>"));
    }

    #[test]
    fn statuses_are_coloured() {
        let mut result = TargetResult::new(Target::container("wp_blog"));
        result.checks = vec![
            HealthCheckResult::new("a", CheckStatus::Success, ""),
            HealthCheckResult::new("b", CheckStatus::FailedToRun, ""),
        ];
        let html = render(&RunReport::from_results(vec![result], false, at()));
        assert!(html.contains("color:#2e7d32;font-weight:bold\">success"));
        assert!(html.contains("color:#c62828;font-weight:bold\">failed_to_run"));
    }

    #[test]
    fn empty_report_is_still_a_document() {
        let html = render(&RunReport::from_results(Vec::new(), false, at()));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(NO_CHECKS));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
