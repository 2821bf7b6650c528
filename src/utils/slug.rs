use regex::Regex;
use std::sync::OnceLock;

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_-]+").expect("static regex"))
}

/// Reduces a site directory or container name to a filesystem-safe slug.
pub fn sanitize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let replaced = invalid_chars().replace_all(&lower, "_");
    let trimmed = replaced.trim_matches('_');

    if trimmed.is_empty() {
        "site".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derives the container name for a site directory, e.g. `example.com` -> `wp_example`.
pub fn container_name_for_site(site: &str, prefix: &str) -> String {
    let base = site.trim().trim_end_matches('/');
    let base = base.rsplit('/').next().unwrap_or(base);
    let base = base.strip_suffix(".com").unwrap_or(base);
    format!("{prefix}{base}")
}
