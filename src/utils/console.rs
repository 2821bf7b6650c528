use colored::Colorize;

pub const VERBOSE_ENV: &str = "WPFLEET_VERBOSE";

pub fn verbose_enabled() -> bool {
    std::env::var(VERBOSE_ENV).is_ok()
}

/// Diagnostic line shown only with `--verbose`.
pub fn verbose(message: impl AsRef<str>) {
    if verbose_enabled() {
        eprintln!("{} {}", "[VERBOSE]".dimmed(), message.as_ref());
    }
}

pub fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "WARNING:".yellow().bold(), message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    eprintln!("{} {}", "ERROR:".red().bold(), message.as_ref());
}
