use super::report_outcome;
use crate::agents::update::context::UpdateContext;
use crate::model::{PluginUpdateRecord, UpdateOutcome};
use colored::Colorize;

/// Updates every flagged plugin with a single WP-CLI invocation.
pub struct BatchHandler<'c, 'w, 'r> {
    ctx: &'c UpdateContext<'w, 'r>,
}

impl<'c, 'w, 'r> BatchHandler<'c, 'w, 'r> {
    pub fn new(ctx: &'c UpdateContext<'w, 'r>) -> Self {
        Self { ctx }
    }

    pub fn apply(&self, records: &mut [PluginUpdateRecord]) {
        let slugs: Vec<String> = records
            .iter()
            .filter(|r| r.needs_update)
            .map(|r| r.slug.clone())
            .collect();
        if slugs.is_empty() {
            return;
        }
        let slug_refs: Vec<&str> = slugs.iter().map(String::as_str).collect();

        if self.ctx.dry_run {
            let mut args = vec!["plugin", "update"];
            args.extend_from_slice(&slug_refs);
            args.push("--format=json");
            println!(
                "   {} {}",
                "[DRY RUN] Would run:".dimmed(),
                self.ctx.wp.command(&args).display()
            );
            for record in records.iter_mut().filter(|r| r.needs_update) {
                record.outcome = UpdateOutcome::Skipped("dry run".to_string());
            }
            return;
        }

        match self.ctx.wp.update_plugins(&slug_refs) {
            Ok(results) => {
                for record in records.iter_mut().filter(|r| r.needs_update) {
                    record.outcome = match results.iter().find(|r| r.slug == record.slug) {
                        Some(r) if r.success => UpdateOutcome::Updated,
                        Some(r) => UpdateOutcome::Failed(r.status.clone()),
                        None => UpdateOutcome::Failed("no result reported".to_string()),
                    };
                    report_outcome(record);
                }
            }
            Err(e) => {
                let message = e.to_string();
                for record in records.iter_mut().filter(|r| r.needs_update) {
                    record.outcome = UpdateOutcome::Failed(message.clone());
                    report_outcome(record);
                }
            }
        }
    }
}
