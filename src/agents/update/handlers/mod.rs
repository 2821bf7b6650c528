// One handler per update mode. Each walks the records that need an update
// and stamps an UpdateOutcome on every one of them.

pub mod batch_handler;
pub mod individual_handler;
pub mod priority_handler;

pub use batch_handler::BatchHandler;
pub use individual_handler::IndividualHandler;
pub use priority_handler::PriorityHandler;

use crate::agents::update::context::UpdateContext;
use crate::model::{PluginUpdateRecord, UpdateOutcome};
use colored::Colorize;

/// Updates a single plugin, or describes the command in dry-run mode.
pub(crate) fn update_single(ctx: &UpdateContext, record: &mut PluginUpdateRecord) {
    if ctx.dry_run {
        let command = ctx.wp.command(&["plugin", "update", record.slug.as_str(), "--format=json"]);
        println!("   {} {}", "[DRY RUN] Would run:".dimmed(), command.display());
        record.outcome = UpdateOutcome::Skipped("dry run".to_string());
        return;
    }

    record.outcome = match ctx.wp.update_plugins(&[record.slug.as_str()]) {
        Ok(results) => match results.into_iter().next() {
            Some(r) if r.success => UpdateOutcome::Updated,
            Some(r) => UpdateOutcome::Failed(r.status),
            None => UpdateOutcome::Failed("no result reported".to_string()),
        },
        Err(e) => UpdateOutcome::Failed(e.to_string()),
    };
    report_outcome(record);
}

pub(crate) fn report_outcome(record: &PluginUpdateRecord) {
    match &record.outcome {
        UpdateOutcome::Updated => println!("   {} {}", "✓".green(), record.slug),
        UpdateOutcome::Failed(msg) => {
            eprintln!("   {} {}: {}", "✗".red(), record.slug, msg)
        }
        _ => {}
    }
}
