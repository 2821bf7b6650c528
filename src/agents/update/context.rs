use crate::agents::update::handlers::{BatchHandler, IndividualHandler, PriorityHandler};
use crate::model::PluginUpdateRecord;
use crate::wordpress::WpCli;
use clap::ValueEnum;

/// How plugins flagged for update are applied. The modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UpdateMode {
    /// One `wp plugin update` per plugin
    #[default]
    Individual,
    /// Only the plugins named in --priority-plugins, in that order
    Priority,
    /// A single `wp plugin update` with every slug
    Batch,
}

/// Context for applying updates to one target.
pub struct UpdateContext<'w, 'r> {
    pub wp: &'w WpCli<'r>,
    pub dry_run: bool,
    pub priority: &'w [String],
}

impl<'w, 'r> UpdateContext<'w, 'r> {
    pub fn new(wp: &'w WpCli<'r>, dry_run: bool, priority: &'w [String]) -> Self {
        Self {
            wp,
            dry_run,
            priority,
        }
    }
}

/// Applies pending updates in `records` according to `mode`, recording the
/// outcome on each record. Never fails as a whole; failures land on records.
pub fn apply_updates(ctx: &UpdateContext, mode: UpdateMode, records: &mut [PluginUpdateRecord]) {
    match mode {
        UpdateMode::Individual => IndividualHandler::new(ctx).apply(records),
        UpdateMode::Priority => PriorityHandler::new(ctx).apply(records),
        UpdateMode::Batch => BatchHandler::new(ctx).apply(records),
    }
}
