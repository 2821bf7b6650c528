use super::update_single;
use crate::agents::update::context::UpdateContext;
use crate::model::PluginUpdateRecord;

/// Issues one update command per plugin that needs it.
pub struct IndividualHandler<'c, 'w, 'r> {
    ctx: &'c UpdateContext<'w, 'r>,
}

impl<'c, 'w, 'r> IndividualHandler<'c, 'w, 'r> {
    pub fn new(ctx: &'c UpdateContext<'w, 'r>) -> Self {
        Self { ctx }
    }

    pub fn apply(&self, records: &mut [PluginUpdateRecord]) {
        for record in records.iter_mut().filter(|r| r.needs_update) {
            update_single(self.ctx, record);
        }
    }
}
