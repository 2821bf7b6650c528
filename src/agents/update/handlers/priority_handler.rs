use super::update_single;
use crate::agents::update::context::UpdateContext;
use crate::model::{PluginUpdateRecord, UpdateOutcome};

/// Updates only the configured priority plugins, in the configured order.
/// Everything else that needs an update is left pending as skipped.
pub struct PriorityHandler<'c, 'w, 'r> {
    ctx: &'c UpdateContext<'w, 'r>,
}

impl<'c, 'w, 'r> PriorityHandler<'c, 'w, 'r> {
    pub fn new(ctx: &'c UpdateContext<'w, 'r>) -> Self {
        Self { ctx }
    }

    pub fn apply(&self, records: &mut [PluginUpdateRecord]) {
        for slug in self.ctx.priority {
            if let Some(record) = records
                .iter_mut()
                .find(|r| r.needs_update && &r.slug == slug && r.outcome == UpdateOutcome::Pending)
            {
                update_single(self.ctx, record);
            }
        }

        for record in records
            .iter_mut()
            .filter(|r| r.needs_update && r.outcome == UpdateOutcome::Pending)
        {
            record.outcome = UpdateOutcome::Skipped("not in priority list".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command_runner::testing::FakeRunner;
    use crate::agents::command_runner::CommandOutput;
    use crate::agents::update::handlers::fixtures::pending;
    use crate::wordpress::{WpCli, WpExecutor};

    #[test]
    fn updates_follow_priority_order_and_skip_others() {
        let runner = FakeRunner::new()
            .respond(
                "plugin update woocommerce",
                CommandOutput::ok(r#"[{"name":"woocommerce","status":"Updated"}]"#),
            )
            .respond(
                "plugin update akismet",
                CommandOutput::ok(r#"[{"name":"akismet","status":"Updated"}]"#),
            );
        let wp = WpCli::new(
            &runner,
            WpExecutor::Docker {
                container: "wp_shop".into(),
                user: None,
                wp_path: None,
            },
        );
        let priority = vec![
            "woocommerce".to_string(),
            "not-installed".to_string(),
            "akismet".to_string(),
        ];
        let ctx = UpdateContext::new(&wp, false, &priority);

        let mut records = vec![pending("akismet"), pending("jetpack"), pending("woocommerce")];
        PriorityHandler::new(&ctx).apply(&mut records);

        let calls = runner.calls_matching("plugin update");
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("woocommerce"));
        assert!(calls[1].contains("akismet"));
        assert_eq!(records[0].outcome, UpdateOutcome::Updated);
        assert_eq!(
            records[1].outcome,
            UpdateOutcome::Skipped("not in priority list".into())
        );
        assert_eq!(records[2].outcome, UpdateOutcome::Updated);
    }
}
