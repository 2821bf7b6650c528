// Plugin update execution
//
// - UpdateContext: the WP-CLI handle and run flags shared by every handler
// - Handlers: one per update mode (individual, priority, batch)
// - RunConfirmation: the interactive "proceed?" prompt before live updates
pub mod context;
pub mod handlers;
pub mod interaction;

pub use context::{UpdateContext, UpdateMode, apply_updates};
pub use interaction::RunConfirmation;
