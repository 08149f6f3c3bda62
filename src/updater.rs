//! Periodic update hook.

use crate::context::MessageContext;

/// Work a node runs on a fixed interval, with request dispatch paused.
///
/// Each tick is bracketed like a request: `begin_message`, the tick, a
/// save, `end_message`. Clients see an update-started notification before
/// the tick and an update-finished notification after it.
pub trait Tick: Send + 'static {
    fn tick(&mut self, ctx: &mut dyn MessageContext);
}
