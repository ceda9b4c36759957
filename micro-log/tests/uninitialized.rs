//! Logging before a logger is installed.
//!
//! Kept in its own test binary: nothing here may install a global logger.

use micro_log::{RequestContext, is_initialized};

#[test]
fn test_logging_before_init_is_discarded() {
    assert!(!is_initialized());

    let ctx = RequestContext::new("early");
    ctx.set_url("/boot");
    micro_log::debug!("config loaded from {}", "env");
    micro_log::info!(ctx: &ctx, "warming {} caches", 3);
    micro_log::error!("registry not reachable yet");
    micro_log::fatal!(ctx: &ctx, "still booting");

    assert!(!is_initialized());
    assert!(ctx.id().starts_with("early-"));
}
