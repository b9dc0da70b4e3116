//! Tracing bootstrap for hosts embedding the engine.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.  `RUST_LOG` overrides the
/// default filter.  Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_client=debug,parley_net=debug,parley_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
