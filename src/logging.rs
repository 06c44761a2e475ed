//! Diagnostic tracing for agentctl.
//!
//! Tracing output is for debugging the resolver and orchestrator. It is
//! separate from the progress lines commands print for the operator.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "AGENTCTL_LOG";

/// Initialize the tracing subscriber.
///
/// Reads `AGENTCTL_LOG`. Defaults to `warn`, or `debug` when `verbose` is set.
/// Output goes to stderr in compact format.
pub fn init(verbose: bool) {
    let fallback = if verbose { "agentctl=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests driving `main` twice) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
