//! Logging setup for the binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a stderr fmt subscriber filtered by `RUST_LOG` (default `skillcoach=info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "skillcoach=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
