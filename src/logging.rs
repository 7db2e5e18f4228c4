// Logging setup: a `tracing` subscriber on stderr, filtered to this crate
// unless `RUST_LOG` says otherwise.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins; otherwise this crate
/// logs at `info`.
pub fn enable_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info",
            env!("CARGO_PKG_NAME").replace('-', "_")
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))
}
