//! Tracing initialization for the CLI

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install a global subscriber writing to stderr. `RUST_LOG` takes
/// precedence over `level`.
pub fn init_tracing(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true);
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
