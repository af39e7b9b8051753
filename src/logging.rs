//! Installs the global `tracing` subscriber.

use std::{fs::OpenOptions, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Print log messages at `level` and above to stderr, and everything at debug
/// level and above to `log_file` if one is given.
///
/// The `RUST_LOG` environment variable overrides `level` when it is set.
///
/// # Errors
///
/// Returns an error if `log_file` cannot be opened for appending.
pub fn setup_logging(level: LevelFilter, log_file: Option<&Path>) -> std::io::Result<()> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        );

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    if let Err(error) = tracing_subscriber::registry()
        .with(stderr_log)
        .with(debug_log)
        .try_init()
    {
        tracing::warn!("tracing init failed: {error}");
    }

    Ok(())
}
