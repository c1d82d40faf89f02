//! Logging setup.
//!
//! Honors `RUST_LOG` when set, otherwise the configured level. The stdio
//! transport forces `stderr: true` since stdout carries protocol frames.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber from a logging configuration.
pub fn init_logging(config: &LoggingConfig) -> crate::error::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => {
            if config.stderr {
                subscriber
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            } else {
                subscriber
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .compact(),
                    )
                    .init();
            }
        }
        LogFormat::Pretty => {
            if config.stderr {
                subscriber
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            } else {
                subscriber
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .init();
            }
        }
        LogFormat::Compact => {
            if config.stderr {
                subscriber
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            } else {
                subscriber
                    .with(tracing_subscriber::fmt::layer().compact())
                    .init();
            }
        }
    }

    Ok(())
}
