pub mod bridge;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod errors;
pub mod launcher;
pub mod protocol;

pub use errors::{ScaleWobError, ScaleWobResult};

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
