use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{EaselError, EaselResult};

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Returns an error if a global
/// subscriber is already installed, which callers may ignore.
pub fn init_tracing(default_filter: &str) -> EaselResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| EaselError::Internal(format!("Failed to install subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_tracing("easel=debug");
        assert!(init_tracing("easel=debug").is_err());
    }
}
