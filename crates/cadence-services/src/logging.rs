//! Tracing subscriber setup for hosts embedding the engine

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),
    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install a fmt subscriber filtered by `RUST_LOG` plus `directive`
/// (for example `"cadence=debug"`).
pub fn init_logging(directive: &str) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .try_init()?;
    tracing::info!("Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_directive() {
        assert!(matches!(
            init_logging("cadence=loudest"),
            Err(LoggingError::Directive(_))
        ));
    }
}
