//! Tracing subscriber setup.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable read for the default filter.
pub const LOG_ENV: &str = "H5VENEER_LOG";

/// Install a global fmt subscriber.
///
/// `filter` overrides the `H5VENEER_LOG` environment variable; with neither
/// present the level is `warn`. Returns false if a global subscriber was
/// already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        let _ = init_logging(Some("h5veneer=trace"));
        assert!(!init_logging(None));
    }
}
