use tracing_subscriber::EnvFilter;

use crate::smartschool::api::error::{ApiError, Result};

/// Installs a global fmt subscriber.
///
/// `filter` takes precedence; otherwise `RUST_LOG` is used, falling back to
/// `info`.
pub fn init(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|err| ApiError::Logging(err.to_string()))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ApiError::Logging(err.to_string()))
}
