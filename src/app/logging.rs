use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

pub const SERVER_DEFAULT_DIRECTIVE: &str = "info";
/// The demo prints its own report on stdout, so only problems are logged.
pub const DEMO_DEFAULT_DIRECTIVE: &str = "warn";

pub fn init(default_directive: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}
