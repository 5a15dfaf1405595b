pub mod config;
mod error;
mod logging;
mod runtime;
pub mod session_store;

pub use error::AppError;
pub use logging::{DEMO_DEFAULT_DIRECTIVE, init as init_logging};

/// Starts the REST façade in front of the Elli cloud.
pub fn run() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();
    logging::init(logging::SERVER_DEFAULT_DIRECTIVE)?;
    if let Err(error) = dotenv
        && !error.not_found()
    {
        return Err(AppError::config(error));
    }

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        elli_base_url = %config.elli_base_url,
        http_bind = %config.http_bind,
        auth_timeout_ms = config.auth_timeout_ms,
        data_timeout_ms = config.data_timeout_ms,
        session_ttl_seconds = config.session_ttl_seconds,
        session_max_entries = config.session_max_entries,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
