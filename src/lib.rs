pub mod adapters {
    pub mod api;
    pub mod elli_client;
    pub mod elli_http;
}
pub mod app;
pub mod domain {
    pub mod elli_payload;
    pub mod models;
}

#[cfg(test)]
mod test_support;

pub use adapters::elli_client::{ElliClient, ElliClientConfig, ElliClientError, ErrorKind};
pub use domain::models::{AccumulatedCharging, ChargingSession, Station, TokenResponse};
