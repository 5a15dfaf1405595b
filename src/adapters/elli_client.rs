use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;

use crate::adapters::elli_http::{ElliHttpTransport, Endpoint, HttpError, TransportInitError};
use crate::domain::elli_payload::{
    DecodingError, parse_accumulated_charging, parse_charging_sessions, parse_stations,
    parse_token_response,
};
use crate::domain::models::{AccumulatedCharging, ChargingSession, Station, TokenResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.elli.eco";
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_secs(15);

const LOGIN_PATH: &str = "/identity/v1/token";
const STATIONS_PATH: &str = "/chargeathome/v1/stations";
const SESSIONS_PATH: &str = "/chargeathome/v1/charging-sessions";
const ACCUMULATED_PATH: &str = "/chargeathome/v1/charging-sessions/accumulated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Authentication,
    NotAuthenticated,
    Remote,
    NotFound,
    Decoding,
}

#[derive(Debug, Error)]
pub enum ElliClientError {
    #[error("elli api unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("elli login rejected with status {status}: {body}")]
    Authentication { status: u16, body: String },
    #[error("no access token set, login first")]
    NotAuthenticated,
    #[error("elli api responded with status {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("{resource} `{id}` is unknown to the elli api")]
    NotFound { resource: &'static str, id: String },
    #[error("failed to decode elli payload: {0}")]
    Decoding(#[from] DecodingError),
}

impl ElliClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Decoding(_) => ErrorKind::Decoding,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(source) if source.is_timeout())
    }

    fn from_http(error: HttpError, record: &str) -> Self {
        match error {
            HttpError::Transport(source) => Self::Transport(source),
            HttpError::Remote { status, body } => Self::Remote { status, body },
            HttpError::InvalidJson(source) => Self::Decoding(DecodingError::InvalidField {
                record: record.to_string(),
                field: "body",
                reason: format!("is not valid JSON: {source}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElliClientConfig {
    pub base_url: String,
    pub auth_timeout: Duration,
    pub data_timeout: Duration,
}

impl Default for ElliClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            data_timeout: DEFAULT_DATA_TIMEOUT,
        }
    }
}

/// Client for the Elli charging cloud.
///
/// Unauthenticated until [`ElliClient::login`] succeeds or a token is
/// assigned with [`ElliClient::set_access_token`]; there is no way back.
/// Reads borrow `&self` and never touch the stored token, so one instance can
/// be shared behind an `Arc` once authenticated.
#[derive(Debug)]
pub struct ElliClient {
    transport: ElliHttpTransport,
    auth_timeout: Duration,
    data_timeout: Duration,
    access_token: Option<String>,
}

impl ElliClient {
    pub fn new(config: &ElliClientConfig) -> Result<Self, TransportInitError> {
        Ok(Self {
            transport: ElliHttpTransport::new(&config.base_url)?,
            auth_timeout: config.auth_timeout,
            data_timeout: config.data_timeout,
            access_token: None,
        })
    }

    pub fn with_access_token(
        config: &ElliClientConfig,
        access_token: impl Into<String>,
    ) -> Result<Self, TransportInitError> {
        let mut client = Self::new(config)?;
        client.set_access_token(access_token);
        Ok(client)
    }

    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = Some(access_token.into());
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, ElliClientError> {
        let endpoint = Endpoint::post(
            LOGIN_PATH,
            json!({
                "email": email,
                "password": password,
            }),
        );

        let response = match self
            .transport
            .send(&endpoint, None, self.auth_timeout)
            .await
        {
            Ok(response) => response,
            Err(HttpError::Remote { status, body }) if (400..500).contains(&status) => {
                tracing::warn!(status, "elli login rejected");
                return Err(ElliClientError::Authentication { status, body });
            }
            Err(error) => return Err(ElliClientError::from_http(error, "token")),
        };

        let token = parse_token_response(&response)?;
        self.access_token = Some(token.access_token.clone());

        tracing::info!(
            token_type = %token.token_type,
            expires_in = token.expires_in,
            "elli login succeeded"
        );

        Ok(token)
    }

    pub async fn get_stations(&self) -> Result<Vec<Station>, ElliClientError> {
        let response = self
            .fetch(&Endpoint::get(STATIONS_PATH), "station")
            .await?;
        let stations = parse_stations(&response)?;

        tracing::debug!(count = stations.len(), "fetched elli stations");
        Ok(stations)
    }

    /// Momentary wattage is costly upstream; pass `false` when only totals
    /// are needed.
    pub async fn get_charging_sessions(
        &self,
        include_momentary_speed: bool,
    ) -> Result<Vec<ChargingSession>, ElliClientError> {
        let endpoint = Endpoint::get(SESSIONS_PATH)
            .with_query("include_momentary_speed", include_momentary_speed.to_string());
        let response = self.fetch(&endpoint, "charging_session").await?;
        let sessions = parse_charging_sessions(&response, include_momentary_speed)?;

        tracing::debug!(
            count = sessions.len(),
            active = sessions.iter().filter(|s| s.is_active()).count(),
            include_momentary_speed,
            "fetched elli charging sessions"
        );
        Ok(sessions)
    }

    pub async fn get_accumulated_charging(
        &self,
        station_id: &str,
    ) -> Result<AccumulatedCharging, ElliClientError> {
        let endpoint = Endpoint::get(ACCUMULATED_PATH).with_query("station_id", station_id);

        let response = match self.fetch(&endpoint, "accumulated_charging").await {
            Err(ElliClientError::Remote { status: 404, .. }) => {
                return Err(ElliClientError::NotFound {
                    resource: "station",
                    id: station_id.to_string(),
                });
            }
            other => other?,
        };

        Ok(parse_accumulated_charging(&response)?)
    }

    async fn fetch(
        &self,
        endpoint: &Endpoint,
        record: &str,
    ) -> Result<Value, ElliClientError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ElliClientError::NotAuthenticated)?;

        self.transport
            .send(endpoint, Some(token), self.data_timeout)
            .await
            .map_err(|error| ElliClientError::from_http(error, record))
    }
}
