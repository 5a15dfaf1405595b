use std::time::Duration;

use reqwest::{Method, Url, header};
use serde_json::Value;
use thiserror::Error;

const USER_AGENT: &str = concat!("elli-charging-api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TransportInitError {
    #[error("invalid Elli base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("elli api request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("elli api responded with status {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("elli api returned malformed JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Connection pool bound to one vendor host. Dropping it releases the pool.
#[derive(Debug)]
pub struct ElliHttpTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl ElliHttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportInitError> {
        let base_url = parse_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()
            .map_err(TransportInitError::Build)?;

        Ok(Self { base_url, client })
    }

    pub async fn send(
        &self,
        endpoint: &Endpoint,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, HttpError> {
        let url = self.url_for(endpoint.path());

        let mut request = self
            .client
            .request(endpoint.method.clone(), url)
            .timeout(timeout);
        if !endpoint.query.is_empty() {
            request = request.query(&endpoint.query);
        }
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &endpoint.body {
            // `json` also sets the content type.
            request = request.json(body);
        }

        tracing::debug!(
            method = %endpoint.method,
            path = endpoint.path(),
            authenticated = bearer_token.is_some(),
            "sending elli api request"
        );

        let response = request.send().await.map_err(HttpError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(HttpError::Transport)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), path = endpoint.path(), "elli api error");
            return Err(HttpError::Remote {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(HttpError::InvalidJson)
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Drop for ElliHttpTransport {
    fn drop(&mut self) {
        tracing::trace!(base_url = %self.base_url, "releasing elli api connection pool");
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportInitError> {
    let invalid = |reason: String| TransportInitError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|error| invalid(error.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    Ok(url)
}
