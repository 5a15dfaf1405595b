use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, get, post, web};
use serde::{Deserialize, Serialize};

use crate::adapters::elli_client::{ElliClient, ElliClientConfig, ElliClientError, ErrorKind};
use crate::app::session_store::{ClientSessionStore, SessionStoreError};
use crate::domain::models::{ChargingSession, Station, partition_sessions};

const SERVICE_NAME: &str = "Elli Charging API";

#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<dyn ClientSessionStore>,
    pub client_config: ElliClientConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub token: String,
    pub include_momentary_speed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ChargingStatusResponse {
    pub stations: Vec<Station>,
    pub active_sessions: Vec<ChargingSession>,
    pub total_active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<Station>,
}

#[derive(Debug, Serialize)]
pub struct ChargingSessionsResponse {
    pub charging_sessions: Vec<ChargingSession>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(root)
        .service(health)
        .service(login_endpoint)
        .service(charging_status_endpoint)
        .service(stations_endpoint)
        .service(accumulated_charging_endpoint)
        .service(charging_sessions_endpoint);
}

#[get("/")]
async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "login": "/login",
            "charging_status": "/charging-status",
            "stations": "/stations",
            "sessions": "/charging-sessions",
        }
    }))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

#[post("/login")]
async fn login_endpoint(
    state: web::Data<ApiState>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    let LoginRequest { email, password } = request.into_inner();
    if email.trim().is_empty() || !email.contains('@') || password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "email and password are required",
        );
    }

    let mut client = match ElliClient::new(&state.client_config) {
        Ok(client) => client,
        Err(error) => return store_error_response(SessionStoreError::from(error)),
    };

    let token = match client.login(email.trim(), &password).await {
        Ok(token) => token,
        Err(error) => return client_error_response("login failed", error),
    };

    if let Err(error) = state.sessions.register(
        &token.access_token,
        client,
        Some(Duration::from_secs(token.expires_in)),
    ) {
        return store_error_response(error);
    }

    HttpResponse::Ok().json(LoginResponse {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
    })
}

#[get("/charging-status")]
async fn charging_status_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<TokenQuery>,
) -> HttpResponse {
    let client = match state.sessions.client_for_token(&query.token) {
        Ok(client) => client,
        Err(error) => return store_error_response(error),
    };

    let stations = match client.get_stations().await {
        Ok(stations) => stations,
        Err(error) => return client_error_response("failed to get charging status", error),
    };
    let sessions = match client.get_charging_sessions(true).await {
        Ok(sessions) => sessions,
        Err(error) => return client_error_response("failed to get charging status", error),
    };

    let (active_sessions, _) = partition_sessions(sessions);

    HttpResponse::Ok().json(ChargingStatusResponse {
        stations,
        total_active_sessions: active_sessions.len(),
        active_sessions,
    })
}

#[get("/stations")]
async fn stations_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<TokenQuery>,
) -> HttpResponse {
    let client = match state.sessions.client_for_token(&query.token) {
        Ok(client) => client,
        Err(error) => return store_error_response(error),
    };

    match client.get_stations().await {
        Ok(stations) => HttpResponse::Ok().json(StationsResponse { stations }),
        Err(error) => client_error_response("failed to get stations", error),
    }
}

#[get("/charging-sessions")]
async fn charging_sessions_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<SessionsQuery>,
) -> HttpResponse {
    let client = match state.sessions.client_for_token(&query.token) {
        Ok(client) => client,
        Err(error) => return store_error_response(error),
    };
    let include_momentary_speed = query.include_momentary_speed.unwrap_or(true);

    match client.get_charging_sessions(include_momentary_speed).await {
        Ok(charging_sessions) => {
            HttpResponse::Ok().json(ChargingSessionsResponse { charging_sessions })
        }
        Err(error) => client_error_response("failed to get charging sessions", error),
    }
}

#[get("/charging-sessions/accumulated/{station_id}")]
async fn accumulated_charging_endpoint(
    state: web::Data<ApiState>,
    station_id: web::Path<String>,
    query: web::Query<TokenQuery>,
) -> HttpResponse {
    let client = match state.sessions.client_for_token(&query.token) {
        Ok(client) => client,
        Err(error) => return store_error_response(error),
    };

    match client.get_accumulated_charging(&station_id).await {
        Ok(accumulated) => HttpResponse::Ok().json(accumulated),
        Err(error) => client_error_response("failed to get accumulated charging", error),
    }
}

fn client_error_response(context: &str, error: ElliClientError) -> HttpResponse {
    let (status, kind) = match &error {
        ElliClientError::Authentication { .. } => (StatusCode::UNAUTHORIZED, "authentication"),
        ElliClientError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
        ElliClientError::Remote { status, .. } if matches!(*status, 401 | 403) => {
            (StatusCode::UNAUTHORIZED, "remote")
        }
        ElliClientError::Remote { .. } => (StatusCode::BAD_GATEWAY, "remote"),
        ElliClientError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        ElliClientError::Transport(_) if error.is_timeout() => {
            (StatusCode::GATEWAY_TIMEOUT, "transport")
        }
        ElliClientError::Transport(_) => (StatusCode::BAD_GATEWAY, "transport"),
        ElliClientError::Decoding(_) => (StatusCode::BAD_GATEWAY, "decoding"),
    };

    if error.kind() == ErrorKind::Authentication {
        tracing::info!(error = %error, "{context}");
    } else {
        tracing::warn!(error = %error, status = status.as_u16(), "{context}");
    }

    error_response(status, kind, &format!("{context}: {error}"))
}

fn store_error_response(error: SessionStoreError) -> HttpResponse {
    tracing::error!(error = %error, "session store failure");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "session_store",
        &error.to_string(),
    )
}

fn error_response(status: StatusCode, kind: &str, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": message,
        "kind": kind,
    }))
}
