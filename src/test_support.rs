use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::adapters::elli_client::{ElliClient, ElliClientConfig};

pub fn client_config(server: &MockServer) -> ElliClientConfig {
    ElliClientConfig {
        base_url: server.uri(),
        auth_timeout: Duration::from_secs(2),
        data_timeout: Duration::from_secs(2),
    }
}

pub fn authenticated_client(server: &MockServer) -> ElliClient {
    ElliClient::with_access_token(&client_config(server), "test-token")
        .expect("client should build")
}

pub async fn mount_login(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/identity/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": format!("refresh-{access_token}"),
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

pub fn sample_stations_payload() -> Value {
    json!([
        {
            "id": "S1",
            "name": "Garage",
            "model": "Elli Charger Pro",
            "serial_number": "EL-0001",
            "firmware_version": "2.4.1"
        },
        {
            "id": "S2",
            "name": "Carport",
            "model": "Elli Charger Connect",
            "serial_number": "EL-0002"
        }
    ])
}

/// One open session on `S1` and one finished session on `S2`.
pub fn sample_sessions_payload() -> Value {
    json!([
        {
            "id": "sess-active",
            "station_id": "S1",
            "start_date_time": "2026-02-20T18:00:00Z",
            "end_date_time": null,
            "accumulated_energy_wh": 5300,
            "momentary_charging_speed_watts": 7200,
            "status": "CHARGING"
        },
        {
            "id": "sess-done",
            "station_id": "S2",
            "start_date_time": "2026-02-19T18:00:00Z",
            "end_date_time": "2026-02-19T21:30:00Z",
            "accumulated_energy_wh": 21000,
            "status": "COMPLETED"
        }
    ])
}
