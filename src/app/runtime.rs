use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::session_store::InMemorySessionStore;

pub fn build_state(config: &AppConfig) -> ApiState {
    let client_config = config.client_config();
    let sessions = Arc::new(InMemorySessionStore::new(
        client_config.clone(),
        config.session_policy(),
    ));

    ApiState {
        sessions,
        client_config,
    }
}

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_header(header::CONTENT_TYPE)
            .max_age(3600),
        None => Cors::default(),
    }
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let api_state = build_state(&config);

    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            let cors_origin = config.cors_allowed_origin.clone();
            HttpServer::new(move || {
                App::new()
                    .wrap(cors(cors_origin.as_deref()))
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::runtime)
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web};

    use crate::adapters::api::configure_routes;
    use crate::app::config::AppConfig;
    use crate::app::session_store::ClientSessionStore;

    use super::{build_state, cors};

    fn config() -> AppConfig {
        AppConfig {
            elli_base_url: "http://127.0.0.1:9".to_string(),
            http_bind: "127.0.0.1:0".to_string(),
            auth_timeout_ms: 100,
            data_timeout_ms: 100,
            session_ttl_seconds: 60,
            session_max_entries: 4,
            cors_allowed_origin: Some("https://dashboard.local".to_string()),
        }
    }

    #[actix_web::test]
    async fn built_state_serves_routes_with_cors() {
        let config = config();
        let app = test::init_service(
            App::new()
                .wrap(cors(config.cors_allowed_origin.as_deref()))
                .app_data(web::Data::new(build_state(&config)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header((header::ORIGIN, "https://dashboard.local"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("https://dashboard.local")
        );
    }

    #[actix_web::test]
    async fn built_state_uses_configured_upstream() {
        let state = build_state(&config());

        assert_eq!(state.client_config.base_url, "http://127.0.0.1:9");
        assert_eq!(state.sessions.len().expect("len"), 0);
    }
}
