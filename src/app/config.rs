use std::time::Duration;

use crate::adapters::elli_client::{DEFAULT_BASE_URL, ElliClientConfig};
use crate::app::AppError;
use crate::app::session_store::{
    DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL, MAX_SESSION_TTL, SessionStorePolicy,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub elli_base_url: String,
    pub http_bind: String,
    pub auth_timeout_ms: u64,
    pub data_timeout_ms: u64,
    pub session_ttl_seconds: u64,
    pub session_max_entries: usize,
    pub cors_allowed_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            elli_base_url: non_empty(&lookup, "ELLI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http_bind: non_empty(&lookup, "HTTP_BIND")
                .unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            auth_timeout_ms: parse_or_default(&lookup, "ELLI_AUTH_TIMEOUT_MS", 5000_u64)?,
            data_timeout_ms: parse_or_default(&lookup, "ELLI_DATA_TIMEOUT_MS", 15000_u64)?,
            session_ttl_seconds: parse_or_default(
                &lookup,
                "SESSION_TTL_SECONDS",
                DEFAULT_SESSION_TTL.as_secs(),
            )?,
            session_max_entries: parse_or_default(
                &lookup,
                "SESSION_MAX_ENTRIES",
                DEFAULT_MAX_SESSIONS,
            )?,
            cors_allowed_origin: non_empty(&lookup, "CORS_ALLOWED_ORIGIN"),
        };

        if config.auth_timeout_ms == 0 || config.data_timeout_ms == 0 {
            return Err(AppError::config("request timeouts must be greater than zero"));
        }
        if config.session_ttl_seconds == 0
            || config.session_ttl_seconds > MAX_SESSION_TTL.as_secs()
        {
            return Err(AppError::config(format!(
                "SESSION_TTL_SECONDS must be between 1 and {}",
                MAX_SESSION_TTL.as_secs()
            )));
        }
        if config.session_max_entries == 0 {
            return Err(AppError::config("SESSION_MAX_ENTRIES must be at least 1"));
        }

        Ok(config)
    }

    pub fn client_config(&self) -> ElliClientConfig {
        ElliClientConfig {
            base_url: self.elli_base_url.clone(),
            auth_timeout: Duration::from_millis(self.auth_timeout_ms),
            data_timeout: Duration::from_millis(self.data_timeout_ms),
        }
    }

    pub fn session_policy(&self) -> SessionStorePolicy {
        SessionStorePolicy {
            ttl: Duration::from_secs(self.session_ttl_seconds),
            max_entries: self.session_max_entries,
        }
    }
}

/// Account used by the `elli_demo` binary.
#[derive(Clone)]
pub struct DemoCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for DemoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoCredentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl DemoCredentials {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (
            non_empty(&lookup, "ELLI_EMAIL"),
            lookup("ELLI_PASSWORD").filter(|v| !v.is_empty()),
        ) {
            (Some(email), Some(password)) => Ok(Self { email, password }),
            _ => Err(AppError::config(
                "ELLI_EMAIL and ELLI_PASSWORD must be set (a .env file is read if present)",
            )),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{AppConfig, DemoCredentials};

    #[test]
    fn applies_defaults_for_optional_fields() {
        let result = AppConfig::from_lookup(|_| None).expect("config should be valid");

        assert_eq!(result.elli_base_url, "https://api.elli.eco");
        assert_eq!(result.http_bind, "0.0.0.0:8000");
        assert_eq!(result.auth_timeout_ms, 5000);
        assert_eq!(result.data_timeout_ms, 15000);
        assert_eq!(result.session_ttl_seconds, 3600);
        assert_eq!(result.session_max_entries, 1000);
        assert_eq!(result.cors_allowed_origin, None);
    }

    #[test]
    fn builds_client_config_and_session_policy() {
        let result = AppConfig::from_lookup(|key| match key {
            "ELLI_BASE_URL" => Some(" http://localhost:9000 ".to_string()),
            "ELLI_AUTH_TIMEOUT_MS" => Some("1500".to_string()),
            "SESSION_TTL_SECONDS" => Some("60".to_string()),
            "SESSION_MAX_ENTRIES" => Some("5".to_string()),
            "CORS_ALLOWED_ORIGIN" => Some("https://dashboard.local".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        let client = result.client_config();
        assert_eq!(client.base_url, "http://localhost:9000");
        assert_eq!(client.auth_timeout, Duration::from_millis(1500));
        assert_eq!(client.data_timeout, Duration::from_secs(15));

        let policy = result.session_policy();
        assert_eq!(policy.ttl, Duration::from_secs(60));
        assert_eq!(policy.max_entries, 5);
        assert_eq!(
            result.cors_allowed_origin.as_deref(),
            Some("https://dashboard.local")
        );
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let result = AppConfig::from_lookup(|key| match key {
            "ELLI_DATA_TIMEOUT_MS" => Some("abc".to_string()),
            _ => None,
        });

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: ELLI_DATA_TIMEOUT_MS must be a valid number"
        );
    }

    #[test]
    fn rejects_zero_timeouts() {
        let result = AppConfig::from_lookup(|key| match key {
            "ELLI_AUTH_TIMEOUT_MS" => Some("0".to_string()),
            _ => None,
        });

        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_session_ttl() {
        for raw in ["18446744073709551615", "31536001", "0"] {
            let result = AppConfig::from_lookup(|key| match key {
                "SESSION_TTL_SECONDS" => Some(raw.to_string()),
                _ => None,
            });

            assert_eq!(
                result.expect_err("ttl must be rejected").to_string(),
                "invalid configuration: SESSION_TTL_SECONDS must be between 1 and 31536000"
            );
        }

        let longest = AppConfig::from_lookup(|key| match key {
            "SESSION_TTL_SECONDS" => Some("31536000".to_string()),
            _ => None,
        })
        .expect("one year is accepted");
        assert_eq!(longest.session_ttl_seconds, 31_536_000);
    }

    #[test]
    fn demo_credentials_require_both_values() {
        let missing = DemoCredentials::from_lookup(|key| match key {
            "ELLI_EMAIL" => Some("driver@example.com".to_string()),
            _ => None,
        });
        assert!(missing.is_err());

        let credentials = DemoCredentials::from_lookup(|key| match key {
            "ELLI_EMAIL" => Some("driver@example.com".to_string()),
            "ELLI_PASSWORD" => Some("secret".to_string()),
            _ => None,
        })
        .expect("credentials should be valid");
        assert_eq!(credentials.email, "driver@example.com");
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
