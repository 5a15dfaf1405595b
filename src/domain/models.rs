use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingSession {
    pub id: String,
    pub station_id: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub accumulated_energy_wh: Option<f64>,
    pub momentary_charging_speed_watts: Option<f64>,
    pub status: Option<String>,
}

impl ChargingSession {
    /// A session without an end timestamp is still charging.
    pub fn is_active(&self) -> bool {
        self.end_date_time.is_none()
    }
}

/// Splits sessions into `(active, completed)`, keeping vendor order in both.
pub fn partition_sessions(
    sessions: Vec<ChargingSession>,
) -> (Vec<ChargingSession>, Vec<ChargingSession>) {
    sessions.into_iter().partition(ChargingSession::is_active)
}

pub const ACCUMULATED_ENERGY_KEY: &str = "accumulated_energy_wh";
pub const MOMENTARY_SPEED_KEY: &str = "momentary_charging_speed_watts";
pub const START_DATE_TIME_KEY: &str = "start_date_time";

/// Vendor running totals for a station. The key set shrinks when no session
/// is active, so every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct AccumulatedCharging(Map<String, Value>);

impl AccumulatedCharging {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn accumulated_energy_wh(&self) -> Option<f64> {
        self.0.get(ACCUMULATED_ENERGY_KEY).and_then(Value::as_f64)
    }

    pub fn momentary_charging_speed_watts(&self) -> Option<f64> {
        self.0.get(MOMENTARY_SPEED_KEY).and_then(Value::as_f64)
    }

    pub fn start_date_time(&self) -> Option<&str> {
        self.0.get(START_DATE_TIME_KEY).and_then(Value::as_str)
    }

    pub fn has_active_session(&self) -> bool {
        self.accumulated_energy_wh().is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{AccumulatedCharging, ChargingSession, partition_sessions};

    fn session(id: &str, ended: bool) -> ChargingSession {
        ChargingSession {
            id: id.to_string(),
            station_id: "S1".to_string(),
            start_date_time: Utc.with_ymd_and_hms(2026, 2, 20, 10, 0, 0).unwrap(),
            end_date_time: ended.then(|| Utc.with_ymd_and_hms(2026, 2, 20, 11, 0, 0).unwrap()),
            accumulated_energy_wh: None,
            momentary_charging_speed_watts: None,
            status: None,
        }
    }

    #[test]
    fn partition_is_exhaustive_and_keeps_order() {
        let sessions = vec![
            session("a", true),
            session("b", false),
            session("c", true),
            session("d", false),
        ];

        let (active, completed) = partition_sessions(sessions);

        let active_ids: Vec<&str> = active.iter().map(|s| s.id.as_str()).collect();
        let completed_ids: Vec<&str> = completed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(active_ids, vec!["b", "d"]);
        assert_eq!(completed_ids, vec!["a", "c"]);
        assert!(active.iter().all(ChargingSession::is_active));
        assert!(!completed.iter().any(ChargingSession::is_active));
    }

    #[test]
    fn accumulated_accessors_read_optional_keys() {
        let idle = AccumulatedCharging::new(
            json!({"station_id": "S1"})
                .as_object()
                .cloned()
                .expect("object literal"),
        );
        assert!(!idle.has_active_session());
        assert_eq!(idle.momentary_charging_speed_watts(), None);

        let active = AccumulatedCharging::new(
            json!({
                "accumulated_energy_wh": 4200,
                "momentary_charging_speed_watts": 11000.5,
                "start_date_time": "2026-02-20T10:00:00Z"
            })
            .as_object()
            .cloned()
            .expect("object literal"),
        );
        assert!(active.has_active_session());
        assert_eq!(active.accumulated_energy_wh(), Some(4200.0));
        assert_eq!(active.momentary_charging_speed_watts(), Some(11000.5));
        assert_eq!(active.start_date_time(), Some("2026-02-20T10:00:00Z"));
    }

    #[test]
    fn accumulated_serializes_as_plain_object() {
        let value = AccumulatedCharging::new(
            json!({"accumulated_energy_wh": 10})
                .as_object()
                .cloned()
                .expect("object literal"),
        );

        let encoded = serde_json::to_value(&value).expect("serializes");

        assert_eq!(encoded, json!({"accumulated_energy_wh": 10}));
    }
}
