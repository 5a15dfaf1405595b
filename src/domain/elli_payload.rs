use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::domain::models::{
    ACCUMULATED_ENERGY_KEY, AccumulatedCharging, ChargingSession, MOMENTARY_SPEED_KEY,
    START_DATE_TIME_KEY, Station, TokenResponse,
};

const TOKEN_RECORD: &str = "token";
const STATION_RECORD: &str = "station";
const SESSION_RECORD: &str = "charging_session";
const ACCUMULATED_RECORD: &str = "accumulated_charging";

const LIST_WRAPPER_KEYS: &[&str] = &["data", "items"];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodingError {
    #[error("{record} payload must be a JSON {expected}")]
    InvalidPayloadType {
        record: String,
        expected: &'static str,
    },
    #[error("{record} payload is missing required field `{field}`")]
    MissingField { record: String, field: &'static str },
    #[error("{record} field `{field}` {reason}")]
    InvalidField {
        record: String,
        field: &'static str,
        reason: String,
    },
}

impl DecodingError {
    pub fn record(&self) -> &str {
        match self {
            Self::InvalidPayloadType { record, .. }
            | Self::MissingField { record, .. }
            | Self::InvalidField { record, .. } => record,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPayloadType { .. } => None,
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => Some(*field),
        }
    }
}

pub fn parse_token_response(payload: &Value) -> Result<TokenResponse, DecodingError> {
    let record = TOKEN_RECORD.to_string();
    let object = as_object(payload, &record)?;

    let access_token = required_string(object, &record, "access_token")?;
    let refresh_token = optional_string(object, &record, "refresh_token")?;
    let token_type = required_string(object, &record, "token_type")?;
    let expires_in = required_number(object, &record, "expires_in")?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type,
        expires_in: expires_in.floor() as u64,
    })
}

pub fn parse_stations(payload: &Value) -> Result<Vec<Station>, DecodingError> {
    list_items(payload, STATION_RECORD, "stations")?
        .iter()
        .enumerate()
        .map(|(index, item)| parse_station_at(item, format!("{STATION_RECORD}[{index}]")))
        .collect()
}

pub fn parse_station(payload: &Value) -> Result<Station, DecodingError> {
    parse_station_at(payload, STATION_RECORD.to_string())
}

fn parse_station_at(payload: &Value, record: String) -> Result<Station, DecodingError> {
    let object = as_object(payload, &record)?;

    Ok(Station {
        id: required_string(object, &record, "id")?,
        name: optional_string(object, &record, "name")?,
        model: optional_string(object, &record, "model")?,
        serial_number: optional_string(object, &record, "serial_number")?,
        firmware_version: optional_string(object, &record, "firmware_version")?,
    })
}

pub fn parse_charging_sessions(
    payload: &Value,
    include_momentary_speed: bool,
) -> Result<Vec<ChargingSession>, DecodingError> {
    list_items(payload, SESSION_RECORD, "charging_sessions")?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            parse_charging_session_at(
                item,
                format!("{SESSION_RECORD}[{index}]"),
                include_momentary_speed,
            )
        })
        .collect()
}

pub fn parse_charging_session(
    payload: &Value,
    include_momentary_speed: bool,
) -> Result<ChargingSession, DecodingError> {
    parse_charging_session_at(payload, SESSION_RECORD.to_string(), include_momentary_speed)
}

fn parse_charging_session_at(
    payload: &Value,
    record: String,
    include_momentary_speed: bool,
) -> Result<ChargingSession, DecodingError> {
    let object = as_object(payload, &record)?;

    let start_date_time = optional_timestamp(object, &record, "start_date_time")?
        .ok_or_else(|| DecodingError::MissingField {
            record: record.clone(),
            field: "start_date_time",
        })?;

    let momentary_charging_speed_watts = if include_momentary_speed {
        optional_number(object, &record, "momentary_charging_speed_watts")?
    } else {
        None
    };

    let status = optional_string(object, &record, "status")?;

    Ok(ChargingSession {
        id: required_string(object, &record, "id")?,
        station_id: required_string(object, &record, "station_id")?,
        start_date_time,
        end_date_time: optional_timestamp(object, &record, "end_date_time")?,
        accumulated_energy_wh: optional_number(object, &record, "accumulated_energy_wh")?,
        momentary_charging_speed_watts,
        status: (!status.is_empty()).then_some(status),
    })
}

/// Keeps the vendor object as-is apart from the documented keys, which are
/// moved to their snake_case spelling and checked for type. Values that are
/// already valid are passed through untouched; numeric strings become numbers.
pub fn parse_accumulated_charging(payload: &Value) -> Result<AccumulatedCharging, DecodingError> {
    let record = ACCUMULATED_RECORD.to_string();
    if payload.is_null() {
        return Ok(AccumulatedCharging::default());
    }
    let mut fields = as_object(payload, &record)?.clone();

    for field in [ACCUMULATED_ENERGY_KEY, MOMENTARY_SPEED_KEY] {
        let Some(number) = optional_number(&fields, &record, field)? else {
            remove_aliases(&mut fields, field);
            continue;
        };
        let value = match find_value(&fields, &[field]) {
            Some(Value::Number(original)) => Value::Number(original.clone()),
            _ => Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| DecodingError::InvalidField {
                    record: record.clone(),
                    field,
                    reason: "must be a finite number".to_string(),
                })?,
        };
        canonicalize_key(&mut fields, field, value);
    }

    if optional_timestamp(&fields, &record, START_DATE_TIME_KEY)?.is_some()
        && let Some(started) = find_value(&fields, &[START_DATE_TIME_KEY]).cloned()
    {
        canonicalize_key(&mut fields, START_DATE_TIME_KEY, started);
    }

    Ok(AccumulatedCharging::new(fields))
}

fn canonicalize_key(fields: &mut Map<String, Value>, canonical: &'static str, value: Value) {
    remove_aliases(fields, canonical);
    fields.insert(canonical.to_string(), value);
}

fn remove_aliases(fields: &mut Map<String, Value>, canonical: &str) {
    let normalized = normalize_key(canonical);
    fields.retain(|key, _| normalize_key(key) != normalized);
}

fn as_object<'a>(
    payload: &'a Value,
    record: &str,
) -> Result<&'a Map<String, Value>, DecodingError> {
    payload
        .as_object()
        .ok_or_else(|| DecodingError::InvalidPayloadType {
            record: record.to_string(),
            expected: "object",
        })
}

fn list_items<'a>(
    payload: &'a Value,
    record: &str,
    plural_key: &str,
) -> Result<&'a Vec<Value>, DecodingError> {
    let invalid = || DecodingError::InvalidPayloadType {
        record: record.to_string(),
        expected: "array",
    };

    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(object) => {
            let mut keys = vec![plural_key];
            keys.extend_from_slice(LIST_WRAPPER_KEYS);
            find_value(object, &keys)
                .and_then(Value::as_array)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn required_string(
    object: &Map<String, Value>,
    record: &str,
    field: &'static str,
) -> Result<String, DecodingError> {
    let value = optional_string(object, record, field)?;
    if value.is_empty() {
        return Err(DecodingError::MissingField {
            record: record.to_string(),
            field,
        });
    }
    Ok(value)
}

fn optional_string(
    object: &Map<String, Value>,
    record: &str,
    field: &'static str,
) -> Result<String, DecodingError> {
    match find_value(object, &[field]) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::Bool(flag)) => Ok(flag.to_string()),
        Some(_) => Err(DecodingError::InvalidField {
            record: record.to_string(),
            field,
            reason: "must be a string".to_string(),
        }),
    }
}

fn required_number(
    object: &Map<String, Value>,
    record: &str,
    field: &'static str,
) -> Result<f64, DecodingError> {
    optional_number(object, record, field)?.ok_or_else(|| DecodingError::MissingField {
        record: record.to_string(),
        field,
    })
}

fn optional_number(
    object: &Map<String, Value>,
    record: &str,
    field: &'static str,
) -> Result<Option<f64>, DecodingError> {
    let invalid = |reason: &str| DecodingError::InvalidField {
        record: record.to_string(),
        field,
        reason: reason.to_string(),
    };

    let number = match find_value(object, &[field]) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64().ok_or_else(|| invalid("is not a number"))?,
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("is not a number"))?,
        Some(_) => return Err(invalid("is not a number")),
    };

    if !number.is_finite() {
        return Err(invalid("must be a finite number"));
    }
    if number < 0.0 {
        return Err(invalid("must not be negative"));
    }

    Ok(Some(number))
}

fn optional_timestamp(
    object: &Map<String, Value>,
    record: &str,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, DecodingError> {
    let invalid = || DecodingError::InvalidField {
        record: record.to_string(),
        field,
        reason: "is not an ISO 8601 timestamp".to_string(),
    };

    match find_value(object, &[field]) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => parse_timestamp(text.trim()).map(Some).ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Offset-less timestamps are reported in UTC.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn find_value<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = object.get(*alias) {
            return Some(value);
        }
    }

    let normalized_aliases: Vec<String> =
        aliases.iter().map(|alias| normalize_key(alias)).collect();

    object.iter().find_map(|(key, value)| {
        let normalized_key = normalize_key(key);
        normalized_aliases
            .iter()
            .any(|alias| alias == &normalized_key)
            .then_some(value)
    })
}

fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|char| char.is_ascii_alphanumeric())
        .flat_map(|char| char.to_lowercase())
        .collect()
}
