//! Device status frames.
//!
//! The device pushes a JSON object roughly every 100 ms. Only `msg` and the
//! `start`/`finish` timestamps carry meaning for the client; everything else
//! is passed through untouched.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::shared::error::DecodeError;

/// Kind of status message reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Running,
    Finish,
    Ready,
    Other(String),
}

impl StatusKind {
    /// Parse a `msg` value.
    ///
    /// Accepts the protocol names and the firmware's own labels
    /// (`Timer running`, `Finish`, `Ready`), case-insensitively.
    pub fn parse(msg: &str) -> Self {
        match msg.trim().to_lowercase().as_str() {
            "running" | "timer running" => Self::Running,
            "finish" => Self::Finish,
            "ready" => Self::Ready,
            _ => Self::Other(msg.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Finish => "finish",
            Self::Ready => "ready",
            Self::Other(msg) => msg,
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration fields echoed back by the device, kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceConfigEcho {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adc_threshold: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beam_cross_lockout_ms: Option<Value>,
}

/// One decoded inbound status frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedStatus {
    pub kind: StatusKind,
    /// Device timestamp of the run start, in microseconds
    pub start: Option<u64>,
    /// Device timestamp of the run finish, in microseconds
    pub finish: Option<u64>,
    pub config: DeviceConfigEcho,
    /// Remaining device fields (counter, samples, adc_value, state, ...)
    pub extra: Map<String, Value>,
}

impl DecodedStatus {
    /// Authoritative run duration from the device clock.
    ///
    /// `None` unless both timestamps are present and ordered.
    pub fn elapsed_micros(&self) -> Option<u64> {
        match (self.start, self.finish) {
            (Some(start), Some(finish)) => finish.checked_sub(start),
            _ => None,
        }
    }
}

/// Decode a non-sentinel text frame.
pub fn decode_status(text: &str) -> Result<DecodedStatus, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let kind = match fields.remove("msg") {
        Some(Value::String(msg)) => StatusKind::parse(&msg),
        Some(_) => return Err(DecodeError::InvalidField("msg")),
        None => return Err(DecodeError::MissingField("msg")),
    };

    let start = take_timestamp(&mut fields, "start")?;
    let finish = take_timestamp(&mut fields, "finish")?;

    if kind == StatusKind::Finish {
        match (start, finish) {
            (Some(start), Some(finish)) if finish < start => {
                return Err(DecodeError::FinishBeforeStart { start, finish });
            }
            (Some(_), Some(_)) => {}
            (None, _) => return Err(DecodeError::MissingField("start")),
            (_, None) => return Err(DecodeError::MissingField("finish")),
        }
    }

    let config = DeviceConfigEcho {
        mode: fields.remove("mode"),
        crossings: fields.remove("crossings"),
        intensity: fields.remove("intensity"),
        adc_threshold: fields.remove("adc_threshold"),
        beam_cross_lockout_ms: fields.remove("beam_cross_lockout_ms"),
    };

    Ok(DecodedStatus {
        kind,
        start,
        finish,
        config,
        extra: fields,
    })
}

fn take_timestamp(
    fields: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Option<u64>, DecodeError> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or(DecodeError::InvalidField(key)),
    }
}
