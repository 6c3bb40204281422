//! Outbound device commands.
//!
//! Each command travels as a JSON object with exactly one key, e.g.
//! `{"intensity":7}`. Values are forwarded as given; the device owns their
//! meaning.

use serde::Serialize;
use serde_json::Value;

use crate::shared::error::ClientError;

/// Single-key configuration command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Mode(String),
    Crossings(u32),
    Intensity(u32),
    AdcThreshold(u32),
    BeamCrossLockoutMs(u32),
}

/// Field names accepted by [`Command::from_field`].
pub const COMMAND_FIELDS: [&str; 5] = [
    "mode",
    "crossings",
    "intensity",
    "adc_threshold",
    "beam_cross_lockout_ms",
];

impl Command {
    /// Build a command from a field name and a JSON value.
    ///
    /// Numeric fields accept numbers or numeric strings, since slider
    /// widgets report their value as text.
    pub fn from_field(field: &str, value: Value) -> Result<Self, ClientError> {
        match field {
            "mode" => match value {
                Value::String(mode) => Ok(Self::Mode(mode)),
                other => Err(ClientError::invalid_value(
                    field,
                    format!("expected a string, got {other}"),
                )),
            },
            "crossings" => Ok(Self::Crossings(numeric(field, &value)?)),
            "intensity" => Ok(Self::Intensity(numeric(field, &value)?)),
            "adc_threshold" => Ok(Self::AdcThreshold(numeric(field, &value)?)),
            "beam_cross_lockout_ms" => Ok(Self::BeamCrossLockoutMs(numeric(field, &value)?)),
            unknown => Err(ClientError::UnknownField(unknown.to_string())),
        }
    }

    /// Lockout toggle: a disabled lockout is sent as 0 ms.
    pub fn lockout(enabled: bool, lockout_ms: u32) -> Self {
        Self::BeamCrossLockoutMs(if enabled { lockout_ms } else { 0 })
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Mode(_) => "mode",
            Self::Crossings(_) => "crossings",
            Self::Intensity(_) => "intensity",
            Self::AdcThreshold(_) => "adc_threshold",
            Self::BeamCrossLockoutMs(_) => "beam_cross_lockout_ms",
        }
    }

    /// Wire form of the command.
    pub fn to_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(|e| ClientError::invalid_value(self.field(), e.to_string()))
    }
}

fn numeric(field: &str, value: &Value) -> Result<u32, ClientError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            ClientError::invalid_value(field, format!("expected a non-negative integer, got {value}"))
        })
}
