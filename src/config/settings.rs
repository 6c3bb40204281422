//! Client settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Timing device endpoint
    pub device: DeviceSettings,

    /// Liveness probing
    pub heartbeat: HeartbeatSettings,

    /// Reconnect schedule
    pub reconnect: ReconnectSettings,

    /// Elapsed-time display
    pub display: DisplaySettings,

    /// Current environment (development, production)
    pub environment: String,
}

/// Timing device endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSettings {
    /// WebSocket URL of the device (e.g., "ws://192.168.4.1/ws")
    pub url: String,

    /// Upper bound on a single connect attempt in milliseconds
    pub connect_timeout_ms: u64,
}

/// Heartbeat probe configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSettings {
    /// Time between probes in milliseconds (default: 5000)
    pub interval_ms: u64,

    /// Time allowed for the acknowledgment in milliseconds (default: 5000)
    pub timeout_ms: u64,

    /// Literal probe frame
    pub probe: String,

    /// Literal acknowledgment frame
    pub ack: String,
}

/// Reconnect delay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    /// Delay before the first reconnect attempt in milliseconds (default: 2000)
    pub delay_ms: u64,

    /// Cap for the doubling delay; equal to `delay_ms` for a constant delay
    pub max_delay_ms: u64,
}

/// Display tick configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySettings {
    /// Tick period in milliseconds (default: 100)
    pub tick_ms: u64,
}

pub const DEFAULT_DEVICE_URL: &str = "ws://192.168.4.1/ws";
pub const DEFAULT_PROBE: &str = "__ping__";
pub const DEFAULT_ACK: &str = "__pong__";

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml
    /// 3. config/{RUN_ENV}.toml
    /// 4. Environment variables (`TIMER__HEARTBEAT__INTERVAL_MS=...`, `DEVICE_URL`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("device.url", DEFAULT_DEVICE_URL)?
            .set_default("device.connect_timeout_ms", 10000_i64)?
            .set_default("heartbeat.interval_ms", 5000_i64)?
            .set_default("heartbeat.timeout_ms", 5000_i64)?
            .set_default("heartbeat.probe", DEFAULT_PROBE)?
            .set_default("heartbeat.ack", DEFAULT_ACK)?
            .set_default("reconnect.delay_ms", 2000_i64)?
            .set_default("reconnect.max_delay_ms", 2000_i64)?
            .set_default("display.tick_ms", 100_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // TIMER__DEVICE__URL=ws://timer.local/ws -> device.url
            .add_source(
                Environment::default()
                    .prefix("TIMER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("device.url", std::env::var("DEVICE_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.url.is_empty() {
            return Err(ConfigError::Message("device.url must not be empty".into()));
        }
        if self.device.connect_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "device.connect_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.heartbeat.interval_ms == 0 || self.heartbeat.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "heartbeat.interval_ms and heartbeat.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.heartbeat.probe.is_empty() || self.heartbeat.ack.is_empty() {
            return Err(ConfigError::Message(
                "heartbeat.probe and heartbeat.ack must not be empty".into(),
            ));
        }
        if self.heartbeat.probe == self.heartbeat.ack {
            return Err(ConfigError::Message(
                "heartbeat.probe and heartbeat.ack must differ".into(),
            ));
        }
        if self.reconnect.delay_ms == 0 {
            return Err(ConfigError::Message(
                "reconnect.delay_ms must be greater than zero".into(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.delay_ms {
            return Err(ConfigError::Message(format!(
                "reconnect.max_delay_ms ({}) must not be below reconnect.delay_ms ({})",
                self.reconnect.max_delay_ms, self.reconnect.delay_ms
            )));
        }
        if self.display.tick_ms == 0 {
            return Err(ConfigError::Message(
                "display.tick_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DeviceSettings {
                url: DEFAULT_DEVICE_URL.into(),
                connect_timeout_ms: 10_000,
            },
            heartbeat: HeartbeatSettings {
                interval_ms: 5_000,
                timeout_ms: 5_000,
                probe: DEFAULT_PROBE.into(),
                ack: DEFAULT_ACK.into(),
            },
            reconnect: ReconnectSettings {
                delay_ms: 2_000,
                max_delay_ms: 2_000,
            },
            display: DisplaySettings { tick_ms: 100 },
            environment: "development".into(),
        }
    }
}

impl DeviceSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl HeartbeatSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether a frame is one of the two liveness sentinels.
    pub fn is_sentinel(&self, frame: &str) -> bool {
        frame == self.probe || frame == self.ack
    }
}

impl ReconnectSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl DisplaySettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
