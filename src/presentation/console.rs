//! Console Front End
//!
//! Headless counterpart of the device's web page: connection banners go to
//! the log, the running display is written line by line, and device
//! settings are mirrored into a [`ControlPanel`] that is only "enabled"
//! while connected.

use std::io::{BufRead, Write};

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::application::services::{ConnectionHandle, DisconnectReason};
use crate::application::ClientObserver;
use crate::domain::{Command, DecodedStatus, DeviceConfigEcho};
use crate::shared::error::ClientError;

/// Mirror of the device's configuration controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlPanel {
    pub controls_enabled: bool,
    pub mode: Option<Value>,
    pub crossings: Option<Value>,
    pub intensity: Option<Value>,
    pub adc_threshold: Option<Value>,
    pub beam_cross_lockout_ms: Option<Value>,
    pub display: Option<String>,
    pub display_micros: Option<u64>,
    /// Latest device diagnostics (counter, samples, adc_value, state, ...)
    pub data: Map<String, Value>,
}

impl ControlPanel {
    /// Copy every field the device reported; absent fields keep their value.
    pub fn mirror(&mut self, echo: &DeviceConfigEcho) {
        let pairs = [
            (&mut self.mode, &echo.mode),
            (&mut self.crossings, &echo.crossings),
            (&mut self.intensity, &echo.intensity),
            (&mut self.adc_threshold, &echo.adc_threshold),
            (&mut self.beam_cross_lockout_ms, &echo.beam_cross_lockout_ms),
        ];
        for (slot, reported) in pairs {
            if let Some(value) = reported {
                *slot = Some(value.clone());
            }
        }
    }
}

pub struct ConsoleObserver<W: Write + Send> {
    writer: W,
    panel: ControlPanel,
}

impl ConsoleObserver<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            panel: ControlPanel::default(),
        }
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> ClientObserver for ConsoleObserver<W> {
    fn on_connected(&mut self) {
        self.panel.controls_enabled = true;
        tracing::info!("Timer connection opened");
    }

    fn on_disconnected(&mut self, reason: &DisconnectReason) {
        self.panel.controls_enabled = false;
        tracing::warn!(reason = %reason, "Timer connection closed");
    }

    fn on_heartbeat_timeout(&mut self) {
        tracing::warn!("Timer heartbeat timeout");
    }

    fn on_status(&mut self, status: &DecodedStatus) {
        self.panel.mirror(&status.config);
        self.panel.data = status.extra.clone();
        match serde_json::to_string(&status.extra) {
            Ok(data) => tracing::debug!(kind = %status.kind, data = %data, "Device status"),
            Err(e) => tracing::debug!(error = %e, "Status not printable"),
        }
    }

    fn on_display_tick(&mut self, formatted: &str, raw_micros: u64) {
        self.panel.display = Some(formatted.to_string());
        self.panel.display_micros = Some(raw_micros);
        if let Err(e) = writeln!(self.writer, "{formatted}  ({raw_micros} us)") {
            tracing::debug!(error = %e, "Display write failed");
        }
    }

    fn on_command_dropped(&mut self, command: &Command) {
        tracing::warn!(field = command.field(), "Not connected, command discarded");
    }
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Send(Command),
    Reconnect,
    Quit,
}

/// How the console reader ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    EndOfInput,
}

pub const CONSOLE_HELP: &str = "commands: mode <name> | crossings <n> | intensity <n> | \
threshold <n> | lockout <ms>|on <ms>|off | reconnect | quit";

/// Parse one console line; blank lines yield `None`.
pub fn parse_console_line(line: &str) -> Result<Option<ConsoleInput>, ClientError> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let input = match (keyword.to_lowercase().as_str(), args.as_slice()) {
        ("quit" | "exit", []) => ConsoleInput::Quit,
        ("reconnect", []) => ConsoleInput::Reconnect,
        ("mode", [mode]) => ConsoleInput::Send(Command::Mode((*mode).to_string())),
        ("crossings", [n]) => ConsoleInput::Send(numeric_command("crossings", n)?),
        ("intensity", [n]) => ConsoleInput::Send(numeric_command("intensity", n)?),
        ("threshold" | "adc_threshold", [n]) => {
            ConsoleInput::Send(numeric_command("adc_threshold", n)?)
        }
        ("lockout", ["off"]) => ConsoleInput::Send(Command::lockout(false, 0)),
        ("lockout", ["on", n]) | ("lockout", [n]) => {
            ConsoleInput::Send(numeric_command("beam_cross_lockout_ms", n)?)
        }
        (keyword, _) => {
            return Err(ClientError::invalid_value(
                keyword,
                format!("unrecognised input, {CONSOLE_HELP}"),
            ))
        }
    };
    Ok(Some(input))
}

fn numeric_command(field: &str, arg: &str) -> Result<Command, ClientError> {
    Command::from_field(field, Value::String(arg.to_string()))
}

/// Forward stdin lines from a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it lives on a plain thread
/// that never holds up runtime shutdown. The channel closes at end of input.
pub fn spawn_stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Stdin read failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Read console lines and forward them to the connection manager.
pub async fn read_console(
    mut lines: mpsc::UnboundedReceiver<String>,
    handle: ConnectionHandle,
) -> Result<ConsoleExit, ClientError> {
    while let Some(line) = lines.recv().await {
        match parse_console_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleInput::Quit)) => return Ok(ConsoleExit::Quit),
            Ok(Some(ConsoleInput::Reconnect)) => handle.close()?,
            Ok(Some(ConsoleInput::Send(command))) => handle.send_command(command)?,
            Err(e) => tracing::warn!(error = %e, "Ignoring console input"),
        }
    }

    Ok(ConsoleExit::EndOfInput)
}
