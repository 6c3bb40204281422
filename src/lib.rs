//! # MGK Timer Client Library
//!
//! Live client for a laser-gate timing device that publishes its state
//! over a WebSocket:
//! - Single managed connection with automatic reconnect
//! - Application-level heartbeat with forced close on silence
//! - Running elapsed-time display driven by device status frames
//! - Configuration commands sent back to the device
//!
//! ## Module Structure
//!
//! ```text
//! mgk_timer_client/
//! +-- config/         Configuration management
//! +-- domain/         Status frames, commands, duration formatting
//! +-- application/    Connection manager, heartbeat, display driver
//! +-- infrastructure/ WebSocket transport
//! +-- presentation/   Console front end
//! +-- shared/         Errors and reconnect backoff
//! ```

// Configuration module
pub mod config;

// Domain layer - protocol values
pub mod domain;

// Application layer - connection lifecycle and timing
pub mod application;

// Infrastructure layer - transport implementations
pub mod infrastructure;

// Presentation layer - console front end
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup
pub mod startup;

// Telemetry and logging
pub mod telemetry;
