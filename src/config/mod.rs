//! # Configuration Module
//!
//! This module handles client configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with TIMER__, plus DEVICE_URL)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mgk_timer_client::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Connecting to {}", settings.device.url);
//! ```

mod settings;

pub use settings::*;
