//! Shared Utilities
//!
//! Common utilities used across all layers.

pub mod backoff;
pub mod error;

pub use backoff::ReconnectBackoff;
pub use error::{ClientError, DecodeError, TransportError};
