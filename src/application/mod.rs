//! Application Layer
//!
//! Services that keep the device link alive and the display in step with it.

pub mod observer;
pub mod services;

pub use observer::ClientObserver;
