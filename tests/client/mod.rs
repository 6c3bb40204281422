//! Client Tests
//!
//! End-to-end tests of the timer client against a scripted device.

mod display_tests;
