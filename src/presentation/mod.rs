//! Presentation Layer
//!
//! Console front end for the timer client.

pub mod console;

pub use console::{
    parse_console_line, read_console, spawn_stdin_lines, ConsoleExit, ConsoleInput,
    ConsoleObserver, ControlPanel,
};
