//! Domain Layer
//!
//! Protocol values and timing state, free of any I/O.

pub mod command;
pub mod duration;
pub mod status;
pub mod timer;

pub use command::{Command, COMMAND_FIELDS};
pub use duration::format_micros;
pub use status::{decode_status, DecodedStatus, DeviceConfigEcho, StatusKind};
pub use timer::TimerSession;
