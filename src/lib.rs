//! Bridge between a BLE command characteristic and a TCP command interpreter.
//!
//! A wireless client writes ASCII commands; each one is forwarded to the
//! interpreter over TCP, the prompt-terminated reply is read back, its
//! command echo removed, and the result is returned as a paced series of
//! notifications.

pub mod domain;
pub mod infrastructure;

pub use domain::error::{BridgeError, BridgeResult};
pub use infrastructure::bluetooth::{BridgeHandle, BridgeService, StdioLink, WirelessLink};
pub use infrastructure::tcp::{ResponseReader, StreamSession};
