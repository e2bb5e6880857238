//! Bluetooth Module
//!
//! Wireless side of the bridge: GATT layout, the radio boundary and the
//! controller that runs command exchanges.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  BridgeEvent   ┌──────────────────────────────────┐
//! │ Radio      │ ─────────────▶ │          BridgeService           │
//! │ (GATT)     │                │ ensure_connected → write → read  │
//! │            │ ◀───────────── │ → echo::clean → chunker.send     │
//! └────────────┘  notify()      └───────────────┬──────────────────┘
//!                                               │ TCP
//!                                               ▼
//!                                        ┌─────────────┐
//!                                        │ Interpreter │
//!                                        └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Service and characteristic UUIDs
//! - [`link`] - Radio boundary trait and a stdio stand-in
//! - [`service`] - Bridge controller and its submission handle

pub mod link;
pub mod protocol;
pub mod service;

pub use link::{StdioLink, WirelessLink};
pub use service::{BridgeHandle, BridgeService};
