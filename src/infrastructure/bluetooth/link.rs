//! Radio Stack Boundary
//!
//! The bridge does not drive a radio itself. Whatever owns the GATT server
//! implements [`WirelessLink`] for the outbound side and feeds inbound
//! events through a [`BridgeHandle`](super::service::BridgeHandle).

use crate::domain::error::{BridgeError, BridgeResult};
use crate::infrastructure::bluetooth::protocol::RadioConfig;
use std::io::Write;
use tracing::{debug, info};

/// Outbound half of the wireless transport
pub trait WirelessLink: Send {
    /// Register the service layout, device name and pairing code with the
    /// radio stack. Called once before the first advertisement.
    fn configure(&mut self, radio: &RadioConfig) -> BridgeResult<()>;

    /// Send one fragment as a notification on the response characteristic
    fn notify(&mut self, fragment: &[u8]) -> BridgeResult<()>;

    /// Make the device discoverable so a new client can bind
    fn start_advertising(&mut self) -> BridgeResult<()>;
}

/// Line-oriented stand-in for a radio: fragments go to a writer as-is.
pub struct StdioLink<W: Write + Send> {
    out: W,
    radio: Option<RadioConfig>,
}

impl StdioLink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> StdioLink<W> {
    pub fn new(out: W) -> Self {
        Self { out, radio: None }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.radio.as_ref().map(|r| r.device_name.as_str())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> WirelessLink for StdioLink<W> {
    fn notify(&mut self, fragment: &[u8]) -> BridgeResult<()> {
        self.out
            .write_all(fragment)
            .and_then(|_| self.out.flush())
            .map_err(|e| BridgeError::Notify(e.to_string()))
    }

    fn configure(&mut self, radio: &RadioConfig) -> BridgeResult<()> {
        debug!(
            "Service {:#034x}: command {:#034x}, response {:#034x}, cccd {:#034x}",
            radio.layout.service,
            radio.layout.command_char,
            radio.layout.response_char,
            radio.layout.cccd
        );
        self.radio = Some(radio.clone());
        Ok(())
    }

    fn start_advertising(&mut self) -> BridgeResult<()> {
        let name = self
            .device_name()
            .ok_or_else(|| BridgeError::Radio("not configured".into()))?;
        info!("Advertising as '{}'", name);
        Ok(())
    }
}
