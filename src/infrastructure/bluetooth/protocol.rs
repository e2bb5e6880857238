//! Bridge GATT Protocol
//!
//! Service layout the radio stack exposes for the bridge. The layout follows
//! the Nordic UART Service, which most serial-over-BLE terminal apps
//! already understand.

use crate::domain::settings::BridgeSettings;
use anyhow::Result;

/// Bridge service UUID (Nordic UART Service)
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// Command characteristic - client writes commands here (write without response)
pub const COMMAND_CHAR_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";

/// Response characteristic - responses are notified here
pub const RESPONSE_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Client Characteristic Configuration Descriptor, written by the client
/// to subscribe to the response characteristic
pub const CCCD_UUID: &str = "00002902-0000-1000-8000-00805f9b34fb";

/// Parsed UUIDs of the bridge service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLayout {
    pub service: u128,
    pub command_char: u128,
    pub response_char: u128,
    pub cccd: u128,
}

impl ServiceLayout {
    pub fn parse() -> Result<Self> {
        Ok(Self {
            service: parse_uuid(SERVICE_UUID)?,
            command_char: parse_uuid(COMMAND_CHAR_UUID)?,
            response_char: parse_uuid(RESPONSE_CHAR_UUID)?,
            cccd: parse_uuid(CCCD_UUID)?,
        })
    }
}

/// Everything the radio stack needs to expose the bridge service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    pub layout: ServiceLayout,
    pub device_name: String,
    /// Static pairing code; bonding is enforced by the radio stack
    pub passkey: u32,
}

impl RadioConfig {
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self> {
        if settings.passkey > 999_999 {
            anyhow::bail!("Passkey must have at most 6 digits: {}", settings.passkey);
        }
        Ok(Self {
            layout: ServiceLayout::parse()?,
            device_name: settings.device_name.clone(),
            passkey: settings.passkey,
        })
    }
}

/// Parse a hyphenated UUID string into its 128-bit value
pub fn parse_uuid(uuid_str: &str) -> Result<u128> {
    let hex = uuid_str.replace('-', "");

    if hex.len() != 32 {
        return Err(anyhow::anyhow!("Invalid UUID format: {}", uuid_str));
    }

    Ok(u128::from_str_radix(&hex, 16)?)
}
