use anyhow::Context;
use ble_tcp_bridge::domain::settings::SettingsService;
use ble_tcp_bridge::infrastructure::bluetooth::protocol::RadioConfig;
use ble_tcp_bridge::infrastructure::logging::init_logger;
use ble_tcp_bridge::{BridgeError, BridgeService, StdioLink, StreamSession, WirelessLink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();
    let _log_guard = init_logger(&settings.log_settings)?;

    info!("Starting BLE to TCP bridge");
    info!("Settings loaded from {}", settings_service.path().display());
    settings.validate().context("Invalid settings")?;

    let bridge = &settings.bridge;
    let radio = RadioConfig::from_settings(bridge)?;
    let mut link = StdioLink::stdout();
    link.configure(&radio)?;

    let session = StreamSession::from_settings(bridge);
    let (service, handle) = BridgeService::new(bridge, session, link);
    let controller = tokio::spawn(service.run());

    // Without a radio attached, stdin stands in for the command characteristic
    handle.central_connected()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => match handle.submit_write(line.as_bytes()) {
                        Ok(()) | Err(BridgeError::EmptyCommand) => {}
                        Err(BridgeError::Busy) => warn!("Bridge busy, dropped {:?}", line),
                        Err(e) => return Err(e.into()),
                    },
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.central_disconnected()?;
    drop(handle);
    controller.await?;

    info!("Bridge stopped");
    Ok(())
}
