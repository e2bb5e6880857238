use crate::domain::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the settings file location
pub const CONFIG_PATH_ENV: &str = "BLE_TCP_BRIDGE_CONFIG";

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Console and rolling-file log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive, e.g. "info" or "ble_tcp_bridge=debug"
    pub level: String,
    pub console_logging_enabled: bool,
    pub file_logging_enabled: bool,
    pub log_dir: PathBuf,
    pub file_name_prefix: String,
    pub rotation: LogRotation,
    pub show_file_line: bool,
    pub show_thread_ids: bool,
    pub show_target: bool,
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_logging_enabled: true,
            file_logging_enabled: false,
            log_dir: PathBuf::from("logs"),
            file_name_prefix: "ble_tcp_bridge".to_string(),
            rotation: LogRotation::default(),
            show_file_line: false,
            show_thread_ids: false,
            show_target: true,
            ansi_colors: true,
        }
    }
}

/// Interpreter endpoint, timing and fragmentation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default = "default_host")]
    pub interpreter_host: String,
    #[serde(default = "default_port")]
    pub interpreter_port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Deadline for one response, measured from the start of the read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_read_poll_interval_ms")]
    pub read_poll_interval_ms: u64,
    /// Bytes per notification. Deliberately independent of the negotiated MTU.
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,
    #[serde(default = "default_fragment_delay_ms")]
    pub fragment_delay_ms: u64,
    /// Writes allowed to wait behind the exchange in flight
    #[serde(default = "default_command_queue_depth")]
    pub command_queue_depth: usize,

    // Passed through to the radio stack
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_passkey")]
    pub passkey: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            interpreter_host: default_host(),
            interpreter_port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            read_poll_interval_ms: default_read_poll_interval_ms(),
            fragment_size: default_fragment_size(),
            fragment_delay_ms: default_fragment_delay_ms(),
            command_queue_depth: default_command_queue_depth(),
            device_name: default_device_name(),
            passkey: default_passkey(),
        }
    }
}

impl BridgeSettings {
    pub fn interpreter_addr(&self) -> String {
        format!("{}:{}", self.interpreter_host, self.interpreter_port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms)
    }

    pub fn fragment_delay(&self) -> Duration {
        Duration::from_millis(self.fragment_delay_ms)
    }
}

fn default_host() -> String {
    "192.168.0.10".to_string()
}
fn default_port() -> u16 {
    35000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_read_timeout_ms() -> u64 {
    10_000
}
fn default_read_poll_interval_ms() -> u64 {
    5
}
fn default_fragment_size() -> usize {
    // 23 byte default ATT MTU minus the 3 byte notification header
    20
}
fn default_fragment_delay_ms() -> u64 {
    10
}
fn default_command_queue_depth() -> usize {
    1
}
fn default_device_name() -> String {
    "OBDII-BLE".to_string()
}
fn default_passkey() -> u32 {
    123456
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub bridge: BridgeSettings,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), BridgeError> {
        let bridge = &self.bridge;
        if bridge.interpreter_host.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("interpreter_host is empty".into()));
        }
        if bridge.interpreter_port == 0 {
            return Err(BridgeError::InvalidConfig("interpreter_port must be non-zero".into()));
        }
        if bridge.read_timeout_ms == 0 {
            return Err(BridgeError::InvalidConfig("read_timeout_ms must be non-zero".into()));
        }
        if bridge.fragment_size == 0 {
            return Err(BridgeError::InvalidConfig("fragment_size must be non-zero".into()));
        }
        Ok(())
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit path, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BleTcpBridge");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ble_tcp_bridge_{}_{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bridge.interpreter_addr(), "192.168.0.10:35000");
        assert_eq!(settings.bridge.read_timeout(), Duration::from_secs(10));
        assert_eq!(settings.bridge.fragment_size, 20);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "bridge": { "interpreter_port": 23 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.bridge.interpreter_port, 23);
        assert_eq!(settings.bridge.interpreter_host, "192.168.0.10");
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_log_rotation_parses_lowercase() {
        let json = r#"{ "log_settings": { "rotation": "hourly", "file_logging_enabled": true } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.log_settings.rotation, LogRotation::Hourly);
        assert!(settings.log_settings.file_logging_enabled);
        assert!(settings.log_settings.console_logging_enabled);

        let bad = r#"{ "log_settings": { "rotation": "weekly" } }"#;
        assert!(serde_json::from_str::<Settings>(bad).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_fragment_size() {
        let mut settings = Settings::default();
        settings.bridge.fragment_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut settings = Settings::default();
        settings.bridge.interpreter_host = "  ".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        let service = SettingsService::with_path(path);
        assert_eq!(service.get().bridge.interpreter_port, 35000);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("reload");
        let mut service = SettingsService::with_path(path.clone());
        service.get_mut().bridge.interpreter_host = "127.0.0.1".into();
        service.get_mut().bridge.fragment_size = 64;
        service.save().unwrap();

        let reloaded = SettingsService::with_path(path.clone());
        assert_eq!(reloaded.get().bridge.interpreter_host, "127.0.0.1");
        assert_eq!(reloaded.get().bridge.fragment_size, 64);
        let _ = fs::remove_file(path);
    }
}
