//! # Relay Configuration
//!
//! Configuration for a Beacon POS device: identity, relay pairing and the
//! remote store credentials.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BEACON_HUB_URL=ws://hub.local:8000/ws                              │
//! │     BEACON_CHANNEL=shop1                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/beacon-pos/beacon.toml (Linux)                           │
//! │     ~/Library/Application Support/com.beacon.beacon-pos/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     auto-generated device id, persisted back on first run              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # beacon.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Front Counter"
//!
//! [relay]
//! hub_url = "ws://192.168.1.100:8000/ws"
//! channel = "shop1"
//! max_retries = 10
//!
//! [store]
//! rest_url = "https://store.example.com/rest/v1"
//! api_key = "anon-key"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{RelayError, RelayResult};
use crate::transport::{TransportConfig, DEFAULT_MAX_RETRIES};

/// Config file name under the platform config directory.
const CONFIG_FILE: &str = "beacon.toml";

// =============================================================================
// Device Settings
// =============================================================================

/// Identity of this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Unique device identifier (UUID v4), used as the relay sender id.
    /// Auto-generated on first run.
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Beacon Terminal".to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Relay Settings
// =============================================================================

/// Relay pairing and reconnect tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Hub WebSocket URL. None means relay features stay off.
    #[serde(default)]
    pub hub_url: Option<String>,

    /// Pairing identifier; both devices of a pair enter the same one.
    /// The full channel name is derived as "pos-scanner-<channel>".
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Connection attempts before giving up. 0 means retry forever.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Initial backoff (milliseconds) for reconnection.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff (seconds) for reconnection.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_channel() -> String {
    "default".to_string()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            hub_url: None,
            channel: default_channel(),
            max_retries: default_max_retries(),
            connect_timeout_secs: default_connect_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Remote store (mirror) credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// REST base URL. None means local-only mode.
    #[serde(default)]
    pub rest_url: Option<String>,

    /// API key, sent as both `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl BeaconConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (beacon.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RelayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads the config, writing the defaults (with the freshly generated
    /// device id) back to disk when no file exists yet.
    pub fn load_or_init(config_path: Option<PathBuf>) -> RelayResult<Self> {
        let path = config_path.or_else(Self::default_config_path);
        let existed = path.as_ref().map(|p| p.exists()).unwrap_or(false);

        let config = Self::load(path.clone())?;
        if !existed {
            if let Err(err) = config.save(path) {
                warn!(error = %err, "Could not persist initial config");
            }
        }
        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> RelayResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| RelayError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RelayResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(RelayError::InvalidConfig("device id is empty".into()));
        }

        if self.relay.channel.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "relay channel identifier is empty".into(),
            ));
        }

        if let Some(url) = &self.relay.hub_url {
            let parsed = Url::parse(url)?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(RelayError::InvalidConfig(format!(
                    "Hub URL must use ws:// or wss://, got: {url}"
                )));
            }
        }

        if let Some(url) = &self.store.rest_url {
            let parsed = Url::parse(url)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(RelayError::InvalidConfig(format!(
                    "Store URL must use http:// or https://, got: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("BEACON_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device id from environment");
            self.device.id = id;
        }

        if let Ok(url) = std::env::var("BEACON_HUB_URL") {
            debug!(url = %url, "Overriding hub URL from environment");
            self.relay.hub_url = Some(url);
        }

        if let Ok(channel) = std::env::var("BEACON_CHANNEL") {
            debug!(channel = %channel, "Overriding channel from environment");
            self.relay.channel = channel;
        }

        if let Ok(url) = std::env::var("BEACON_STORE_URL") {
            self.store.rest_url = Some(url);
        }

        if let Ok(key) = std::env::var("BEACON_STORE_KEY") {
            self.store.api_key = Some(key);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "beacon", "beacon-pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The relay sender id for this device.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// The hub URL, if relay features are enabled.
    pub fn hub_url(&self) -> Option<&str> {
        self.relay.hub_url.as_deref()
    }

    /// Builds a transport config from the relay timing settings.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.relay.hub_url.clone().unwrap_or_default(),
            connect_timeout: Duration::from_secs(self.relay.connect_timeout_secs),
            initial_backoff: Duration::from_millis(self.relay.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.relay.max_backoff_secs),
            max_retries: self.relay.max_retries,
            ping_interval: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_generates_device_id() {
        let config = BeaconConfig::default();
        assert!(!config.device.id.is_empty());
        assert!(Uuid::parse_str(&config.device.id).is_ok());
        assert_eq!(config.relay.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_validation_rejects_bad_urls() {
        let mut config = BeaconConfig::default();
        assert!(config.validate().is_ok());

        config.relay.hub_url = Some("http://not-a-socket".to_string());
        assert!(config.validate().is_err());

        config.relay.hub_url = Some("ws://hub.local:8000/ws".to_string());
        assert!(config.validate().is_ok());

        config.store.rest_url = Some("ftp://files".to_string());
        assert!(config.validate().is_err());

        config.store.rest_url = Some("https://store.example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = BeaconConfig::load(Some(path)).unwrap();
        assert_eq!(config.relay.channel, "default");
    }

    #[test]
    fn test_load_or_init_persists_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let first = BeaconConfig::load_or_init(Some(path.clone())).unwrap();
        assert!(path.exists());

        // Second load sees the same device id.
        let second = BeaconConfig::load_or_init(Some(path)).unwrap();
        assert_eq!(first.device.id, second.device.id);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = BeaconConfig::default();
        config.relay.hub_url = Some("ws://hub.local:8000/ws".to_string());
        config.relay.channel = "shop1".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = BeaconConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.relay.hub_url.as_deref(), Some("ws://hub.local:8000/ws"));
        assert_eq!(loaded.relay.channel, "shop1");
        assert_eq!(loaded.device.id, config.device.id);
    }

    #[test]
    fn test_transport_config_from_settings() {
        let mut config = BeaconConfig::default();
        config.relay.hub_url = Some("ws://hub.local:8000/ws".to_string());
        config.relay.max_retries = 3;
        config.relay.initial_backoff_ms = 250;

        let transport = config.transport_config();
        assert_eq!(transport.url, "ws://hub.local:8000/ws");
        assert_eq!(transport.max_retries, 3);
        assert_eq!(transport.initial_backoff, Duration::from_millis(250));
    }
}
