//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/flip/config.toml)
//! 3. Environment variables (FLIP_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};
use crate::flag::FlagValue;
use crate::registry::Binding;

/// Environment variable prefix
const ENV_PREFIX: &str = "FLIP";

/// Default relay endpoint, used by the default bindings
pub const DEFAULT_RELAY_URL: &str = "http://localhost:4000/api/toggle";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local state (user key, dashboard log)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Flag provider connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Client-side relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Relay server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Dashboard settings
    #[serde(default)]
    pub ui: UiConfig,

    /// Flag bindings tracked by the engine
    #[serde(default = "default_bindings")]
    pub bindings: Vec<Binding>,
}

/// Flag provider connection settings
///
/// Both `stream_url` and `client_key` must be present for a live
/// connection; otherwise the client runs in degraded mode on binding
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// WebSocket URL of the flag stream (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,

    /// Client-side key sent when identifying (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,

    /// Initial evaluation region
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            stream_url: None,
            client_key: None,
            region: default_region(),
        }
    }
}

/// Credentials for a live provider connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub stream_url: String,
    pub client_key: String,
}

impl ProviderConfig {
    /// Credentials when fully configured, `None` for degraded mode
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.stream_url, &self.client_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(Credentials {
                stream_url: url.clone(),
                client_key: key.clone(),
            }),
            _ => None,
        }
    }
}

/// Client-side relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Toggle endpoint of the relay server
    #[serde(default = "default_relay_url")]
    pub url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
        }
    }
}

impl RelayConfig {
    /// Health endpoint derived from the toggle URL
    pub fn health_url(&self) -> String {
        match self.url.rfind("/api/") {
            Some(pos) => format!("{}/health", &self.url[..pos]),
            None => format!("{}/health", self.url.trim_end_matches('/')),
        }
    }
}

/// Relay server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream trigger URLs per flag key
    #[serde(default)]
    pub triggers: HashMap<String, Trigger>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            triggers: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Trigger mapping, or the startup error when none is configured
    ///
    /// The relay server cannot do anything without upstream triggers, so
    /// this is fatal at startup rather than degraded.
    pub fn require_triggers(&self) -> ConfigResult<&HashMap<String, Trigger>> {
        if self.triggers.is_empty() {
            return Err(ConfigError::MissingCredentials {
                what: "no flag trigger endpoints configured under [server.triggers]".to_string(),
            });
        }
        Ok(&self.triggers)
    }
}

/// Upstream trigger URL pair for one flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    /// Called to turn the flag on
    pub on: String,
    /// Called to turn the flag off
    pub off: String,
}

impl Trigger {
    /// Pick the trigger URL for the requested availability
    pub fn url_for(&self, is_available: bool) -> &str {
        if is_available {
            &self.on
        } else {
            &self.off
        }
    }
}

/// Dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Regions offered by the region selector
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            provider: ProviderConfig::default(),
            relay: RelayConfig::default(),
            server: ServerConfig::default(),
            ui: UiConfig::default(),
            bindings: default_bindings(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FLIP_STREAM_URL, FLIP_RELAY_URL, ...)
    /// 2. Config file (~/.config/flip/config.toml or FLIP_CONFIG)
    /// 3. Default values
    pub fn load() -> ConfigResult<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> ConfigResult<Self> {
        let mut config: Config = toml::from_str(toml_content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // FLIP_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // FLIP_STREAM_URL
        if let Ok(val) = std::env::var(format!("{}_STREAM_URL", ENV_PREFIX)) {
            self.provider.stream_url = if val.is_empty() { None } else { Some(val) };
        }

        // FLIP_CLIENT_KEY
        if let Ok(val) = std::env::var(format!("{}_CLIENT_KEY", ENV_PREFIX)) {
            self.provider.client_key = if val.is_empty() { None } else { Some(val) };
        }

        // FLIP_REGION
        if let Ok(val) = std::env::var(format!("{}_REGION", ENV_PREFIX)) {
            if !val.is_empty() {
                self.provider.region = val;
            }
        }

        // FLIP_RELAY_URL
        if let Ok(val) = std::env::var(format!("{}_RELAY_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.relay.url = val;
            }
        }

        // FLIP_PORT
        if let Ok(val) = std::env::var(format!("{}_PORT", ENV_PREFIX)) {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> ConfigResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|source| {
                ConfigError::CreateDirectory {
                    path: self.data_dir.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FLIP_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flip")
            .join("config.toml")
    }

    /// Get the path to the persisted user key
    pub fn user_key_path(&self) -> PathBuf {
        self.data_dir.join("user_key")
    }

    /// Get the path to the dashboard log file
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("flip.log")
    }

    /// Load the stable per-install user key, generating it on first use
    ///
    /// The key identifies this install to the flag service across
    /// sessions, like the reference deployment's persisted session key.
    pub fn load_or_create_user_key(&self) -> ConfigResult<String> {
        let path = self.user_key_path();
        if path.exists() {
            let key = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        self.ensure_data_dir()?;
        let key = format!("user-{}", &Uuid::new_v4().to_string()[..8]);
        std::fs::write(&path, &key).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(key)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flip")
}

fn default_region() -> String {
    "default".to_string()
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_regions() -> Vec<String> {
    vec![
        "default".to_string(),
        "Europe".to_string(),
        "California".to_string(),
    ]
}

/// Bindings for the demo deployment's three flags
///
/// All of them relay through the local relay server; the body tells the
/// server which way to flip the flag.
fn default_bindings() -> Vec<Binding> {
    vec![
        Binding::new(
            "release-laptop-life-remaining",
            FlagValue::Bool(false),
            DEFAULT_RELAY_URL,
            DEFAULT_RELAY_URL,
        ),
        Binding::new(
            "release-marketing-security-report",
            FlagValue::Bool(false),
            DEFAULT_RELAY_URL,
            DEFAULT_RELAY_URL,
        ),
        Binding::new(
            "show-region-based-security-report",
            FlagValue::Str("SOC 2".to_string()),
            DEFAULT_RELAY_URL,
            DEFAULT_RELAY_URL,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap();
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "FLIP_DATA_DIR",
        "FLIP_STREAM_URL",
        "FLIP_CLIENT_KEY",
        "FLIP_REGION",
        "FLIP_RELAY_URL",
        "FLIP_PORT",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.provider.stream_url.is_none());
        assert!(config.provider.credentials().is_none());
        assert_eq!(config.provider.region, "default");
        assert_eq!(config.relay.url, DEFAULT_RELAY_URL);
        assert_eq!(config.server.listen_addr(), "127.0.0.1:4000");
        assert!(config.data_dir.ends_with("flip"));
        assert_eq!(config.bindings.len(), 3);
    }

    #[test]
    fn test_default_bindings_cover_demo_flags() {
        let config = Config::default();
        let flags: Vec<&str> = config.bindings.iter().map(|b| b.flag.as_str()).collect();
        assert_eq!(
            flags,
            vec![
                "release-laptop-life-remaining",
                "release-marketing-security-report",
                "show-region-based-security-report",
            ]
        );
        assert_eq!(
            config.bindings[2].default,
            FlagValue::Str("SOC 2".to_string())
        );
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.user_key_path().ends_with("user_key"));
        assert!(config.log_path().ends_with("flip.log"));
    }

    #[test]
    fn test_health_url() {
        let relay = RelayConfig {
            url: "http://localhost:4000/api/toggle".to_string(),
        };
        assert_eq!(relay.health_url(), "http://localhost:4000/health");
    }

    #[test]
    fn test_credentials_require_both_fields() {
        let mut provider = ProviderConfig::default();
        assert!(provider.credentials().is_none());

        provider.stream_url = Some("ws://localhost:8030/stream".to_string());
        assert!(provider.credentials().is_none());

        provider.client_key = Some("sdk-key-123".to_string());
        let creds = provider.credentials().unwrap();
        assert_eq!(creds.stream_url, "ws://localhost:8030/stream");
        assert_eq!(creds.client_key, "sdk-key-123");
    }

    #[test]
    fn test_require_triggers_empty() {
        let server = ServerConfig::default();
        let err = server.require_triggers().unwrap_err();
        assert!(err.to_string().contains("trigger"));
    }

    #[test]
    fn test_trigger_url_for() {
        let trigger = Trigger {
            on: "https://triggers.test/on".to_string(),
            off: "https://triggers.test/off".to_string(),
        };
        assert_eq!(trigger.url_for(true), "https://triggers.test/on");
        assert_eq!(trigger.url_for(false), "https://triggers.test/off");
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLIP_DATA_DIR", "/tmp/flip-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/flip-test"));
    }

    #[test]
    fn test_env_override_provider() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLIP_STREAM_URL", "ws://localhost:8030/stream");
        env::set_var("FLIP_CLIENT_KEY", "sdk-key-456");
        env::set_var("FLIP_REGION", "Europe");
        config.apply_env_overrides();

        assert!(config.provider.credentials().is_some());
        assert_eq!(config.provider.region, "Europe");

        // Empty string clears credentials
        env::set_var("FLIP_STREAM_URL", "");
        config.apply_env_overrides();
        assert!(config.provider.stream_url.is_none());
    }

    #[test]
    fn test_env_override_port() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLIP_PORT", "4100");
        config.apply_env_overrides();
        assert_eq!(config.server.port, 4100);

        // Unparseable port is ignored
        env::set_var("FLIP_PORT", "not-a-port");
        config.apply_env_overrides();
        assert_eq!(config.server.port, 4100);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            [provider]
            stream_url = "ws://flags.example.com/stream"
            client_key = "sdk-key-789"
            region = "California"

            [relay]
            url = "http://relay.example.com/api/toggle"

            [server]
            bind = "0.0.0.0"
            port = 4040

            [server.triggers.release-laptop-life-remaining]
            on = "https://triggers.example.com/laptop/on"
            off = "https://triggers.example.com/laptop/off"

            [[bindings]]
            flag = "release-laptop-life-remaining"
            default = false
            enable_url = "http://relay.example.com/api/toggle"
            disable_url = "http://relay.example.com/api/toggle"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.provider.region, "California");
        assert_eq!(config.relay.url, "http://relay.example.com/api/toggle");
        assert_eq!(config.server.listen_addr(), "0.0.0.0:4040");
        assert_eq!(config.bindings.len(), 1);

        let triggers = config.server.require_triggers().unwrap();
        assert_eq!(
            triggers["release-laptop-life-remaining"].url_for(true),
            "https://triggers.example.com/laptop/on"
        );
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("FLIP_DATA_DIR", temp_dir.path());

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert!(config.provider.credentials().is_none());
        assert_eq!(config.bindings.len(), 3);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[[bindings]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.relay.url, config.relay.url);
        assert_eq!(parsed.bindings, config.bindings);
    }

    #[test]
    fn test_save_to_path_round_trip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("FLIP_DATA_DIR", temp_dir.path());

        let path = temp_dir.path().join("nested").join("config.toml");
        let config = Config::default();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.relay.url, config.relay.url);
        assert_eq!(loaded.bindings, config.bindings);
    }

    #[test]
    fn test_user_key_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let key = config.load_or_create_user_key().unwrap();
        assert!(key.starts_with("user-"));

        // Same key on subsequent loads
        let again = config.load_or_create_user_key().unwrap();
        assert_eq!(key, again);
    }
}
