//! Configuration management
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (match the shipped proxy firmware)
//! 2. `<config dir>/config.{toml,json,yaml}` if present
//! 3. `TD_*` environment variables, `__` between sections
//!    (e.g. `TD_MQTT__HOST`, `TD_LIGHT__PORT`, `TD_PROXY_IDS=0,1,2,3`)
//! 4. `MQTT_SERVER`, the variable name used by the proxy firmware builds,
//!    when `TD_MQTT__HOST` is not set

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::device::profile::{MQTT_PORT, MQTT_SERVER};
use crate::device::topics::{hub_state_topic, proxy_state_topic};
use crate::device::topics::{DEFAULT_ANIMATION_TOPIC, DEFAULT_OVERRIDE_TOPIC};
use crate::device::ProxyId;
use crate::light::DEFAULT_MIN_INTERVAL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default = "default_animation_topic")]
    pub animation_topic: String,

    #[serde(default = "default_override_topic")]
    pub override_topic: String,

    /// Proxies placed on the board; id 0 is the hub proxy
    #[serde(default = "default_proxy_ids")]
    pub proxy_ids: Vec<ProxyId>,

    #[serde(default)]
    pub light: LightConfig,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Config {
    /// Every topic the hub listens on: both directions for each proxy,
    /// then the animation and override topics
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .proxy_ids
            .iter()
            .flat_map(|&id| [proxy_state_topic(id), hub_state_topic(id)])
            .collect();
        topics.push(self.animation_topic.clone());
        topics.push(self.override_topic.clone());
        topics
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            animation_topic: default_animation_topic(),
            override_topic: default_override_topic(),
            proxy_ids: default_proxy_ids(),
            light: LightConfig::default(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_animation_topic() -> String {
    DEFAULT_ANIMATION_TOPIC.to_string()
}

fn default_override_topic() -> String {
    DEFAULT_OVERRIDE_TOPIC.to_string()
}

fn default_proxy_ids() -> Vec<ProxyId> {
    vec![0, 1, 2, 3]
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
        }
    }
}

fn default_mqtt_host() -> String {
    MQTT_SERVER.to_string()
}

fn default_mqtt_port() -> u16 {
    MQTT_PORT
}

fn default_client_id() -> String {
    "tangible-dashboard".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    /// Serial device of the LED controller
    #[serde(default = "default_light_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Minimum pause between two messages to the LED controller
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
}

impl LightConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            port: default_light_port(),
            baud_rate: default_baud_rate(),
            min_interval_secs: default_min_interval_secs(),
        }
    }
}

fn default_light_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_min_interval_secs() -> u64 {
    DEFAULT_MIN_INTERVAL.as_secs()
}

/// Get config directory (TD_CONFIG_DIR, XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TD_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("tangible-dashboard");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config/tangible-dashboard");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/tangible-dashboard");
        }
    }

    // Fallback to current directory
    PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (TD_MQTT__HOST, TD_LIGHT__PORT, etc.)
        .add_source(
            ::config::Environment::with_prefix("TD")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("proxy_ids")
                .try_parsing(true),
        );

    // Firmware-style MQTT_SERVER as fallback: TD_MQTT__HOST > MQTT_SERVER > config > default
    if std::env::var("TD_MQTT__HOST").is_err() {
        if let Ok(host) = std::env::var("MQTT_SERVER") {
            builder = builder.set_override("mqtt.host", host)?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const NO_CONFIG_DIR: &str = "/tmp/td-test-nonexistent";

    fn clear_env() {
        for key in [
            "TD_MQTT__HOST",
            "TD_MQTT__PORT",
            "TD_PROXY_IDS",
            "TD_LIGHT__MIN_INTERVAL_SECS",
            "MQTT_SERVER",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_match_firmware() {
        clear_env();
        env::set_var("TD_CONFIG_DIR", NO_CONFIG_DIR);

        let config = load_config().expect("config should load");

        env::remove_var("TD_CONFIG_DIR");

        assert_eq!(config.mqtt.host, "test.mosquitto.org");
        assert_eq!(config.mqtt.port, 1883);
        assert!(config.mqtt.username.is_none());
        assert_eq!(config.animation_topic, "dashboardAnimations");
        assert_eq!(config.override_topic, "dashboardOverride");
        assert_eq!(config.proxy_ids, vec![0, 1, 2, 3]);
        assert_eq!(config.light.port, "/dev/ttyUSB0");
        assert_eq!(config.light.baud_rate, 9600);
        assert_eq!(config.light.min_interval(), Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("TD_CONFIG_DIR", NO_CONFIG_DIR);
        env::set_var("TD_MQTT__HOST", "192.168.4.1");
        env::set_var("TD_MQTT__PORT", "1884");
        env::set_var("TD_PROXY_IDS", "0,3");
        env::set_var("TD_LIGHT__MIN_INTERVAL_SECS", "1");

        let config = load_config().expect("config should load");

        clear_env();
        env::remove_var("TD_CONFIG_DIR");

        assert_eq!(config.mqtt.host, "192.168.4.1");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.proxy_ids, vec![0, 3]);
        assert_eq!(config.light.min_interval_secs, 1);
    }

    #[test]
    #[serial]
    fn test_mqtt_server_fallback() {
        clear_env();
        env::set_var("TD_CONFIG_DIR", NO_CONFIG_DIR);
        env::set_var("MQTT_SERVER", "broker.lan");

        let config = load_config().expect("config should load");
        assert_eq!(config.mqtt.host, "broker.lan");

        // TD_MQTT__HOST takes precedence
        env::set_var("TD_MQTT__HOST", "hub.lan");
        let config = load_config().expect("config should load");

        clear_env();
        env::remove_var("TD_CONFIG_DIR");

        assert_eq!(config.mqtt.host, "hub.lan");
    }

    #[test]
    #[serial]
    fn test_config_file() {
        clear_env();
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(
            temp_dir.path().join("config.toml"),
            r#"
proxy_ids = [0, 1]
animation_topic = "anim"

[light]
port = "/dev/ttyACM0"
"#,
        )
        .expect("write config");
        env::set_var("TD_CONFIG_DIR", temp_dir.path());

        let config = load_config().expect("config should load");

        env::remove_var("TD_CONFIG_DIR");

        assert_eq!(config.proxy_ids, vec![0, 1]);
        assert_eq!(config.animation_topic, "anim");
        assert_eq!(config.override_topic, "dashboardOverride");
        assert_eq!(config.light.port, "/dev/ttyACM0");
        assert_eq!(config.light.baud_rate, 9600);
    }

    #[test]
    fn test_subscriptions() {
        let config = Config {
            proxy_ids: vec![0, 3],
            ..Config::default()
        };
        assert_eq!(
            config.subscriptions(),
            vec![
                "proxy_state_update_proxy_0",
                "hub_state_update_proxy_0",
                "proxy_state_update_proxy_3",
                "hub_state_update_proxy_3",
                "dashboardAnimations",
                "dashboardOverride",
            ]
        );
    }
}
