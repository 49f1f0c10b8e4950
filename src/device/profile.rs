//! Per-device profile
//!
//! A profile bundles everything a proxy firmware image is built with: its id,
//! topics, network credentials and the hardware it carries. Profiles are
//! created once at startup and never mutated.

use serde::{Deserialize, Serialize};

use super::pins::{
    COL_PIN, ENCODER_PIN_A, ENCODER_PIN_B, ROW_PIN, SCREEN_HEIGHT, SCREEN_WIDTH, TILE_PIN,
};
use super::topics::{hub_state_topic, proxy_state_topic, ProxyId};

pub const WIFI_SSID: &str = "DashboardAP";
pub const WIFI_PASSWORD: &str = "muchPrivate";

pub const MQTT_SERVER: &str = "test.mosquitto.org";
pub const MQTT_PORT: u16 = 1883;
pub const MQTT_USER: &str = "";
pub const MQTT_PASSWORD: &str = "";

/// Id of the hub proxy
pub const HUB_PROXY_ID: ProxyId = 0;
/// Id the sensor proxy ships with
pub const SENSOR_PROXY_ID: ProxyId = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Marks the hub position on the board, publishes only
    Hub,
    /// Carries an encoder and a screen, publishes and subscribes
    Sensor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl Default for WifiCredentials {
    fn default() -> Self {
        Self {
            ssid: WIFI_SSID.to_string(),
            password: WIFI_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerCredentials {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl BrokerCredentials {
    /// Credentials are only sent when a user name is set
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty()
    }
}

impl Default for BrokerCredentials {
    fn default() -> Self {
        Self {
            server: MQTT_SERVER.to_string(),
            port: MQTT_PORT,
            user: MQTT_USER.to_string(),
            password: MQTT_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPins {
    pub tile: u8,
    pub row: u8,
    pub col: u8,
}

impl Default for PositionPins {
    fn default() -> Self {
        Self {
            tile: TILE_PIN,
            row: ROW_PIN,
            col: COL_PIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderPins {
    pub a: u8,
    pub b: u8,
}

impl Default for EncoderPins {
    fn default() -> Self {
        Self {
            a: ENCODER_PIN_A,
            b: ENCODER_PIN_B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenResolution {
    pub width: u16,
    pub height: u16,
}

impl Default for ScreenResolution {
    fn default() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        }
    }
}

/// Complete build-time configuration of one proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub role: DeviceRole,
    pub id: ProxyId,
    pub pub_topic: String,
    /// Hub proxies never receive state, so they have no subscribe topic
    pub sub_topic: Option<String>,
    pub wifi: WifiCredentials,
    pub broker: BrokerCredentials,
    pub position_pins: PositionPins,
    pub encoder_pins: Option<EncoderPins>,
    pub screen: Option<ScreenResolution>,
}

impl DeviceProfile {
    /// Profile of the hub proxy (id 0)
    pub fn hub_proxy() -> Self {
        Self {
            role: DeviceRole::Hub,
            id: HUB_PROXY_ID,
            pub_topic: proxy_state_topic(HUB_PROXY_ID),
            sub_topic: None,
            wifi: WifiCredentials::default(),
            broker: BrokerCredentials::default(),
            position_pins: PositionPins::default(),
            encoder_pins: None,
            screen: None,
        }
    }

    /// Profile of a sensor proxy with the given id
    pub fn sensor_proxy(id: ProxyId) -> Self {
        Self {
            role: DeviceRole::Sensor,
            id,
            pub_topic: proxy_state_topic(id),
            sub_topic: Some(hub_state_topic(id)),
            wifi: WifiCredentials::default(),
            broker: BrokerCredentials::default(),
            position_pins: PositionPins::default(),
            encoder_pins: Some(EncoderPins::default()),
            screen: Some(ScreenResolution::default()),
        }
    }

    /// MQTT client id used when this profile connects to the broker
    pub fn client_id(&self) -> String {
        match self.role {
            DeviceRole::Hub => format!("hub-proxy-{}", self.id),
            DeviceRole::Sensor => format!("sensor-proxy-{}", self.id),
        }
    }
}
