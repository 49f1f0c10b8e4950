//! Proxy device definitions
//!
//! Everything a proxy node and the hub must agree on:
//! - GPIO pin assignments and screen resolution (`pins`)
//! - MQTT topic naming (`topics`)
//! - Per-device network and hardware profile (`profile`)
//! - The state payloads exchanged over MQTT (`payload`)

pub mod payload;
pub mod pins;
pub mod profile;
pub mod topics;

pub use payload::{
    HubState, OverrideRequest, PathRequest, PayloadError, ProxyReport, ReportedState,
};
pub use profile::{
    BrokerCredentials, DeviceProfile, DeviceRole, EncoderPins, PositionPins, ScreenResolution,
    WifiCredentials,
};
pub use topics::{ProxyId, TopicError, TopicKind};
