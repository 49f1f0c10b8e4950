//! MQTT topic layout shared by the proxies and the hub
//!
//! Each proxy publishes its readings on `proxy_state_update_proxy_<id>` and
//! listens for state pushed by the hub on `hub_state_update_proxy_<id>`.

use thiserror::Error;

/// Identifies a proxy within the fleet. The hub proxy is always 0.
pub type ProxyId = u8;

pub const PROXY_STATE_PREFIX: &str = "proxy_state_update_proxy_";
pub const HUB_STATE_PREFIX: &str = "hub_state_update_proxy_";

/// Hub-wide topic carrying `"<from>,<to>"` path animation requests
pub const DEFAULT_ANIMATION_TOPIC: &str = "dashboardAnimations";
/// Hub-wide topic carrying `"<id>,<row>,<col>"` manual position overrides
pub const DEFAULT_OVERRIDE_TOPIC: &str = "dashboardOverride";

/// Which side of the conversation a per-proxy topic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Readings published by a proxy
    ProxyState,
    /// State pushed to a proxy by the hub
    HubState,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic '{0}' is not a proxy state topic")]
    UnknownTopic(String),
    #[error("invalid proxy id '{id}' in topic '{topic}'")]
    InvalidId { topic: String, id: String },
}

/// Topic a proxy publishes its readings on
pub fn proxy_state_topic(id: ProxyId) -> String {
    format!("{}{}", PROXY_STATE_PREFIX, id)
}

/// Topic a proxy receives hub state on
pub fn hub_state_topic(id: ProxyId) -> String {
    format!("{}{}", HUB_STATE_PREFIX, id)
}

/// Split a per-proxy topic into its kind and proxy id
pub fn parse_topic(topic: &str) -> Result<(TopicKind, ProxyId), TopicError> {
    let (kind, id) = if let Some(id) = topic.strip_prefix(PROXY_STATE_PREFIX) {
        (TopicKind::ProxyState, id)
    } else if let Some(id) = topic.strip_prefix(HUB_STATE_PREFIX) {
        (TopicKind::HubState, id)
    } else {
        return Err(TopicError::UnknownTopic(topic.to_string()));
    };

    let id = id.parse::<ProxyId>().map_err(|_| TopicError::InvalidId {
        topic: topic.to_string(),
        id: id.to_string(),
    })?;

    Ok((kind, id))
}
