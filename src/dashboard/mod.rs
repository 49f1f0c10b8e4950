//! Dashboard state machine
//!
//! Turns MQTT messages from the proxies, the hub and the operator into
//! proxy state and light commands. Pure and synchronous: the async plumbing
//! lives in [`service`].

pub mod service;

pub use service::DashboardService;

use tracing::{info, warn};

use crate::calibration::Position;
use crate::device::payload::{OverrideRequest, PathRequest};
use crate::device::topics::{parse_topic, TopicKind};
use crate::device::{HubState, ProxyId, ProxyReport, ReportedState};
use crate::light::LightCommand;
use crate::proxy::{Proxy, Readings};

/// Id of the hub proxy, the endpoint of every state-change path
pub const HUB_ID: ProxyId = crate::device::profile::HUB_PROXY_ID;

/// What was last animated for a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Animated {
    position: Option<Position>,
    state: Option<u8>,
}

impl Default for Animated {
    fn default() -> Self {
        Self {
            position: Some(Position::new(0, 0)),
            state: Some(0),
        }
    }
}

/// Which side changed a proxy's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeSource {
    Proxy,
    Hub,
}

/// Result of handling one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Proxy whose state was touched
    pub updated: Option<ProxyId>,
    pub command: Option<LightCommand>,
}

pub struct Dashboard {
    proxies: Vec<Proxy>,
    animated: Vec<Animated>,
    animation_topic: String,
    override_topic: String,
}

impl Dashboard {
    pub fn new(
        proxy_ids: &[ProxyId],
        animation_topic: impl Into<String>,
        override_topic: impl Into<String>,
    ) -> Self {
        Self {
            proxies: proxy_ids.iter().map(|&id| Proxy::new(id)).collect(),
            animated: vec![Animated::default(); proxy_ids.len()],
            animation_topic: animation_topic.into(),
            override_topic: override_topic.into(),
        }
    }

    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    pub fn proxy(&self, id: ProxyId) -> Option<&Proxy> {
        self.proxies.iter().find(|p| p.id == id)
    }

    fn index_of(&self, id: ProxyId) -> Option<usize> {
        self.proxies.iter().position(|p| p.id == id)
    }

    /// Handle a message received on any subscribed topic
    pub fn handle(&mut self, topic: &str, payload: &str) -> Outcome {
        if topic == self.animation_topic {
            return Outcome {
                updated: None,
                command: self.handle_path_request(payload),
            };
        }
        if topic == self.override_topic {
            return self.handle_override(payload);
        }

        match parse_topic(topic) {
            Ok((TopicKind::ProxyState, id)) => self.handle_proxy_report(id, payload),
            Ok((TopicKind::HubState, id)) => self.handle_hub_state(id, payload),
            Err(e) => {
                warn!("(handle) Ignoring message: {}", e);
                Outcome::default()
            }
        }
    }

    fn handle_proxy_report(&mut self, id: ProxyId, payload: &str) -> Outcome {
        let Some(index) = self.index_of(id) else {
            warn!("(handle_proxy_report) Proxy with ID {} not found.", id);
            return Outcome::default();
        };

        let report: ProxyReport = match payload.parse() {
            Ok(report) => report,
            Err(e) => {
                warn!("(handle_proxy_report) Invalid payload from proxy {}: {}", id, e);
                return Outcome::default();
            }
        };

        let readings = Readings {
            tile: report.tile,
            row: report.row,
            col: report.col,
        };
        let proxy = &mut self.proxies[index];

        match report.state {
            ReportedState::Unknown => {
                proxy.update(readings, true, None);
                // A proxy only reports `x` right after being plugged in
                proxy.override_active = false;
            }
            ReportedState::Value(state) if proxy.override_active => {
                // Position is pinned by the override, only take the state
                proxy.state = Some(state);
                return Outcome {
                    updated: Some(id),
                    command: self.compare(index, ChangeSource::Proxy),
                };
            }
            ReportedState::Value(state) => proxy.update(readings, true, Some(state)),
        }

        let command = self.compare(index, ChangeSource::Proxy);
        info!(
            "(handle_proxy_report) Updated Proxy {} with readings {:?} and state {}.",
            id, readings, report.state
        );

        Outcome {
            updated: Some(id),
            command,
        }
    }

    fn handle_hub_state(&mut self, id: ProxyId, payload: &str) -> Outcome {
        let Some(index) = self.index_of(id) else {
            warn!("(handle_hub_state) Proxy with ID {} not found.", id);
            return Outcome::default();
        };

        let state: HubState = match payload.parse() {
            Ok(state) => state,
            Err(e) => {
                info!("(handle_hub_state) {}", e);
                return Outcome::default();
            }
        };

        self.proxies[index].state = Some(state.value());
        let command = self.compare(index, ChangeSource::Hub);
        info!("(handle_hub_state) Updated Proxy {} with state {}.", id, state);

        Outcome {
            updated: Some(id),
            command,
        }
    }

    fn handle_path_request(&self, payload: &str) -> Option<LightCommand> {
        match payload.parse::<PathRequest>() {
            Ok(req) => self.path(req.from, req.to),
            Err(e) => {
                warn!("(handle_path_request) Invalid path animation request: {}", e);
                None
            }
        }
    }

    fn handle_override(&mut self, payload: &str) -> Outcome {
        let req: OverrideRequest = match payload.parse() {
            Ok(req) => req,
            Err(e) => {
                warn!("(handle_override) Invalid override request: {}", e);
                return Outcome::default();
            }
        };

        let Some(index) = self.index_of(req.id) else {
            warn!("(handle_override) Proxy with ID {} not found.", req.id);
            return Outcome::default();
        };

        let position = Position::new(req.row, req.col);
        self.proxies[index].override_position(position);
        info!(
            "(handle_override) Manual override for Proxy {} with position {}.",
            req.id, position
        );

        Outcome {
            updated: Some(req.id),
            command: self.coordinates(req.id),
        }
    }

    /// Decide which animation a change warrants and remember what was shown
    fn compare(&mut self, index: usize, source: ChangeSource) -> Option<LightCommand> {
        let proxy = &self.proxies[index];
        let id = proxy.id;
        let last = self.animated[index];

        match source {
            ChangeSource::Proxy => {
                if proxy.position != last.position {
                    if proxy.override_active {
                        // Position pinned by hand: the snapshot keeps the sensed position
                        return self.path(id, HUB_ID);
                    }
                    let command = self.coordinates(id);
                    self.remember(index);
                    command
                } else if proxy.state != last.state {
                    let command = self.path(id, HUB_ID);
                    self.remember(index);
                    command
                } else {
                    None
                }
            }
            ChangeSource::Hub => {
                if proxy.state != last.state {
                    let command = self.path(HUB_ID, id);
                    self.remember(index);
                    command
                } else {
                    None
                }
            }
        }
    }

    fn remember(&mut self, index: usize) {
        let proxy = &self.proxies[index];
        self.animated[index] = Animated {
            position: proxy.position,
            state: proxy.state,
        };
    }

    fn path(&self, from: ProxyId, to: ProxyId) -> Option<LightCommand> {
        let (Some(start), Some(end)) = (self.proxy(from), self.proxy(to)) else {
            warn!("(path) Proxy IDs {} or {} not connected or invalid.", from, to);
            return None;
        };

        let (Some(from_position), Some(to_position)) = (start.position, end.position) else {
            warn!("(path) Proxy positions for Proxy IDs {} or {} not set.", from, to);
            return None;
        };

        if !start.plugged_in || !end.plugged_in {
            warn!("(path) Proxies {} or {} not connected.", from, to);
            return None;
        }

        info!("(path) Sending path from Proxy {} to Proxy {}.", from, to);
        Some(LightCommand::Path {
            from: from_position,
            to: to_position,
        })
    }

    fn coordinates(&self, id: ProxyId) -> Option<LightCommand> {
        let Some(proxy) = self.proxy(id) else {
            warn!("(coordinates) Proxy with ID {} not found.", id);
            return None;
        };

        let Some(at) = proxy.position else {
            warn!("(coordinates) Position for Proxy with ID {} not set.", id);
            return None;
        };

        if !proxy.plugged_in {
            warn!("(coordinates) Proxy with ID {} not connected.", id);
            return None;
        }

        info!("(coordinates) Sending coordinates for Proxy {}.", id);
        Some(LightCommand::Coordinates { at })
    }
}
