//! Hub-side view of a single proxy

use serde::Serialize;

use crate::calibration::{resolve_position, Position};
use crate::device::ProxyId;

/// Last raw readings reported by a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Readings {
    pub tile: u16,
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proxy {
    pub id: ProxyId,
    pub position: Option<Position>,
    pub readings: Option<Readings>,
    pub state: Option<u8>,
    pub plugged_in: bool,
    /// Position was set by hand and must not be replaced by sensor readings
    pub override_active: bool,
}

impl Proxy {
    pub fn new(id: ProxyId) -> Self {
        Self {
            id,
            position: None,
            readings: None,
            state: None,
            plugged_in: false,
            override_active: false,
        }
    }

    /// Store new readings and recompute the position.
    /// `state` of `None` keeps the previous state.
    pub fn update(&mut self, readings: Readings, plugged_in: bool, state: Option<u8>) {
        self.readings = Some(readings);
        self.plugged_in = plugged_in;
        if let Some(state) = state {
            self.state = Some(state);
        }
        self.refresh_position();
    }

    /// Pin the proxy to a position chosen by hand
    pub fn override_position(&mut self, position: Position) {
        self.position = Some(position);
        self.plugged_in = true;
        self.override_active = true;
    }

    /// Position if the proxy is plugged in and located
    pub fn active_position(&self) -> Option<Position> {
        if self.plugged_in {
            self.position
        } else {
            None
        }
    }

    fn refresh_position(&mut self) {
        if !self.plugged_in {
            return;
        }
        if let Some(r) = self.readings {
            self.position = Some(resolve_position(r.tile, r.row, r.col));
        }
    }
}
