//! Text payloads exchanged over MQTT
//!
//! All payloads are short comma-separated ASCII strings so they can be built
//! and parsed on the proxies without an allocator-heavy format.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::topics::ProxyId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("expected {expected} fields in '{payload}', got {got}")]
    FieldCount {
        payload: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid hub state '{0}'")]
    InvalidHubState(String),
}

fn split_fields(payload: &str, expected: usize) -> Result<Vec<&str>, PayloadError> {
    let fields: Vec<&str> = payload.trim().split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(PayloadError::FieldCount {
            payload: payload.to_string(),
            expected,
            got: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, PayloadError> {
    value.parse().map_err(|_| PayloadError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// State field of a proxy report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedState {
    /// `x`: the proxy was just plugged in and does not know its state yet
    Unknown,
    Value(u8),
}

impl fmt::Display for ReportedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedState::Unknown => write!(f, "x"),
            ReportedState::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Raw ADC readings plus state, published by a proxy as `tile,row,col,state`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyReport {
    pub tile: u16,
    pub row: u16,
    pub col: u16,
    pub state: ReportedState,
}

impl FromStr for ProxyReport {
    type Err = PayloadError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(payload, 4)?;

        let state = match fields[3] {
            "x" => ReportedState::Unknown,
            v => ReportedState::Value(parse_field("state", v)?),
        };

        Ok(Self {
            tile: parse_field("tile", fields[0])?,
            row: parse_field("row", fields[1])?,
            col: parse_field("col", fields[2])?,
            state,
        })
    }
}

impl fmt::Display for ProxyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.tile, self.row, self.col, self.state)
    }
}

/// State pushed by the hub to a proxy. Only 0, 1 and 2 are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubState(u8);

impl HubState {
    pub const MAX: u8 = 2;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl FromStr for HubState {
    type Err = PayloadError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let trimmed = payload.trim();
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(HubState::new)
            .ok_or_else(|| PayloadError::InvalidHubState(trimmed.to_string()))
    }
}

impl fmt::Display for HubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `"<from>,<to>"` on the animation topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRequest {
    pub from: ProxyId,
    pub to: ProxyId,
}

impl FromStr for PathRequest {
    type Err = PayloadError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(payload, 2)?;
        Ok(Self {
            from: parse_field("from", fields[0])?,
            to: parse_field("to", fields[1])?,
        })
    }
}

/// `"<id>,<row>,<col>"` on the override topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideRequest {
    pub id: ProxyId,
    pub row: u8,
    pub col: u8,
}

impl FromStr for OverrideRequest {
    type Err = PayloadError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(payload, 3)?;
        Ok(Self {
            id: parse_field("id", fields[0])?,
            row: parse_field("row", fields[1])?,
            col: parse_field("col", fields[2])?,
        })
    }
}
