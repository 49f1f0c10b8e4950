//! LED controller link
//!
//! The board's LEDs are driven by a separate ESP32 listening on a serial
//! line. It understands three newline-terminated text commands:
//! - `x,y` lights the slot at row x, column y
//! - `x1,y1,x2,y2` runs a path animation between two slots
//! - `boot` plays the startup animation

mod controller;
mod sink;

pub use controller::{LightController, DEFAULT_MIN_INTERVAL, QUEUE_CAPACITY};
pub use sink::{LightSink, LogSink, SerialSink};

use serde::{Deserialize, Serialize};

use crate::calibration::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightCommand {
    Coordinates { at: Position },
    Path { from: Position, to: Position },
    Boot,
}

impl LightCommand {
    /// Wire form understood by the LED controller
    pub fn encode(&self) -> String {
        match self {
            LightCommand::Coordinates { at } => format!("{},{}\n", at.row, at.col),
            LightCommand::Path { from, to } => {
                format!("{},{},{},{}\n", from.row, from.col, to.row, to.col)
            }
            // The controller firmware matches the bare word, no terminator
            LightCommand::Boot => "boot".to_string(),
        }
    }
}
