//! External links of the hub (MQTT broker) and their shared lifecycle trait

pub mod mqtt;
mod traits;

pub use traits::{StartOrder, Startable};
