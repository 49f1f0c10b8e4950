//! Mock servers for integration testing
//!
//! Simulates the MQTT broker the hub and the proxies talk to, so the adapter
//! can be exercised without a network.

pub mod mqtt;

pub use mqtt::MockBroker;
