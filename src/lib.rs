//! Tangible Dashboard
//!
//! Hub service for a tangible smart-home dashboard: physical proxies are
//! plugged into a 16x16 board, report where they sit and what state they are
//! in over MQTT, and the hub lights up the board accordingly.
//!
//! This library provides:
//! - Proxy device profiles, pin map and MQTT topic layout
//! - ADC calibration turning raw readings into board positions
//! - The dashboard state machine deciding which animation to play
//! - A rate-limited link to the LED controller
//! - MQTT integration over an internal event bus

pub mod adapters;
pub mod bus;
pub mod calibration;
pub mod config;
pub mod dashboard;
pub mod device;
pub mod light;
pub mod logging;
pub mod proxy;
