//! MQTT Adapter
//!
//! Bridges the broker to the internal event bus: every message received on a
//! subscribed topic is published on the bus as `MessageReceived`.

use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, Incoming, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::bus::{BusEvent, SharedBus};
use crate::config::MqttConfig;

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_CLIENT_ID: &str = "tangible-dashboard";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// MQTT connection status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttStatus {
    pub connected: bool,
    pub host: Option<String>,
    pub port: u16,
    pub subscriptions: Vec<String>,
}

/// Internal state
struct MqttState {
    host: Option<String>,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    client_id: String,
    subscriptions: Vec<String>,
    connected: bool,
}

impl Default for MqttState {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            username: None,
            password: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            subscriptions: Vec::new(),
            connected: false,
        }
    }
}

/// MQTT Adapter
pub struct MqttAdapter {
    state: Arc<RwLock<MqttState>>,
    client: Arc<RwLock<Option<AsyncClient>>>,
    bus: SharedBus,
    shutdown: CancellationToken,
}

impl MqttAdapter {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(MqttState::default())),
            client: Arc::new(RwLock::new(None)),
            bus,
            shutdown: CancellationToken::new(),
        }
    }

    /// Configure the broker connection and the topics to (re)subscribe on connect
    pub async fn configure(&self, config: &MqttConfig, subscriptions: Vec<String>) {
        let mut state = self.state.write().await;
        state.host = Some(config.host.clone());
        state.port = config.port;
        // Empty strings mean anonymous access
        state.username = config.username.clone().filter(|u| !u.is_empty());
        state.password = config.password.clone();
        state.client_id = config.client_id.clone();
        state.subscriptions = subscriptions;
    }

    /// Check if configured
    pub async fn is_configured(&self) -> bool {
        self.state.read().await.host.is_some()
    }

    /// Get connection status
    pub async fn get_status(&self) -> MqttStatus {
        let state = self.state.read().await;
        MqttStatus {
            connected: state.connected,
            host: state.host.clone(),
            port: state.port,
            subscriptions: state.subscriptions.clone(),
        }
    }

    /// Start MQTT connection and bridge
    async fn start_internal(&self) -> Result<()> {
        let (host, port, username, password, client_id, subscriptions) = {
            let state = self.state.read().await;
            let host = state
                .host
                .clone()
                .ok_or_else(|| anyhow!("MQTT host not configured"))?;
            (
                host,
                state.port,
                state.username.clone(),
                state.password.clone(),
                state.client_id.clone(),
                state.subscriptions.clone(),
            )
        };

        let mut options = MqttOptions::new(client_id, &host, port);
        options.set_keep_alive(Duration::from_secs(30));

        if let Some(user) = &username {
            options.set_credentials(user, password.as_deref().unwrap_or(""));
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);

        {
            let mut client_guard = self.client.write().await;
            *client_guard = Some(client.clone());
        }

        tracing::info!("MQTT connecting to {}:{}...", host, port);

        let state = self.state.clone();
        let bus = self.bus.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("MQTT event loop shutting down");
                        break;
                    }
                    result = eventloop.poll() => {
                        match result {
                            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                                match String::from_utf8(publish.payload.to_vec()) {
                                    Ok(payload) => {
                                        tracing::info!(
                                            "MQTT message on {}: {}",
                                            publish.topic,
                                            payload
                                        );
                                        bus.publish(BusEvent::MessageReceived {
                                            topic: publish.topic.clone(),
                                            payload,
                                        });
                                    }
                                    Err(e) => {
                                        tracing::error!(
                                            "Failed to decode payload on {}: {}",
                                            publish.topic,
                                            e
                                        );
                                    }
                                }
                            }
                            Ok(Event::Incoming(Incoming::ConnAck(ack)))
                                if ack.code != ConnectReturnCode::Success =>
                            {
                                tracing::error!("MQTT connection refused: {:?}", ack.code);
                            }
                            Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                                tracing::info!("MQTT connected (code: {:?})", ack.code);
                                // Clean session: subscriptions are lost on every reconnect
                                for topic in &subscriptions {
                                    match client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                                        Ok(()) => tracing::info!("Subscribed to {}", topic),
                                        Err(e) => tracing::error!("Failed to subscribe to {}: {}", topic, e),
                                    }
                                }
                                state.write().await.connected = true;
                                bus.publish(BusEvent::MqttConnected { host: host.clone() });
                            }
                            Ok(Event::Incoming(Incoming::Disconnect)) => {
                                tracing::warn!("MQTT disconnected");
                                state.write().await.connected = false;
                                bus.publish(BusEvent::MqttDisconnected {
                                    reason: "broker sent disconnect".to_string(),
                                });
                            }
                            Err(e) => {
                                tracing::error!("MQTT error: {}", e);
                                let was_connected = {
                                    let mut state = state.write().await;
                                    std::mem::replace(&mut state.connected, false)
                                };
                                if was_connected {
                                    bus.publish(BusEvent::MqttDisconnected {
                                        reason: e.to_string(),
                                    });
                                }
                                // Check shutdown before sleeping
                                tokio::select! {
                                    _ = shutdown.cancelled() => break,
                                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop MQTT connection
    async fn stop_internal(&self) {
        // Cancel background tasks first
        self.shutdown.cancel();

        // Then disconnect client
        let mut client = self.client.write().await;
        if let Some(c) = client.take() {
            let _ = c.disconnect().await;
        }

        let mut state = self.state.write().await;
        state.connected = false;

        tracing::info!("MQTT adapter stopped");
    }

    /// Publish a message on a topic
    pub async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        let client = self.client.read().await;
        let c = client
            .as_ref()
            .ok_or_else(|| anyhow!("MQTT adapter not started"))?;
        c.publish(topic, QoS::AtLeastOnce, false, payload.as_bytes())
            .await?;
        Ok(())
    }
}

crate::impl_startable!(MqttAdapter, "mqtt", is_configured);
