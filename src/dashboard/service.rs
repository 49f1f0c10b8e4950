//! Bus-driven wrapper around [`Dashboard`]
//!
//! Consumes `MessageReceived` events, applies them to the dashboard, forwards
//! resulting light commands to the LED controller and announces proxy
//! changes on the bus.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Dashboard;
use crate::bus::{BusEvent, SharedBus};
use crate::light::LightController;
use crate::proxy::Proxy;

pub struct DashboardService {
    dashboard: Arc<RwLock<Dashboard>>,
    lights: Arc<LightController>,
    bus: SharedBus,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DashboardService {
    pub fn new(dashboard: Dashboard, lights: Arc<LightController>, bus: SharedBus) -> Self {
        Self {
            dashboard: Arc::new(RwLock::new(dashboard)),
            lights,
            bus,
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    /// Current view of all proxies
    pub async fn proxies(&self) -> Vec<Proxy> {
        self.dashboard.read().await.proxies().to_vec()
    }

    async fn start_internal(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Err(anyhow!("dashboard service already started"));
        }

        // Subscribe before spawning so no message published after start is missed
        let rx = self.bus.subscribe();
        *worker = Some(tokio::spawn(run(
            rx,
            self.dashboard.clone(),
            self.lights.clone(),
            self.bus.clone(),
            self.shutdown.clone(),
        )));

        info!("Message Handler started.");
        Ok(())
    }

    async fn stop_internal(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Dashboard worker panicked: {}", e);
            }
        }
        info!("Message Handler stopped.");
    }
}

crate::impl_startable!(DashboardService, "dashboard");

async fn run(
    mut rx: broadcast::Receiver<BusEvent>,
    dashboard: Arc<RwLock<Dashboard>>,
    lights: Arc<LightController>,
    bus: SharedBus,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = rx.recv() => match result {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dashboard lagged behind the bus, {} events dropped", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let (topic, payload) = match event {
            BusEvent::MessageReceived { topic, payload } => (topic, payload),
            BusEvent::ShuttingDown { .. } => break,
            _ => continue,
        };

        let (outcome, updated) = {
            let mut dashboard = dashboard.write().await;
            let outcome = dashboard.handle(&topic, &payload);
            let updated = outcome.updated.and_then(|id| dashboard.proxy(id).cloned());
            (outcome, updated)
        };

        if let Some(proxy) = updated {
            bus.publish(BusEvent::ProxyUpdated {
                id: proxy.id,
                position: proxy.position,
                state: proxy.state,
                plugged_in: proxy.plugged_in,
            });
        }

        if let Some(command) = outcome.command {
            if let Err(e) = lights.send(command) {
                warn!("Light command {:?} not queued: {}", command, e);
            }
        }
    }
    debug!("Dashboard worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Startable;
    use crate::bus::create_bus;
    use crate::calibration::Position;
    use crate::light::{LightCommand, LogSink};
    use std::time::Duration;

    async fn next_matching<F>(rx: &mut broadcast::Receiver<BusEvent>, mut f: F) -> BusEvent
    where
        F: FnMut(&BusEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let event = rx.recv().await.expect("bus open");
                if f(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event in time")
    }

    #[tokio::test]
    async fn test_message_becomes_light_command() {
        let bus = create_bus();
        let lights = Arc::new(LightController::new(
            Box::new(LogSink),
            Duration::from_millis(1),
            bus.clone(),
        ));
        let service = DashboardService::new(
            Dashboard::new(&[0, 1], "anim", "override"),
            lights,
            bus.clone(),
        );
        service.start().await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(BusEvent::MessageReceived {
            topic: "override".to_string(),
            payload: "1,4,5".to_string(),
        });

        let updated =
            next_matching(&mut rx, |e| matches!(e, BusEvent::ProxyUpdated { .. })).await;
        assert_eq!(
            updated,
            BusEvent::ProxyUpdated {
                id: 1,
                position: Some(Position::new(4, 5)),
                state: None,
                plugged_in: true,
            }
        );

        let queued =
            next_matching(&mut rx, |e| matches!(e, BusEvent::LightCommandQueued { .. })).await;
        assert_eq!(
            queued,
            BusEvent::LightCommandQueued {
                command: LightCommand::Coordinates {
                    at: Position::new(4, 5)
                }
            }
        );

        let proxies = service.proxies().await;
        assert_eq!(proxies.len(), 2);
        assert!(proxies[1].override_active);

        service.stop().await;
    }

    #[tokio::test]
    async fn test_slow_leds_do_not_stall_message_handling() {
        let bus = create_bus();
        let lights = Arc::new(LightController::new(
            Box::new(LogSink),
            Duration::from_secs(60),
            bus.clone(),
        ));
        lights.start().await.unwrap();
        let service = DashboardService::new(
            Dashboard::new(&[0, 1], "anim", "override"),
            lights.clone(),
            bus.clone(),
        );
        service.start().await.unwrap();

        // More moves than the LED queue can hold
        for i in 0..70u8 {
            bus.publish(BusEvent::MessageReceived {
                topic: "override".to_string(),
                payload: format!("1,{},{}", i / 10 + 1, i % 10 + 1),
            });
        }
        for state in ["1", "0", "2"] {
            bus.publish(BusEvent::MessageReceived {
                topic: "hub_state_update_proxy_0".to_string(),
                payload: state.to_string(),
            });
        }

        let mut proxies = service.proxies().await;
        for _ in 0..200 {
            if proxies[0].state == Some(2) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            proxies = service.proxies().await;
        }

        assert_eq!(proxies[0].state, Some(2));
        assert_eq!(proxies[1].position, Some(Position::new(7, 10)));

        service.stop().await;
        lights.stop().await;
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_event() {
        let bus = create_bus();
        let lights = Arc::new(LightController::new(
            Box::new(LogSink),
            Duration::from_millis(1),
            bus.clone(),
        ));
        let service = DashboardService::new(Dashboard::new(&[0], "a", "o"), lights, bus.clone());
        service.start().await.unwrap();
        assert!(service.start().await.is_err());

        bus.publish(BusEvent::ShuttingDown { reason: None });

        let handle = service.worker.lock().await.take().unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker exits")
            .unwrap();
    }
}
