//! Tangible Dashboard hub
//!
//! Listens to the proxies over MQTT and drives the board's LED controller.

use tangible_dashboard::{adapters, bus, config, dashboard, light, logging};

use adapters::StartOrder;
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;

    match logging::init(&config.log_dir) {
        Ok(path) => tracing::info!("Logging to {}", path.display()),
        Err(e) => tracing::warn!("File logging disabled: {}", e),
    }

    tracing::info!(
        "Starting Tangible Dashboard v{} ({})",
        env!("TD_VERSION"),
        env!("TD_GIT_SHA")
    );
    tracing::info!(
        "Configuration loaded, broker: {}:{}, proxies: {:?}",
        config.mqtt.host,
        config.mqtt.port,
        config.proxy_ids
    );

    // Create event bus
    let bus = bus::create_bus();

    // LED controller link
    let opened = light::SerialSink::open(&config.light.port, config.light.baud_rate);
    let sink: Box<dyn light::LightSink> = match opened {
        Ok(sink) => {
            tracing::info!(
                "LED controller on {} at {} baud",
                sink.name(),
                config.light.baud_rate
            );
            Box::new(sink)
        }
        Err(e) => {
            tracing::warn!(
                "Cannot open LED controller at {}: {}, animations will only be logged",
                config.light.port,
                e
            );
            Box::new(light::LogSink)
        }
    };
    let lights = Arc::new(light::LightController::new(
        sink,
        config.light.min_interval(),
        bus.clone(),
    ));

    // Dashboard state machine
    let dashboard = Arc::new(dashboard::DashboardService::new(
        dashboard::Dashboard::new(
            &config.proxy_ids,
            config.animation_topic.clone(),
            config.override_topic.clone(),
        ),
        lights.clone(),
        bus.clone(),
    ));

    // Broker link
    let mqtt = Arc::new(adapters::mqtt::MqttAdapter::new(bus.clone()));
    mqtt.configure(&config.mqtt, config.subscriptions()).await;

    // Consumers first so nothing the broker delivers is missed
    let mut running = StartOrder::new();
    running.start(lights.clone()).await?;
    running.start(dashboard).await?;
    running.start(mqtt).await?;

    lights.send_boot()?;

    shutdown_signal().await;

    bus.publish(bus::BusEvent::ShuttingDown {
        reason: Some("signal".to_string()),
    });

    // Stop in reverse order: broker first, LED link last
    tracing::info!("Shutting down...");
    running.stop_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
