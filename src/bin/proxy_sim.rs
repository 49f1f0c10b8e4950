//! Proxy Simulator CLI
//!
//! Stands in for a proxy device so the hub can be exercised without
//! hardware. Uses the same profile, topics and payloads as the firmware.
//!
//! Usage:
//!   proxy-sim show <hub|sensor> [id]
//!   proxy-sim report <id> <tile> <row> <col> <state|x>
//!   proxy-sim listen <id>

use std::env;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tangible_dashboard::adapters::mqtt::MqttAdapter;
use tangible_dashboard::adapters::Startable;
use tangible_dashboard::bus::{create_bus, BusEvent};
use tangible_dashboard::config::MqttConfig;
use tangible_dashboard::device::profile::SENSOR_PROXY_ID;
use tangible_dashboard::device::{DeviceProfile, HubState, ProxyId, ProxyReport};
use tokio::sync::broadcast;

/// Time given to the client to flush a publish before disconnecting
const FLUSH_DELAY: Duration = Duration::from_secs(2);

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  proxy-sim show <hub|sensor> [id]");
    eprintln!("  proxy-sim report <id> <tile> <row> <col> <state|x>");
    eprintln!("  proxy-sim listen <id>");
}

/// Id 0 is always the hub proxy
fn profile_for(id: ProxyId) -> DeviceProfile {
    if id == 0 {
        DeviceProfile::hub_proxy()
    } else {
        DeviceProfile::sensor_proxy(id)
    }
}

fn mqtt_config(profile: &DeviceProfile) -> MqttConfig {
    MqttConfig {
        host: profile.broker.server.clone(),
        port: profile.broker.port,
        username: Some(profile.broker.user.clone()),
        password: Some(profile.broker.password.clone()),
        client_id: profile.client_id(),
    }
}

fn parse_id(arg: Option<&String>) -> Result<ProxyId> {
    let arg = arg.ok_or_else(|| anyhow!("missing proxy id"))?;
    arg.parse()
        .with_context(|| format!("invalid proxy id '{}'", arg))
}

fn show(args: &[String]) -> Result<()> {
    let profile = match args.first().map(String::as_str) {
        Some("hub") => DeviceProfile::hub_proxy(),
        Some("sensor") => {
            let id = match args.get(1) {
                Some(_) => parse_id(args.get(1))?,
                None => SENSOR_PROXY_ID,
            };
            DeviceProfile::sensor_proxy(id)
        }
        _ => return Err(anyhow!("expected 'hub' or 'sensor'")),
    };
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn report(args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let payload = args.get(1..5).ok_or_else(|| anyhow!("missing readings"))?.join(",");
    let report: ProxyReport = payload.parse()?;
    let profile = profile_for(id);

    let adapter = MqttAdapter::new(create_bus());
    adapter.configure(&mqtt_config(&profile), Vec::new()).await;
    adapter.start().await?;

    adapter
        .publish(&profile.pub_topic, &report.to_string())
        .await?;
    println!("{} <- {}", profile.pub_topic, report);

    tokio::time::sleep(FLUSH_DELAY).await;
    adapter.stop().await;
    Ok(())
}

async fn listen(args: &[String]) -> Result<()> {
    let id = parse_id(args.first())?;
    let profile = profile_for(id);
    let topic = profile
        .sub_topic
        .clone()
        .ok_or_else(|| anyhow!("proxy {} does not receive hub state", id))?;

    let bus = create_bus();
    let mut rx = bus.subscribe();
    let adapter = MqttAdapter::new(bus);
    adapter
        .configure(&mqtt_config(&profile), vec![topic.clone()])
        .await;
    adapter.start().await?;
    println!("Listening on {} (Ctrl+C to stop)", topic);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = next_hub_state(&mut rx, &topic) => match state {
                Some(state) => println!("hub state -> {}", state),
                None => break,
            },
        }
    }

    adapter.stop().await;
    Ok(())
}

/// Next valid hub state on `topic`, or `None` once the bus is closed
async fn next_hub_state(rx: &mut broadcast::Receiver<BusEvent>, topic: &str) -> Option<HubState> {
    loop {
        match rx.recv().await {
            Ok(BusEvent::MessageReceived { topic: t, payload }) if t == topic => {
                match payload.parse::<HubState>() {
                    Ok(state) => return Some(state),
                    Err(e) => eprintln!("ignored: {}", e),
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                eprintln!("missed {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest = &args[2..];
    let result = match args[1].as_str() {
        "show" => show(rest),
        "report" => report(rest).await,
        "listen" => listen(rest).await,
        _ => {
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
