//! Rate-limited queue in front of the LED controller
//!
//! The controller firmware needs time to finish an animation before it can
//! take the next command, so messages are queued and written by a single
//! worker that waits `min_interval` after every write.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::sink::LightSink;
use super::LightCommand;
use crate::bus::{BusEvent, SharedBus};
use crate::calibration::Position;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);
pub const QUEUE_CAPACITY: usize = 64;

pub struct LightController {
    sender: mpsc::Sender<LightCommand>,
    receiver: Mutex<Option<mpsc::Receiver<LightCommand>>>,
    sink: Mutex<Option<Box<dyn LightSink>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    min_interval: Duration,
    bus: SharedBus,
    shutdown: CancellationToken,
}

impl LightController {
    pub fn new(sink: Box<dyn LightSink>, min_interval: Duration, bus: SharedBus) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            sink: Mutex::new(Some(sink)),
            worker: Mutex::new(None),
            min_interval,
            bus,
            shutdown: CancellationToken::new(),
        }
    }

    /// Queue a command. Commands queued before `start` are kept.
    ///
    /// Never waits on the LED pacing: when the queue is full the command is
    /// dropped and an error is returned.
    pub fn send(&self, command: LightCommand) -> Result<()> {
        match self.sender.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Light queue full, dropping {:?}", command);
                return Err(anyhow!("light controller queue full"));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Err(anyhow!("light controller queue closed"));
            }
        }
        debug!("Light command queued: {:?}", command);
        self.bus.publish(BusEvent::LightCommandQueued { command });
        Ok(())
    }

    pub fn send_coordinates(&self, at: Position) -> Result<()> {
        self.send(LightCommand::Coordinates { at })
    }

    pub fn send_path(&self, from: Position, to: Position) -> Result<()> {
        self.send(LightCommand::Path { from, to })
    }

    pub fn send_boot(&self) -> Result<()> {
        self.send(LightCommand::Boot)
    }

    async fn start_internal(&self) -> Result<()> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("light controller already started"))?;
        let sink = self
            .sink
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("light controller has no sink"))?;

        let handle = tokio::spawn(run_worker(
            sink,
            receiver,
            self.min_interval,
            self.shutdown.clone(),
        ));
        *self.worker.lock().await = Some(handle);

        info!(
            "Light controller started (min interval {:?})",
            self.min_interval
        );
        Ok(())
    }

    async fn stop_internal(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Light controller worker panicked: {}", e);
            }
        }
        info!("Light controller stopped");
    }
}

crate::impl_startable!(LightController, "light");

async fn run_worker(
    mut sink: Box<dyn LightSink>,
    mut receiver: mpsc::Receiver<LightCommand>,
    min_interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = shutdown.cancelled() => break,
            command = receiver.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        let message = command.encode();
        match sink.write_message(&message).await {
            Ok(()) => info!("Light message sent: {}", message.trim_end()),
            Err(e) => error!("Failed to send light message '{}': {}", message.trim_end(), e),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(min_interval) => {}
        }
    }
    debug!("Light controller worker exiting");
}
