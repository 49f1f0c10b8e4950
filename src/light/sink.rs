use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

/// Destination for encoded light messages
#[async_trait]
pub trait LightSink: Send + 'static {
    async fn write_message(&mut self, message: &str) -> io::Result<()>;
}

/// Serial line (e.g. `/dev/ttyUSB0`) the LED controller is attached to.
///
/// Opened 8N1 without flow control. The port is raw, so `\n` reaches the
/// controller unchanged.
pub struct SerialSink<W = SerialStream> {
    name: String,
    writer: W,
}

impl SerialSink {
    pub fn open(port: &str, baud_rate: u32) -> io::Result<Self> {
        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()?;
        Ok(Self::from_writer(port, stream))
    }
}

impl<W> SerialSink<W> {
    /// Wrap an already opened line
    pub fn from_writer(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<W> LightSink for SerialSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_message(&mut self, message: &str) -> io::Result<()> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.flush().await
    }
}

/// Sink used when no LED controller is attached: messages are only logged
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl LightSink for LogSink {
    async fn write_message(&mut self, message: &str) -> io::Result<()> {
        info!("(no LED controller) {}", message.trim_end());
        Ok(())
    }
}
