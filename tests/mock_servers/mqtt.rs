#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Mock MQTT broker for testing
//!
//! Speaks just enough MQTT 3.1.1 for one client: answers CONNECT, SUBSCRIBE
//! and PINGREQ, records the subscribed topic filters per connection, and can
//! push PUBLISH packets to the connected client.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

const CONNECT: u8 = 1;
const SUBSCRIBE: u8 = 8;
const PINGREQ: u8 = 12;
const DISCONNECT: u8 = 14;

/// Mock broker state
#[derive(Debug, Default)]
pub struct MockBrokerState {
    /// Topic filters subscribed, one entry per accepted CONNECT
    pub subscriptions: Vec<Vec<String>>,
}

/// Mock MQTT broker
pub struct MockBroker {
    addr: SocketAddr,
    state: Arc<RwLock<MockBrokerState>>,
    client: Arc<Mutex<Option<OwnedWriteHalf>>>,
    handle: JoinHandle<()>,
}

impl MockBroker {
    /// Start a broker that accepts every connection
    pub async fn start() -> Self {
        Self::with_return_code(0).await
    }

    /// Start a broker answering CONNECT with the given CONNACK return code
    pub async fn with_return_code(code: u8) -> Self {
        let state = Arc::new(RwLock::new(MockBrokerState::default()));
        let client = Arc::new(Mutex::new(None));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state_clone = state.clone();
        let client_clone = client.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        let client = client_clone.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, state, client, code).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            state,
            client,
            handle,
        }
    }

    /// Get the broker address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of CONNECT packets seen so far
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }

    /// Topic filters subscribed during the given connection
    pub async fn subscriptions(&self, connection: usize) -> Vec<String> {
        self.state
            .read()
            .await
            .subscriptions
            .get(connection)
            .cloned()
            .unwrap_or_default()
    }

    /// Push a QoS 0 PUBLISH to the connected client
    pub async fn publish(&self, topic: &str, payload: &[u8]) {
        let mut body = Vec::new();
        body.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        body.extend_from_slice(topic.as_bytes());
        body.extend_from_slice(payload);

        let mut client = self.client.lock().await;
        let writer = client.as_mut().expect("no client connected");
        writer.write_all(&packet(0x30, &body)).await.unwrap();
    }

    /// Close the connection to the current client
    pub async fn drop_client(&self) {
        if let Some(mut writer) = self.client.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Stop the mock broker
    pub async fn stop(self) {
        self.drop_client().await;
        self.handle.abort();
    }
}

/// Frame a packet: fixed header byte, remaining length, body
fn packet(header: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![header];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
    out.extend_from_slice(body);
    out
}

/// Read one packet, returning its type and body
async fn read_packet<R: AsyncReadExt + Unpin>(reader: &mut R) -> Option<(u8, Vec<u8>)> {
    let header = reader.read_u8().await.ok()?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8().await.ok()?;
        len |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; len];
    reader.read_exact(&mut body).await.ok()?;
    Some((header >> 4, body))
}

/// Topic filters of a SUBSCRIBE body (packet id, then length-prefixed filter and QoS pairs)
fn subscribe_filters(body: &[u8]) -> Vec<String> {
    let mut filters = Vec::new();
    let mut at = 2;
    while at + 2 <= body.len() {
        let len = u16::from_be_bytes([body[at], body[at + 1]]) as usize;
        let start = at + 2;
        filters.push(String::from_utf8_lossy(&body[start..start + len]).into_owned());
        at = start + len + 1;
    }
    filters
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    state: Arc<RwLock<MockBrokerState>>,
    client: Arc<Mutex<Option<OwnedWriteHalf>>>,
    code: u8,
) {
    let (mut reader, writer) = stream.into_split();
    *client.lock().await = Some(writer);
    let mut connection = None;

    while let Some((kind, body)) = read_packet(&mut reader).await {
        let response = match kind {
            CONNECT => {
                let mut state = state.write().await;
                state.subscriptions.push(Vec::new());
                connection = Some(state.subscriptions.len() - 1);
                packet(0x20, &[0x00, code])
            }
            SUBSCRIBE => {
                let filters = subscribe_filters(&body);
                let granted = vec![0x00; filters.len()];
                if let Some(index) = connection {
                    state.write().await.subscriptions[index].extend(filters);
                }
                let mut ack = body[..2].to_vec();
                ack.extend_from_slice(&granted);
                packet(0x90, &ack)
            }
            PINGREQ => packet(0xd0, &[]),
            DISCONNECT => break,
            _ => continue,
        };

        let mut client = client.lock().await;
        match client.as_mut() {
            Some(writer) => {
                if writer.write_all(&response).await.is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}
