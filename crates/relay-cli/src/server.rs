//! TCP transport for the bridge.
//!
//! Connections are served concurrently, but all of them share one
//! [`Dispatcher`] behind a mutex: each request holds the lock for its whole
//! duration on a blocking worker, so operations never interleave. Requests
//! on one connection are answered in order.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use relay_runtime::{BridgeError, Dispatcher, Envelope};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::{decode_request, encode_line, Response};

/// Dispatcher shared by all connections
pub type SharedDispatcher = Arc<Mutex<Dispatcher>>;

pub struct Server {
    listener: TcpListener,
    dispatcher: SharedDispatcher,
}

impl Server {
    pub async fn bind(addr: &str, dispatcher: Dispatcher) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher: Arc::new(Mutex::new(dispatcher)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn dispatcher(&self) -> SharedDispatcher {
        self.dispatcher.clone()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "bridge listening");
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                tracing::info!(%peer, "client connected");
                match handle_connection(dispatcher, stream).await {
                    Ok(()) => tracing::info!(%peer, "client disconnected"),
                    Err(e) => tracing::warn!(%peer, "connection closed with error: {}", e),
                }
            });
        }
    }
}

/// Serve one connection: read request lines, answer each in order.
pub async fn handle_connection(dispatcher: SharedDispatcher, stream: TcpStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match decode_request(&line) {
            Ok(request) => {
                let result = dispatch_blocking(dispatcher.clone(), request.method, request.params).await;
                Response::new(request.id, result)
            }
            Err(response) => {
                tracing::debug!("Rejected request line: {}", line.trim());
                response
            }
        };
        let encoded = encode_line(&response)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Run one operation on a blocking worker while holding the dispatcher lock.
async fn dispatch_blocking(
    dispatcher: SharedDispatcher,
    method: String,
    params: serde_json::Value,
) -> Envelope {
    let task = tokio::task::spawn_blocking(move || dispatcher.lock().dispatch(&method, &params));
    match task.await {
        Ok(envelope) => envelope,
        Err(e) => Envelope::failure(&BridgeError::Internal(format!("request task failed: {}", e))),
    }
}
