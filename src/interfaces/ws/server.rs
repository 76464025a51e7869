//! Gateway WebSocket server
//!
//! Accepts hardware at `ws://<host>:<port>/{class}/{device_id}` and
//! dashboards at `ws://<host>:<port>/frontend/{class}`. Every socket gets a
//! writer task that owns the sink and a read loop that feeds its hub.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use super::routes::{negotiate_subprotocol, WsRoute};
use crate::application::hub::{
    ConnectionHandle, ConnectionId, Outbound, OutboundQueue, SharedConnectionRegistry, SharedHub,
    SharedHubDirectory,
};
use crate::shared::shutdown::ShutdownSignal;

const SUBPROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// A single socket write that takes longer than this marks the peer dead
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Gateway socket server
pub struct GatewayServer {
    hubs: SharedHubDirectory,
    idle_timeout: Option<Duration>,
    shutdown_signal: Option<ShutdownSignal>,
}

impl GatewayServer {
    pub fn new(hubs: SharedHubDirectory) -> Self {
        Self {
            hubs,
            idle_timeout: None,
            shutdown_signal: None,
        }
    }

    /// Drop hardware that stays silent for longer than `timeout`.
    /// Dashboards only listen, so they are never timed out.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the shutdown signal for graceful shutdown
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    /// Serve connections from an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let local = listener.local_addr()?;
        info!("🔌 Charging gateway listening on ws://{}", local);
        for class in self.hubs.classes() {
            info!(class, "   Hardware: ws://{}/{}/{{device_id}}  Dashboards: ws://{}/frontend/{}", local, class, local, class);
        }

        let shutdown = self.shutdown_signal.clone().unwrap_or_default();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("🛑 WebSocket server received shutdown signal");
                    self.graceful_shutdown();
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let hubs = self.hubs.clone();
        let idle_timeout = self.idle_timeout;
        let shutdown = self.shutdown_signal.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, hubs, idle_timeout, shutdown).await {
                warn!(peer = %addr, error = %e, "Connection error");
            }
        });
    }

    fn graceful_shutdown(&self) {
        let closed = self.hubs.close_all();
        info!(closed, "✅ WebSocket server shutdown complete");
    }
}

// ── Handshake ──────────────────────────────────────────────────

fn not_found(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("No socket endpoint at {}", path)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Resolve the request path to an enabled hub and echo the hub's
/// subprotocol when the client asked for it.
fn accept_route(
    hubs: &SharedHubDirectory,
    req: &Request,
    mut response: Response,
) -> Result<(Response, WsRoute, SharedHub), ErrorResponse> {
    let path = req.uri().path();

    let route = WsRoute::parse(path).ok_or_else(|| not_found(path))?;
    let hub = hubs.get(route.class()).ok_or_else(|| not_found(path))?;

    let requested = req
        .headers()
        .get(SUBPROTOCOL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Some(protocol) = negotiate_subprotocol(requested, hub.profile().subprotocol) {
        response
            .headers_mut()
            .insert(SUBPROTOCOL_HEADER, HeaderValue::from_static(protocol));
    } else if !requested.is_empty() {
        debug!(path, requested, "No matching subprotocol");
    }

    Ok((response, route, hub))
}

// ── Connection lifecycle ───────────────────────────────────────

/// Removes exactly one registry entry when the connection task ends,
/// however it ends.
struct RegistrationGuard {
    registry: SharedConnectionRegistry,
    conn_id: ConnectionId,
    device_id: Option<String>,
}

impl RegistrationGuard {
    fn register(route: &WsRoute, hub: &SharedHub, conn: &ConnectionHandle) -> Self {
        let registry = hub.registry().clone();
        let device_id = match route {
            WsRoute::Hardware { device_id, .. } => {
                registry.register_hardware(device_id.clone(), conn.clone());
                Some(device_id.clone())
            }
            WsRoute::Dashboard { .. } => {
                registry.register_dashboard(conn.clone());
                None
            }
        };
        Self {
            registry,
            conn_id: conn.id(),
            device_id,
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        match &self.device_id {
            Some(device_id) => {
                self.registry.unregister_hardware(device_id, self.conn_id);
            }
            None => {
                self.registry.unregister_dashboard(self.conn_id);
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hubs: SharedHubDirectory,
    idle_timeout: Option<Duration>,
    shutdown: Option<ShutdownSignal>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!(peer = %addr, "New TCP connection");

    let mut resolved: Option<(WsRoute, SharedHub)> = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, response: Response| {
        let (response, route, hub) = accept_route(&hubs, req, response).map_err(|e| {
            warn!(peer = %addr, path = req.uri().path(), "Rejected socket handshake");
            e
        })?;
        resolved = Some((route, hub));
        Ok(response)
    })
    .await?;

    let Some((route, hub)) = resolved else {
        return Ok(());
    };

    let (sink, source) = ws_stream.split();
    let (conn, rx) = ConnectionHandle::channel(hub.registry().allocate_id(), route.label());
    let guard = RegistrationGuard::register(&route, &hub, &conn);

    info!(
        hub = hub.class(),
        device_id = route.label(),
        connection = conn.id(),
        peer = %addr,
        "Connected"
    );

    let mut writer = tokio::spawn(write_loop(sink, rx, conn.id()));
    let shutdown = shutdown.unwrap_or_default();

    tokio::select! {
        _ = read_loop(source, &route, &hub, &conn, idle_timeout) => {}
        _ = &mut writer => {
            debug!(connection = conn.id(), "Writer finished first");
        }
        _ = shutdown.notified().wait() => {
            info!(connection = conn.id(), "Connection closing due to server shutdown");
        }
    }

    drop(guard);
    conn.close();
    if !writer.is_finished()
        && tokio::time::timeout(Duration::from_secs(1), &mut writer).await.is_err()
    {
        writer.abort();
    }

    info!(hub = hub.class(), device_id = route.label(), connection = conn.id(), "Disconnected");
    Ok(())
}

/// Sole owner of the socket sink
async fn write_loop(mut sink: WsSink, mut rx: OutboundQueue, conn_id: ConnectionId) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Text(text) => {
                match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Text(text))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(connection = conn_id, error = %e, "Send error");
                        break;
                    }
                    Err(_) => {
                        warn!(connection = conn_id, timeout_secs = WRITE_TIMEOUT.as_secs(), "Peer stopped reading");
                        return;
                    }
                }
            }
            Outbound::Close => {
                let _ = tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Close(None))).await;
                break;
            }
        }
    }
    let _ = tokio::time::timeout(WRITE_TIMEOUT, sink.close()).await;
}

async fn read_loop(
    mut source: WsSource,
    route: &WsRoute,
    hub: &SharedHub,
    conn: &ConnectionHandle,
    idle_timeout: Option<Duration>,
) {
    let idle_timeout = match route {
        WsRoute::Hardware { .. } => idle_timeout,
        WsRoute::Dashboard { .. } => None,
    };
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, source.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(connection = conn.id(), idle_secs = limit.as_secs(), "Idle timeout");
                    break;
                }
            },
            None => source.next().await,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                debug!(connection = conn.id(), error = %e, "WebSocket error");
                break;
            }
            None => break,
        };

        match message {
            Message::Text(text) => match route {
                WsRoute::Hardware { device_id, .. } => {
                    debug!(hub = hub.class(), device_id = device_id.as_str(), "<- {}", text);
                    if let Err(e) = hub.on_hardware_text(device_id, conn, &text) {
                        warn!(hub = hub.class(), device_id = device_id.as_str(), error = %e, "Reply failed, dropping connection");
                        break;
                    }
                }
                WsRoute::Dashboard { .. } => {
                    hub.on_dashboard_text(&text);
                }
            },
            Message::Close(frame) => {
                debug!(connection = conn.id(), ?frame, "Close frame received");
                break;
            }
            Message::Binary(data) => {
                warn!(connection = conn.id(), bytes = data.len(), "Binary message ignored");
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
}
