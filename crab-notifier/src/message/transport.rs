use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_util::sync::CancellationToken;

use super::codec::{self, EnginePacket, OpenInfo, ROOT_NAMESPACE, SocketPacket};
use super::{ChannelEvent, ClientRequest, TransportConfig, TransportError, TransportEvent};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Transport abstraction for the order channel
///
/// Reconnection is the transport's business: after `Disconnected` the
/// notifier just waits for the next `Connected`.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Next event; `None` once the transport has given up or been closed
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Queue a request for the server
    fn emit(&self, request: ClientRequest) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    async fn close(&mut self);
}

/// Socket.IO client over a websocket
///
/// A background task owns the socket, answers pings and reconnects with
/// exponential backoff.
#[derive(Debug)]
pub struct SocketIoTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<ClientRequest>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl SocketIoTransport {
    /// Start connecting to `url` (`ws://host/socket.io/?EIO=4&transport=websocket`)
    pub fn spawn(url: String, cookie: Option<String>, config: TransportConfig) -> Self {
        let (event_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, request_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let worker = SocketWorker {
            url,
            cookie,
            config,
            events: event_tx,
            requests: request_rx,
            connected: connected.clone(),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(worker.run());

        Self {
            inbound,
            outbound,
            connected,
            shutdown,
        }
    }
}

#[async_trait]
impl Transport for SocketIoTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }

    fn emit(&self, request: ClientRequest) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(request)
            .map_err(|_| TransportError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.shutdown.cancel();
        self.inbound.close();
    }
}

impl Drop for SocketIoTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// How a session ended
enum SessionEnd {
    Shutdown,
    Lost(String),
}

struct SocketWorker {
    url: String,
    cookie: Option<String>,
    config: TransportConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    requests: mpsc::UnboundedReceiver<ClientRequest>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl SocketWorker {
    async fn run(mut self) {
        tracing::info!(url = %self.url, "Order channel transport started");
        let mut failures: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let attempt = tokio::time::timeout(self.config.connect_timeout, self.handshake()).await;
            match attempt {
                Ok(Ok((ws, open, early))) => {
                    failures = 0;
                    self.connected.store(true, Ordering::SeqCst);
                    tracing::info!(sid = %open.sid, "✅ Order channel connected");
                    if self.events.send(TransportEvent::Connected).is_err() {
                        break;
                    }
                    // 握手期间收到的事件, 连接成功后按原顺序投递
                    if early
                        .into_iter()
                        .any(|event| self.events.send(TransportEvent::Event(event)).is_err())
                    {
                        break;
                    }

                    let end = self.run_session(ws, &open).await;
                    self.connected.store(false, Ordering::SeqCst);
                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(reason) => {
                            tracing::warn!(%reason, "❌ Order channel lost");
                            if self
                                .events
                                .send(TransportEvent::Disconnected { reason })
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(failures, "Order channel connect failed: {e}");
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(failures, "Order channel connect timed out");
                }
            }

            if !self.config.may_retry(failures) {
                tracing::error!(failures, "Giving up on order channel");
                break;
            }

            let delay = self.config.backoff(failures.max(1));
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("Order channel transport stopped");
    }

    /// Websocket connect, engine open, namespace connect
    ///
    /// Events the server emits before acknowledging the namespace are kept
    /// and returned alongside the socket.
    async fn handshake(&self) -> Result<(WsStream, OpenInfo, Vec<ChannelEvent>), TransportError> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(cookie) = &self.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| TransportError::Connection(format!("invalid cookie: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (mut ws, _response) = tokio_tungstenite::connect_async(request).await?;

        let open = match next_packet(&mut ws).await? {
            EnginePacket::Open(open) => open,
            other => {
                return Err(TransportError::Protocol(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        };

        ws.send(Message::text(codec::encode_connect(ROOT_NAMESPACE)))
            .await?;

        let mut early = Vec::new();
        loop {
            match next_packet(&mut ws).await? {
                EnginePacket::Message(SocketPacket::Connect { .. }) => return Ok((ws, open, early)),
                EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                    return Err(TransportError::Refused(message));
                }
                EnginePacket::Ping(data) => {
                    ws.send(Message::text(codec::encode_pong(&data))).await?;
                }
                EnginePacket::Message(SocketPacket::Event {
                    namespace,
                    name,
                    args,
                    ..
                }) if namespace == ROOT_NAMESPACE => {
                    if let Some(event) = decode_event(&name, args) {
                        early.push(event);
                    }
                }
                EnginePacket::Close => {
                    return Err(TransportError::Connection("closed during handshake".into()));
                }
                _ => {}
            }
        }
    }

    async fn run_session(&mut self, ws: WsStream, open: &OpenInfo) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let liveness = open.liveness_window().max(Duration::from_secs(1));
        // 只有收到服务端帧才刷新存活期限
        let deadline = tokio::time::sleep(liveness);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }

                Some(request) = self.requests.recv() => {
                    let frame = codec::encode_event(ROOT_NAMESPACE, request.name(), request.payload());
                    tracing::debug!(event = %request, "Emitting");
                    if let Err(e) = sink.send(Message::text(frame)).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }

                _ = &mut deadline => return SessionEnd::Lost("ping timeout".into()),

                frame = stream.next() => {
                    deadline.as_mut().reset(tokio::time::Instant::now() + liveness);
                    let text = match frame {
                        None => return SessionEnd::Lost("stream ended".into()),
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.as_str().to_string())
                                .unwrap_or_else(|| "closed by server".into());
                            return SessionEnd::Lost(reason);
                        }
                        Some(Ok(_)) => continue,
                    };

                    match codec::decode(text.as_str()) {
                        Ok(EnginePacket::Ping(data)) => {
                            if let Err(e) = sink.send(Message::text(codec::encode_pong(&data))).await {
                                return SessionEnd::Lost(e.to_string());
                            }
                        }
                        Ok(EnginePacket::Close) => return SessionEnd::Lost("engine close".into()),
                        Ok(EnginePacket::Message(SocketPacket::Disconnect { .. })) => {
                            return SessionEnd::Lost("server disconnect".into());
                        }
                        Ok(EnginePacket::Message(SocketPacket::Event { namespace, name, args, .. })) => {
                            if namespace != ROOT_NAMESPACE {
                                continue;
                            }
                            let Some(event) = decode_event(&name, args) else {
                                continue;
                            };
                            if self.events.send(TransportEvent::Event(event)).is_err() {
                                return SessionEnd::Shutdown;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Dropping frame: {e}"),
                    }
                }
            }
        }
    }
}

fn decode_event(name: &str, args: Vec<serde_json::Value>) -> Option<ChannelEvent> {
    match ChannelEvent::decode(name, args.into_iter().next()) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(event = %name, "Dropping event: {e}");
            None
        }
    }
}

async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(codec::decode(text.as_str())?),
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Connection("closed during handshake".into()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// In-process transport, driven by a [`MemoryServer`]
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<ClientRequest>,
    connected: Arc<AtomicBool>,
}

/// Server side of a [`MemoryTransport`]
#[derive(Debug)]
pub struct MemoryServer {
    events: mpsc::UnboundedSender<TransportEvent>,
    requests: mpsc::UnboundedReceiver<ClientRequest>,
    connected: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Create a connected pair, initially disconnected
    pub fn pair() -> (Self, MemoryServer) {
        let (events, inbound) = mpsc::unbounded_channel();
        let (outbound, requests) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        (
            Self {
                inbound,
                outbound,
                connected: connected.clone(),
            },
            MemoryServer {
                events,
                requests,
                connected,
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }

    fn emit(&self, request: ClientRequest) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(request)
            .map_err(|_| TransportError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.inbound.close();
    }
}

impl MemoryServer {
    /// Accept the client
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Connected);
    }

    /// Drop the channel
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: "server disconnect".into(),
        });
    }

    /// Push an event to the client
    pub fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(TransportEvent::Event(event));
    }

    /// Wait for the next client request
    pub async fn next_request(&mut self) -> Option<ClientRequest> {
        self.requests.recv().await
    }

    /// Requests received so far, without waiting
    pub fn drain_requests(&mut self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = self.requests.try_recv() {
            requests.push(request);
        }
        requests
    }
}
