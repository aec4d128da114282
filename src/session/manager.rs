//! Gateway session management
//!
//! [`StatusBridge`] owns the single gateway connection and the status
//! publisher. Its lifecycle loops until shutdown:
//!
//! ```text
//! Disconnected ─► Connecting ─► Authenticating ─► Authenticated
//!      ▲                                               │
//!      └──────── reconnect delay ◄── close / error ◄───┘
//! ```
//!
//! Inbound frames are handled one at a time; classification and publishing
//! finish before the next frame is read.

use crate::classifier::classify;
use crate::config::{BridgeConfig, GatewayConfig};
use crate::credentials::CredentialResolver;
use crate::error::{Error, Result};
use crate::session::protocol::{self, InboundFrame};
use crate::session::reconnect::ReconnectGuard;
use crate::status::{AgentState, StatusPublisher};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gateway connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; a reconnect may be pending
    Disconnected,
    /// Opening the WebSocket
    Connecting,
    /// Connect request sent, waiting for the response
    Authenticating,
    /// Handshake accepted; events are being classified
    Authenticated,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// What handling one inbound frame did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The handshake response was accepted
    Authenticated,
    /// The handshake response was a rejection
    Rejected(String),
    /// An event produced a transition that was published
    Published(AgentState),
    /// An event produced a transition but the primary write failed
    PublishFailed(AgentState),
    /// Nothing to do (unrelated event, unknown frame, malformed text)
    Ignored,
}

/// Handle for stopping a running bridge from another task
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Close the active connection and cancel any pending reconnect
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Why a session ended without an error
enum SessionEnd {
    Closed(String),
    Shutdown,
}

enum Step {
    Message(Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>),
    HandshakeTimeout,
    Shutdown,
}

/// Long-lived client that mirrors gateway activity into status files
pub struct StatusBridge {
    gateway: GatewayConfig,
    credentials: CredentialResolver,
    publisher: StatusPublisher,
    connection: ConnectionState,
    reconnect: ReconnectGuard,
    shutdown: CancellationToken,
}

impl StatusBridge {
    /// Create a bridge from configuration
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_parts(
            config.gateway.clone(),
            CredentialResolver::from_config(&config.credentials),
            StatusPublisher::from_config(&config.status),
        )
    }

    /// Create a bridge from already-built components
    pub fn with_parts(
        gateway: GatewayConfig,
        credentials: CredentialResolver,
        publisher: StatusPublisher,
    ) -> Self {
        Self {
            gateway,
            credentials,
            publisher,
            connection: ConnectionState::Disconnected,
            reconnect: ReconnectGuard::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.shutdown.clone(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn publisher(&self) -> &StatusPublisher {
        &self.publisher
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_scheduled()
    }

    /// Run until shutdown.
    ///
    /// Connection failures, handshake rejections and disconnects are retried
    /// after the fixed reconnect delay. The only error returned is a missing
    /// credential, which no retry can fix.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(url = %self.gateway.url, "Starting status bridge");

        while !self.shutdown.is_cancelled() {
            self.reconnect.clear();
            self.set_connection(ConnectionState::Connecting);

            let resolved = match self.credentials.resolve() {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::error!("{}; stopping bridge", e);
                    self.set_connection(ConnectionState::Disconnected);
                    return Err(e);
                }
            };
            tracing::debug!(source = %resolved.source, "Resolved gateway token");

            match self.run_session(&resolved.token).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed(reason)) => {
                    tracing::warn!("Gateway connection closed: {}", reason);
                }
                Err(e) => {
                    tracing::warn!("Gateway connection failed: {}", e);
                }
            }

            self.on_disconnect();
            if !self.wait_reconnect_delay().await {
                break;
            }
        }

        self.set_connection(ConnectionState::Disconnected);
        tracing::info!("Status bridge stopped");
        Ok(())
    }

    /// Handle a close or error: publish the reconnecting status and schedule
    /// a reconnect. Returns `false` if a reconnect was already scheduled, in
    /// which case nothing is published.
    pub fn on_disconnect(&mut self) -> bool {
        self.set_connection(ConnectionState::Disconnected);

        if !self.reconnect.try_schedule() {
            tracing::debug!("Reconnect already scheduled");
            return false;
        }

        if let Err(e) = self
            .publisher
            .publish_state(AgentState::Idle, None, "Bridge reconnecting")
        {
            tracing::error!("Failed to publish reconnecting status: {}", e);
        }
        tracing::info!(
            delay_secs = self.gateway.reconnect_delay_secs,
            "Reconnecting to gateway"
        );
        true
    }

    /// Sleep out the reconnect delay. Returns `false` if shut down meanwhile.
    async fn wait_reconnect_delay(&self) -> bool {
        let delay = Duration::from_secs(self.gateway.reconnect_delay_secs);
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    /// One connection: open, handshake, then dispatch until close.
    async fn run_session(&mut self, token: &str) -> Result<SessionEnd> {
        let shutdown = self.shutdown.clone();
        let url = self.gateway.url.clone();

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
        };
        let (mut ws, _response) = connected?;
        tracing::info!(url = %url, "Connected to gateway");

        self.set_connection(ConnectionState::Authenticating);
        let request = protocol::connect_request(&self.gateway, token);
        let handshake_id = request.id.clone();
        ws.send(Message::Text(serde_json::to_string(&request)?))
            .await?;

        // An unrepresentable deadline means the handshake wait is unbounded
        let deadline =
            Instant::now().checked_add(Duration::from_secs(self.gateway.handshake_timeout_secs));

        loop {
            let awaiting_handshake = self.connection == ConnectionState::Authenticating;
            let step = tokio::select! {
                msg = ws.next() => Step::Message(msg),
                _ = handshake_deadline(deadline), if awaiting_handshake => Step::HandshakeTimeout,
                _ = shutdown.cancelled() => Step::Shutdown,
            };

            let msg = match step {
                Step::Message(Some(Ok(msg))) => msg,
                Step::Message(Some(Err(e))) => return Err(e.into()),
                Step::Message(None) => return Ok(SessionEnd::Closed("stream ended".to_string())),
                Step::HandshakeTimeout => {
                    close_quietly(&mut ws).await;
                    return Err(Error::Gateway(format!(
                        "no handshake response within {}s",
                        self.gateway.handshake_timeout_secs
                    )));
                }
                Step::Shutdown => {
                    close_quietly(&mut ws).await;
                    return Ok(SessionEnd::Shutdown);
                }
            };

            match msg {
                Message::Text(text) => {
                    if let FrameOutcome::Rejected(reason) = self.handle_frame(&text, &handshake_id)
                    {
                        close_quietly(&mut ws).await;
                        return Err(Error::Handshake(reason));
                    }
                }
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "close frame".to_string());
                    return Ok(SessionEnd::Closed(reason));
                }
                Message::Binary(data) => {
                    tracing::debug!(len = data.len(), "Ignoring binary frame");
                }
                _ => {}
            }
        }
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed frames are logged and skipped; they never end the session.
    pub fn handle_frame(&mut self, text: &str, handshake_id: &str) -> FrameOutcome {
        let frame = match protocol::parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Skipping malformed gateway message: {}", e);
                return FrameOutcome::Ignored;
            }
        };

        match frame {
            InboundFrame::Res(res)
                if res.id == handshake_id
                    && self.connection == ConnectionState::Authenticating =>
            {
                if res.ok {
                    self.set_connection(ConnectionState::Authenticated);
                    tracing::info!("Gateway handshake accepted");
                    if let Err(e) =
                        self.publisher
                            .publish_state(AgentState::Idle, None, "Bridge connected")
                    {
                        tracing::error!("Failed to publish connected status: {}", e);
                    }
                    FrameOutcome::Authenticated
                } else {
                    let reason = res.error_message();
                    tracing::error!("Gateway rejected handshake: {}", reason);
                    FrameOutcome::Rejected(reason)
                }
            }
            InboundFrame::Res(res) => {
                tracing::debug!(id = %res.id, "Ignoring unmatched response");
                FrameOutcome::Ignored
            }
            InboundFrame::Event(ev) if self.connection == ConnectionState::Authenticated => {
                self.dispatch_event(&ev.event, &ev.payload)
            }
            InboundFrame::Event(ev) => {
                tracing::debug!(event = %ev.event, "Ignoring event before handshake");
                FrameOutcome::Ignored
            }
            InboundFrame::Unknown => FrameOutcome::Ignored,
        }
    }

    fn dispatch_event(&mut self, event: &str, payload: &Value) -> FrameOutcome {
        let Some(transition) = classify(event, payload) else {
            return FrameOutcome::Ignored;
        };

        match self.publisher.publish(&transition) {
            Ok(_) => FrameOutcome::Published(transition.state),
            Err(e) => {
                tracing::error!(event = %event, "Failed to publish status: {}", e);
                FrameOutcome::PublishFailed(transition.state)
            }
        }
    }

    fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            tracing::debug!(from = %self.connection, to = %state, "Connection state");
            self.connection = state;
        }
    }
}

async fn handshake_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn close_quietly(ws: &mut GatewayStream) {
    if let Err(e) = ws.close(None).await {
        tracing::debug!("Error closing gateway connection: {}", e);
    }
}
