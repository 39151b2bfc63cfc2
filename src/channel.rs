//! Scope and event types exchanged with the host server.
//!
//! The host hands every request or persistent connection to the dispatcher as
//! a [`Scope`] plus a [`ReceiveFn`]/[`SendFn`] pair. Inbound events arrive
//! through `receive`, outbound events leave through `send`; middleware wraps
//! either side to observe or rewrite the stream.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::http::{Headers, StatusCode};
use crate::websocket::{Error as ConnectionError, Message};

/// Type alias for a boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pulls the next inbound event from the host.
pub type ReceiveFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Inbound, ConnectionError>> + Send + Sync>;

/// Pushes an outbound event to the host.
pub type SendFn =
    Arc<dyn Fn(Outbound) -> BoxFuture<'static, Result<(), ConnectionError>> + Send + Sync>;

/// The protocol a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeType {
    /// A single request/response exchange.
    Http,
    /// A persistent duplex connection.
    WebSocket,
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeType::Http => f.write_str("http"),
            ScopeType::WebSocket => f.write_str("websocket"),
        }
    }
}

/// Connection metadata supplied by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub scope_type: ScopeType,
    /// The method token; only present for HTTP scopes.
    pub method: Option<String>,
    pub path: String,
    pub query_string: String,
    pub headers: Headers,
    pub client: Option<SocketAddr>,
    pub http_version: String,
}

impl Scope {
    /// An HTTP scope for `method` and `path`.
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Http,
            method: Some(method.into()),
            path: path.into(),
            query_string: String::new(),
            headers: Headers::new(),
            client: None,
            http_version: "1.1".to_string(),
        }
    }

    /// A persistent-connection scope for `path`.
    pub fn websocket(path: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::WebSocket,
            method: None,
            path: path.into(),
            query_string: String::new(),
            headers: Headers::new(),
            client: None,
            http_version: "1.1".to_string(),
        }
    }

    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_client(mut self, client: SocketAddr) -> Self {
        self.client = Some(client);
        self
    }
}

/// Events flowing from the host into the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A chunk of the HTTP request body.
    Request { body: Vec<u8>, more_body: bool },
    /// The HTTP client went away.
    HttpDisconnect,
    /// The peer asks to open a persistent connection.
    Connect,
    /// A data message on an open connection.
    Receive(Message),
    /// The peer closed the connection.
    Disconnect { code: u16 },
}

impl Inbound {
    /// The event type discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Request { .. } => "http.request",
            Inbound::HttpDisconnect => "http.disconnect",
            Inbound::Connect => "websocket.connect",
            Inbound::Receive(_) => "websocket.receive",
            Inbound::Disconnect { .. } => "websocket.disconnect",
        }
    }
}

/// Events flowing from the application out to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Status line and headers of an HTTP response.
    ResponseStart { status: StatusCode, headers: Headers },
    /// The HTTP response body; `more_body: false` terminates the response.
    ResponseBody { body: Vec<u8>, more_body: bool },
    /// Completes the persistent-connection handshake.
    Accept { subprotocol: Option<String> },
    /// A data message on an open connection.
    Send(Message),
    /// Closes an open connection.
    Close { code: u16, reason: String },
}

impl Outbound {
    /// The event type discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::ResponseStart { .. } => "http.response.start",
            Outbound::ResponseBody { .. } => "http.response.body",
            Outbound::Accept { .. } => "websocket.accept",
            Outbound::Send(_) => "websocket.send",
            Outbound::Close { .. } => "websocket.close",
        }
    }
}

/// The host side of an in-memory channel.
///
/// Events pushed here are what the application receives; events the
/// application sends are read back with [`next`](Peer::next).
pub struct Peer {
    inbound: Option<mpsc::Sender<Inbound>>,
    outbound: mpsc::Receiver<Outbound>,
}

impl Peer {
    /// Deliver an event to the application.
    pub async fn push(&self, event: Inbound) -> Result<(), ConnectionError> {
        let sender = self.inbound.as_ref().ok_or(ConnectionError::ChannelClosed)?;
        sender
            .send(event)
            .await
            .map_err(|_| ConnectionError::ChannelClosed)
    }

    /// Wait for the next event sent by the application.
    ///
    /// Returns `None` once every application-side sender is gone.
    pub async fn next(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// The next already-sent event, without waiting.
    pub fn try_next(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    /// Collect every remaining event until the application side is dropped.
    pub async fn drain(&mut self) -> Vec<Outbound> {
        let mut events = Vec::new();
        while let Some(event) = self.outbound.recv().await {
            events.push(event);
        }
        events
    }

    /// Drop the inbound sender; the application's next `receive` sees the
    /// channel as closed.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }
}

/// Build an in-memory duplex channel with `buffer` slots in each direction.
pub fn memory_channel(buffer: usize) -> (Peer, ReceiveFn, SendFn) {
    let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(buffer);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(buffer);

    let inbound_rx = Arc::new(Mutex::new(inbound_rx));
    let receive: ReceiveFn = Arc::new(move || {
        let inbound_rx = Arc::clone(&inbound_rx);
        Box::pin(async move {
            let mut inbound_rx = inbound_rx.lock().await;
            inbound_rx.recv().await.ok_or(ConnectionError::ChannelClosed)
        })
    });

    let send: SendFn = Arc::new(move |event| {
        let outbound_tx = outbound_tx.clone();
        Box::pin(async move {
            outbound_tx
                .send(event)
                .await
                .map_err(|_| ConnectionError::ChannelClosed)
        })
    });

    let peer = Peer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
    };
    (peer, receive, send)
}
