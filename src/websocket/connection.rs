//! The connection state machine.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::channel::{Inbound, Outbound, ReceiveFn, Scope, SendFn};
use crate::http::{HttpResponse, StatusCode};
use crate::websocket::message::{close_code, Message, Payload};
use crate::websocket::Error;

/// Lifecycle of a persistent connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Waiting for the handler to accept or deny.
    Connecting,
    /// Accepted; data may flow both ways.
    Opened,
    /// Closed by either side. Terminal.
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Opened,
            _ => ConnectionState::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Opened => f.write_str("open"),
            ConnectionState::Closed => f.write_str("closed"),
        }
    }
}

struct Inner {
    scope: Scope,
    receive: ReceiveFn,
    send: SendFn,
    state: AtomicU8,
    // set once the connect event has been read, by `accept` or `receive`
    connect_received: AtomicBool,
    // serializes outbound events and the state changes tied to them
    outbound: Mutex<()>,
}

/// A persistent duplex connection.
///
/// Cloning is cheap and every clone drives the same state machine, so a
/// handler can hand a clone to background work such as a
/// [`set_interval`](crate::timer::set_interval) timer.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Wrap a host channel. The connection starts in [`ConnectionState::Connecting`].
    pub fn new(scope: Scope, receive: ReceiveFn, send: SendFn) -> Self {
        Self {
            inner: Arc::new(Inner {
                scope,
                receive,
                send,
                state: AtomicU8::new(ConnectionState::Connecting as u8),
                connect_received: AtomicBool::new(false),
                outbound: Mutex::new(()),
            }),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    pub fn path(&self) -> &str {
        &self.inner.scope.path
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Opened
    }

    /// Complete the handshake.
    ///
    /// Consumes the pending `websocket.connect` event, emits the accept event
    /// and moves to [`ConnectionState::Opened`]. If the handler already read
    /// the connect event through [`receive`](Self::receive), it is not waited
    /// for again.
    pub async fn accept(&self, subprotocol: Option<String>) -> Result<(), Error> {
        let _outbound = self.inner.outbound.lock().await;
        self.expect_state("accept", ConnectionState::Connecting)?;

        if !self.inner.connect_received.load(Ordering::Acquire) {
            let event = self.next_event().await?;
            if event != Inbound::Connect {
                return Err(Error::UnexpectedEvent {
                    expected: "websocket.connect",
                    got: event.kind(),
                });
            }
            self.inner.connect_received.store(true, Ordering::Release);
        }

        self.emit(Outbound::Accept { subprotocol }).await?;
        self.set_state(ConnectionState::Opened);
        debug!("Connection {} opened", self.path());
        Ok(())
    }

    /// Refuse the connection with an HTTP status before the handshake.
    ///
    /// This is the only way from [`ConnectionState::Connecting`] straight to
    /// [`ConnectionState::Closed`].
    pub async fn deny(&self, status: StatusCode) -> Result<(), Error> {
        let _outbound = self.inner.outbound.lock().await;
        self.expect_state("deny", ConnectionState::Connecting)?;

        for event in HttpResponse::empty(status).into_events() {
            self.emit(event).await?;
        }
        self.set_state(ConnectionState::Closed);
        debug!("Connection {} denied with {}", self.path(), status.as_u16());
        Ok(())
    }

    /// Send one message. Only valid while open.
    pub async fn send(&self, payload: impl Into<Payload>) -> Result<(), Error> {
        let _outbound = self.inner.outbound.lock().await;
        self.expect_state("send on", ConnectionState::Opened)?;

        let message = payload.into().into_message()?;
        self.emit(Outbound::Send(message)).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), Error> {
        self.send(Payload::text(text)).await
    }

    pub async fn send_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<(), Error> {
        self.send(Payload::bytes(bytes)).await
    }

    /// Serialize `value` and send it as a text message.
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        let text = serde_json::to_string(value)?;
        self.send_text(text).await
    }

    /// Wait for the next inbound event.
    ///
    /// While connecting only `websocket.connect` is valid; once open only
    /// `websocket.receive` and `websocket.disconnect`. A disconnect (or the
    /// channel going away, reported as code 1006) moves to
    /// [`ConnectionState::Closed`].
    pub async fn receive(&self) -> Result<Inbound, Error> {
        let state = self.state();
        if state == ConnectionState::Closed {
            return Err(Error::InvalidState {
                operation: "receive from",
                state,
            });
        }

        let event = match (self.inner.receive)().await {
            Ok(event) => event,
            Err(Error::ChannelClosed) if state == ConnectionState::Opened => Inbound::Disconnect {
                code: close_code::ABNORMAL_CLOSURE,
            },
            Err(e) => {
                if matches!(e, Error::ChannelClosed) {
                    self.set_state(ConnectionState::Closed);
                }
                return Err(e);
            }
        };

        match (state, &event) {
            (ConnectionState::Connecting, Inbound::Connect) => {
                self.inner.connect_received.store(true, Ordering::Release);
            }
            (ConnectionState::Opened, Inbound::Receive(_)) => {}
            (ConnectionState::Opened, Inbound::Disconnect { code }) => {
                debug!("Connection {} closed by peer with code {code}", self.path());
                self.set_state(ConnectionState::Closed);
            }
            (ConnectionState::Connecting, other) => {
                return Err(Error::UnexpectedEvent {
                    expected: "websocket.connect",
                    got: other.kind(),
                });
            }
            (_, other) => {
                return Err(Error::UnexpectedEvent {
                    expected: "websocket.receive or websocket.disconnect",
                    got: other.kind(),
                });
            }
        }

        Ok(event)
    }

    /// Wait for the next message, which must be text.
    pub async fn receive_text(&self) -> Result<String, Error> {
        match self.receive_message("receive text from").await? {
            Message::Text(text) => Ok(text),
            other => Err(Error::UnexpectedEvent {
                expected: "text message",
                got: other.kind(),
            }),
        }
    }

    /// Wait for the next message, which must be binary.
    pub async fn receive_bytes(&self) -> Result<Vec<u8>, Error> {
        match self.receive_message("receive bytes from").await? {
            Message::Binary(bytes) => Ok(bytes),
            other => Err(Error::UnexpectedEvent {
                expected: "binary message",
                got: other.kind(),
            }),
        }
    }

    /// Wait for the next message and deserialize it, text or binary.
    pub async fn receive_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let message = self.receive_message("receive JSON from").await?;
        Ok(serde_json::from_slice(message.as_bytes())?)
    }

    /// Close an open connection.
    pub async fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), Error> {
        let _outbound = self.inner.outbound.lock().await;
        self.expect_state("close", ConnectionState::Opened)?;

        self.emit(Outbound::Close {
            code,
            reason: reason.into(),
        })
        .await?;
        self.set_state(ConnectionState::Closed);
        debug!("Connection {} closed with code {code}", self.path());
        Ok(())
    }

    async fn receive_message(&self, operation: &'static str) -> Result<Message, Error> {
        self.expect_state(operation, ConnectionState::Opened)?;
        match self.receive().await? {
            Inbound::Receive(message) => Ok(message),
            Inbound::Disconnect { code } => Err(Error::Disconnected(code)),
            other => Err(Error::UnexpectedEvent {
                expected: "websocket.receive",
                got: other.kind(),
            }),
        }
    }

    async fn next_event(&self) -> Result<Inbound, Error> {
        let result = (self.inner.receive)().await;
        if matches!(result, Err(Error::ChannelClosed)) {
            self.set_state(ConnectionState::Closed);
        }
        result
    }

    async fn emit(&self, event: Outbound) -> Result<(), Error> {
        let result = (self.inner.send)(event).await;
        if matches!(result, Err(Error::ChannelClosed)) {
            self.set_state(ConnectionState::Closed);
        }
        result
    }

    fn expect_state(&self, operation: &'static str, expected: ConnectionState) -> Result<(), Error> {
        let state = self.state();
        if state != expected {
            return Err(Error::InvalidState { operation, state });
        }
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path())
            .field("state", &self.state())
            .finish()
    }
}
