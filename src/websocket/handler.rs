//! Callback-style connection handlers.

use async_trait::async_trait;
use log::debug;

use crate::channel::Inbound;
use crate::endpoint::StreamHandler;
use crate::error::Error;
use crate::routing::Params;
use crate::websocket::{Connection, Message};

/// Per-connection callbacks.
///
/// A fresh handler value is created for every connection by [`Session`], so
/// fields can hold connection-local state such as timers.
#[async_trait]
pub trait WebSocketHandler: Send + 'static {
    /// Called once, while the connection is still connecting. The default
    /// accepts without a subprotocol.
    async fn on_connect(&mut self, connection: &Connection, _params: &Params) -> Result<(), Error> {
        connection.accept(None).await?;
        Ok(())
    }

    /// Called for every inbound message.
    async fn on_message(&mut self, connection: &Connection, message: Message) -> Result<(), Error>;

    /// Called once when the peer goes away. Anything the handler spawned for
    /// this connection must be stopped here.
    async fn on_disconnect(&mut self, _connection: &Connection, _code: u16) -> Result<(), Error> {
        Ok(())
    }
}

/// Runs a [`WebSocketHandler`] per connection.
pub struct Session<F> {
    factory: F,
}

impl<F> Session<F> {
    /// `factory` builds the handler for each new connection.
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F, H> StreamHandler for Session<F>
where
    F: Fn() -> H + Send + Sync + 'static,
    H: WebSocketHandler,
{
    async fn handle(&self, connection: Connection, params: Params) -> Result<(), Error> {
        let mut handler = (self.factory)();
        handler.on_connect(&connection, &params).await?;

        while connection.is_open() {
            match connection.receive().await? {
                Inbound::Receive(message) => handler.on_message(&connection, message).await?,
                Inbound::Disconnect { code } => {
                    handler.on_disconnect(&connection, code).await?;
                    break;
                }
                // receive() only yields the two kinds above once open
                _ => {}
            }
        }

        debug!("Session on {} finished", connection.path());
        Ok(())
    }
}
