//! Connection messages and close codes.

use crate::websocket::Error;

/// One data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(bytes) => bytes,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "text message",
            Message::Binary(_) => "binary message",
        }
    }
}

/// An outgoing message before validation: exactly one side must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub text: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            bytes: None,
        }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            text: None,
            bytes: Some(bytes.into()),
        }
    }

    /// The single message this payload describes.
    pub fn into_message(self) -> Result<Message, Error> {
        match (self.text, self.bytes) {
            (Some(text), None) => Ok(Message::Text(text)),
            (None, Some(bytes)) => Ok(Message::Binary(bytes)),
            (Some(_), Some(_)) => Err(Error::AmbiguousPayload),
            (None, None) => Err(Error::EmptyPayload),
        }
    }
}

impl From<Message> for Payload {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Payload::text(text),
            Message::Binary(bytes) => Payload::bytes(bytes),
        }
    }
}

/// Close codes from RFC 6455, section 7.4.
pub mod close_code {
    pub const NORMAL_CLOSURE: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const UNSUPPORTED_DATA: u16 = 1003;
    pub const NO_STATUS_RCVD: u16 = 1005;
    /// Reported when the channel closes without a close frame.
    pub const ABNORMAL_CLOSURE: u16 = 1006;
    pub const INVALID_FRAME_PAYLOAD_DATA: u16 = 1007;
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
    pub const MANDATORY_EXT: u16 = 1010;
    pub const INTERNAL_ERROR: u16 = 1011;
    pub const SERVICE_RESTART: u16 = 1012;
    pub const TRY_AGAIN_LATER: u16 = 1013;
    pub const BAD_GATEWAY: u16 = 1014;
    pub const TLS_HANDSHAKE: u16 = 1015;
}
