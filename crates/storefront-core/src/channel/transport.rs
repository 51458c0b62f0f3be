//! Duplex socket seam.
//!
//! The channel manager only talks to the socket through these traits, which
//! lets tests drive it with an in-memory fake.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::session::Credentials;

/// Something that arrived on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Text(String),
    /// The peer closed the connection (close frame or end of stream).
    Closed { code: Option<u16>, reason: String },
}

/// One open duplex connection.
#[async_trait]
pub trait ChannelConnection: Send {
    /// Waits for the next inbound event.
    async fn recv(&mut self) -> Result<TransportEvent, ChannelError>;

    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), ChannelError>;

    /// Closes with normal-closure status. Errors are informational only.
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Opens connections to the notification endpoint.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Performs the handshake for the given session credentials.
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ChannelConnection>, ChannelError>;
}
