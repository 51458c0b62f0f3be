//! Channel connection state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket "normal closure" status code.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Why a channel ended up `Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloseReason {
    /// The client called `disconnect()`. Never followed by a reconnect.
    UserInitiated,
    /// The server sent a close frame.
    ServerClosed { code: Option<u16>, reason: String },
    /// The socket failed (handshake, read or write error, or EOF).
    Error { message: String },
}

impl CloseReason {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this close may be followed by an automatic reconnect.
    pub fn allows_reconnect(&self) -> bool {
        !matches!(self, Self::UserInitiated)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserInitiated => write!(f, "closed by client"),
            Self::ServerClosed {
                code: Some(code),
                reason,
            } => write!(f, "closed by server ({}): {}", code, reason),
            Self::ServerClosed { code: None, reason } => write!(f, "closed by server: {}", reason),
            Self::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Lifecycle state of the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed { reason: CloseReason },
}

impl ChannelState {
    pub fn closed(reason: CloseReason) -> Self {
        Self::Closed { reason }
    }

    /// `Connecting` or `Open`: a connect request is a no-op in these states.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        match self {
            Self::Closed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed { reason } => write!(f, "closed ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_user_close_blocks_reconnect() {
        assert!(!CloseReason::UserInitiated.allows_reconnect());
        assert!(CloseReason::error("reset").allows_reconnect());
        assert!(
            CloseReason::ServerClosed {
                code: Some(NORMAL_CLOSURE),
                reason: "restart".to_string()
            }
            .allows_reconnect()
        );
    }

    #[test]
    fn test_active_states() {
        assert!(ChannelState::Connecting.is_active());
        assert!(ChannelState::Open.is_active());
        assert!(!ChannelState::Idle.is_active());
        assert!(!ChannelState::Closing.is_active());
        assert!(!ChannelState::closed(CloseReason::UserInitiated).is_active());
    }
}
