//! Error types for the storefront synchronization layer.
//!
//! The layer distinguishes four failure families, each with its own recovery
//! policy:
//!
//! - [`PersistenceError`]: durable store read/write failure. Absorbed by the
//!   cart reconciler; the in-memory cart stays authoritative.
//! - [`SyncError`]: network or server rejection of a cart sync. Returned to the
//!   caller; the local cart is left untouched.
//! - [`ChannelError`]: socket-level failure. Absorbed by the reconnect loop.
//! - [`ParseError`]: malformed inbound frame. Logged and dropped.
//!
//! [`StorefrontError`] wraps all of them for call sites that only need to
//! report a failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durable store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceError {
    /// The backing store refused a read.
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    /// The backing store refused a write (quota, permissions, disk full).
    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },

    /// The backing store refused a delete.
    #[error("Failed to remove '{key}': {message}")]
    Remove { key: String, message: String },

    /// The persisted record exists but cannot be decoded.
    #[error("Corrupt record '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// The in-memory value could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// The key the failure relates to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Read { key, .. }
            | Self::Write { key, .. }
            | Self::Remove { key, .. }
            | Self::Corrupt { key, .. } => Some(key),
            Self::Serialization(_) => None,
        }
    }
}

/// Cart sync failure. Always recoverable: the local cart keeps working offline.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("Server rejected cart sync ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server answered, but the body is not a usable cart.
    #[error("Invalid sync response: {0}")]
    InvalidResponse(String),
}

impl SyncError {
    /// Whether the server itself refused the cart (as opposed to transport trouble).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Socket-level channel failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelError {
    /// The handshake did not complete.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Sending a frame failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// Reading from the socket failed.
    #[error("Receive failed: {0}")]
    Receive(String),

    /// The channel endpoint is not configured or is malformed.
    #[error("Invalid channel endpoint: {0}")]
    Endpoint(String),
}

/// Malformed inbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    /// The frame is not valid JSON.
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(String),

    /// The frame has no string `type` discriminator.
    #[error("Frame has no 'type' field")]
    MissingType,

    /// The frame declares a notification but the payload is incomplete.
    #[error("Invalid notification payload: {0}")]
    InvalidNotification(String),
}

/// A shared error type for the whole synchronization layer.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StorefrontError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the failure has a user-visible consequence the UI should render.
    ///
    /// Persistence and frame errors are absorbed inside the layer; sync
    /// rejections and configuration problems are not.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::Sync(_) | Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StorefrontError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StorefrontError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StorefrontError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StorefrontError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, StorefrontError>`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
