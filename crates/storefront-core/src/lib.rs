//! Domain core of the storefront synchronization layer.
//!
//! Holds the models and the pieces of logic that need no I/O runtime: the
//! cart reconciler, the notification log, channel state and frame decoding,
//! and the traits the outer crates implement (`DurableStore`, `CartSyncApi`,
//! `ChannelTransport`, `Clock`).

pub mod cart;
pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod notification;
pub mod session;
pub mod wire;

// Re-export common error type
pub use error::StorefrontError;
