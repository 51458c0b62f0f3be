//! Application layer for the storefront synchronization layer.
//!
//! This crate runs the pieces that need a Tokio runtime: the realtime channel
//! manager and the session lifecycle coordinator that drives it.

pub mod channel;
pub mod notifications;
pub mod session;

#[cfg(test)]
mod testing;

pub use channel::RealtimeChannelManager;
pub use notifications::SharedNotificationLog;
pub use session::{CartSync, LoginOutcome, SessionCoordinator};
