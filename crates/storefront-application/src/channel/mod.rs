//! Realtime channel supervision.

mod manager;

pub use manager::RealtimeChannelManager;
