//! Realtime channel building blocks: state, frames, backoff, transport seam.
//!
//! The manager that drives these lives in `storefront-application`.

pub mod backoff;
pub mod frame;
pub mod state;
pub mod transport;

pub use backoff::{Backoff, ReconnectPolicy};
pub use frame::{HEARTBEAT_TYPE, InboundFrame, heartbeat_ack};
pub use state::{ChannelState, CloseReason, NORMAL_CLOSURE};
pub use transport::{ChannelConnection, ChannelTransport, TransportEvent};
