//! Session application services.
//!
//! Binds authentication transitions to the cart and the realtime channel.

mod coordinator;

pub use coordinator::{CartSync, LoginOutcome, SessionCoordinator};
