//! Pushed notifications and the read-tracking log.

pub mod log;
pub mod model;

pub use log::NotificationLog;
pub use model::{Notification, NotificationKind};
