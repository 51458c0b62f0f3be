//! Notification domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a pushed notification.
///
/// Unknown server categories are kept verbatim in [`NotificationKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    OrderUpdate,
    Payment,
    Promotion,
    StockAlert,
    System,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrderUpdate => "order_update",
            Self::Payment => "payment",
            Self::Promotion => "promotion",
            Self::StockAlert => "stock_alert",
            Self::System => "system",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "order_update" => Self::OrderUpdate,
            "payment" => Self::Payment,
            "promotion" => Self::Promotion,
            "stock_alert" => Self::StockAlert,
            "system" => Self::System,
            _ => Self::Other(value),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification as held by the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Server-assigned identity; the log never holds two entries with the same id.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Client-local read flag.
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Creates an unread notification.
    pub fn new(
        id: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            message: message.into(),
            timestamp,
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrips_known_and_unknown() {
        assert_eq!(
            NotificationKind::from("order_update".to_string()),
            NotificationKind::OrderUpdate
        );
        let custom = NotificationKind::from("flash_sale".to_string());
        assert_eq!(custom, NotificationKind::Other("flash_sale".to_string()));
        assert_eq!(String::from(custom), "flash_sale");
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let n = Notification::new("n1", NotificationKind::Payment, "Paid", Utc::now());
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "payment");
        assert_eq!(value["read"], false);
    }
}
