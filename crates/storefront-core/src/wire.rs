//! Lenient field decoders for server payloads.
//!
//! The backend is an opaque collaborator: ids arrive as JSON strings or
//! integers and timestamps as RFC 3339 strings or epoch milliseconds. Both are
//! normalized here so the domain models stay strongly typed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

/// Accepts `"42"` or `42` and yields `"42"`.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Accepts an RFC 3339 string or epoch milliseconds.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
        RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(deserialize_with = "deserialize_timestamp")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_numeric_id_and_millis() {
        let sample: Sample = serde_json::from_str(r#"{"id": 7, "at": 1700000000000}"#).unwrap();
        assert_eq!(sample.id, "7");
        assert_eq!(sample.at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_string_id_and_rfc3339() {
        let sample: Sample =
            serde_json::from_str(r#"{"id": "sku-1", "at": "2024-05-01T10:00:00+02:00"}"#).unwrap();
        assert_eq!(sample.id, "sku-1");
        assert_eq!(sample.at.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    }

    #[test]
    fn test_rejects_garbage_timestamp() {
        let result = serde_json::from_str::<Sample>(r#"{"id": 1, "at": "yesterday"}"#);
        assert!(result.is_err());
    }
}
