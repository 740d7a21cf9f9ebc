//! Purchase domain models

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

/// Server-assigned receipt time, rendered as ISO-8601 with microseconds and
/// an explicit offset, e.g. `2024-05-01T12:34:56.123456+03:00`.
///
/// This is the identity of a purchase: no two stored purchases share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = DateTime, example = "2024-05-01T12:34:56.123456+03:00")]
pub struct PurchaseTimestamp(String);

impl PurchaseTimestamp {
    pub fn from_datetime(at: DateTime<FixedOffset>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, false))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurchaseTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchase as it travels through the broker: producer-defined fields plus
/// the server-assigned `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseEvent {
    pub timestamp: PurchaseTimestamp,

    /// Free-form fields supplied by the client
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl PurchaseEvent {
    /// Attach a server-side timestamp to a client payload.
    ///
    /// Client-supplied `timestamp` and `_id` keys are discarded.
    pub fn stamp(mut payload: Map<String, Value>, at: DateTime<FixedOffset>) -> Self {
        payload.remove("timestamp");
        payload.remove("_id");
        Self {
            timestamp: PurchaseTimestamp::from_datetime(at),
            payload,
        }
    }
}

/// A purchase read back from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoredPurchase {
    /// Store-assigned identifier rendered as a string
    #[serde(rename = "_id")]
    pub id: String,

    /// Every other stored field, including `timestamp`
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredPurchase {
    pub fn timestamp(&self) -> Option<&str> {
        self.fields.get("timestamp").and_then(Value::as_str)
    }
}

/// Body returned by `POST /api/buy/`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    pub data: PurchaseEvent,
}

impl IngestResponse {
    pub fn accepted(data: PurchaseEvent) -> Self {
        Self {
            status: "success".to_string(),
            message: "Purchase request sent to broker".to_string(),
            data,
        }
    }
}

/// Error body of the query endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryErrorResponse {
    pub error: String,
}

/// Error body of the gateway endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusErrorResponse {
    pub fn new(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn plus_three() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_timestamp_format() {
        let at = plus_three()
            .with_ymd_and_hms(2024, 5, 1, 12, 34, 56)
            .unwrap()
            + chrono::Duration::microseconds(123_456);
        let ts = PurchaseTimestamp::from_datetime(at);
        assert_eq!(ts.as_str(), "2024-05-01T12:34:56.123456+03:00");
    }

    #[test]
    fn test_timestamp_keeps_zero_micros() {
        let at = plus_three().with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            PurchaseTimestamp::from_datetime(at).to_string(),
            "2024-01-02T03:04:05.000000+03:00"
        );
    }

    #[test]
    fn test_stamp_replaces_client_timestamp_and_id() {
        let payload = json!({"item": "book", "timestamp": "forged", "_id": "abc"});
        let Value::Object(map) = payload else {
            panic!("object expected")
        };
        let at = plus_three().with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let event = PurchaseEvent::stamp(map, at);

        assert_eq!(event.timestamp.as_str(), "2024-05-01T00:00:00.000000+03:00");
        assert!(!event.payload.contains_key("_id"));
        assert!(!event.payload.contains_key("timestamp"));

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({"item": "book", "timestamp": "2024-05-01T00:00:00.000000+03:00"})
        );
    }

    #[test]
    fn test_event_round_trips_through_wire_format() {
        let wire = json!({
            "item": "lamp",
            "qty": 2,
            "timestamp": "2024-05-01T00:00:00.000001+03:00"
        });
        let event: PurchaseEvent = serde_json::from_value(wire).unwrap();
        assert_eq!(event.payload.get("qty"), Some(&json!(2)));
        assert_eq!(event.timestamp.as_str(), "2024-05-01T00:00:00.000001+03:00");
    }

    #[test]
    fn test_stored_purchase_serializes_id_as_underscore_id() {
        let mut fields = Map::new();
        fields.insert("item".into(), json!("book"));
        fields.insert("timestamp".into(), json!("t"));
        let stored = StoredPurchase {
            id: "665f1c".into(),
            fields,
        };

        assert_eq!(stored.timestamp(), Some("t"));
        assert_eq!(
            serde_json::to_value(&stored).unwrap(),
            json!({"_id": "665f1c", "item": "book", "timestamp": "t"})
        );
    }
}
