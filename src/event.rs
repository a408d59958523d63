//! The emitted audit event
//!
//! `AuditEvent` is the immutable snapshot produced by
//! [`AuditContext::to_event`](crate::AuditContext::to_event) and handed to a
//! sink. Absent optional fields are omitted from the wire form entirely.

use crate::types::{ActionType, EntityType, Identifier};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully materialized audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Trace identifier assigned when the context was created
    pub trace_id: Identifier,

    /// Acting principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<EntityType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<Identifier>,

    /// Free-form attributes merged during the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    /// Derived from `response_code`, see [`is_success_code`]
    pub success: bool,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    /// JSON encoding of the pre-operation state
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "raw_json"
    )]
    pub old_data: Option<Bytes>,

    /// JSON encoding of the post-operation state
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "raw_json"
    )]
    pub new_data: Option<Bytes>,
}

impl AuditEvent {
    /// Decode `old_data` back into a JSON value
    pub fn old_value(&self) -> Option<serde_json::Value> {
        self.old_data
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }

    /// Decode `new_data` back into a JSON value
    pub fn new_value(&self) -> Option<serde_json::Value> {
        self.new_data
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }

    /// Wall-clock duration of the observed operation in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// Fixed success rule: `200 <= code < 400`. No code is never a success.
pub fn is_success_code(code: Option<u16>) -> bool {
    matches!(code, Some(c) if (200..400).contains(&c))
}

/// Embeds pre-serialized JSON bytes verbatim instead of as a byte array
mod raw_json {
    use bytes::Bytes;
    use serde::de::Deserializer;
    use serde::ser::{Error, Serializer};
    use serde::{Deserialize, Serialize};
    use serde_json::value::RawValue;

    pub fn serialize<S: Serializer>(
        value: &Option<Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => {
                let raw: &RawValue = serde_json::from_slice(bytes).map_err(S::Error::custom)?;
                raw.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        let raw: Option<Box<RawValue>> = Option::deserialize(deserializer)?;
        Ok(raw.map(|r| Bytes::from(r.get().to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_event() -> AuditEvent {
        let now = Utc::now();
        AuditEvent {
            trace_id: Identifier::from("trace-1"),
            user_id: None,
            action: None,
            resource: None,
            resource_id: None,
            metadata: None,
            ip_address: None,
            user_agent: None,
            request_uri: None,
            method: None,
            response_code: None,
            success: false,
            start_time: now,
            end_time: now,
            old_data: None,
            new_data: None,
        }
    }

    #[test]
    fn test_success_rule() {
        assert!(is_success_code(Some(200)));
        assert!(is_success_code(Some(302)));
        assert!(is_success_code(Some(399)));
        assert!(!is_success_code(Some(0)));
        assert!(!is_success_code(Some(199)));
        assert!(!is_success_code(Some(400)));
        assert!(!is_success_code(Some(500)));
        assert!(!is_success_code(None));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let json = serde_json::to_value(bare_event()).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "userId", "action", "resource", "resourceId", "metadata", "ipAddress",
            "userAgent", "requestUri", "method", "responseCode", "oldData", "newData",
        ] {
            assert!(!obj.contains_key(key), "{} should be omitted", key);
        }
        assert_eq!(obj["traceId"], "trace-1");
        assert_eq!(obj["success"], false);
        assert!(obj.contains_key("startTime"));
        assert!(obj.contains_key("endTime"));
    }

    #[test]
    fn test_data_embedded_as_raw_json() {
        let mut event = bare_event();
        event.new_data = Some(Bytes::from_static(br#"{"name":"x"}"#));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""newData":{"name":"x"}"#));

        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.new_value(), Some(serde_json::json!({"name": "x"})));
        assert!(parsed.old_data.is_none());
    }

    #[test]
    fn test_timestamps_are_rfc3339() {
        let json = serde_json::to_value(bare_event()).unwrap();
        let start = json["startTime"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(start).is_ok());
    }

    #[test]
    fn test_response_code_zero_is_kept() {
        let mut event = bare_event();
        event.response_code = Some(0);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["responseCode"], 0);
    }
}
