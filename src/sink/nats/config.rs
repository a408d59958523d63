//! NATS sink configuration

use serde::{Deserialize, Serialize};

/// JetStream storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageType {
    #[default]
    File,
    Memory,
}

/// Configuration for the NATS JetStream audit sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NatsConfig {
    /// Server URL
    pub url: String,

    /// JetStream stream holding audit events
    pub stream_name: String,

    /// Subject prefix; events go to `<prefix>.<resource>.<action>`
    pub subject_prefix: String,

    pub storage: StorageType,

    /// Maximum messages retained by the stream (-1 = unlimited)
    pub max_events: i64,

    /// Maximum message age in seconds (0 = unlimited)
    pub max_age_secs: u64,

    /// Maximum stream size in bytes (-1 = unlimited)
    pub max_bytes: i64,

    pub connect_timeout_secs: u64,

    pub request_timeout_secs: u64,

    /// Authentication token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// How long to wait for the publish ack (None = client default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_timeout_secs: Option<u64>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream_name: "AUDIT_EVENTS".to_string(),
            subject_prefix: "audit".to_string(),
            storage: StorageType::File,
            max_events: 1_000_000,
            max_age_secs: 90 * 24 * 3600,
            max_bytes: -1,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            token: None,
            publish_timeout_secs: Some(5),
        }
    }
}

impl NatsConfig {
    /// Subjects captured by the stream
    pub fn stream_subjects(&self) -> Vec<String> {
        vec![format!("{}.>", self.subject_prefix)]
    }

    /// Subject for an event, falling back to `unknown` for missing tags
    pub fn build_subject(&self, resource: Option<&str>, action: Option<&str>) -> String {
        format!(
            "{}.{}.{}",
            self.subject_prefix,
            subject_token(resource),
            subject_token(action)
        )
    }
}

/// Lowercase and strip characters that are not valid inside a subject token
fn subject_token(tag: Option<&str>) -> String {
    let token: String = tag
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if token.is_empty() {
        "unknown".to_string()
    } else {
        token
    }
}
