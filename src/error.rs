//! Error types for a3s-audit

use thiserror::Error;

/// Errors that can occur while wiring or delivering audit events
///
/// Mutating an `AuditContext` or converting it to an `AuditEvent` never
/// fails; errors only surface from sinks, dead-letter handlers and the
/// `Auditor` builder.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sink connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Delivery failure reported by a sink
    #[error("Failed to deliver audit event to sink '{sink}': {reason}")]
    Delivery {
        sink: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stream creation or management error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Sink-local failure (I/O, lock poisoning, ...)
    #[error("Sink error: {0}")]
    Sink(String),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_display() {
        let err = AuditError::Delivery {
            sink: "nats".to_string(),
            reason: "no responders".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to deliver audit event to sink 'nats': no responders"
        );
    }

    #[test]
    fn test_serialization_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuditError = json_err.into();
        assert!(matches!(err, AuditError::Serialization(_)));
    }
}
