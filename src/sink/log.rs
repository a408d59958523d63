//! Sink that writes events to the `tracing` pipeline

use crate::error::Result;
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use async_trait::async_trait;

/// Emits each event as a JSON field on the `audit` target at INFO level
///
/// Pair with any `tracing` subscriber; filter on `target = "audit"` to
/// route audit records separately from application logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AuditSink for LogSink {
    async fn deliver(&self, event: &AuditEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        tracing::info!(
            target: "audit",
            trace_id = %event.trace_id,
            action = event.action.as_ref().map(|a| a.as_str()),
            resource = event.resource.as_ref().map(|r| r.as_str()),
            success = event.success,
            event = %json,
            "Audit event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
