//! Dead Letter Queue — keep audit events whose delivery failed
//!
//! The dispatcher never retries. When a sink rejects an event, times out
//! or panics, the event is handed to a `DlqHandler` (if configured) so it
//! can be inspected, replayed by an operator, or alerted on.

use crate::buffer::BoundedBuffer;
use crate::error::Result;
use crate::event::AuditEvent;
use crate::types::now_millis;
use async_trait::async_trait;

/// A failed event with context about why it ended up in the DLQ
#[derive(Debug, Clone)]
pub struct DeadLetterEvent {
    /// The event that could not be delivered
    pub event: AuditEvent,

    /// Name of the sink that failed
    pub sink: String,

    /// Reason the delivery failed
    pub reason: String,

    /// Unix timestamp in milliseconds when the event was dead-lettered
    pub dead_lettered_at: u64,
}

impl DeadLetterEvent {
    /// Create a new dead letter event
    pub fn new(event: AuditEvent, sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            event,
            sink: sink.into(),
            reason: reason.into(),
            dead_lettered_at: now_millis(),
        }
    }
}

/// Trait for dead letter queue handlers
#[async_trait]
pub trait DlqHandler: Send + Sync {
    /// Handle a dead-lettered event
    async fn handle(&self, event: DeadLetterEvent) -> Result<()>;

    /// Get the number of events currently in the DLQ
    async fn count(&self) -> Result<usize>;

    /// List recent dead-lettered events, most recent first
    async fn list(&self, limit: usize) -> Result<Vec<DeadLetterEvent>>;
}

/// In-memory DLQ handler for development and testing
///
/// Keeps at most `max_events` dead-lettered events, dropping the oldest.
#[derive(Clone)]
pub struct MemoryDlqHandler {
    events: BoundedBuffer<DeadLetterEvent>,
}

impl MemoryDlqHandler {
    /// Create a new in-memory DLQ handler
    pub fn new(max_events: usize) -> Self {
        Self {
            events: BoundedBuffer::new(max_events),
        }
    }
}

impl Default for MemoryDlqHandler {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DlqHandler for MemoryDlqHandler {
    async fn handle(&self, event: DeadLetterEvent) -> Result<()> {
        tracing::warn!(
            trace_id = %event.event.trace_id,
            sink = %event.sink,
            reason = %event.reason,
            "Audit event dead-lettered"
        );

        self.events.push(event).await;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.events.len().await)
    }

    async fn list(&self, limit: usize) -> Result<Vec<DeadLetterEvent>> {
        Ok(self.events.recent(limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuditContext;

    fn failed(reason: &str) -> DeadLetterEvent {
        DeadLetterEvent::new(AuditContext::new("t").to_event(), "nats", reason)
    }

    #[test]
    fn test_dead_letter_event_creation() {
        let dle = failed("connection refused");
        assert_eq!(dle.reason, "connection refused");
        assert_eq!(dle.sink, "nats");
        assert!(dle.dead_lettered_at > 0);
    }

    #[tokio::test]
    async fn test_memory_dlq_handle_and_count() {
        let dlq = MemoryDlqHandler::default();
        assert_eq!(dlq.count().await.unwrap(), 0);

        dlq.handle(failed("boom")).await.unwrap();
        assert_eq!(dlq.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_dlq_list() {
        let dlq = MemoryDlqHandler::default();
        for i in 0..5 {
            dlq.handle(failed(&format!("reason {}", i))).await.unwrap();
        }

        let list = dlq.list(3).await.unwrap();
        assert_eq!(list.len(), 3);
        // Most recent first
        assert_eq!(list[0].reason, "reason 4");
        assert_eq!(list[2].reason, "reason 2");
    }

    #[tokio::test]
    async fn test_memory_dlq_max_capacity() {
        let dlq = MemoryDlqHandler::new(3);
        for i in 0..5 {
            dlq.handle(failed(&format!("reason {}", i))).await.unwrap();
        }

        assert_eq!(dlq.count().await.unwrap(), 3);
        let list = dlq.list(10).await.unwrap();
        // Oldest events drained
        assert_eq!(list[0].reason, "reason 4");
        assert_eq!(list[2].reason, "reason 2");
    }
}
