//! In-memory sink for development and testing

use crate::buffer::BoundedBuffer;
use crate::error::Result;
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use async_trait::async_trait;

/// Stores delivered events in a bounded buffer
///
/// Clones share the same storage, so a test can keep one handle and give
/// another to the `Auditor`.
#[derive(Clone)]
pub struct MemorySink {
    events: BoundedBuffer<AuditEvent>,
}

impl MemorySink {
    /// Create a sink keeping at most `max_events` (0 = unbounded)
    pub fn new(max_events: usize) -> Self {
        Self {
            events: BoundedBuffer::new(max_events),
        }
    }

    /// All stored events, oldest first
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.to_vec().await
    }

    pub async fn count(&self) -> usize {
        self.events.len().await
    }

    pub async fn clear(&self) {
        self.events.clear().await;
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn deliver(&self, event: &AuditEvent) -> Result<()> {
        self.events.push(event.clone()).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
