//! Audit sink trait — the delivery abstraction for finished events
//!
//! Every destination (NATS, file, log, in-memory, ...) implements
//! `AuditSink`. The `Auditor` hands each event to its sink on a detached
//! task, so a slow or failing sink never holds up the audited operation.

use crate::error::Result;
use crate::event::AuditEvent;
use async_trait::async_trait;
use std::sync::Arc;

pub mod file;
pub mod log;
pub mod memory;
pub mod nats;

/// Core trait for audit event destinations
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Deliver one event
    ///
    /// Failures are reported to the dispatcher, which logs them and
    /// forwards the event to the dead-letter handler if one is configured.
    /// Sinks must not retry on their own account.
    async fn deliver(&self, event: &AuditEvent) -> Result<()>;

    /// Sink name (e.g., "nats", "memory", "file")
    fn name(&self) -> &str;

    /// Health check — returns true if the sink can accept events
    async fn health(&self) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    async fn deliver(&self, event: &AuditEvent) -> Result<()> {
        (**self).deliver(event).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health(&self) -> Result<bool> {
        (**self).health().await
    }
}
