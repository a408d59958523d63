//! # a3s-audit
//!
//! Request-scoped audit capture with pluggable, fire-and-forget delivery
//! for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-audit` gathers facts about an in-flight operation (who, what, which
//! resource, state before and after, timing, outcome) in a thread-safe
//! [`AuditContext`], freezes it into an immutable [`AuditEvent`] when the
//! operation ends, and hands the event to an [`AuditSink`] on a detached
//! task. Auditing can never fail or slow down the operation it observes.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_audit::{record_update, ActionType, Auditor, MemorySink, RequestInfo};
//!
//! # async fn example() -> a3s_audit::Result<()> {
//! let sink = MemorySink::default();
//! let auditor: Auditor = Auditor::builder().sink(sink.clone()).build()?;
//!
//! // Adapter: request starts
//! let ctx = auditor.begin(&(), RequestInfo::new().method("PUT").request_uri("/users/7"));
//! auditor.attach(&ctx, &(), "User", ActionType::UPDATE);
//!
//! // Business code
//! record_update(&ctx, 7, serde_json::json!({"name": "old"}), serde_json::json!({"name": "new"}));
//!
//! // Adapter: request ends
//! if let Some(delivery) = auditor.finish(&ctx, Some(200)) {
//!     delivery.await.ok();
//! }
//! assert_eq!(sink.count().await, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Sinks
//!
//! - **memory** — In-memory sink for testing and single-process use
//! - **log** — Emits events through `tracing` on the `audit` target
//! - **file** — Appends JSON Lines to a local file
//! - **nats** — NATS JetStream for durable, replayable audit streams
//!
//! ## Architecture
//!
//! - **AuditContext** — mutable accumulator, one per operation
//! - **AuditEvent** — immutable snapshot with a compact wire form
//! - **recorders** — `record_create`, `record_update`, ... for CRUD shapes
//! - **Auditor** — begin / attach / finish lifecycle and async dispatch
//! - **AuditSink** trait — delivery abstraction all destinations implement
//! - **DlqHandler** trait — where failed deliveries end up

mod buffer;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod dlq;
pub mod error;
pub mod event;
pub mod options;
pub mod recorder;
pub mod sink;
pub mod types;

// Re-export core types
pub use config::DispatchConfig;
pub use context::{AuditContext, AuditScope, Snapshot};
pub use dispatch::{Auditor, AuditorBuilder, ResponseStatus, RouteBinding};
pub use dlq::{DeadLetterEvent, DlqHandler, MemoryDlqHandler};
pub use error::{AuditError, Result};
pub use event::{is_success_code, AuditEvent};
pub use options::{
    apply_options, with_attribute, with_attributes, with_new_data, with_old_data,
    with_resource_id, with_user_id, ContextOption,
};
pub use recorder::{
    record_action, record_create, record_delete, record_get, record_list, record_page,
    record_update,
};
pub use sink::AuditSink;
pub use types::{ActionType, EntityType, Identifier, RequestInfo};

// Re-export sinks for convenience
pub use sink::file::FileSink;
pub use sink::log::LogSink;
pub use sink::memory::MemorySink;
pub use sink::nats::{NatsConfig, NatsSink, StorageType};
