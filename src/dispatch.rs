//! Auditor — the dispatch side of request auditing
//!
//! An `Auditor` is an explicitly constructed, cloneable configuration
//! object that a transport adapter uses to drive the audit lifecycle:
//!
//! 1. [`Auditor::begin`] — consult the skipper, mint a trace id, create the context
//! 2. [`Auditor::attach`] / [`RouteBinding::apply`] — declare resource, action and user
//! 3. [`Auditor::finish`] — stamp end time and status, then deliver if auditable
//!
//! Delivery runs on a detached tokio task. Its failures (errors, timeouts,
//! panics) are logged and dead-lettered but never reach the audited
//! operation.

use crate::config::DispatchConfig;
use crate::context::{AuditContext, AuditScope};
use crate::dlq::{DeadLetterEvent, DlqHandler};
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use crate::types::{ActionType, EntityType, Identifier, RequestInfo};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Produces a fresh trace id per audited operation
pub type TraceIdFn = Arc<dyn Fn() -> Identifier + Send + Sync>;

/// Extracts the acting user from the adapter's request type
pub type UserFn<R> = Arc<dyn Fn(&R) -> Option<Identifier> + Send + Sync>;

/// Decides whether a request is exempt from auditing
pub type SkipFn<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Outcome of an observed operation, as far as auditing is concerned
pub trait ResponseStatus {
    /// Status code to stamp on the context, if one materialized
    fn response_code(&self) -> Option<u16>;
}

impl ResponseStatus for u16 {
    fn response_code(&self) -> Option<u16> {
        Some(*self)
    }
}

impl ResponseStatus for Option<u16> {
    fn response_code(&self) -> Option<u16> {
        *self
    }
}

impl<T: ResponseStatus, E: ResponseStatus> ResponseStatus for std::result::Result<T, E> {
    fn response_code(&self) -> Option<u16> {
        match self {
            Ok(value) => value.response_code(),
            Err(err) => err.response_code(),
        }
    }
}

/// Audit dispatcher for requests of type `R`
pub struct Auditor<R: ?Sized = ()> {
    sink: Arc<dyn AuditSink>,
    new_trace_id: TraceIdFn,
    user_from_request: Option<UserFn<R>>,
    skipper: Option<SkipFn<R>>,
    dlq: Option<Arc<dyn DlqHandler>>,
    config: DispatchConfig,
}

impl<R: ?Sized> Clone for Auditor<R> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            new_trace_id: self.new_trace_id.clone(),
            user_from_request: self.user_from_request.clone(),
            skipper: self.skipper.clone(),
            dlq: self.dlq.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: ?Sized> Auditor<R> {
    /// Start building an auditor
    pub fn builder() -> AuditorBuilder<R> {
        AuditorBuilder::default()
    }

    /// Name of the configured sink
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Create the audit context for a request, unless the skipper exempts it
    pub fn begin(&self, request: &R, info: RequestInfo) -> Option<Arc<AuditContext>> {
        if let Some(skipper) = &self.skipper {
            if skipper(request) {
                return None;
            }
        }

        let trace_id = (self.new_trace_id)();
        Some(Arc::new(AuditContext::with_request(trace_id, info)))
    }

    /// Declare what the operation does and who is doing it
    pub fn attach<S>(
        &self,
        scope: &S,
        request: &R,
        resource: impl Into<EntityType>,
        action: impl Into<ActionType>,
    ) where
        S: AuditScope + ?Sized,
    {
        let Some(ctx) = scope.audit_context() else {
            return;
        };

        ctx.set_resource(resource);
        ctx.set_action(action);

        if let Some(user_from_request) = &self.user_from_request {
            if let Some(user_id) = user_from_request(request) {
                ctx.set_user_id(user_id);
            }
        }
    }

    /// Pre-bind a resource/action pair, e.g. once per route at startup
    pub fn bind(
        &self,
        resource: impl Into<EntityType>,
        action: impl Into<ActionType>,
    ) -> RouteBinding<R> {
        RouteBinding {
            auditor: self.clone(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// End-of-operation trigger
    ///
    /// Stamps the end time and status code, then converts and delivers the
    /// context if both resource and action were declared. A context is
    /// delivered at most once; later calls leave it untouched.
    /// Returns the delivery task handle; `None` means no event was produced.
    pub fn finish<S>(&self, scope: &S, response_code: Option<u16>) -> Option<JoinHandle<()>>
    where
        S: AuditScope + ?Sized,
    {
        let ctx = scope.audit_context()?;

        if ctx.is_dispatched() {
            tracing::debug!(
                trace_id = %ctx.trace_id(),
                "Audit event already dispatched, ignoring repeated finish"
            );
            return None;
        }

        ctx.set_end_time(Utc::now());
        if let Some(code) = response_code {
            ctx.set_response_code(code);
        }

        if !ctx.is_auditable() {
            if self.config.log_untriggered {
                tracing::debug!(
                    trace_id = %ctx.trace_id(),
                    "Operation declared no resource/action, no audit event"
                );
            }
            return None;
        }

        // Concurrent finishers race here; only the winner converts
        if !ctx.mark_dispatched() {
            return None;
        }

        self.dispatch(ctx.to_event())
    }

    /// Hand an event to the sink on a detached task
    ///
    /// Returns `None` (and drops the event) when called outside a tokio
    /// runtime.
    pub fn dispatch(&self, event: AuditEvent) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!(
                    trace_id = %event.trace_id,
                    "No tokio runtime available, audit event dropped"
                );
                return None;
            }
        };

        Some(handle.spawn(deliver(
            self.sink.clone(),
            self.dlq.clone(),
            self.config.delivery_timeout(),
            event,
        )))
    }

    /// Audit an async operation end to end
    ///
    /// The operation receives the context (or `None` if skipped) and its
    /// output is returned untouched; auditing cannot change it.
    pub async fn observe<F, Fut, T>(&self, request: &R, info: RequestInfo, op: F) -> T
    where
        F: FnOnce(Option<Arc<AuditContext>>) -> Fut,
        Fut: Future<Output = T>,
        T: ResponseStatus,
    {
        let ctx = self.begin(request, info);
        let output = op(ctx.clone()).await;

        if let Some(ctx) = &ctx {
            self.finish(ctx, output.response_code());
        }

        output
    }
}

/// A resource/action pair bound to an auditor
pub struct RouteBinding<R: ?Sized = ()> {
    auditor: Auditor<R>,
    resource: EntityType,
    action: ActionType,
}

impl<R: ?Sized> RouteBinding<R> {
    pub fn resource(&self) -> &EntityType {
        &self.resource
    }

    pub fn action(&self) -> &ActionType {
        &self.action
    }

    /// Attach the bound resource/action (and user) to the current context
    pub fn apply<S>(&self, scope: &S, request: &R)
    where
        S: AuditScope + ?Sized,
    {
        self.auditor
            .attach(scope, request, self.resource.clone(), self.action.clone());
    }
}

impl<R: ?Sized> Clone for RouteBinding<R> {
    fn clone(&self) -> Self {
        Self {
            auditor: self.auditor.clone(),
            resource: self.resource.clone(),
            action: self.action.clone(),
        }
    }
}

/// Builder for [`Auditor`]
pub struct AuditorBuilder<R: ?Sized = ()> {
    sink: Option<Arc<dyn AuditSink>>,
    new_trace_id: Option<TraceIdFn>,
    user_from_request: Option<UserFn<R>>,
    skipper: Option<SkipFn<R>>,
    dlq: Option<Arc<dyn DlqHandler>>,
    config: DispatchConfig,
}

impl<R: ?Sized> Default for AuditorBuilder<R> {
    fn default() -> Self {
        Self {
            sink: None,
            new_trace_id: None,
            user_from_request: None,
            skipper: None,
            dlq: None,
            config: DispatchConfig::default(),
        }
    }
}

impl<R: ?Sized> AuditorBuilder<R> {
    /// Destination for finished events (required)
    pub fn sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Trace id supplier; defaults to random UUID v4
    pub fn trace_id_generator(
        mut self,
        f: impl Fn() -> Identifier + Send + Sync + 'static,
    ) -> Self {
        self.new_trace_id = Some(Arc::new(f));
        self
    }

    pub fn user_from_request(
        mut self,
        f: impl Fn(&R) -> Option<Identifier> + Send + Sync + 'static,
    ) -> Self {
        self.user_from_request = Some(Arc::new(f));
        self
    }

    /// Requests for which the predicate returns true are not audited
    pub fn skipper(mut self, f: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.skipper = Some(Arc::new(f));
        self
    }

    /// Where failed deliveries go
    pub fn dead_letter(mut self, handler: impl DlqHandler + 'static) -> Self {
        self.dlq = Some(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Auditor<R>> {
        let sink = self
            .sink
            .ok_or_else(|| AuditError::Config("Auditor requires a sink".to_string()))?;

        Ok(Auditor {
            sink,
            new_trace_id: self.new_trace_id.unwrap_or_else(default_trace_id),
            user_from_request: self.user_from_request,
            skipper: self.skipper,
            dlq: self.dlq,
            config: self.config,
        })
    }
}

fn default_trace_id() -> TraceIdFn {
    Arc::new(Identifier::new_v4)
}

async fn deliver_with_timeout(
    sink: &dyn AuditSink,
    event: &AuditEvent,
    timeout: Option<Duration>,
) -> Result<()> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, sink.deliver(event))
            .await
            .map_err(|_| {
                AuditError::Timeout(format!(
                    "Delivery to sink '{}' exceeded {:?}",
                    sink.name(),
                    limit
                ))
            })?,
        None => sink.deliver(event).await,
    }
}

async fn deliver(
    sink: Arc<dyn AuditSink>,
    dlq: Option<Arc<dyn DlqHandler>>,
    timeout: Option<Duration>,
    event: AuditEvent,
) {
    let outcome = AssertUnwindSafe(deliver_with_timeout(sink.as_ref(), &event, timeout))
        .catch_unwind()
        .await;

    let reason = match outcome {
        Ok(Ok(())) => {
            tracing::debug!(
                trace_id = %event.trace_id,
                sink = sink.name(),
                "Audit event delivered"
            );
            return;
        }
        Ok(Err(e)) => {
            tracing::warn!(
                trace_id = %event.trace_id,
                sink = sink.name(),
                error = %e,
                "Audit delivery failed"
            );
            e.to_string()
        }
        Err(panic) => {
            let reason = format!("sink panicked: {}", panic_message(panic.as_ref()));
            tracing::error!(
                trace_id = %event.trace_id,
                sink = sink.name(),
                reason = %reason,
                "Audit delivery panicked"
            );
            reason
        }
    };

    if let Some(dlq) = dlq {
        let trace_id = event.trace_id.clone();
        if let Err(e) = dlq.handle(DeadLetterEvent::new(event, sink.name(), reason)).await {
            tracing::warn!(trace_id = %trace_id, error = %e, "Failed to dead-letter audit event");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
