//! Request-scoped audit context
//!
//! `AuditContext` accumulates facts about one in-flight operation and is
//! frozen into an [`AuditEvent`] by [`AuditContext::to_event`]. Every
//! mutator takes the per-context write lock only for the duration of the
//! field update; conversion takes the read lock for the copy.

use crate::event::{is_success_code, AuditEvent};
use crate::types::{ActionType, EntityType, Identifier, RequestInfo};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A value that can be encoded to JSON at snapshot time
///
/// Implemented for every `Serialize + Send + Sync` type so callers can
/// hand over their domain objects directly.
pub trait Snapshot: Send + Sync {
    /// Encode to canonical JSON bytes
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send + Sync> Snapshot for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Mutable state guarded by the context lock
struct State {
    user_id: Option<Identifier>,
    action: Option<ActionType>,
    resource: Option<EntityType>,
    resource_id: Option<Identifier>,
    old_data: Option<Arc<dyn Snapshot>>,
    new_data: Option<Arc<dyn Snapshot>>,
    metadata: Option<HashMap<String, serde_json::Value>>,
    request: RequestInfo,
    response_code: Option<u16>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl State {
    fn started_at(start_time: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            action: None,
            resource: None,
            resource_id: None,
            old_data: None,
            new_data: None,
            metadata: None,
            request: RequestInfo::default(),
            response_code: None,
            start_time,
            end_time: None,
        }
    }
}

/// Accumulator for one audited operation
///
/// Shared by reference (usually `Arc<AuditContext>`) between the adapter
/// that owns it and the business code that records into it.
pub struct AuditContext {
    trace_id: Identifier,
    state: RwLock<State>,
    dispatched: AtomicBool,
}

impl AuditContext {
    /// Create a context stamped with the current time as start time
    pub fn new(trace_id: impl Into<Identifier>) -> Self {
        Self {
            trace_id: trace_id.into(),
            state: RwLock::new(State::started_at(Utc::now())),
            dispatched: AtomicBool::new(false),
        }
    }

    /// Create a context pre-populated with transport-derived fields
    pub fn with_request(trace_id: impl Into<Identifier>, request: RequestInfo) -> Self {
        let ctx = Self::new(trace_id);
        ctx.set_request_info(request);
        ctx
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn trace_id(&self) -> &Identifier {
        &self.trace_id
    }

    pub fn set_user_id(&self, user_id: impl Into<Identifier>) {
        self.write().user_id = Some(user_id.into());
    }

    pub fn set_action(&self, action: impl Into<ActionType>) {
        self.write().action = Some(action.into());
    }

    pub fn set_resource(&self, resource: impl Into<EntityType>) {
        self.write().resource = Some(resource.into());
    }

    pub fn set_resource_id(&self, resource_id: impl Into<Identifier>) {
        self.write().resource_id = Some(resource_id.into());
    }

    /// Record the pre-operation state; encoded lazily by `to_event`
    pub fn set_old_data<T: Serialize + Send + Sync + 'static>(&self, data: T) {
        let data: Arc<dyn Snapshot> = Arc::new(data);
        self.write().old_data = Some(data);
    }

    /// Record the post-operation state; encoded lazily by `to_event`
    pub fn set_new_data<T: Serialize + Send + Sync + 'static>(&self, data: T) {
        let data: Arc<dyn Snapshot> = Arc::new(data);
        self.write().new_data = Some(data);
    }

    /// Set a single metadata entry
    ///
    /// Values that cannot be represented as JSON are dropped.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(
                    trace_id = %self.trace_id,
                    key = %key,
                    error = %e,
                    "Attribute skipped"
                );
                return;
            }
        };
        self.write()
            .metadata
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
    }

    /// Shallow-merge entries into the metadata, overwriting on collision
    pub fn merge_attributes(&self, attributes: HashMap<String, serde_json::Value>) {
        if attributes.is_empty() {
            return;
        }
        // Created under the same guard as the merge so concurrent first
        // writers cannot both install a fresh map.
        self.write()
            .metadata
            .get_or_insert_with(HashMap::new)
            .extend(attributes);
    }

    pub fn set_request_info(&self, request: RequestInfo) {
        self.write().request = request;
    }

    pub fn set_response_code(&self, code: u16) {
        self.write().response_code = Some(code);
    }

    pub fn set_start_time(&self, at: DateTime<Utc>) {
        self.write().start_time = at;
    }

    pub fn set_end_time(&self, at: DateTime<Utc>) {
        self.write().end_time = Some(at);
    }

    pub fn action(&self) -> Option<ActionType> {
        self.read().action.clone()
    }

    pub fn resource(&self) -> Option<EntityType> {
        self.read().resource.clone()
    }

    pub fn response_code(&self) -> Option<u16> {
        self.read().response_code
    }

    /// Whether both action and resource have been declared
    ///
    /// Operations that never declared what they did are not audit-worthy.
    pub fn is_auditable(&self) -> bool {
        let state = self.read();
        state.action.is_some() && state.resource.is_some()
    }

    /// Claim the right to publish this context
    ///
    /// Returns `true` for exactly one caller over the context's lifetime.
    pub fn mark_dispatched(&self) -> bool {
        !self.dispatched.swap(true, Ordering::AcqRel)
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Freeze the current state into an event
    ///
    /// Never fails: payloads that cannot be encoded are left out. Each call
    /// produces an independent snapshot. An unset end time falls back to
    /// the start time.
    pub fn to_event(&self) -> AuditEvent {
        let state = self.read();

        AuditEvent {
            trace_id: self.trace_id.clone(),
            user_id: state.user_id.clone(),
            action: state.action.clone(),
            resource: state.resource.clone(),
            resource_id: state.resource_id.clone(),
            metadata: state.metadata.clone().filter(|m| !m.is_empty()),
            ip_address: state.request.ip_address.clone(),
            user_agent: state.request.user_agent.clone(),
            request_uri: state.request.request_uri.clone(),
            method: state.request.method.clone(),
            response_code: state.response_code,
            success: is_success_code(state.response_code),
            start_time: state.start_time,
            end_time: state.end_time.unwrap_or(state.start_time),
            old_data: encode(&self.trace_id, "oldData", state.old_data.as_deref()),
            new_data: encode(&self.trace_id, "newData", state.new_data.as_deref()),
        }
    }
}

fn encode(trace_id: &Identifier, field: &str, data: Option<&dyn Snapshot>) -> Option<Bytes> {
    match data?.to_json() {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(e) => {
            tracing::debug!(
                trace_id = %trace_id,
                payload = field,
                error = %e,
                "Snapshot not serializable, omitted"
            );
            None
        }
    }
}

impl fmt::Debug for AuditContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("AuditContext")
            .field("trace_id", &self.trace_id)
            .field("user_id", &state.user_id)
            .field("action", &state.action)
            .field("resource", &state.resource)
            .field("resource_id", &state.resource_id)
            .field("has_old_data", &state.old_data.is_some())
            .field("has_new_data", &state.new_data.is_some())
            .field("metadata", &state.metadata)
            .field("response_code", &state.response_code)
            .field("dispatched", &self.is_dispatched())
            .finish_non_exhaustive()
    }
}

/// Typed carrier resolving the audit context of the current operation
///
/// Replaces ambient lookup: business code receives something that may or
/// may not hold a context, and recording becomes a no-op when it doesn't.
pub trait AuditScope {
    fn audit_context(&self) -> Option<&AuditContext>;
}

impl AuditScope for AuditContext {
    fn audit_context(&self) -> Option<&AuditContext> {
        Some(self)
    }
}

impl AuditScope for Arc<AuditContext> {
    fn audit_context(&self) -> Option<&AuditContext> {
        Some(self.as_ref())
    }
}

impl<T: AuditScope> AuditScope for Option<T> {
    fn audit_context(&self) -> Option<&AuditContext> {
        self.as_ref().and_then(AuditScope::audit_context)
    }
}

impl<T: AuditScope + ?Sized> AuditScope for &T {
    fn audit_context(&self) -> Option<&AuditContext> {
        (**self).audit_context()
    }
}
