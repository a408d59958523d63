//! Composable context mutations
//!
//! A `ContextOption` is a deferred mutation; build a list of them and apply
//! it in one go with [`apply_options`]. Useful when the decision of what to
//! record is made before the context is at hand.

use crate::context::{AuditContext, AuditScope};
use crate::types::Identifier;
use serde::Serialize;
use std::collections::HashMap;

/// A deferred mutation of an `AuditContext`
pub struct ContextOption(Box<dyn FnOnce(&AuditContext) + Send>);

impl ContextOption {
    /// Wrap an arbitrary mutation
    pub fn new(f: impl FnOnce(&AuditContext) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    fn apply(self, ctx: &AuditContext) {
        (self.0)(ctx)
    }
}

impl std::fmt::Debug for ContextOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContextOption")
    }
}

/// Apply options in order; does nothing when the scope holds no context
pub fn apply_options<S>(scope: &S, options: impl IntoIterator<Item = ContextOption>)
where
    S: AuditScope + ?Sized,
{
    if let Some(ctx) = scope.audit_context() {
        for option in options {
            option.apply(ctx);
        }
    }
}

pub fn with_user_id(user_id: impl Into<Identifier>) -> ContextOption {
    let user_id = user_id.into();
    ContextOption::new(move |ctx| ctx.set_user_id(user_id))
}

pub fn with_resource_id(resource_id: impl Into<Identifier>) -> ContextOption {
    let resource_id = resource_id.into();
    ContextOption::new(move |ctx| ctx.set_resource_id(resource_id))
}

pub fn with_old_data<T: Serialize + Send + Sync + 'static>(data: T) -> ContextOption {
    ContextOption::new(move |ctx| ctx.set_old_data(data))
}

pub fn with_new_data<T: Serialize + Send + Sync + 'static>(data: T) -> ContextOption {
    ContextOption::new(move |ctx| ctx.set_new_data(data))
}

pub fn with_attribute<V: Serialize + Send + 'static>(
    key: impl Into<String>,
    value: V,
) -> ContextOption {
    let key = key.into();
    ContextOption::new(move |ctx| ctx.set_attribute(key, value))
}

pub fn with_attributes(attributes: HashMap<String, serde_json::Value>) -> ContextOption {
    ContextOption::new(move |ctx| ctx.merge_attributes(attributes))
}
