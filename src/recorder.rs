//! Operation-kind recorders
//!
//! Convenience compositions of `AuditContext` mutators for common CRUD
//! shapes. Each takes an [`AuditScope`]; when the scope holds no context the
//! call does nothing.

use crate::context::AuditScope;
use crate::types::Identifier;
use serde::Serialize;
use std::collections::HashMap;

/// Record a create: resource id and the created state
pub fn record_create<S, T>(scope: &S, resource_id: impl Into<Identifier>, new_data: T)
where
    S: AuditScope + ?Sized,
    T: Serialize + Send + Sync + 'static,
{
    if let Some(ctx) = scope.audit_context() {
        ctx.set_resource_id(resource_id);
        ctx.set_new_data(new_data);
    }
}

/// Record an update: resource id plus state before and after
pub fn record_update<S, T, U>(
    scope: &S,
    resource_id: impl Into<Identifier>,
    old_data: T,
    new_data: U,
) where
    S: AuditScope + ?Sized,
    T: Serialize + Send + Sync + 'static,
    U: Serialize + Send + Sync + 'static,
{
    if let Some(ctx) = scope.audit_context() {
        ctx.set_resource_id(resource_id);
        ctx.set_old_data(old_data);
        ctx.set_new_data(new_data);
    }
}

/// Record a delete: resource id and the removed state
pub fn record_delete<S, T>(scope: &S, resource_id: impl Into<Identifier>, old_data: T)
where
    S: AuditScope + ?Sized,
    T: Serialize + Send + Sync + 'static,
{
    if let Some(ctx) = scope.audit_context() {
        ctx.set_resource_id(resource_id);
        ctx.set_old_data(old_data);
    }
}

/// Record a single-entity read
pub fn record_get<S>(scope: &S, resource_id: impl Into<Identifier>)
where
    S: AuditScope + ?Sized,
{
    if let Some(ctx) = scope.audit_context() {
        ctx.set_resource_id(resource_id);
    }
}

/// Record a listing by merging caller-supplied metadata
pub fn record_list<S>(scope: &S, metadata: Option<HashMap<String, serde_json::Value>>)
where
    S: AuditScope + ?Sized,
{
    if let (Some(ctx), Some(metadata)) = (scope.audit_context(), metadata) {
        ctx.merge_attributes(metadata);
    }
}

/// Record a paginated listing
///
/// The page value is round-tripped through JSON into a key-value map and
/// merged into the metadata. Anything that is not a JSON object, or fails to
/// serialize, leaves the metadata untouched.
pub fn record_page<S, P>(scope: &S, page: &P)
where
    S: AuditScope + ?Sized,
    P: Serialize + ?Sized,
{
    let Some(ctx) = scope.audit_context() else {
        return;
    };

    let metadata = serde_json::to_value(page)
        .and_then(serde_json::from_value::<HashMap<String, serde_json::Value>>);

    match metadata {
        Ok(metadata) => ctx.merge_attributes(metadata),
        Err(e) => {
            tracing::debug!(trace_id = %ctx.trace_id(), error = %e, "Page metadata skipped");
        }
    }
}

/// Record a custom action on a resource, with optional metadata
pub fn record_action<S>(
    scope: &S,
    resource_id: impl Into<Identifier>,
    metadata: Option<HashMap<String, serde_json::Value>>,
) where
    S: AuditScope + ?Sized,
{
    if let Some(ctx) = scope.audit_context() {
        ctx.set_resource_id(resource_id);
        if let Some(metadata) = metadata {
            ctx.merge_attributes(metadata);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuditContext;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Page {
        page: u32,
        page_size: u32,
        total: u64,
    }

    #[test]
    fn test_record_create() {
        let ctx = AuditContext::new(1);
        record_create(&ctx, 42, json!({"name": "x"}));

        let event = ctx.to_event();
        assert_eq!(event.resource_id, Some(Identifier::from(42)));
        assert_eq!(event.new_value(), Some(json!({"name": "x"})));
        assert!(event.old_data.is_none());

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["resourceId"], 42);
        assert_eq!(wire["newData"], json!({"name": "x"}));
        assert!(wire.get("oldData").is_none());
    }

    #[test]
    fn test_record_update() {
        let ctx = AuditContext::new(1);
        record_update(&ctx, 7, json!({"v": 1}), json!({"v": 2}));

        let event = ctx.to_event();
        assert_eq!(event.resource_id, Some(Identifier::from(7)));
        assert_eq!(event.old_value(), Some(json!({"v": 1})));
        assert_eq!(event.new_value(), Some(json!({"v": 2})));
        assert_ne!(event.old_data, event.new_data);
    }

    #[test]
    fn test_record_delete() {
        let ctx = AuditContext::new(1);
        record_delete(&ctx, "order-9", json!({"total": 10}));

        let event = ctx.to_event();
        assert_eq!(event.resource_id, Some(Identifier::from("order-9")));
        assert_eq!(event.old_value(), Some(json!({"total": 10})));
        assert!(event.new_data.is_none());
    }

    #[test]
    fn test_record_get() {
        let ctx = AuditContext::new(1);
        record_get(&ctx, 5);

        let event = ctx.to_event();
        assert_eq!(event.resource_id, Some(Identifier::from(5)));
        assert!(event.old_data.is_none() && event.new_data.is_none());
    }

    #[test]
    fn test_record_list() {
        let ctx = AuditContext::new(1);
        record_list(&ctx, None);
        assert!(ctx.to_event().metadata.is_none());

        record_list(&ctx, Some(HashMap::from([("count".to_string(), json!(3))])));
        let metadata = ctx.to_event().metadata.unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["count"], json!(3));
    }

    #[test]
    fn test_record_page() {
        let ctx = AuditContext::new(1);
        record_page(
            &ctx,
            &Page {
                page: 2,
                page_size: 20,
                total: 95,
            },
        );

        let metadata = ctx.to_event().metadata.unwrap();
        assert_eq!(metadata["page"], json!(2));
        assert_eq!(metadata["pageSize"], json!(20));
        assert_eq!(metadata["total"], json!(95));
    }

    #[test]
    fn test_record_page_non_object_leaves_metadata_unchanged() {
        let ctx = AuditContext::new(1);
        ctx.set_attribute("existing", true);

        record_page(&ctx, &vec![1, 2, 3]);
        record_page(&ctx, "just a string");

        let metadata = ctx.to_event().metadata.unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["existing"], json!(true));
    }

    #[test]
    fn test_record_page_unserializable_leaves_metadata_unchanged() {
        // Tuple keys are not representable as JSON object keys
        let page: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);

        let ctx = AuditContext::new(1);
        record_page(&ctx, &page);
        assert!(ctx.to_event().metadata.is_none());
    }

    #[test]
    fn test_record_action() {
        let ctx = AuditContext::new(1);
        record_action(&ctx, 11, None);
        assert!(ctx.to_event().metadata.is_none());

        record_action(
            &ctx,
            12,
            Some(HashMap::from([("reason".to_string(), json!("manual"))])),
        );
        let event = ctx.to_event();
        assert_eq!(event.resource_id, Some(Identifier::from(12)));
        assert_eq!(event.metadata.unwrap()["reason"], json!("manual"));
    }

    #[test]
    fn test_recorders_without_context_are_noops() {
        let scope: Option<Arc<AuditContext>> = None;

        record_create(&scope, 1, json!({}));
        record_update(&scope, 1, json!({}), json!({}));
        record_delete(&scope, 1, json!({}));
        record_get(&scope, 1);
        record_list(&scope, Some(HashMap::from([("k".to_string(), json!(1))])));
        record_page(
            &scope,
            &Page {
                page: 1,
                page_size: 1,
                total: 1,
            },
        );
        record_action(&scope, 1, None);
    }

    #[test]
    fn test_recorders_through_shared_scope() {
        let ctx = Arc::new(AuditContext::new(1));
        let scope = Some(ctx.clone());

        record_get(&scope, 3);
        assert_eq!(ctx.to_event().resource_id, Some(Identifier::from(3)));
    }
}
