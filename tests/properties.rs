//! Property tests for snapshot conversion

use a3s_audit::{is_success_code, AuditContext, Identifier};
use proptest::prelude::*;
use std::collections::HashMap;

proptest! {
    #[test]
    fn success_iff_code_in_2xx_3xx(code in any::<u16>()) {
        let ctx = AuditContext::new(1);
        ctx.set_response_code(code);
        let event = ctx.to_event();

        prop_assert_eq!(event.success, (200..400).contains(&code));
        prop_assert_eq!(event.success, is_success_code(Some(code)));
    }

    #[test]
    fn last_write_wins_per_field(ids in prop::collection::vec(any::<i64>(), 1..20)) {
        let ctx = AuditContext::new(1);
        for id in &ids {
            ctx.set_resource_id(*id);
            ctx.set_user_id(id.to_string());
        }

        let last = *ids.last().unwrap();
        let event = ctx.to_event();
        prop_assert_eq!(event.resource_id, Some(Identifier::from(last)));
        prop_assert_eq!(event.user_id, Some(Identifier::from(last.to_string())));
    }

    #[test]
    fn merges_accumulate_all_distinct_keys(
        batches in prop::collection::vec(
            prop::collection::hash_map("[a-z]{1,6}", any::<i32>(), 0..8),
            0..8,
        )
    ) {
        let ctx = AuditContext::new(1);
        let mut expected: HashMap<String, serde_json::Value> = HashMap::new();
        for batch in &batches {
            let batch: HashMap<String, serde_json::Value> = batch
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            expected.extend(batch.clone());
            ctx.merge_attributes(batch);
        }

        let event = ctx.to_event();
        if expected.is_empty() {
            prop_assert!(event.metadata.is_none());
        } else {
            prop_assert_eq!(event.metadata, Some(expected));
        }
    }

    #[test]
    fn conversion_is_repeatable(code in any::<u16>(), key in "[a-z]{1,8}", value in any::<i64>()) {
        let ctx = AuditContext::new("t");
        ctx.set_response_code(code);
        ctx.set_attribute(key, value);
        ctx.set_new_data(serde_json::json!({"value": value}));

        prop_assert_eq!(ctx.to_event(), ctx.to_event());
    }
}

#[test]
fn unset_code_is_not_success() {
    assert!(!AuditContext::new(1).to_event().success);
}
