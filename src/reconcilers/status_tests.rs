// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{Condition, Wireguard, WireguardStatus};
    use crate::reconcilers::memory_store::MemoryStore;
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, update_condition_in_memory,
        HasStatus, StatusUpdater,
    };
    use crate::status_reasons::{
        CONDITION_TYPE_AVAILABLE, CONDITION_TYPE_DEGRADED, REASON_FINALIZING, REASON_RECONCILING,
        STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN,
    };
    use crate::test_fixtures::{server, TEST_NAMESPACE};

    const OLD_TIME: &str = "2024-01-01T00:00:00+00:00";

    fn condition_at(condition_type: &str, status: &str, time: &str) -> Condition {
        Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            reason: Some(REASON_RECONCILING.to_string()),
            message: Some("msg".to_string()),
            last_transition_time: Some(time.to_string()),
        }
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            REASON_RECONCILING,
            "ready",
        );

        assert_eq!(condition.r#type, CONDITION_TYPE_AVAILABLE);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason.as_deref(), Some(REASON_RECONCILING));
        assert_eq!(condition.message.as_deref(), Some("ready"));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![
            condition_at(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, OLD_TIME),
            condition_at(CONDITION_TYPE_DEGRADED, STATUS_UNKNOWN, OLD_TIME),
        ];

        let degraded = find_condition(&conditions, CONDITION_TYPE_DEGRADED).unwrap();
        assert_eq!(degraded.status, STATUS_UNKNOWN);
        assert!(find_condition(&conditions, "Progressing").is_none());
        assert!(find_condition(&[], CONDITION_TYPE_AVAILABLE).is_none());
    }

    #[test]
    fn test_update_condition_appends_new_type() {
        let mut conditions = vec![condition_at(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, OLD_TIME)];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_DEGRADED,
            STATUS_UNKNOWN,
            REASON_FINALIZING,
            "cleaning up",
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, CONDITION_TYPE_AVAILABLE);
        assert_eq!(conditions[1].r#type, CONDITION_TYPE_DEGRADED);
    }

    #[test]
    fn test_update_condition_replaces_in_place() {
        let mut conditions = vec![
            condition_at(CONDITION_TYPE_AVAILABLE, STATUS_UNKNOWN, OLD_TIME),
            condition_at(CONDITION_TYPE_DEGRADED, STATUS_FALSE, OLD_TIME),
        ];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            REASON_RECONCILING,
            "done",
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, CONDITION_TYPE_AVAILABLE);
        assert_eq!(conditions[0].status, STATUS_TRUE);
        assert_eq!(conditions[0].message.as_deref(), Some("done"));
        assert_ne!(conditions[0].last_transition_time.as_deref(), Some(OLD_TIME));
        // Unrelated entries untouched
        assert_eq!(conditions[1], condition_at(CONDITION_TYPE_DEGRADED, STATUS_FALSE, OLD_TIME));
    }

    #[test]
    fn test_update_condition_preserves_time_when_status_unchanged() {
        let mut conditions = vec![condition_at(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, OLD_TIME)];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            REASON_RECONCILING,
            "new message",
        );

        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(OLD_TIME));
        assert_eq!(conditions[0].message.as_deref(), Some("new message"));
    }

    #[test]
    fn test_repeated_updates_never_duplicate() {
        let mut conditions = Vec::new();
        for _ in 0..5 {
            update_condition_in_memory(
                &mut conditions,
                CONDITION_TYPE_AVAILABLE,
                STATUS_TRUE,
                REASON_RECONCILING,
                "ready",
            );
        }
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![condition_at(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, OLD_TIME)];
        let b = vec![condition_at(
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            "2025-06-01T00:00:00+00:00",
        )];
        assert!(conditions_equal(&a, &b));

        let c = vec![condition_at(CONDITION_TYPE_AVAILABLE, STATUS_FALSE, OLD_TIME)];
        assert!(!conditions_equal(&a, &c));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_updater_reports_changes_for_fresh_resource() {
        let wg = server("office");
        let updater = StatusUpdater::new(&wg);
        assert!(updater.has_changes());
    }

    #[test]
    fn test_updater_without_semantic_change() {
        let mut wg = server("office");
        wg.status = Some(WireguardStatus {
            conditions: vec![condition_at(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, OLD_TIME)],
            public_key: Some("key".into()),
            endpoint: Some("1.2.3.4:51820".into()),
        });

        let mut updater = StatusUpdater::new(&wg);
        updater.set_condition(CONDITION_TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "msg");
        updater.status_mut().endpoint = Some("1.2.3.4:51820".into());
        assert!(!updater.has_changes());

        updater.status_mut().endpoint = Some("5.6.7.8:51820".into());
        assert!(updater.has_changes());
    }

    #[tokio::test]
    async fn test_apply_writes_once() {
        let store = MemoryStore::new();
        let wg = store.insert(&server("office"));

        let mut updater = StatusUpdater::new(&wg);
        updater.set_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_UNKNOWN,
            REASON_RECONCILING,
            "start",
        );
        let updated = updater.apply(&store).await.unwrap().unwrap();
        assert_eq!(updated.conditions().len(), 1);
        assert_eq!(store.writes(), 1);

        let mut updater = StatusUpdater::new(&updated);
        updater.set_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_UNKNOWN,
            REASON_RECONCILING,
            "start",
        );
        assert!(updater.apply(&store).await.unwrap().is_none());
        assert_eq!(store.writes(), 1);

        let stored: Wireguard = store.fetch(TEST_NAMESPACE, "office").unwrap();
        assert_eq!(stored.conditions()[0].status, STATUS_UNKNOWN);
    }

    #[tokio::test]
    async fn test_apply_on_stale_copy_conflicts() {
        let store = MemoryStore::new();
        let wg = store.insert(&server("office"));
        store.mutate::<Wireguard>(TEST_NAMESPACE, "office", |w| w.spec.replicas = 2);

        let mut updater = StatusUpdater::new(&wg);
        updater.set_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_UNKNOWN,
            REASON_RECONCILING,
            "start",
        );
        let err = updater.apply(&store).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
