use nncp_api::{ConditionStatus, ObjectKey, Policy, PolicyConditionType};
use nncp_conditions::{BackoffStrategy, ConflictRetryExecutor, PolicyConditions, RetryPolicy};
use nncp_store::{InMemoryStore, StoreErrorKind};
use nncp_test_utils::{report, ClusterFixture, EnactmentOutcome};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn controller(store: Arc<InMemoryStore>) -> PolicyConditions<Arc<InMemoryStore>> {
    PolicyConditions::new(store).with_executor(ConflictRetryExecutor::new(RetryPolicy::new(
        5,
        1,
        BackoffStrategy::Fixed,
    )))
}

fn condition(policy: &Policy, t: PolicyConditionType) -> (ConditionStatus, String, String) {
    let c = policy
        .status
        .conditions
        .find(t)
        .unwrap_or_else(|| panic!("missing {t} condition"));
    (c.status, c.reason.clone(), c.message.clone())
}

async fn run_update(store: &Arc<InMemoryStore>, key: &ObjectKey) -> Policy {
    controller(store.clone()).update(key).await.unwrap();
    store.policy(key).unwrap()
}

#[tokio::test]
async fn test_one_failure_degrades_policy() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .node("n2", EnactmentOutcome::Available)
        .node("n3", EnactmentOutcome::Failed)
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Degraded),
        (
            ConditionStatus::True,
            "FailedToConfigure".to_string(),
            "1/3 nodes failed to configure".to_string()
        )
    );
    assert_eq!(
        condition(&policy, PolicyConditionType::Available),
        (ConditionStatus::False, "FailedToConfigure".to_string(), String::new())
    );
}

#[tokio::test]
async fn test_progressing_counts_only_finished() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .node("n2", EnactmentOutcome::Progressing)
        .node("n3", EnactmentOutcome::Pending)
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Available),
        (
            ConditionStatus::Unknown,
            "ConfigurationProgressing".to_string(),
            "Policy is progressing 1/3 nodes finished".to_string()
        )
    );
    assert_eq!(
        condition(&policy, PolicyConditionType::Degraded),
        (
            ConditionStatus::Unknown,
            "ConfigurationProgressing".to_string(),
            String::new()
        )
    );
}

#[tokio::test]
async fn test_no_matching_node() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::NotMatching)
        .node("n2", EnactmentOutcome::NotMatching)
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Available),
        (
            ConditionStatus::True,
            "ConfigurationNoMatchingNode".to_string(),
            "Policy does not match any node".to_string()
        )
    );
    assert_eq!(
        condition(&policy, PolicyConditionType::Degraded).0,
        ConditionStatus::False
    );
}

#[tokio::test]
async fn test_empty_cluster_reports_no_matching_node() {
    let (store, key) = ClusterFixture::new("bond0").build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Available).1,
        "ConfigurationNoMatchingNode"
    );
}

#[tokio::test]
async fn test_unready_nodes_do_not_hold_rollout() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .node("n2", EnactmentOutcome::Available)
        .unready_node("n3", ConditionStatus::Unknown, None)
        .unready_node("n4", ConditionStatus::False, Some(EnactmentOutcome::Pending))
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Available),
        (
            ConditionStatus::True,
            "SuccessfullyConfigured".to_string(),
            "2/2 nodes successfully configured".to_string()
        )
    );
}

#[tokio::test]
async fn test_success_message_repeats_available_count() {
    // One ready node finished, an unready node still progressing: matching is
    // 2 but the message denominator is the available count.
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .unready_node(
            "n2",
            ConditionStatus::False,
            Some(EnactmentOutcome::Progressing),
        )
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Available).2,
        "1/1 nodes successfully configured"
    );
}

#[tokio::test]
async fn test_other_policies_enactments_ignored() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .foreign_enactment("n1", "vlan100", EnactmentOutcome::Failed)
        .build();

    let policy = run_update(&store, &key).await;

    assert_eq!(
        condition(&policy, PolicyConditionType::Degraded).0,
        ConditionStatus::False
    );
}

#[tokio::test]
async fn test_rollout_transitions_keep_condition_order() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Progressing)
        .node("n2", EnactmentOutcome::Pending)
        .build();

    let first = run_update(&store, &key).await;
    let types: Vec<_> = first
        .status
        .conditions
        .iter()
        .map(|c| c.condition_type)
        .collect();
    assert_eq!(
        types,
        vec![PolicyConditionType::Degraded, PolicyConditionType::Available]
    );

    report(&store, "n1", "bond0", EnactmentOutcome::Available);
    report(&store, "n2", "bond0", EnactmentOutcome::Available);
    let done = run_update(&store, &key).await;

    assert_eq!(done.status.conditions.len(), 2);
    assert_eq!(
        condition(&done, PolicyConditionType::Available).2,
        "2/2 nodes successfully configured"
    );
    assert!(done.metadata.resource_version > first.metadata.resource_version);
}

#[tokio::test]
async fn test_unchanged_status_keeps_transition_time() {
    let (store, key) = ClusterFixture::new("bond0")
        .node("n1", EnactmentOutcome::Available)
        .build();

    let first = run_update(&store, &key).await;
    let second = run_update(&store, &key).await;

    let before = first
        .status
        .conditions
        .find(PolicyConditionType::Available)
        .unwrap();
    let after = second
        .status
        .conditions
        .find(PolicyConditionType::Available)
        .unwrap();
    assert_eq!(after.last_transition_time, before.last_transition_time);
    assert!(after.last_heartbeat_time >= before.last_heartbeat_time);
}

#[tokio::test]
async fn test_reset_on_policy_without_conditions() {
    let (store, key) = ClusterFixture::new("bond0").build();

    controller(store.clone()).reset(&key).await.unwrap();

    assert!(store.policy(&key).unwrap().status.conditions.is_empty());
    assert_eq!(store.stats().status_writes, 1);
}

#[tokio::test]
async fn test_missing_policy_is_not_retried() {
    let (store, _) = ClusterFixture::new("bond0").build();
    let missing = ObjectKey::cluster_scoped("nope");

    let err = controller(store.clone()).update(&missing).await.unwrap_err();

    assert_eq!(err.kind(), StoreErrorKind::NotFound);
    assert!(err.is_retrieval());
    assert!(err.to_string().starts_with("getting policy failed"));
    assert_eq!(store.stats().status_writes, 0);
}
