//! Testing utilities for the NNCP status workspace
//!
//! Shared fixtures and store wrappers.

#![allow(missing_docs)]

use nncp_api::{ConditionStatus, Enactment, EnactmentConditionType, Node, ObjectKey, Policy};
use nncp_api::{LabelSelector, ObjectMeta};
use nncp_store::{InMemoryStore, ObjectKind, ObjectStore, StoreError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Outcome a node agent has reported on its enactment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnactmentOutcome {
    /// No conditions reported yet
    Pending,
    Progressing,
    Available,
    Failed,
    NotMatching,
}

/// Build an enactment of `policy` on `node` carrying `outcome`
pub fn enactment(node: &str, policy: &str, outcome: EnactmentOutcome) -> Enactment {
    let mut enactment = Enactment::new(node, policy);
    set_outcome(&mut enactment, outcome);
    enactment
}

/// Overwrite the conditions of `enactment` to reflect `outcome`
pub fn set_outcome(enactment: &mut Enactment, outcome: EnactmentOutcome) {
    use ConditionStatus::{False, True};
    use EnactmentConditionType::{Available, Failing, Matching, Progressing};

    let conditions = &mut enactment.status.conditions;
    conditions.clear();
    match outcome {
        EnactmentOutcome::Pending => {}
        EnactmentOutcome::Progressing => {
            conditions.set(Matching, True, "NodeSelectorConfigured", "");
            conditions.set(Progressing, True, "ConfigurationProgressing", "");
            conditions.set(Available, False, "ConfigurationProgressing", "");
            conditions.set(Failing, False, "ConfigurationProgressing", "");
        }
        EnactmentOutcome::Available => {
            conditions.set(Matching, True, "NodeSelectorConfigured", "");
            conditions.set(Progressing, False, "SuccessfullyConfigured", "");
            conditions.set(Available, True, "SuccessfullyConfigured", "");
            conditions.set(Failing, False, "SuccessfullyConfigured", "");
        }
        EnactmentOutcome::Failed => {
            conditions.set(Matching, True, "NodeSelectorConfigured", "");
            conditions.set(Progressing, False, "FailedToConfigure", "");
            conditions.set(Available, False, "FailedToConfigure", "");
            conditions.set(Failing, True, "FailedToConfigure", "apply failed");
        }
        EnactmentOutcome::NotMatching => {
            conditions.set(Matching, False, "NodeSelectorNotMatching", "");
        }
    }
}

/// Builder for an in-memory cluster holding one policy
#[derive(Debug, Clone)]
pub struct ClusterFixture {
    policy: String,
    nodes: Vec<(String, ConditionStatus, Option<EnactmentOutcome>)>,
    foreign: Vec<Enactment>,
}

impl ClusterFixture {
    pub fn new(policy: &str) -> Self {
        Self {
            policy: policy.to_string(),
            nodes: Vec::new(),
            foreign: Vec::new(),
        }
    }

    /// Ready node with an enactment
    pub fn node(mut self, name: &str, outcome: EnactmentOutcome) -> Self {
        self.nodes
            .push((name.to_string(), ConditionStatus::True, Some(outcome)));
        self
    }

    /// Ready node without an enactment
    pub fn bare_node(mut self, name: &str) -> Self {
        self.nodes.push((name.to_string(), ConditionStatus::True, None));
        self
    }

    /// Node whose `Ready` condition is not `True`
    pub fn unready_node(
        mut self,
        name: &str,
        ready: ConditionStatus,
        outcome: Option<EnactmentOutcome>,
    ) -> Self {
        self.nodes.push((name.to_string(), ready, outcome));
        self
    }

    /// Enactment belonging to another policy
    pub fn foreign_enactment(mut self, node: &str, policy: &str, outcome: EnactmentOutcome) -> Self {
        self.foreign.push(enactment(node, policy, outcome));
        self
    }

    pub fn build(self) -> (Arc<InMemoryStore>, ObjectKey) {
        let store = Arc::new(InMemoryStore::new());
        let policy = store
            .create_policy(Policy::new(self.policy.as_str()))
            .expect("fresh store");

        for (name, ready, outcome) in &self.nodes {
            store.apply_node(Node::with_ready(name.as_str(), *ready));
            if let Some(outcome) = outcome {
                store.apply_enactment(enactment(name, &self.policy, *outcome));
            }
        }
        for enactment in self.foreign {
            store.apply_enactment(enactment);
        }

        (store, policy.key())
    }
}

/// Move the enactment of `policy` on `node` to `outcome`
pub fn report(store: &InMemoryStore, node: &str, policy: &str, outcome: EnactmentOutcome) {
    let key = ObjectMeta::named(format!("{node}.{policy}")).key();
    let mut enactment = store
        .enactment(&key)
        .unwrap_or_else(|| Enactment::new(node, policy));
    set_outcome(&mut enactment, outcome);
    store.apply_enactment(enactment);
}

type ConflictHook = Box<dyn FnOnce(&InMemoryStore) + Send>;

/// Store wrapper that rejects the first status writes as conflicts
///
/// A hook registered with [`on_conflict`](Self::on_conflict) runs against the
/// inner store when the first conflict is injected, standing in for a
/// concurrent writer.
pub struct ConflictInjectingStore {
    inner: Arc<InMemoryStore>,
    conflicts_left: AtomicU32,
    hook: Mutex<Option<ConflictHook>>,
    attempted: Mutex<Vec<Policy>>,
    write_error: Mutex<Option<StoreError>>,
}

impl ConflictInjectingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            conflicts_left: AtomicU32::new(0),
            hook: Mutex::new(None),
            attempted: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
        }
    }

    /// Reject the next `n` status writes with conflicts
    pub fn with_conflicts(self, n: u32) -> Self {
        self.conflicts_left.store(n, Ordering::SeqCst);
        self
    }

    /// Run `hook` on the inner store when the first conflict is injected
    pub fn on_conflict(self, hook: impl FnOnce(&InMemoryStore) + Send + 'static) -> Self {
        *self.hook.lock() = Some(Box::new(hook));
        self
    }

    /// Fail every status write once conflicts run out
    pub fn with_write_error(self, error: StoreError) -> Self {
        *self.write_error.lock() = Some(error);
        self
    }

    /// Every policy passed to `update_policy_status`, in call order
    pub fn attempted_writes(&self) -> Vec<Policy> {
        self.attempted.lock().clone()
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }
}

#[async_trait::async_trait]
impl ObjectStore for ConflictInjectingStore {
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy, StoreError> {
        self.inner.get_policy(key).await
    }

    async fn list_enactments(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<Enactment>, StoreError> {
        self.inner.list_enactments(selector).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.inner.list_nodes().await
    }

    async fn update_policy_status(&self, policy: &Policy) -> Result<Policy, StoreError> {
        self.attempted.lock().push(policy.clone());

        let injected = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            if let Some(hook) = self.hook.lock().take() {
                hook(&self.inner);
            }
            return Err(StoreError::conflict(
                ObjectKind::Policy,
                policy.key(),
                policy.metadata.resource_version,
                policy.metadata.resource_version + 1,
            ));
        }

        if let Some(err) = self.write_error.lock().clone() {
            return Err(err);
        }
        self.inner.update_policy_status(policy).await
    }
}
