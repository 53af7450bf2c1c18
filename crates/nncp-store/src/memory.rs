//! In-memory object store
//!
//! Reference implementation of [`ObjectStore`] with a single store-wide
//! revision counter. Every accepted write stamps the object with the next
//! revision; status writes must carry the revision they read.

use crate::error::{ObjectKind, StoreError};
use crate::store::ObjectStore;
use nncp_api::{Enactment, LabelSelector, Node, ObjectKey, Policy};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for status writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Accepted policy status writes
    pub status_writes: u64,
    /// Policy status writes rejected as stale
    pub status_conflicts: u64,
}

#[derive(Debug, Default)]
struct Objects {
    policies: BTreeMap<ObjectKey, Policy>,
    enactments: BTreeMap<ObjectKey, Enactment>,
    nodes: BTreeMap<ObjectKey, Node>,
    revision: u64,
}

impl Objects {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<Objects>,
    status_writes: AtomicU64,
    status_conflicts: AtomicU64,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy
    ///
    /// # Errors
    /// Returns `AlreadyExists` if a policy with the same key is stored
    pub fn create_policy(&self, mut policy: Policy) -> Result<Policy, StoreError> {
        let mut objects = self.objects.write();
        let key = policy.key();
        if objects.policies.contains_key(&key) {
            return Err(StoreError::already_exists(ObjectKind::Policy, key));
        }
        policy.metadata.resource_version = objects.next_revision();
        objects.policies.insert(key, policy.clone());
        Ok(policy)
    }

    /// Create or replace an enactment unconditionally
    pub fn apply_enactment(&self, mut enactment: Enactment) -> Enactment {
        let mut objects = self.objects.write();
        enactment.metadata.resource_version = objects.next_revision();
        objects
            .enactments
            .insert(enactment.metadata.key(), enactment.clone());
        enactment
    }

    /// Create or replace a node unconditionally
    pub fn apply_node(&self, mut node: Node) -> Node {
        let mut objects = self.objects.write();
        node.metadata.resource_version = objects.next_revision();
        objects.nodes.insert(node.metadata.key(), node.clone());
        node
    }

    /// Snapshot of a stored policy
    #[must_use]
    pub fn policy(&self, key: &ObjectKey) -> Option<Policy> {
        self.objects.read().policies.get(key).cloned()
    }

    /// Snapshot of a stored enactment
    #[must_use]
    pub fn enactment(&self, key: &ObjectKey) -> Option<Enactment> {
        self.objects.read().enactments.get(key).cloned()
    }

    /// Write counters
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            status_writes: self.status_writes.load(Ordering::Relaxed),
            status_conflicts: self.status_conflicts.load(Ordering::Relaxed),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy, StoreError> {
        self.policy(key)
            .ok_or_else(|| StoreError::not_found(ObjectKind::Policy, key))
    }

    async fn list_enactments(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<Enactment>, StoreError> {
        let objects = self.objects.read();
        Ok(objects
            .enactments
            .values()
            .filter(|e| selector.matches(&e.metadata.labels))
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.objects.read().nodes.values().cloned().collect())
    }

    async fn update_policy_status(&self, policy: &Policy) -> Result<Policy, StoreError> {
        let mut objects = self.objects.write();
        let key = policy.key();

        let stored_version = objects
            .policies
            .get(&key)
            .map(|p| p.metadata.resource_version)
            .ok_or_else(|| StoreError::not_found(ObjectKind::Policy, &key))?;

        if stored_version != policy.metadata.resource_version {
            self.status_conflicts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                policy = %key,
                expected = policy.metadata.resource_version,
                stored = stored_version,
                "rejecting stale status write"
            );
            return Err(StoreError::conflict(
                ObjectKind::Policy,
                &key,
                policy.metadata.resource_version,
                stored_version,
            ));
        }

        let revision = objects.next_revision();
        let stored = objects
            .policies
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(ObjectKind::Policy, &key))?;
        stored.status = policy.status.clone();
        stored.metadata.resource_version = revision;
        self.status_writes.fetch_add(1, Ordering::Relaxed);

        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nncp_api::{ConditionStatus, PolicyConditionType, ENACTMENT_POLICY_LABEL};

    #[tokio::test]
    async fn create_and_get_policy() {
        let store = InMemoryStore::new();
        let created = store.create_policy(Policy::new("bond0")).unwrap();
        assert!(created.metadata.resource_version > 0);

        let fetched = store.get_policy(&created.key()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_policy_rejected() {
        let store = InMemoryStore::new();
        store.create_policy(Policy::new("bond0")).unwrap();
        let err = store.create_policy(Policy::new("bond0")).unwrap_err();
        assert_eq!(err.kind(), crate::StoreErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn missing_policy_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .get_policy(&ObjectKey::cluster_scoped("nope"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_enactments_filters_by_label() {
        let store = InMemoryStore::new();
        store.apply_enactment(Enactment::new("n1", "p1"));
        store.apply_enactment(Enactment::new("n2", "p1"));
        store.apply_enactment(Enactment::new("n1", "p2"));

        let selector = LabelSelector::everything().with(ENACTMENT_POLICY_LABEL, "p1");
        let listed = store.list_enactments(&selector).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.policy_name() == Some("p1")));
    }

    #[tokio::test]
    async fn status_write_bumps_version() {
        let store = InMemoryStore::new();
        let mut policy = store.create_policy(Policy::new("bond0")).unwrap();
        let before = policy.metadata.resource_version;

        policy.status.conditions.set(
            PolicyConditionType::Available,
            ConditionStatus::True,
            "r",
            "",
        );
        let written = store.update_policy_status(&policy).await.unwrap();

        assert!(written.metadata.resource_version > before);
        assert_eq!(written.status, policy.status);
        assert_eq!(store.stats().status_writes, 1);
    }

    #[tokio::test]
    async fn stale_status_write_conflicts() {
        let store = InMemoryStore::new();
        let policy = store.create_policy(Policy::new("bond0")).unwrap();

        let mut first = policy.clone();
        first.status.conditions.set(
            PolicyConditionType::Degraded,
            ConditionStatus::False,
            "r",
            "",
        );
        store.update_policy_status(&first).await.unwrap();

        // second writer still holds the original version
        let err = store.update_policy_status(&policy).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.policy(&policy.key()).unwrap();
        assert_eq!(stored.status, first.status);
        assert_eq!(
            store.stats(),
            StoreStats {
                status_writes: 1,
                status_conflicts: 1,
            }
        );
    }
}
