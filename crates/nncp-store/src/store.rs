//! Object store collaborator boundary

use crate::error::StoreError;
use nncp_api::{Enactment, LabelSelector, Node, ObjectKey, Policy};

/// Read/write capabilities the status controller needs from the cluster store
///
/// Reads are independent snapshots; nothing ties a policy read to the
/// enactment or node reads that follow it. Status writes are
/// version-checked: a write carrying a stale
/// [`resource_version`](nncp_api::ObjectMeta::resource_version) fails with a
/// [`Conflict`](crate::StoreErrorKind::Conflict) error.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a policy by key
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy, StoreError>;

    /// List enactments whose labels match `selector` exactly
    async fn list_enactments(&self, selector: &LabelSelector)
        -> Result<Vec<Enactment>, StoreError>;

    /// List every node
    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Write the policy status, checked against its resource version
    ///
    /// Returns the stored policy with its new resource version.
    async fn update_policy_status(&self, policy: &Policy) -> Result<Policy, StoreError>;
}

#[async_trait::async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy, StoreError> {
        (**self).get_policy(key).await
    }

    async fn list_enactments(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<Enactment>, StoreError> {
        (**self).list_enactments(selector).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        (**self).list_nodes().await
    }

    async fn update_policy_status(&self, policy: &Policy) -> Result<Policy, StoreError> {
        (**self).update_policy_status(policy).await
    }
}
