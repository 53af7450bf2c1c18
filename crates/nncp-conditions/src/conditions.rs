//! Policy condition updates
//!
//! [`PolicyConditions`] owns the two entry points invoked by the
//! reconciliation driver:
//! - [`update`](PolicyConditions::update): recompute and persist the aggregate conditions
//! - [`reset`](PolicyConditions::reset): clear them
//!
//! Both run a full get-compute-write cycle under the
//! [`ConflictRetryExecutor`], so a conflicting write is retried from fresh
//! reads.

use crate::aggregate::PolicyConditionState;
use crate::config::ConditionsConfig;
use crate::counts::{ConditionCounter, EnactmentCounter, NodeReadyProbe, ReadinessProbe};
use crate::error::ConditionsError;
use crate::retry::ConflictRetryExecutor;
use chrono::Utc;
use nncp_api::{ConditionList, LabelSelector, ObjectKey, Policy, ENACTMENT_POLICY_LABEL};
use nncp_store::ObjectStore;
use std::sync::Arc;
use tracing::Span;

/// Computes and persists aggregate policy conditions
pub struct PolicyConditions<S> {
    store: S,
    executor: ConflictRetryExecutor,
    counter: Arc<dyn EnactmentCounter>,
    probe: Arc<dyn ReadinessProbe>,
}

impl<S: ObjectStore> PolicyConditions<S> {
    /// Create with default retry policy and collaborators
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            executor: ConflictRetryExecutor::default(),
            counter: Arc::new(ConditionCounter),
            probe: Arc::new(NodeReadyProbe),
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn with_config(store: S, config: &ConditionsConfig) -> Self {
        Self::new(store).with_executor(ConflictRetryExecutor::new(config.retry.clone()))
    }

    /// With retry executor
    #[inline]
    #[must_use]
    pub fn with_executor(mut self, executor: ConflictRetryExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// With enactment counter
    #[inline]
    #[must_use]
    pub fn with_counter(mut self, counter: impl EnactmentCounter + 'static) -> Self {
        self.counter = Arc::new(counter);
        self
    }

    /// With readiness probe
    #[inline]
    #[must_use]
    pub fn with_probe(mut self, probe: impl ReadinessProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Retry executor in use
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &ConflictRetryExecutor {
        &self.executor
    }

    /// Recompute the policy's conditions from its enactments and the ready nodes
    ///
    /// # Errors
    /// Returns the last error: a read failure, a non-conflict write failure,
    /// or the final conflict once retries are exhausted
    pub async fn update(&self, key: &ObjectKey) -> Result<(), ConditionsError> {
        let span = invocation_span(key);
        self.executor
            .execute(&span, move || self.update_once(key))
            .await
    }

    /// Clear the policy's conditions
    ///
    /// # Errors
    /// Same as [`update`](Self::update)
    pub async fn reset(&self, key: &ObjectKey) -> Result<(), ConditionsError> {
        let span = invocation_span(key);
        self.executor
            .execute(&span, move || self.reset_once(key))
            .await
    }

    async fn update_once(&self, key: &ObjectKey) -> Result<(), ConditionsError> {
        let mut policy = self
            .store
            .get_policy(key)
            .await
            .map_err(ConditionsError::GetPolicy)?;

        let selector = LabelSelector::everything().with(ENACTMENT_POLICY_LABEL, policy.name());
        let enactments = self
            .store
            .list_enactments(&selector)
            .await
            .map_err(ConditionsError::GetEnactments)?;

        let nodes = self
            .store
            .list_nodes()
            .await
            .map_err(ConditionsError::GetNodes)?;

        let ready_nodes = self.probe.ready_nodes(&nodes);
        let counts = self.counter.count(&enactments);
        tracing::info!(%counts, ready_nodes, "enactments count");

        let state = PolicyConditionState::evaluate(ready_nodes, &counts);
        tracing::info!(%state, reason = %state.reason(), "setting policy conditions");
        state.apply(&mut policy.status.conditions, Utc::now());

        self.write_status(&policy, "updating").await
    }

    async fn reset_once(&self, key: &ObjectKey) -> Result<(), ConditionsError> {
        let mut policy = self
            .store
            .get_policy(key)
            .await
            .map_err(ConditionsError::GetPolicy)?;

        policy.status.conditions = ConditionList::new();

        self.write_status(&policy, "resetting").await
    }

    async fn write_status(&self, policy: &Policy, action: &str) -> Result<(), ConditionsError> {
        match self.store.update_policy_status(policy).await {
            Ok(stored) => {
                tracing::debug!(
                    resource_version = stored.metadata.resource_version,
                    "policy conditions written"
                );
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                tracing::info!("conflict {action} policy conditions, retrying");
                Err(ConditionsError::UpdateStatus(err))
            }
            Err(err) => {
                tracing::error!(error = %err, "failed {action} policy conditions");
                Err(ConditionsError::UpdateStatus(err))
            }
        }
    }
}

impl<S> std::fmt::Debug for PolicyConditions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyConditions")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

fn invocation_span(key: &ObjectKey) -> Span {
    tracing::info_span!("policyconditions", policy = %key.name)
}
