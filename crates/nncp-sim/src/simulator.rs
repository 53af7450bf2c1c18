//! Rollout simulator
//!
//! Drives [`PolicyConditions`] against an in-memory cluster while node agents
//! move their enactments through a rollout:
//! 1. Each agent reports `Progressing`, then `Available` or `Failing`
//!    (or `Matching=False` straight away for nodes the policy skips)
//! 2. Controller replicas call `update` concurrently until every agent is done
//! 3. Every replica runs one last `update`, and the stored conditions are
//!    compared with the state the final enactment outcomes imply
//!
//! Agent timings and store latencies come from a seeded RNG. Every store call
//! made by a replica sleeps for a random latency first, so replicas interleave
//! between their reads and their status write and collide on stale versions.

use nncp_api::{
    ConditionList, ConditionStatus, Enactment, EnactmentConditionType, LabelSelector, Node,
    ObjectKey, Policy, PolicyConditionType,
};
use nncp_conditions::{
    ConditionsConfig, ConditionsError, EnactmentCounts, PolicyConditionState, PolicyConditions,
};
use nncp_store::{InMemoryStore, ObjectStore, StoreError};
use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Policy name used by every simulated cluster
pub const SIM_POLICY: &str = "sim-policy";

/// Simulator errors
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Node counts do not add up
    #[error("invalid rollout shape: {0}")]
    InvalidShape(String),

    /// Seeding the cluster failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A controller call failed where it must not
    #[error(transparent)]
    Conditions(#[from] ConditionsError),

    /// Agent or replica task panicked
    #[error("simulation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Final enactment outcome of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentOutcome {
    /// Configuration applied
    Available,
    /// Configuration failed
    Failing,
    /// Policy selector skips the node
    NotMatching,
}

/// Rollout configuration
#[derive(Debug, Clone)]
pub struct RolloutConfig {
    /// Ready nodes
    pub nodes: usize,
    /// Nodes whose enactment fails
    pub failing: usize,
    /// Nodes the policy does not match
    pub not_matching: usize,
    /// Concurrent controller replicas
    pub replicas: usize,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Upper bound of each agent step delay
    pub max_agent_delay_ms: u64,
    /// Pause between updates of one replica
    pub update_interval_ms: u64,
    /// Upper bound of the latency added to each store call of a replica
    pub max_store_latency_ms: u64,
    /// Controller configuration
    pub conditions: ConditionsConfig,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            nodes: 5,
            failing: 0,
            not_matching: 0,
            replicas: 2,
            seed: 42,
            max_agent_delay_ms: 20,
            update_interval_ms: 5,
            max_store_latency_ms: 3,
            conditions: ConditionsConfig::default(),
        }
    }
}

impl RolloutConfig {
    /// Check node counts and replicas
    ///
    /// # Errors
    /// Returns `InvalidShape` if failing and non-matching nodes exceed the
    /// node count or no replica is requested
    pub fn validate(&self) -> Result<(), SimError> {
        if self.replicas == 0 {
            return Err(SimError::InvalidShape(
                "at least one replica is required".to_string(),
            ));
        }
        if self.failing + self.not_matching > self.nodes {
            return Err(SimError::InvalidShape(format!(
                "{} failing + {} not matching exceeds {} nodes",
                self.failing, self.not_matching, self.nodes
            )));
        }
        Ok(())
    }

    /// Counts the finished rollout must produce
    #[must_use]
    pub fn final_counts(&self) -> EnactmentCounts {
        let matching = self.nodes.saturating_sub(self.not_matching);
        EnactmentCounts::new(
            matching,
            matching.saturating_sub(self.failing),
            self.failing,
            self.not_matching,
        )
    }

    /// State the finished rollout must produce
    #[must_use]
    pub fn expected_state(&self) -> PolicyConditionState {
        PolicyConditionState::evaluate(self.nodes, &self.final_counts())
    }
}

/// Result of a rollout run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutReport {
    /// Seed used
    pub seed: u64,
    /// Ready nodes
    pub nodes: usize,
    /// Controller replicas
    pub replicas: usize,
    /// Planned outcome per node, by node index
    pub outcomes: Vec<AgentOutcome>,
    /// Expected aggregate state
    pub expected: String,
    /// Conditions stored when the run ended
    pub conditions: ConditionList<PolicyConditionType>,
    /// `update` calls across replicas
    pub update_calls: u64,
    /// `update` calls that returned an error
    pub update_failures: u64,
    /// Accepted status writes
    pub status_writes: u64,
    /// Status writes rejected as stale
    pub status_conflicts: u64,
    /// Stored conditions match the expected state
    pub passed: bool,
}

impl RolloutReport {
    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Rollout Report\n");
        out.push_str("==============\n");
        out.push_str(&format!("Seed: {}\n", self.seed));
        out.push_str(&format!("Nodes: {}\n", self.nodes));
        out.push_str(&format!("Replicas: {}\n", self.replicas));
        out.push_str(&format!("Expected: {}\n", self.expected));
        out.push_str(&format!(
            "Updates: {} ({} failed)\n",
            self.update_calls, self.update_failures
        ));
        out.push_str(&format!(
            "Status writes: {} accepted, {} conflicts\n",
            self.status_writes, self.status_conflicts
        ));
        out.push_str("Conditions:\n");
        for c in &self.conditions {
            out.push_str(&format!(
                "  {} = {} ({}) {:?}\n",
                c.condition_type, c.status, c.reason, c.message
            ));
        }
        out.push_str(&format!(
            "Status: {}\n",
            if self.passed { "PASSED" } else { "FAILED" }
        ));
        out
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ReplicaStats {
    calls: u64,
    failures: u64,
}

/// Run one rollout
///
/// # Errors
/// Returns error on an invalid shape, a seeding failure, or a panicked task.
/// Failed `update` calls are counted in the report, not returned.
pub async fn run_rollout(config: RolloutConfig) -> Result<RolloutReport, SimError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let outcomes = plan_outcomes(&config, &mut rng);

    let store = Arc::new(InMemoryStore::new());
    let key = store.create_policy(Policy::new(SIM_POLICY))?.key();
    for i in 0..config.nodes {
        store.apply_node(Node::with_ready(node_name(i), ConditionStatus::True));
    }

    let replica_store = Arc::new(LatencyStore::new(
        store.clone(),
        config.max_store_latency_ms,
        rng.random(),
    ));
    let (done_tx, done_rx) = watch::channel(false);

    let mut replicas = JoinSet::new();
    for id in 0..config.replicas {
        let controller = PolicyConditions::with_config(replica_store.clone(), &config.conditions);
        let key = key.clone();
        let done = done_rx.clone();
        let interval = Duration::from_millis(config.update_interval_ms);
        replicas.spawn(
            run_replica(controller, key, done, interval)
                .instrument(tracing::info_span!("replica", id)),
        );
    }

    let mut agents = JoinSet::new();
    for (i, outcome) in outcomes.iter().copied().enumerate() {
        let delays = (
            rng.random_range(0..=config.max_agent_delay_ms),
            rng.random_range(0..=config.max_agent_delay_ms),
        );
        let node = node_name(i);
        agents.spawn(
            run_agent(store.clone(), node.clone(), outcome, delays)
                .instrument(tracing::info_span!("agent", node = %node)),
        );
    }

    while let Some(joined) = agents.join_next().await {
        joined?;
    }
    tracing::info!(nodes = config.nodes, "all agents finished");
    done_tx.send_replace(true);

    let mut totals = ReplicaStats::default();
    while let Some(joined) = replicas.join_next().await {
        let stats = joined?;
        totals.calls += stats.calls;
        totals.failures += stats.failures;
    }

    let conditions = store
        .policy(&key)
        .map(|p| p.status.conditions)
        .unwrap_or_default();
    let expected = config.expected_state();
    let passed = conditions_match(&conditions, &expected);
    let stats = store.stats();

    if passed {
        tracing::info!(%expected, "rollout converged");
    } else {
        tracing::error!(%expected, "rollout did not converge on the expected state");
    }

    Ok(RolloutReport {
        seed: config.seed,
        nodes: config.nodes,
        replicas: config.replicas,
        outcomes,
        expected: expected.to_string(),
        conditions,
        update_calls: totals.calls,
        update_failures: totals.failures,
        status_writes: stats.status_writes,
        status_conflicts: stats.status_conflicts,
        passed,
    })
}

/// Result of a reset run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    /// Conditions present before the reset
    pub conditions_before: usize,
    /// Conditions present after the reset
    pub conditions_after: usize,
    /// Reset left no conditions
    pub passed: bool,
}

/// Seed a degraded policy, then reset it
///
/// # Errors
/// Returns error if seeding, `update` or `reset` fails
pub async fn run_reset(config: &ConditionsConfig) -> Result<ResetReport, SimError> {
    let store = Arc::new(InMemoryStore::new());
    let key = store.create_policy(Policy::new(SIM_POLICY))?.key();
    for (i, outcome) in [AgentOutcome::Available, AgentOutcome::Failing]
        .into_iter()
        .enumerate()
    {
        let node = node_name(i);
        store.apply_node(Node::with_ready(node.as_str(), ConditionStatus::True));
        let mut enactment = Enactment::new(&node, SIM_POLICY);
        finish(&mut enactment, outcome);
        store.apply_enactment(enactment);
    }

    let controller = PolicyConditions::with_config(store.clone(), config);
    controller.update(&key).await?;
    let conditions_before = condition_count(&store, &key);

    controller.reset(&key).await?;
    let conditions_after = condition_count(&store, &key);

    Ok(ResetReport {
        conditions_before,
        conditions_after,
        passed: conditions_before > 0 && conditions_after == 0,
    })
}

/// Store as seen over the network by controller replicas
///
/// Sleeps for a seeded random latency before delegating each call.
#[derive(Debug)]
struct LatencyStore {
    inner: Arc<InMemoryStore>,
    max_latency_ms: u64,
    rng: Mutex<StdRng>,
}

impl LatencyStore {
    fn new(inner: Arc<InMemoryStore>, max_latency_ms: u64, seed: u64) -> Self {
        Self {
            inner,
            max_latency_ms,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    async fn latency(&self) {
        let ms = self.rng.lock().random_range(0..=self.max_latency_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait::async_trait]
impl ObjectStore for LatencyStore {
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy, StoreError> {
        self.latency().await;
        self.inner.get_policy(key).await
    }

    async fn list_enactments(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<Enactment>, StoreError> {
        self.latency().await;
        self.inner.list_enactments(selector).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.latency().await;
        self.inner.list_nodes().await
    }

    async fn update_policy_status(&self, policy: &Policy) -> Result<Policy, StoreError> {
        self.latency().await;
        self.inner.update_policy_status(policy).await
    }
}

fn condition_count(store: &InMemoryStore, key: &ObjectKey) -> usize {
    store.policy(key).map_or(0, |p| p.status.conditions.len())
}

fn node_name(index: usize) -> String {
    format!("node-{index:03}")
}

fn plan_outcomes(config: &RolloutConfig, rng: &mut StdRng) -> Vec<AgentOutcome> {
    let mut outcomes = Vec::with_capacity(config.nodes);
    outcomes.extend(std::iter::repeat(AgentOutcome::Failing).take(config.failing));
    outcomes.extend(std::iter::repeat(AgentOutcome::NotMatching).take(config.not_matching));
    outcomes.resize(config.nodes, AgentOutcome::Available);
    outcomes.shuffle(rng);
    outcomes
}

fn conditions_match(
    conditions: &ConditionList<PolicyConditionType>,
    expected: &PolicyConditionState,
) -> bool {
    let reason = expected.reason();
    [
        (PolicyConditionType::Degraded, expected.degraded()),
        (PolicyConditionType::Available, expected.available()),
    ]
    .into_iter()
    .all(|(condition_type, want)| {
        conditions.find(condition_type).is_some_and(|c| {
            c.status == want.status && c.reason == reason.as_str() && c.message == want.message
        })
    })
}

async fn run_agent(
    store: Arc<InMemoryStore>,
    node: String,
    outcome: AgentOutcome,
    (first_delay, second_delay): (u64, u64),
) {
    let mut enactment = Enactment::new(&node, SIM_POLICY);
    store.apply_enactment(enactment.clone());

    tokio::time::sleep(Duration::from_millis(first_delay)).await;
    if outcome != AgentOutcome::NotMatching {
        progress(&mut enactment);
        store.apply_enactment(enactment.clone());
        tracing::debug!("enactment progressing");
        tokio::time::sleep(Duration::from_millis(second_delay)).await;
    }

    finish(&mut enactment, outcome);
    store.apply_enactment(enactment);
    tracing::debug!(?outcome, "enactment finished");
}

fn progress(enactment: &mut Enactment) {
    let conditions = &mut enactment.status.conditions;
    conditions.set(
        EnactmentConditionType::Matching,
        ConditionStatus::True,
        "NodeSelectorConfigured",
        "",
    );
    conditions.set(
        EnactmentConditionType::Progressing,
        ConditionStatus::True,
        "ConfigurationProgressing",
        "applying desired state",
    );
    conditions.set(
        EnactmentConditionType::Available,
        ConditionStatus::Unknown,
        "ConfigurationProgressing",
        "",
    );
    conditions.set(
        EnactmentConditionType::Failing,
        ConditionStatus::Unknown,
        "ConfigurationProgressing",
        "",
    );
}

fn finish(enactment: &mut Enactment, outcome: AgentOutcome) {
    let conditions = &mut enactment.status.conditions;
    match outcome {
        AgentOutcome::NotMatching => {
            conditions.set(
                EnactmentConditionType::Matching,
                ConditionStatus::False,
                "NodeSelectorNotMatching",
                "policy node selector does not match node labels",
            );
        }
        AgentOutcome::Available | AgentOutcome::Failing => {
            let failed = outcome == AgentOutcome::Failing;
            let reason = if failed {
                "FailedToConfigure"
            } else {
                "SuccessfullyConfigured"
            };
            conditions.set(
                EnactmentConditionType::Matching,
                ConditionStatus::True,
                "NodeSelectorConfigured",
                "",
            );
            conditions.set(
                EnactmentConditionType::Progressing,
                ConditionStatus::False,
                reason,
                "",
            );
            conditions.set(
                EnactmentConditionType::Available,
                ConditionStatus::from(!failed),
                reason,
                "",
            );
            conditions.set(
                EnactmentConditionType::Failing,
                ConditionStatus::from(failed),
                reason,
                if failed { "simulated apply failure" } else { "" },
            );
        }
    }
}

async fn run_replica(
    controller: PolicyConditions<Arc<LatencyStore>>,
    key: ObjectKey,
    mut done: watch::Receiver<bool>,
    interval: Duration,
) -> ReplicaStats {
    let mut stats = ReplicaStats::default();

    loop {
        let finished = *done.borrow();

        stats.calls += 1;
        if let Err(err) = controller.update(&key).await {
            stats.failures += 1;
            tracing::warn!(error = %err, "update failed");
        }

        if finished {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = done.changed() => {}
        }
    }

    stats
}
