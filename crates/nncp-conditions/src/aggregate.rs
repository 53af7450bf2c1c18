//! Aggregate decision over ready nodes and enactment outcomes
//!
//! [`PolicyConditionState::evaluate`] maps `(ready nodes, counts)` to exactly
//! one of four states. Branches are checked in declaration order and the
//! first match wins:
//!
//! 1. [`Progressing`](PolicyConditionState::Progressing): fewer enactments finished than nodes are ready
//! 2. [`NotMatching`](PolicyConditionState::NotMatching): no enactment matches
//! 3. [`FailedToConfigure`](PolicyConditionState::FailedToConfigure): at least one failed
//! 4. [`Success`](PolicyConditionState::Success): otherwise

use crate::counts::EnactmentCounts;
use chrono::{DateTime, Utc};
use nncp_api::{ConditionList, ConditionStatus, PolicyConditionReason, PolicyConditionType};
use std::fmt::{self, Display, Formatter};

/// Status and message for one policy condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionUpdate {
    /// New status
    pub status: ConditionStatus,
    /// New message, possibly empty
    pub message: String,
}

impl ConditionUpdate {
    fn new(status: ConditionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Aggregate rollout state of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyConditionState {
    /// Not every ready node has a finished enactment
    Progressing {
        /// Finished enactments
        finished: usize,
        /// Ready nodes
        ready_nodes: usize,
    },
    /// The policy matches no node
    NotMatching,
    /// Some matching nodes failed
    FailedToConfigure {
        /// Failed enactments
        failed: usize,
        /// Matching enactments
        matching: usize,
    },
    /// Every matching node applied the configuration
    Success {
        /// Available enactments
        available: usize,
    },
}

impl PolicyConditionState {
    /// Decide the aggregate state
    #[must_use]
    pub fn evaluate(ready_nodes: usize, counts: &EnactmentCounts) -> Self {
        let finished = counts.finished();

        if finished < ready_nodes {
            Self::Progressing {
                finished,
                ready_nodes,
            }
        } else if counts.matching == 0 {
            Self::NotMatching
        } else if counts.failed > 0 {
            Self::FailedToConfigure {
                failed: counts.failed,
                matching: counts.matching,
            }
        } else {
            Self::Success {
                available: counts.available,
            }
        }
    }

    /// Reason written on both conditions
    #[inline]
    #[must_use]
    pub fn reason(&self) -> PolicyConditionReason {
        match self {
            Self::Progressing { .. } => PolicyConditionReason::ConfigurationProgressing,
            Self::NotMatching => PolicyConditionReason::ConfigurationNoMatchingNode,
            Self::FailedToConfigure { .. } => PolicyConditionReason::FailedToConfigure,
            Self::Success { .. } => PolicyConditionReason::SuccessfullyConfigured,
        }
    }

    /// Value of the `Degraded` condition
    #[must_use]
    pub fn degraded(&self) -> ConditionUpdate {
        match *self {
            Self::Progressing { .. } => ConditionUpdate::new(ConditionStatus::Unknown, ""),
            Self::NotMatching => ConditionUpdate::new(ConditionStatus::False, NO_MATCHING_NODE),
            Self::FailedToConfigure { failed, matching } => ConditionUpdate::new(
                ConditionStatus::True,
                format!("{failed}/{matching} nodes failed to configure"),
            ),
            Self::Success { .. } => ConditionUpdate::new(ConditionStatus::False, ""),
        }
    }

    /// Value of the `Available` condition
    #[must_use]
    pub fn available(&self) -> ConditionUpdate {
        match *self {
            Self::Progressing {
                finished,
                ready_nodes,
            } => ConditionUpdate::new(
                ConditionStatus::Unknown,
                format!("Policy is progressing {finished}/{ready_nodes} nodes finished"),
            ),
            Self::NotMatching => ConditionUpdate::new(ConditionStatus::True, NO_MATCHING_NODE),
            Self::FailedToConfigure { .. } => ConditionUpdate::new(ConditionStatus::False, ""),
            // Denominator repeats `available`, not `matching`.
            Self::Success { available } => ConditionUpdate::new(
                ConditionStatus::True,
                format!("{available}/{available} nodes successfully configured"),
            ),
        }
    }

    /// Upsert `Degraded` then `Available` into `conditions`
    pub fn apply(&self, conditions: &mut ConditionList<PolicyConditionType>, now: DateTime<Utc>) {
        let reason = self.reason();
        let degraded = self.degraded();
        let available = self.available();

        conditions.set_at(
            PolicyConditionType::Degraded,
            degraded.status,
            reason.as_str(),
            degraded.message,
            now,
        );
        conditions.set_at(
            PolicyConditionType::Available,
            available.status,
            reason.as_str(),
            available.message,
            now,
        );
    }
}

impl Display for PolicyConditionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Progressing { .. } => "progressing",
            Self::NotMatching => "not-matching",
            Self::FailedToConfigure { .. } => "failed-to-configure",
            Self::Success { .. } => "success",
        };
        f.write_str(name)
    }
}

const NO_MATCHING_NODE: &str = "Policy does not match any node";
