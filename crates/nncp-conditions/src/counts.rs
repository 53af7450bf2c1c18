//! Enactment counting and node readiness
//!
//! Both are collaborator seams: the status pipeline consumes their results
//! and never inspects enactments or nodes itself.

use nncp_api::{ConditionStatus, Enactment, EnactmentConditionType, Node};
use std::fmt::{self, Display, Formatter};

/// Outcome counts over the enactments of one policy
///
/// `available + failed + not_matching` is expected to stay at or below
/// `matching`, but counts and node readiness come from independent
/// snapshots, so nothing here enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnactmentCounts {
    /// Enactments whose node matches the policy
    pub matching: usize,
    /// Enactments that applied the configuration
    pub available: usize,
    /// Enactments that failed to apply it
    pub failed: usize,
    /// Enactments whose node does not match the policy
    pub not_matching: usize,
}

impl EnactmentCounts {
    /// Create counts
    #[inline]
    #[must_use]
    pub fn new(matching: usize, available: usize, failed: usize, not_matching: usize) -> Self {
        Self {
            matching,
            available,
            failed,
            not_matching,
        }
    }

    /// Enactments that reached a final outcome
    #[inline]
    #[must_use]
    pub fn finished(&self) -> usize {
        self.available + self.failed + self.not_matching
    }
}

impl Display for EnactmentCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{failed: {}, available: {}, matching: {}, notMatching: {}}}",
            self.failed, self.available, self.matching, self.not_matching
        )
    }
}

/// Counts enactment outcomes for one policy
pub trait EnactmentCounter: Send + Sync {
    /// Count outcomes over `enactments`
    fn count(&self, enactments: &[Enactment]) -> EnactmentCounts;
}

/// Counts `True` enactment conditions
///
/// `Matching=False` counts as not matching; missing conditions count nowhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionCounter;

impl EnactmentCounter for ConditionCounter {
    fn count(&self, enactments: &[Enactment]) -> EnactmentCounts {
        let mut counts = EnactmentCounts::default();

        for enactment in enactments {
            let conditions = &enactment.status.conditions;

            match conditions.status_of(EnactmentConditionType::Matching) {
                Some(ConditionStatus::True) => counts.matching += 1,
                Some(ConditionStatus::False) => counts.not_matching += 1,
                _ => {}
            }
            if conditions.status_of(EnactmentConditionType::Available) == Some(ConditionStatus::True)
            {
                counts.available += 1;
            }
            if conditions.status_of(EnactmentConditionType::Failing) == Some(ConditionStatus::True) {
                counts.failed += 1;
            }
        }

        counts
    }
}

/// Counts nodes currently ready
pub trait ReadinessProbe: Send + Sync {
    /// Number of ready nodes in `nodes`
    fn ready_nodes(&self, nodes: &[Node]) -> usize;
}

/// Ready means a `(Ready, True)` node condition
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeReadyProbe;

impl ReadinessProbe for NodeReadyProbe {
    fn ready_nodes(&self, nodes: &[Node]) -> usize {
        nodes.iter().filter(|n| n.is_ready()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nncp_test_utils::{enactment, EnactmentOutcome};

    #[test]
    fn counts_each_outcome_class() {
        let enactments = vec![
            enactment("n1", "p", EnactmentOutcome::Available),
            enactment("n2", "p", EnactmentOutcome::Available),
            enactment("n3", "p", EnactmentOutcome::Failed),
            enactment("n4", "p", EnactmentOutcome::Progressing),
            enactment("n5", "p", EnactmentOutcome::NotMatching),
            enactment("n6", "p", EnactmentOutcome::Pending),
        ];

        let counts = ConditionCounter.count(&enactments);
        assert_eq!(counts, EnactmentCounts::new(4, 2, 1, 1));
        assert_eq!(counts.finished(), 4);
    }

    #[test]
    fn empty_set_counts_zero() {
        assert_eq!(ConditionCounter.count(&[]), EnactmentCounts::default());
    }

    #[test]
    fn display_format() {
        let counts = EnactmentCounts::new(3, 2, 1, 0);
        assert_eq!(
            counts.to_string(),
            "{failed: 1, available: 2, matching: 3, notMatching: 0}"
        );
    }

    #[test]
    fn probe_counts_ready_true_only() {
        let nodes = vec![
            Node::with_ready("a", ConditionStatus::True),
            Node::with_ready("b", ConditionStatus::False),
            Node::with_ready("c", ConditionStatus::Unknown),
            Node::new("d"),
            Node::with_ready("e", ConditionStatus::True),
        ];
        assert_eq!(NodeReadyProbe.ready_nodes(&nodes), 2);
    }
}
