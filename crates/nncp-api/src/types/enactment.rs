//! Per-node enactment of a policy

use crate::condition::ConditionList;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Label linking an enactment to the policy it enacts
pub const ENACTMENT_POLICY_LABEL: &str = "nmstate.io/policy";

/// Condition types reported by node agents on an enactment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnactmentConditionType {
    /// Applying the configuration failed
    Failing,
    /// Configuration applied successfully
    Available,
    /// Configuration is being applied
    Progressing,
    /// Node matches the policy node selector
    Matching,
}

impl Display for EnactmentConditionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Failing => "Failing",
            Self::Available => "Available",
            Self::Progressing => "Progressing",
            Self::Matching => "Matching",
        };
        f.write_str(s)
    }
}

/// Observed state of an enactment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnactmentStatus {
    /// Conditions written by the node agent
    #[serde(default)]
    pub conditions: ConditionList<EnactmentConditionType>,
}

/// Outcome of applying one policy on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enactment {
    /// Object metadata, labeled with [`ENACTMENT_POLICY_LABEL`]
    pub metadata: ObjectMeta,
    /// Observed state
    #[serde(default)]
    pub status: EnactmentStatus,
}

impl Enactment {
    /// Create the enactment of `policy` on `node`
    ///
    /// Named `<node>.<policy>` and labeled with the owning policy.
    #[must_use]
    pub fn new(node: &str, policy: &str) -> Self {
        Self {
            metadata: ObjectMeta::named(format!("{node}.{policy}"))
                .with_label(ENACTMENT_POLICY_LABEL, policy),
            status: EnactmentStatus::default(),
        }
    }

    /// Name of the owning policy, if labeled
    #[inline]
    #[must_use]
    pub fn policy_name(&self) -> Option<&str> {
        self.metadata
            .labels
            .get(ENACTMENT_POLICY_LABEL)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enactment_is_labeled_with_policy() {
        let enactment = Enactment::new("node01", "bond0");
        assert_eq!(enactment.metadata.name, "node01.bond0");
        assert_eq!(enactment.policy_name(), Some("bond0"));
        assert!(enactment.status.conditions.is_empty());
    }
}
