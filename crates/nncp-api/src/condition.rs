//! Status conditions
//!
//! Provides [`ConditionList`], an insertion-ordered collection holding at most
//! one [`Condition`] per condition type. Policies and enactments share it with
//! their own type enums.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

/// Marker for types usable as a condition identity key
pub trait ConditionKind: Copy + Eq + Hash + Debug + Display {}

impl<T> ConditionKind for T where T: Copy + Eq + Hash + Debug + Display {}

/// Tri-state status of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Not yet known
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// String form used on the wire
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(holds: bool) -> Self {
        if holds {
            Self::True
        } else {
            Self::False
        }
    }
}

impl Display for ConditionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single condition, keyed by its type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition<T> {
    /// Identity key
    #[serde(rename = "type")]
    pub condition_type: T,
    /// Current status
    pub status: ConditionStatus,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time the condition was set
    pub last_heartbeat_time: DateTime<Utc>,
    /// Last time the status value changed
    pub last_transition_time: DateTime<Utc>,
}

/// Ordered, type-keyed upsert collection of conditions
///
/// Holds at most one condition per type. Iteration follows first-insertion
/// order; overwriting a condition keeps its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionList<T: ConditionKind> {
    entries: IndexMap<T, Condition<T>>,
}

impl<T: ConditionKind> ConditionList<T> {
    /// Create empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Upsert a condition, stamped with the current time
    pub fn set(
        &mut self,
        condition_type: T,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_at(condition_type, status, reason, message, Utc::now());
    }

    /// Upsert a condition, stamped with `now`
    ///
    /// An existing condition is overwritten in place. Its transition time only
    /// moves when the status value changes.
    pub fn set_at(
        &mut self,
        condition_type: T,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let reason = reason.into();
        let message = message.into();

        match self.entries.get_mut(&condition_type) {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = now;
                }
                existing.status = status;
                existing.reason = reason;
                existing.message = message;
                existing.last_heartbeat_time = now;
            }
            None => {
                self.entries.insert(
                    condition_type,
                    Condition {
                        condition_type,
                        status,
                        reason,
                        message,
                        last_heartbeat_time: now,
                        last_transition_time: now,
                    },
                );
            }
        }
    }

    /// Find condition by type
    #[inline]
    #[must_use]
    pub fn find(&self, condition_type: T) -> Option<&Condition<T>> {
        self.entries.get(&condition_type)
    }

    /// Status of a condition type, if present
    #[inline]
    #[must_use]
    pub fn status_of(&self, condition_type: T) -> Option<ConditionStatus> {
        self.find(condition_type).map(|c| c.status)
    }

    /// Iterate in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Condition<T>> {
        self.entries.values()
    }

    /// Number of conditions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list holds no conditions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every condition
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: ConditionKind> Default for ConditionList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ConditionKind> FromIterator<Condition<T>> for ConditionList<T> {
    fn from_iter<I: IntoIterator<Item = Condition<T>>>(iter: I) -> Self {
        let mut list = Self::new();
        for condition in iter {
            // later duplicates win, first position is kept
            list.entries.insert(condition.condition_type, condition);
        }
        list
    }
}

impl<'a, T: ConditionKind> IntoIterator for &'a ConditionList<T> {
    type Item = &'a Condition<T>;
    type IntoIter = indexmap::map::Values<'a, T, Condition<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl<T: ConditionKind + Serialize> Serialize for ConditionList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl<'de, T: ConditionKind + Deserialize<'de>> Deserialize<'de> for ConditionList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let conditions = Vec::<Condition<T>>::deserialize(deserializer)?;
        Ok(conditions.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    enum Kind {
        A,
        B,
        C,
    }

    impl Display for Kind {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn set_appends_new_types_in_order() {
        let mut list = ConditionList::new();
        list.set_at(Kind::B, ConditionStatus::True, "r1", "", at(1));
        list.set_at(Kind::A, ConditionStatus::False, "r2", "", at(1));

        let order: Vec<Kind> = list.iter().map(|c| c.condition_type).collect();
        assert_eq!(order, vec![Kind::B, Kind::A]);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut list = ConditionList::new();
        list.set_at(Kind::A, ConditionStatus::True, "first", "m1", at(1));
        list.set_at(Kind::B, ConditionStatus::True, "other", "", at(1));
        list.set_at(Kind::A, ConditionStatus::False, "second", "m2", at(2));

        assert_eq!(list.len(), 2);
        let first = list.iter().next().unwrap();
        assert_eq!(first.condition_type, Kind::A);
        assert_eq!(first.status, ConditionStatus::False);
        assert_eq!(first.reason, "second");
        assert_eq!(first.message, "m2");
    }

    #[test]
    fn transition_time_moves_only_on_status_change() {
        let mut list = ConditionList::new();
        list.set_at(Kind::A, ConditionStatus::True, "r", "", at(1));
        list.set_at(Kind::A, ConditionStatus::True, "r2", "", at(5));

        let c = list.find(Kind::A).unwrap();
        assert_eq!(c.last_transition_time, at(1));
        assert_eq!(c.last_heartbeat_time, at(5));

        list.set_at(Kind::A, ConditionStatus::Unknown, "r3", "", at(9));
        let c = list.find(Kind::A).unwrap();
        assert_eq!(c.last_transition_time, at(9));
    }

    #[test]
    fn status_from_bool() {
        assert_eq!(ConditionStatus::from(true), ConditionStatus::True);
        assert_eq!(ConditionStatus::from(false), ConditionStatus::False);
    }

    #[test]
    fn clear_empties_list() {
        let mut list = ConditionList::new();
        list.set(Kind::C, ConditionStatus::True, "r", "m");
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.status_of(Kind::C), None);
    }

    #[test]
    fn serializes_as_sequence() {
        let mut list = ConditionList::new();
        list.set_at(Kind::A, ConditionStatus::True, "Reason", "msg", at(0));

        let json = serde_json::to_value(&list).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["type"], "A");
        assert_eq!(json[0]["status"], "True");
        assert_eq!(json[0]["reason"], "Reason");

        let back: ConditionList<Kind> = serde_json::from_value(json).unwrap();
        assert_eq!(back, list);
    }

    fn kind_strategy() -> impl Strategy<Value = Kind> {
        prop_oneof![Just(Kind::A), Just(Kind::B), Just(Kind::C)]
    }

    fn status_strategy() -> impl Strategy<Value = ConditionStatus> {
        prop_oneof![
            Just(ConditionStatus::True),
            Just(ConditionStatus::False),
            Just(ConditionStatus::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn prop_one_condition_per_type(
            ops in proptest::collection::vec((kind_strategy(), status_strategy()), 0..40)
        ) {
            let mut list = ConditionList::new();
            let mut first_seen: Vec<Kind> = Vec::new();

            for (kind, status) in &ops {
                list.set_at(*kind, *status, "r", "", at(0));
                if !first_seen.contains(kind) {
                    first_seen.push(*kind);
                }
            }

            let order: Vec<Kind> = list.iter().map(|c| c.condition_type).collect();
            prop_assert_eq!(order, first_seen);

            for kind in [Kind::A, Kind::B, Kind::C] {
                let last = ops.iter().rev().find(|(k, _)| *k == kind).map(|(_, s)| *s);
                prop_assert_eq!(list.status_of(kind), last);
            }
        }
    }
}
