use std::collections::BTreeSet;

use crate::models::DependencySet;

/// Dependencies dropped and picked up between two manifest snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDelta {
    pub abandoned: BTreeSet<String>,
    pub adopted: BTreeSet<String>,
}

impl DependencyDelta {
    /// Exact set difference in both directions: `before − after` is
    /// abandoned, `after − before` is adopted.
    pub fn between(before: &DependencySet, after: &DependencySet) -> Self {
        Self {
            abandoned: before.as_set().difference(after.as_set()).cloned().collect(),
            adopted: after.as_set().difference(before.as_set()).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.abandoned.is_empty() && self.adopted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> DependencySet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_abandoned_and_adopted() {
        let delta = DependencyDelta::between(&set(&["gson", "junit"]), &set(&["jackson", "junit"]));
        assert_eq!(delta.abandoned, BTreeSet::from(["gson".to_string()]));
        assert_eq!(delta.adopted, BTreeSet::from(["jackson".to_string()]));
    }

    #[test]
    fn test_unchanged_set_has_empty_delta() {
        let a = set(&["a", "b", "c"]);
        assert!(DependencyDelta::between(&a, &a).is_empty());
        assert!(DependencyDelta::between(&set(&[]), &set(&[])).is_empty());
    }

    #[test]
    fn test_empty_sides_degenerate() {
        let deps = set(&["x", "y"]);
        let from_nothing = DependencyDelta::between(&set(&[]), &deps);
        assert!(from_nothing.abandoned.is_empty());
        assert_eq!(from_nothing.adopted.len(), 2);

        let to_nothing = DependencyDelta::between(&deps, &set(&[]));
        assert!(to_nothing.adopted.is_empty());
        assert_eq!(to_nothing.abandoned.len(), 2);
    }

    #[test]
    fn test_delta_partitions_the_union() {
        let pairs = [
            (set(&["a", "b"]), set(&["a"])),
            (set(&["c"]), set(&["c", "d"])),
            (set(&["p", "q", "r"]), set(&["r", "s", "t"])),
            (set(&[]), set(&["z"])),
        ];

        for (a, b) in &pairs {
            let delta = DependencyDelta::between(a, b);
            assert!(delta.abandoned.is_disjoint(&delta.adopted));

            let common: BTreeSet<String> =
                a.as_set().intersection(b.as_set()).cloned().collect();
            let union: BTreeSet<String> = a.as_set().union(b.as_set()).cloned().collect();
            let covered: BTreeSet<String> = delta
                .abandoned
                .iter()
                .chain(&delta.adopted)
                .chain(&common)
                .cloned()
                .collect();
            assert_eq!(covered, union);
        }
    }

    #[test]
    fn test_identifiers_match_exactly() {
        let delta = DependencyDelta::between(&set(&["Requests"]), &set(&["requests"]));
        assert_eq!(delta.abandoned.len(), 1);
        assert_eq!(delta.adopted.len(), 1);
    }
}
