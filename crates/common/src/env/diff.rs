use serde::{Deserialize, Serialize};

use super::Snapshot;

/// Key-level difference between two snapshots
///
/// The three lists are pairwise disjoint and sorted. A key whose value did
/// not change appears in none of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed keys
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Compute what changed going from `old` to `new`
pub fn diff(old: &Snapshot, new: &Snapshot) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();

    for (key, value) in new {
        match old.get(key) {
            None => result.added.push(key.clone()),
            Some(previous) if previous != value => result.modified.push(key.clone()),
            Some(_) => {}
        }
    }
    result.removed = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();

    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let s = snapshot(&[("A", "1"), ("B", "2")]);
        let d = diff(&s, &s);
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
        assert!(diff(&Snapshot::new(), &Snapshot::new()).is_empty());
    }

    #[test]
    fn test_diff_added_removed() {
        let old = snapshot(&[("A", "1"), ("B", "2")]);
        let new = snapshot(&[("A", "1"), ("C", "3")]);
        let d = diff(&old, &new);
        assert_eq!(d.added, vec!["C"]);
        assert_eq!(d.removed, vec!["B"]);
        assert!(d.modified.is_empty());
    }

    #[test]
    fn test_diff_modified() {
        let old = snapshot(&[("FOO", "bar")]);
        let new = snapshot(&[("FOO", "baz"), ("NEW", "1")]);
        let d = diff(&old, &new);
        assert_eq!(d.added, vec!["NEW"]);
        assert_eq!(d.modified, vec!["FOO"]);
        assert!(d.removed.is_empty());
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_diff_is_directional() {
        let a = snapshot(&[("X", "1")]);
        let b = snapshot(&[("Y", "1")]);
        assert_eq!(diff(&a, &b).added, diff(&b, &a).removed);
    }

    #[test]
    fn test_empty_value_change_is_modified() {
        let old = snapshot(&[("A", "")]);
        let new = snapshot(&[("A", "x")]);
        assert_eq!(diff(&old, &new).modified, vec!["A"]);
    }
}
