//! Snapshot selection for clones

use std::fmt;

use dbflow_client::{SnapshotCollection, SnapshotGroup};
use dbflow_common::{Error, Result};

/// Schedule type of a snapshot group, in selection precedence order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnapshotType {
    /// Daily snapshots (group 0)
    Daily,
    /// Continuous snapshots (group 1)
    Continuous,
    /// Manual snapshots (group 2)
    Manual,
}

impl SnapshotType {
    /// Every known type, highest precedence first
    pub const PRECEDENCE: [SnapshotType; 3] =
        [SnapshotType::Daily, SnapshotType::Continuous, SnapshotType::Manual];

    /// Position of this type's group in a cluster's group list
    pub const fn group_index(self) -> usize {
        match self {
            SnapshotType::Daily => 0,
            SnapshotType::Continuous => 1,
            SnapshotType::Manual => 2,
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotType::Daily => "daily",
            SnapshotType::Continuous => "continuous",
            SnapshotType::Manual => "manual",
        })
    }
}

/// Pick the snapshot a clone on `cluster_id` should restore from
///
/// Groups are tried daily, continuous, manual, then any further groups in
/// listed order. The first snapshot of the first non-empty group wins.
///
/// Entries with an empty id are ignored, so a group holding only such entries
/// counts as empty and selection moves on to the next group. A clone cannot
/// be submitted without a snapshot id.
pub fn select_snapshot_id(collection: &SnapshotCollection, cluster_id: &str) -> Result<String> {
    let groups = collection
        .snapshots_per_cluster
        .get(cluster_id)
        .filter(|groups| !groups.is_empty())
        .ok_or_else(|| Error::not_found("snapshots for cluster", cluster_id))?;

    let known = SnapshotType::PRECEDENCE.map(SnapshotType::group_index);
    let rest = (0..groups.len()).filter(|index| !known.contains(index));

    known
        .into_iter()
        .chain(rest)
        .filter_map(|index| groups.get(index))
        .find_map(first_snapshot_id)
        .ok_or_else(|| Error::not_found("snapshot for cluster", cluster_id))
}

fn first_snapshot_id(group: &SnapshotGroup) -> Option<String> {
    group
        .snapshots
        .iter()
        .find(|snapshot| !snapshot.id.is_empty())
        .map(|snapshot| snapshot.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn collection(cluster: &str, groups: Vec<Vec<&str>>) -> SnapshotCollection {
        let mut collection = SnapshotCollection::default();
        collection.snapshots_per_cluster.insert(
            cluster.to_string(),
            groups.into_iter().map(SnapshotGroup::from_ids).collect(),
        );
        collection
    }

    #[rstest]
    #[case::daily_first(vec![vec!["daily-1", "daily-2"], vec!["cont-1"], vec!["man-1"]], "daily-1")]
    #[case::continuous_when_no_daily(vec![vec![], vec!["cont-1"], vec!["man-1"]], "cont-1")]
    #[case::manual_when_only_manual(vec![vec![], vec![], vec!["man-1"]], "man-1")]
    #[case::first_of_first_non_empty(vec![vec![], vec!["s1", "s2"], vec!["s3"]], "s1")]
    #[case::blank_ids_count_as_empty(vec![vec!["", ""], vec!["", "cont-1"]], "cont-1")]
    #[case::single_daily_group(vec![vec!["daily-1"]], "daily-1")]
    #[case::extra_groups_after_known(vec![vec![], vec![], vec![], vec!["extra-1"]], "extra-1")]
    fn test_selection_precedence(#[case] groups: Vec<Vec<&str>>, #[case] expected: &str) {
        let snapshots = collection("cluster-a", groups);
        assert_eq!(
            select_snapshot_id(&snapshots, "cluster-a").expect("snapshot"),
            expected
        );
    }

    /// Story: the collection lists only the daily group, which is empty.
    /// Selection must report not-found rather than index past the end.
    #[test]
    fn story_short_group_list_is_not_found() {
        let snapshots = collection("cluster-a", vec![vec![]]);
        let err = select_snapshot_id(&snapshots, "cluster-a").unwrap_err();
        assert!(err.is_not_found());
    }

    #[rstest]
    #[case::unknown_cluster("cluster-b")]
    #[case::empty_cluster_id("")]
    fn test_missing_cluster_is_not_found(#[case] cluster: &str) {
        let snapshots = collection("cluster-a", vec![vec!["daily-1"]]);
        let err = select_snapshot_id(&snapshots, cluster).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cluster_with_no_groups_is_not_found() {
        let snapshots = collection("cluster-a", vec![]);
        assert!(select_snapshot_id(&snapshots, "cluster-a")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_group_indices_follow_precedence() {
        let indices: Vec<usize> = SnapshotType::PRECEDENCE
            .iter()
            .map(|t| t.group_index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(SnapshotType::Continuous.to_string(), "continuous");
    }
}
