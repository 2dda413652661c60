use crate::store::SnapshotArchive;
use packspace_common::{ActorId, SnapshotId};
use std::collections::{HashMap, VecDeque};

/// Per-actor FIFO of archived snapshot ids.
///
/// # Invariants
/// - After [`SnapshotHistory::enforce_limit`] an actor holds at most `max` ids.
/// - Ids leave only from the front, oldest first.
#[derive(Debug, Default)]
pub struct SnapshotHistory {
    entries: HashMap<ActorId, VecDeque<SnapshotId>>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, actor: &ActorId, id: SnapshotId) {
        self.entries.entry(actor.clone()).or_default().push_back(id);
    }

    /// Pop the oldest ids until `actor` holds at most `max`, deleting each
    /// popped snapshot from `archive`. Returns the evicted ids.
    ///
    /// A file that cannot be deleted is still evicted.
    pub fn enforce_limit(
        &mut self,
        actor: &ActorId,
        max: usize,
        archive: &SnapshotArchive,
    ) -> Vec<SnapshotId> {
        let Some(ids) = self.entries.get_mut(actor) else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        while ids.len() > max {
            let Some(oldest) = ids.pop_front() else {
                break;
            };
            match archive.delete(actor, oldest) {
                Ok(true) => {}
                Ok(false) => tracing::debug!(%actor, id = %oldest, "evicted snapshot had no file"),
                Err(e) => tracing::debug!(%actor, id = %oldest, error = %e, "failed to delete evicted snapshot"),
            }
            evicted.push(oldest);
        }
        evicted
    }

    pub fn entries(&self, actor: &ActorId) -> impl Iterator<Item = SnapshotId> + '_ {
        self.entries.get(actor).into_iter().flatten().copied()
    }

    pub fn len(&self, actor: &ActorId) -> usize {
        self.entries.get(actor).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, actor: &ActorId) -> bool {
        self.len(actor) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_appends_in_order() {
        let mut h = SnapshotHistory::new();
        let actor = ActorId::new("bob");
        let ids: Vec<_> = (0..3).map(|_| SnapshotId::new()).collect();
        for id in &ids {
            h.record(&actor, *id);
        }
        assert_eq!(h.entries(&actor).collect::<Vec<_>>(), ids);
        assert!(h.is_empty(&ActorId::new("nobody")));
    }

    #[test]
    fn enforce_limit_evicts_oldest_and_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = SnapshotArchive::open(tmp.path()).unwrap();
        let actor = ActorId::new("bob");
        let mut h = SnapshotHistory::new();

        let ids: Vec<_> = (0..3).map(|_| SnapshotId::new()).collect();
        for id in &ids {
            archive.save(&actor, *id, b"bytes").unwrap();
            h.record(&actor, *id);
            h.enforce_limit(&actor, 2, &archive);
        }

        assert_eq!(h.len(&actor), 2);
        assert_eq!(h.entries(&actor).collect::<Vec<_>>(), ids[1..]);
        assert!(!archive.path_for(&actor, ids[0]).exists());
        assert!(archive.path_for(&actor, ids[2]).exists());
    }

    #[test]
    fn missing_file_is_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = SnapshotArchive::open(tmp.path()).unwrap();
        let actor = ActorId::new("bob");
        let mut h = SnapshotHistory::new();
        let gone = SnapshotId::new();
        h.record(&actor, gone);
        h.record(&actor, SnapshotId::new());

        assert_eq!(h.enforce_limit(&actor, 1, &archive), vec![gone]);
        assert_eq!(h.len(&actor), 1);
    }

    #[test]
    fn unknown_actor_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = SnapshotArchive::open(tmp.path()).unwrap();
        let mut h = SnapshotHistory::new();
        assert!(h.enforce_limit(&ActorId::new("x"), 0, &archive).is_empty());
    }
}
