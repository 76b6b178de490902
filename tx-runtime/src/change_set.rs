//! Change Set: a copy-on-write overlay over root storage, with tombstone
//! deletes and atomic commit-or-discard.

use indexmap::IndexMap;

/// Underlying committed storage the Change Set overlays.
pub trait RootStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Value(Vec<u8>),
    Tombstone,
}

/// A writable overlay on top of a `RootStore`. Reads fall through to the root
/// when a key has no local entry; writes and deletes stay local until
/// `merge` commits them.
pub struct ChangeSet {
    overlay: IndexMap<Vec<u8>, Slot>,
    read_only: bool,
}

impl ChangeSet {
    pub fn new(read_only: bool) -> Self {
        Self {
            overlay: IndexMap::new(),
            read_only,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// A local, writable view nested under this one, used for triggers whose
    /// writes may be discarded independently of the parent's.
    pub fn child(&self) -> Self {
        Self::new(self.read_only)
    }

    pub fn get(&self, root: &dyn RootStore, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(Slot::Value(v)) => Some(v.clone()),
            Some(Slot::Tombstone) => None,
            None => root.get(key),
        }
    }

    /// Writes in read-only mode fault rather than silently no-op, since a
    /// silently dropped write would desynchronize the caller's view of state
    /// from what actually committed.
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), ReadOnlyWrite> {
        if self.read_only {
            return Err(ReadOnlyWrite);
        }
        self.overlay.insert(key, Slot::Value(value));
        Ok(())
    }

    pub fn delete(&mut self, key: Vec<u8>) -> Result<(), ReadOnlyWrite> {
        if self.read_only {
            return Err(ReadOnlyWrite);
        }
        self.overlay.insert(key, Slot::Tombstone);
        Ok(())
    }

    /// Whether this overlay holds any pending write or delete, regardless of
    /// root contents — the dirty check the commit path uses to decide
    /// whether a read-only change set actually attempted a write.
    pub fn any(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Folds `other`'s local writes into `self`, in `other`'s insertion order,
    /// overwriting any of `self`'s entries for the same key. Used both for
    /// the top-level commit and for absorbing a successful trigger's child
    /// Change Set into its parent.
    pub fn merge(&mut self, other: ChangeSet) {
        for (key, slot) in other.overlay {
            self.overlay.insert(key, slot);
        }
    }

    /// Drops every uncommitted local write: used when a trigger invocation
    /// faults and its side effects must not reach the parent.
    pub fn discard(self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("storage write attempted in read-only mode")]
pub struct ReadOnlyWrite;

impl From<ReadOnlyWrite> for crate::error::Error {
    fn from(_: ReadOnlyWrite) -> Self {
        crate::error::Error::ReadOnlyWrite
    }
}
