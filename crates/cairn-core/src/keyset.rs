//! Mutable sets of content identifiers.
//!
//! A [`KeySet`] tracks which blocks a traversal has reached. Membership is
//! monotonic for the lifetime of the set: identifiers are added, never
//! removed. The [`KeySet::visit`] operation is the traversal recursion guard;
//! callers must expand an identifier's children only when `visit` returned
//! true for it.

use std::collections::HashSet;

use crate::cid::ContentId;

/// A mutable, monotonic set of content identifiers.
///
/// Kept behind a trait so that a probabilistic (bloom filter) or disk-backed
/// variant can replace [`MemoryKeySet`] without changing call sites, should
/// the reachable set outgrow memory.
pub trait KeySet {
    /// Inserts `cid` into the set. Idempotent.
    fn add(&mut self, cid: ContentId);

    /// Returns true if `cid` is a member.
    fn contains(&self, cid: &ContentId) -> bool;

    /// Inserts `cid` if absent, returning true exactly on first insertion.
    ///
    /// Traversals must check this before expanding an identifier's children
    /// and must never expand one for which it returned false.
    fn visit(&mut self, cid: &ContentId) -> bool;

    /// Returns the number of members.
    fn len(&self) -> usize;

    /// Returns true if the set has no members.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`KeySet`] backed by a hash set.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeySet {
    members: HashSet<ContentId>,
}

impl MemoryKeySet {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over the members in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentId> {
        self.members.iter()
    }
}

impl KeySet for MemoryKeySet {
    fn add(&mut self, cid: ContentId) {
        self.members.insert(cid);
    }

    fn contains(&self, cid: &ContentId) -> bool {
        self.members.contains(cid)
    }

    fn visit(&mut self, cid: &ContentId) -> bool {
        self.members.insert(*cid)
    }

    fn len(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_reports_first_insertion_only() {
        let mut set = MemoryKeySet::new();
        let id = ContentId::from_data(b"block");

        assert!(set.visit(&id));
        assert!(!set.visit(&id));
        assert!(set.contains(&id));
    }

    #[test]
    fn add_is_idempotent() {
        let mut set = MemoryKeySet::new();
        let id = ContentId::from_data(b"block");

        set.add(id);
        set.add(id);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn visit_after_add_reports_already_present() {
        let mut set = MemoryKeySet::new();
        let id = ContentId::from_data(b"root");

        set.add(id);
        assert!(!set.visit(&id));
    }

    #[test]
    fn empty_set() {
        let set = MemoryKeySet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(!set.contains(&ContentId::from_data(b"absent")));
    }
}
