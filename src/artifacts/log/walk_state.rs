//! Per-walk side table of commit flags
//!
//! Flags never live on the commit values handed out by the object store. Each
//! `RevWalk` owns one `WalkState`, so independent walks over the same
//! `Database` cannot observe each other's bookkeeping.

use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;

/// Number of start commits that get their own reachability bit
pub const MAX_TRACKED_STARTS: usize = u64::BITS as usize;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WalkFlags: u8 {
        /// enqueued in the pending queue at some point; never enqueued again
        const SEEN = 0b0001;
        /// parents have been expanded
        const PARSED = 0b0010;
        /// handed to the caller
        const EMITTED = 0b0100;
        /// hidden, or an ancestor of a hidden commit
        const UNINTERESTING = 0b1000;
    }
}

impl WalkFlags {
    /// Flags a child passes down to its parents
    pub(crate) const CARRIED: WalkFlags = WalkFlags::UNINTERESTING;
}

impl fmt::Debug for WalkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter_names().map(|(name, _)| name).collect::<Vec<_>>();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

#[derive(Debug, Clone, Default)]
struct NodeState {
    flags: WalkFlags,
    reached_from: u64,
    parents: Vec<ObjectId>,
}

#[derive(Debug, Default)]
pub struct WalkState {
    nodes: HashMap<ObjectId, NodeState>,
    starts: Vec<ObjectId>,
    emitted: usize,
}

impl WalkState {
    pub fn flags(&self, oid: &ObjectId) -> WalkFlags {
        self.nodes
            .get(oid)
            .map(|node| node.flags)
            .unwrap_or_default()
    }

    pub fn has(&self, oid: &ObjectId, flags: WalkFlags) -> bool {
        self.flags(oid).contains(flags)
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted
    }

    /// Start commits in the order they were pushed
    pub fn starts(&self) -> &[ObjectId] {
        &self.starts
    }

    /// Whether `oid` was reached by following parents from `start`
    ///
    /// Only the first [`MAX_TRACKED_STARTS`] starts are tracked; later ones
    /// always answer `false`. The answer reflects what the walk has discovered
    /// so far.
    pub fn is_reachable_from(&self, oid: &ObjectId, start: &ObjectId) -> bool {
        let Some(bit) = self.start_bit(start) else {
            return false;
        };
        self.nodes
            .get(oid)
            .is_some_and(|node| node.reached_from & bit != 0)
    }

    fn start_bit(&self, start: &ObjectId) -> Option<u64> {
        self.starts
            .iter()
            .take(MAX_TRACKED_STARTS)
            .position(|candidate| candidate == start)
            .map(|index| 1u64 << index)
    }

    pub(crate) fn reached_from(&self, oid: &ObjectId) -> u64 {
        self.nodes.get(oid).map_or(0, |node| node.reached_from)
    }

    /// Record a start commit and return its reachability bit (0 past the tracked limit)
    pub(crate) fn add_start(&mut self, oid: ObjectId) -> u64 {
        if !self.starts.contains(&oid) {
            self.starts.push(oid);
        }
        self.start_bit(&oid).unwrap_or(0)
    }

    pub(crate) fn insert(&mut self, oid: ObjectId, flags: WalkFlags) {
        self.nodes.entry(oid).or_default().flags |= flags;
    }

    pub(crate) fn mark_parsed(&mut self, oid: ObjectId, parents: &[ObjectId]) {
        let node = self.nodes.entry(oid).or_default();
        node.flags |= WalkFlags::PARSED;
        node.parents = parents.to_vec();
    }

    pub(crate) fn mark_emitted(&mut self, oid: ObjectId) {
        self.insert(oid, WalkFlags::EMITTED);
        self.emitted += 1;
    }

    /// Add carried flags and reachability bits to `oid` and every already
    /// parsed ancestor that does not have them yet
    ///
    /// Returns how many pending commits (seen, not yet parsed) became
    /// uninteresting.
    pub(crate) fn carry(&mut self, oid: ObjectId, flags: WalkFlags, reached_from: u64) -> usize {
        let flags = flags & WalkFlags::CARRIED;
        if flags.is_empty() && reached_from == 0 {
            return 0;
        }

        let mut hidden_pending = 0;
        let mut stack = vec![oid];
        while let Some(current) = stack.pop() {
            let node = self.nodes.entry(current).or_default();
            if node.flags.contains(flags) && node.reached_from & reached_from == reached_from {
                continue;
            }
            let pending = node.flags & (WalkFlags::SEEN | WalkFlags::PARSED) == WalkFlags::SEEN;
            if pending
                && flags.contains(WalkFlags::UNINTERESTING)
                && !node.flags.contains(WalkFlags::UNINTERESTING)
            {
                hidden_pending += 1;
            }
            node.flags |= flags;
            node.reached_from |= reached_from;

            if node.flags.contains(WalkFlags::PARSED) {
                stack.extend(node.parents.iter().copied());
            }
        }
        hidden_pending
    }
}
