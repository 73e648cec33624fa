//! Pull-based revision walk over the commit graph
//!
//! Pending commits sit in a priority queue ordered by the active [`RevSort`]
//! (commit time, newest first, by default; ties keep insertion order). Each
//! `next()` pops commits until one passes the filter:
//!
//! 1. pop the highest-priority pending commit
//! 2. expand its parents once, enqueueing the ones never seen before
//! 3. skip it if it is uninteresting (hidden or an ancestor of a hidden commit)
//! 4. hand it to the filter; only accepted commits are returned
//!
//! Rejected commits still have their parents walked. The walk ends early once
//! the filter can never accept again (a spent `max_count`). All per-commit flags live
//! in the walk's own [`WalkState`], so several walks may share one
//! [`Database`](crate::areas::database::Database) concurrently.
//!
//! ## States
//!
//! `Idle` → `Seeded` (starts pushed) → `Running` (first `next()`) →
//! `Exhausted` (queue drained, or an error) or `Cancelled`. Both final states
//! are terminal; a fresh traversal needs a fresh `RevWalk`.

use crate::artifacts::log::rev_filter::RevFilter;
use crate::artifacts::log::walk_state::{WalkFlags, WalkState};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{StoreError, WalkError};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tracing::{debug, trace, warn};

/// Pops of uninteresting commits tolerated once only uninteresting commits
/// remain pending, to absorb clock skew between branches
const OVER_SCAN: usize = 5;

/// Where a walk loads commits from
pub trait CommitSource {
    /// `Ok(None)` when no storage holds `oid`
    fn find_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, StoreError>;
}

impl<F> CommitSource for F
where
    F: Fn(&ObjectId) -> Option<Commit>,
{
    fn find_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, StoreError> {
        Ok(self(oid))
    }
}

pub type CommitComparator = Arc<dyn Fn(&Commit, &Commit) -> Ordering + Send + Sync>;

/// Order in which pending commits are dequeued
///
/// A comparator returning `Less` means the first commit is dequeued first.
#[derive(Clone, Default)]
pub enum RevSort {
    #[default]
    CommitTimeDescending,
    CommitTimeAscending,
    Custom(CommitComparator),
}

impl RevSort {
    pub fn custom(compare: impl Fn(&Commit, &Commit) -> Ordering + Send + Sync + 'static) -> Self {
        RevSort::Custom(Arc::new(compare))
    }

    pub fn compare(&self, a: &Commit, b: &Commit) -> Ordering {
        match self {
            RevSort::CommitTimeDescending => b.commit_time().cmp(&a.commit_time()),
            RevSort::CommitTimeAscending => a.commit_time().cmp(&b.commit_time()),
            RevSort::Custom(compare) => compare(a, b),
        }
    }
}

impl fmt::Debug for RevSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevSort::CommitTimeDescending => write!(f, "CommitTimeDescending"),
            RevSort::CommitTimeAscending => write!(f, "CommitTimeAscending"),
            RevSort::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Queue entry; the heap pops the entry that sorts first, oldest insertion on ties
struct Pending {
    commit: Commit,
    sequence: u64,
    sort: RevSort,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort
            .compare(&other.commit, &self.commit)
            .then_with(|| Reverse(self.sequence).cmp(&Reverse(other.sequence)))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkPhase {
    Idle,
    Seeded,
    Running,
    Exhausted,
    Cancelled,
}

/// Requests cancellation of a walk, possibly from another thread
///
/// The walk observes the request at its next `next()` call. Cancelling more
/// than once has no further effect.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Acquire)
    }
}

pub struct RevWalk<'s, S: CommitSource + ?Sized> {
    source: &'s S,
    pending: BinaryHeap<Pending>,
    /// insertion counter for stable tie-breaks
    sequence: u64,
    /// pending commits not flagged uninteresting
    interesting_pending: usize,
    state: WalkState,
    filter: RevFilter,
    sort: RevSort,
    phase: WalkPhase,
    cancel: CancelHandle,
    over_scan: usize,
}

impl<'s, S: CommitSource + ?Sized> RevWalk<'s, S> {
    pub fn new(source: &'s S) -> Self {
        RevWalk {
            source,
            pending: BinaryHeap::new(),
            sequence: 0,
            interesting_pending: 0,
            state: WalkState::default(),
            filter: RevFilter::All,
            sort: RevSort::default(),
            phase: WalkPhase::Idle,
            cancel: CancelHandle::default(),
            over_scan: OVER_SCAN,
        }
    }

    /// Add a commit the walk starts from
    pub fn push_start(&mut self, oid: ObjectId) -> Result<(), WalkError> {
        self.ensure_configurable()?;

        self.seed(oid)?;
        let reached_from = self.state.add_start(oid);
        self.state.carry(oid, WalkFlags::empty(), reached_from);

        debug!(commit = %oid, "pushed walk start");
        Ok(())
    }

    /// Exclude a commit and all of its ancestors from the output
    pub fn hide(&mut self, oid: ObjectId) -> Result<(), WalkError> {
        self.ensure_configurable()?;

        self.seed(oid)?;
        let hidden = self.state.carry(oid, WalkFlags::UNINTERESTING, 0);
        self.interesting_pending -= hidden;

        debug!(commit = %oid, "hid commit");
        Ok(())
    }

    pub fn set_filter(&mut self, filter: RevFilter) -> Result<(), WalkError> {
        self.ensure_configurable()?;
        self.filter = filter;
        Ok(())
    }

    pub fn set_sort(&mut self, sort: RevSort) -> Result<(), WalkError> {
        self.ensure_configurable()?;
        self.sort = sort;

        let pending = std::mem::take(&mut self.pending);
        self.pending = pending
            .into_iter()
            .map(|entry| Pending {
                sort: self.sort.clone(),
                ..entry
            })
            .collect();
        Ok(())
    }

    pub fn filter(&self) -> &RevFilter {
        &self.filter
    }

    pub fn phase(&self) -> WalkPhase {
        self.phase
    }

    pub fn state(&self) -> &WalkState {
        &self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop the walk and drop everything still pending
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.observe_cancel();
    }

    /// Next accepted commit, `Ok(None)` once the walk is over
    pub fn next_commit(&mut self) -> Result<Option<Commit>, WalkError> {
        match self.phase {
            WalkPhase::Exhausted | WalkPhase::Cancelled => return Ok(None),
            WalkPhase::Idle | WalkPhase::Seeded | WalkPhase::Running => {}
        }

        if self.cancel.is_cancelled() {
            self.observe_cancel();
            return Ok(None);
        }

        self.phase = WalkPhase::Running;
        match self.advance() {
            Ok(Some(commit)) => Ok(Some(commit)),
            Ok(None) => {
                self.exhaust();
                Ok(None)
            }
            Err(error) => {
                self.exhaust();
                Err(error)
            }
        }
    }

    fn ensure_configurable(&self) -> Result<(), WalkError> {
        match self.phase {
            WalkPhase::Idle | WalkPhase::Seeded => Ok(()),
            _ => Err(WalkError::AlreadyStarted),
        }
    }

    fn seed(&mut self, oid: ObjectId) -> Result<(), WalkError> {
        if !self.state.has(&oid, WalkFlags::SEEN) {
            let commit = self.load(&oid)?;
            self.state.insert(oid, WalkFlags::SEEN);
            self.enqueue(commit);
        }
        self.phase = WalkPhase::Seeded;
        Ok(())
    }

    fn load(&self, oid: &ObjectId) -> Result<Commit, WalkError> {
        self.source
            .find_commit(oid)?
            .ok_or(WalkError::MissingObject(*oid))
    }

    fn enqueue(&mut self, commit: Commit) {
        if !self.state.has(commit.oid(), WalkFlags::UNINTERESTING) {
            self.interesting_pending += 1;
        }
        self.pending.push(Pending {
            commit,
            sequence: self.sequence,
            sort: self.sort.clone(),
        });
        self.sequence += 1;
    }

    fn advance(&mut self) -> Result<Option<Commit>, WalkError> {
        loop {
            if self.filter.is_done() {
                trace!("filter accepts no further commits");
                return Ok(None);
            }
            let Some(Pending { commit, .. }) = self.pending.pop() else {
                return Ok(None);
            };

            let oid = *commit.oid();
            trace!(commit = %oid, time = commit.commit_time(), "popped pending commit");
            if !self.state.has(&oid, WalkFlags::UNINTERESTING) {
                self.interesting_pending -= 1;
            }

            self.expand_parents(&commit)?;

            let flags = self.state.flags(&oid);
            if flags.contains(WalkFlags::UNINTERESTING) {
                if self.interesting_pending == 0 {
                    self.over_scan = self.over_scan.saturating_sub(1);
                    if self.over_scan == 0 {
                        trace!("only uninteresting commits remain pending");
                        return Ok(None);
                    }
                } else {
                    self.over_scan = OVER_SCAN;
                }
                continue;
            }
            if flags.contains(WalkFlags::EMITTED) {
                continue;
            }

            let accepted = self.filter.include(&self.state, &commit);
            trace!(commit = %oid, accepted, "filter verdict");
            if accepted {
                self.state.mark_emitted(oid);
                return Ok(Some(commit));
            }
        }
    }

    fn expand_parents(&mut self, commit: &Commit) -> Result<(), WalkError> {
        let oid = *commit.oid();
        if self.state.has(&oid, WalkFlags::PARSED) {
            return Ok(());
        }
        self.state.mark_parsed(oid, commit.parents());

        let flags = self.state.flags(&oid);
        let reached_from = self.state.reached_from(&oid);
        for parent in commit.parents() {
            let hidden = self.state.carry(*parent, flags, reached_from);
            self.interesting_pending -= hidden;
            if self.state.has(parent, WalkFlags::SEEN) {
                continue;
            }

            let parent_commit = match self.source.find_commit(parent)? {
                Some(parent_commit) => parent_commit,
                None => {
                    warn!(commit = %oid, parent = %parent, "parent missing from object store");
                    return Err(WalkError::MissingObject(*parent));
                }
            };
            self.state.insert(*parent, WalkFlags::SEEN);
            trace!(commit = %parent, "enqueued parent");
            self.enqueue(parent_commit);
        }
        Ok(())
    }

    fn observe_cancel(&mut self) {
        if matches!(self.phase, WalkPhase::Exhausted | WalkPhase::Cancelled) {
            return;
        }
        debug!(
            emitted = self.state.emitted_count(),
            discarded = self.pending.len(),
            "walk cancelled"
        );
        self.pending.clear();
        self.interesting_pending = 0;
        self.phase = WalkPhase::Cancelled;
    }

    fn exhaust(&mut self) {
        self.pending.clear();
        self.interesting_pending = 0;
        self.phase = WalkPhase::Exhausted;
    }
}

impl<S: CommitSource + ?Sized> Iterator for RevWalk<'_, S> {
    type Item = Result<Commit, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_commit().transpose()
    }
}
