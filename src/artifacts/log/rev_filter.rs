//! Composable commit filters for revision walks
//!
//! A filter is a tagged tree: terminal matchers at the leaves, `And`/`Or`
//! nodes (a binary fast path plus an n-ary list form) and `Not`. Combinators
//! are plain functions that build new trees and fold algebraic identities
//! away, so `RevFilter::and(RevFilter::All, f)` is just `f`.
//!
//! Evaluation is strictly left to right with short-circuit: `And` stops at the
//! first rejection, `Or` at the first acceptance. Place cheap, highly selective
//! filters first. Stateful filters (`MaxCount`, `Skip`, most `Custom`
//! predicates) only see the commits their left siblings let through.

use crate::artifacts::log::matchers::{
    CommitPredicate, CommitTimeRange, MaxCount, PatternField, PatternMatch, Skip,
};
use crate::artifacts::log::walk_state::WalkState;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::FilterError;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub enum RevFilter {
    /// accepts every commit (pure)
    #[default]
    All,
    /// rejects every commit (pure)
    None,
    /// regex over author, committer or message (pure)
    Pattern(PatternMatch),
    /// committer time window (pure)
    CommitTime(CommitTimeRange),
    /// commits with at most one parent (pure)
    NoMerges,
    /// commits with two or more parents (pure)
    OnlyMerges,
    /// commits reached from the given start commit in this walk (pure)
    ReachableFrom(ObjectId),
    /// first `n` commits offered (stateful)
    MaxCount(MaxCount),
    /// everything after the first `n` commits offered (stateful)
    Skip(Skip),
    /// caller-defined predicate; its `clone_box` decides the clone semantics
    Custom(Box<dyn CommitPredicate>),
    And(Box<RevFilter>, Box<RevFilter>),
    AndAll(Vec<RevFilter>),
    Or(Box<RevFilter>, Box<RevFilter>),
    OrAny(Vec<RevFilter>),
    Not(Box<RevFilter>),
}

impl RevFilter {
    /// Both filters must accept; `All` on either side yields the other operand
    pub fn and(a: RevFilter, b: RevFilter) -> RevFilter {
        match (a, b) {
            (RevFilter::All, other) | (other, RevFilter::All) => other,
            (a, b) => RevFilter::And(Box::new(a), Box::new(b)),
        }
    }

    /// Every filter must accept, evaluated in the given order
    ///
    /// Two filters collapse to the binary form of [`RevFilter::and`].
    pub fn and_all(filters: Vec<RevFilter>) -> Result<RevFilter, FilterError> {
        match <[RevFilter; 2]>::try_from(filters) {
            Ok([a, b]) => Ok(Self::and(a, b)),
            Err(filters) if filters.len() < 2 => Err(FilterError::TooFewFilters {
                got: filters.len(),
            }),
            Err(filters) => Ok(RevFilter::AndAll(filters)),
        }
    }

    /// Either filter may accept
    ///
    /// `All` on the left yields `All`, as does `All` on the right of a pure
    /// filter. `None` on either side yields the other operand.
    pub fn or(a: RevFilter, b: RevFilter) -> RevFilter {
        match (a, b) {
            (RevFilter::All, _) => RevFilter::All,
            (a, RevFilter::All) if !a.is_stateful() => RevFilter::All,
            (RevFilter::None, other) | (other, RevFilter::None) => other,
            (a, b) => RevFilter::Or(Box::new(a), Box::new(b)),
        }
    }

    /// At least one filter must accept, evaluated in the given order
    pub fn or_any(filters: Vec<RevFilter>) -> Result<RevFilter, FilterError> {
        match <[RevFilter; 2]>::try_from(filters) {
            Ok([a, b]) => Ok(Self::or(a, b)),
            Err(filters) if filters.len() < 2 => Err(FilterError::TooFewFilters {
                got: filters.len(),
            }),
            Err(filters) => Ok(RevFilter::OrAny(filters)),
        }
    }

    /// Inverts a filter; double negation and the constant filters fold away
    pub fn negate(filter: RevFilter) -> RevFilter {
        match filter {
            RevFilter::All => RevFilter::None,
            RevFilter::None => RevFilter::All,
            RevFilter::Not(inner) => *inner,
            other => RevFilter::Not(Box::new(other)),
        }
    }

    pub fn author(pattern: &str) -> Result<RevFilter, FilterError> {
        Ok(RevFilter::Pattern(PatternMatch::new(PatternField::Author, pattern)?))
    }

    pub fn committer(pattern: &str) -> Result<RevFilter, FilterError> {
        Ok(RevFilter::Pattern(PatternMatch::new(PatternField::Committer, pattern)?))
    }

    pub fn message(pattern: &str) -> Result<RevFilter, FilterError> {
        Ok(RevFilter::Pattern(PatternMatch::new(PatternField::Message, pattern)?))
    }

    /// Commits with `commit_time <= until` (seconds since the epoch)
    pub fn commit_time_before(until: i64) -> RevFilter {
        RevFilter::CommitTime(CommitTimeRange::before(until))
    }

    /// Commits with `commit_time >= since`
    pub fn commit_time_after(since: i64) -> RevFilter {
        RevFilter::CommitTime(CommitTimeRange::after(since))
    }

    pub fn commit_time_between(since: i64, until: i64) -> RevFilter {
        RevFilter::CommitTime(CommitTimeRange::between(since, until))
    }

    pub fn no_merges() -> RevFilter {
        RevFilter::NoMerges
    }

    pub fn only_merges() -> RevFilter {
        RevFilter::OnlyMerges
    }

    pub fn reachable_from(start: ObjectId) -> RevFilter {
        RevFilter::ReachableFrom(start)
    }

    pub fn max_count(limit: usize) -> RevFilter {
        RevFilter::MaxCount(MaxCount::new(limit))
    }

    pub fn skip(count: usize) -> RevFilter {
        RevFilter::Skip(Skip::new(count))
    }

    pub fn custom(predicate: impl CommitPredicate + 'static) -> RevFilter {
        RevFilter::Custom(Box::new(predicate))
    }

    /// Whether evaluating this filter can change its future answers
    pub fn is_stateful(&self) -> bool {
        match self {
            RevFilter::MaxCount(_) | RevFilter::Skip(_) | RevFilter::Custom(_) => true,
            RevFilter::And(a, b) | RevFilter::Or(a, b) => a.is_stateful() || b.is_stateful(),
            RevFilter::AndAll(filters) | RevFilter::OrAny(filters) => {
                filters.iter().any(RevFilter::is_stateful)
            }
            RevFilter::Not(inner) => inner.is_stateful(),
            _ => false,
        }
    }

    /// Whether this filter can never accept another commit
    ///
    /// True once a `MaxCount` that every acceptance must pass through has run
    /// out. A walk stops loading commits at that point.
    pub fn is_done(&self) -> bool {
        match self {
            RevFilter::MaxCount(limit) => limit.is_exhausted(),
            RevFilter::And(a, b) => a.is_done() || b.is_done(),
            RevFilter::AndAll(filters) => filters.iter().any(RevFilter::is_done),
            RevFilter::Or(a, b) => a.is_done() && b.is_done(),
            RevFilter::OrAny(filters) => filters.iter().all(RevFilter::is_done),
            _ => false,
        }
    }

    pub fn include(&mut self, state: &WalkState, commit: &Commit) -> bool {
        match self {
            RevFilter::All => true,
            RevFilter::None => false,
            RevFilter::Pattern(pattern) => pattern.include(commit),
            RevFilter::CommitTime(range) => range.include(commit),
            RevFilter::NoMerges => commit.parents().len() <= 1,
            RevFilter::OnlyMerges => commit.is_merge(),
            RevFilter::ReachableFrom(start) => state.is_reachable_from(commit.oid(), start),
            RevFilter::MaxCount(limit) => limit.include(),
            RevFilter::Skip(skip) => skip.include(),
            RevFilter::Custom(predicate) => predicate.include(state, commit),
            RevFilter::And(a, b) => a.include(state, commit) && b.include(state, commit),
            RevFilter::AndAll(filters) => filters.iter_mut().all(|f| f.include(state, commit)),
            RevFilter::Or(a, b) => a.include(state, commit) || b.include(state, commit),
            RevFilter::OrAny(filters) => filters.iter_mut().any(|f| f.include(state, commit)),
            RevFilter::Not(inner) => !inner.include(state, commit),
        }
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, filters: &[RevFilter], operator: &str) -> fmt::Result {
    write!(f, "(")?;
    for (index, filter) in filters.iter().enumerate() {
        if index > 0 {
            write!(f, " {operator} ")?;
        }
        write!(f, "{filter}")?;
    }
    write!(f, ")")
}

impl fmt::Display for RevFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevFilter::All => write!(f, "ALL"),
            RevFilter::None => write!(f, "NONE"),
            RevFilter::Pattern(pattern) => write!(f, "{pattern}"),
            RevFilter::CommitTime(range) => write!(f, "{range}"),
            RevFilter::NoMerges => write!(f, "NO_MERGES"),
            RevFilter::OnlyMerges => write!(f, "ONLY_MERGES"),
            RevFilter::ReachableFrom(start) => {
                write!(f, "REACHABLE_FROM({})", start.to_short_oid())
            }
            RevFilter::MaxCount(limit) => write!(f, "{limit}"),
            RevFilter::Skip(skip) => write!(f, "{skip}"),
            RevFilter::Custom(predicate) => write!(f, "{}", predicate.describe()),
            RevFilter::And(a, b) => write!(f, "({a} AND {b})"),
            RevFilter::AndAll(filters) => write_list(f, filters, "AND"),
            RevFilter::Or(a, b) => write!(f, "({a} OR {b})"),
            RevFilter::OrAny(filters) => write_list(f, filters, "OR"),
            RevFilter::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}
