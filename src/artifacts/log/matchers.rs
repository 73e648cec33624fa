//! Terminal revision filters
//!
//! Pure matchers decide from the commit alone (and the walk's side table), so
//! cloning them is a plain copy. Stateful matchers count what they have seen;
//! cloning one yields a fresh counter so a reused filter tree starts every walk
//! from zero.

use crate::artifacts::log::walk_state::WalkState;
use crate::artifacts::objects::commit::Commit;
use regex::Regex;
use std::fmt;

/// Which identity line a pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    /// `name <email>` of the author
    Author,
    /// `name <email>` of the committer
    Committer,
    /// full commit message
    Message,
}

/// Regex search over one commit field (pure)
#[derive(Debug, Clone)]
pub struct PatternMatch {
    field: PatternField,
    pattern: Regex,
}

impl PatternMatch {
    pub fn new(field: PatternField, pattern: &str) -> Result<Self, regex::Error> {
        Ok(PatternMatch {
            field,
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn include(&self, commit: &Commit) -> bool {
        match self.field {
            PatternField::Author => self.pattern.is_match(&commit.author().display_name()),
            PatternField::Committer => self.pattern.is_match(&commit.committer().display_name()),
            PatternField::Message => self.pattern.is_match(commit.message()),
        }
    }
}

impl fmt::Display for PatternMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.field {
            PatternField::Author => "AUTHOR",
            PatternField::Committer => "COMMITTER",
            PatternField::Message => "MESSAGE",
        };
        write!(f, "{label}({})", self.pattern.as_str())
    }
}

/// Inclusive commit-time window in seconds since the epoch (pure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitTimeRange {
    since: Option<i64>,
    until: Option<i64>,
}

impl CommitTimeRange {
    pub fn before(until: i64) -> Self {
        CommitTimeRange {
            since: None,
            until: Some(until),
        }
    }

    pub fn after(since: i64) -> Self {
        CommitTimeRange {
            since: Some(since),
            until: None,
        }
    }

    pub fn between(since: i64, until: i64) -> Self {
        CommitTimeRange {
            since: Some(since),
            until: Some(until),
        }
    }

    pub fn include(&self, commit: &Commit) -> bool {
        let time = commit.commit_time();
        self.since.is_none_or(|since| time >= since) && self.until.is_none_or(|until| time <= until)
    }
}

fn format_time(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| seconds.to_string())
}

impl fmt::Display for CommitTimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.since, self.until) {
            (Some(since), Some(until)) => write!(
                f,
                "COMMIT_TIME_BETWEEN({}, {})",
                format_time(since),
                format_time(until)
            ),
            (Some(since), None) => write!(f, "COMMIT_TIME_AFTER({})", format_time(since)),
            (None, Some(until)) => write!(f, "COMMIT_TIME_BEFORE({})", format_time(until)),
            (None, None) => write!(f, "COMMIT_TIME_ANY"),
        }
    }
}

/// Accepts the first `limit` commits offered to it (stateful)
#[derive(Debug)]
pub struct MaxCount {
    limit: usize,
    seen: usize,
}

impl MaxCount {
    pub fn new(limit: usize) -> Self {
        MaxCount { limit, seen: 0 }
    }

    pub fn include(&mut self) -> bool {
        if self.seen >= self.limit {
            return false;
        }
        self.seen += 1;
        true
    }

    /// Whether the limit has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.seen >= self.limit
    }
}

impl Clone for MaxCount {
    /// The clone starts with a fresh counter
    fn clone(&self) -> Self {
        Self::new(self.limit)
    }
}

impl fmt::Display for MaxCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAX_COUNT({})", self.limit)
    }
}

/// Rejects the first `count` commits offered to it (stateful)
#[derive(Debug)]
pub struct Skip {
    count: usize,
    seen: usize,
}

impl Skip {
    pub fn new(count: usize) -> Self {
        Skip { count, seen: 0 }
    }

    pub fn include(&mut self) -> bool {
        if self.seen < self.count {
            self.seen += 1;
            return false;
        }
        true
    }
}

impl Clone for Skip {
    /// The clone starts with a fresh counter
    fn clone(&self) -> Self {
        Self::new(self.count)
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SKIP({})", self.count)
    }
}

/// Caller-defined matcher plugged into the filter algebra
///
/// `clone_box` decides whether state is copied, reset or shared (e.g. through an
/// `Arc` the caller holds on to).
pub trait CommitPredicate: fmt::Debug + Send {
    fn include(&mut self, state: &WalkState, commit: &Commit) -> bool;

    fn clone_box(&self) -> Box<dyn CommitPredicate>;

    fn describe(&self) -> String;
}

impl Clone for Box<dyn CommitPredicate> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
