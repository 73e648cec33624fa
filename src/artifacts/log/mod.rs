//! Commit history traversal
//!
//! - `rev_walk`: pull-based walk over the commit graph, ordered by a comparator
//! - `rev_filter`: composable filters deciding which commits a walk emits
//! - `matchers`: the terminal filters (patterns, time windows, counters)
//! - `walk_state`: per-walk flags kept beside, never on, the commits

pub mod matchers;
pub mod rev_filter;
pub mod rev_walk;
pub mod walk_state;
