//! Git data structures and algorithms
//!
//! This module contains the core Git types and algorithms:
//!
//! - `log`: Commit history traversal and revision filters
//! - `objects`: Object ids and the commit object
//! - `pack`: Pack index and pack file formats

pub mod log;
pub mod objects;
pub mod pack;
