//! Object storage components
//!
//! - `pack`: one pack file paired with its index
//! - `resolver`: ordered search of an id across packs
//! - `database`: object loading and commit parsing on top of the resolver

pub mod database;
pub mod pack;
pub mod resolver;
