//! Pack index reading and writing, object resolution across packs, and
//! filtered revision walks over the commit graph stored in them.

pub mod areas;
pub mod artifacts;
pub mod errors;
