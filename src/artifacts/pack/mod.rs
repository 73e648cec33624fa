//! Pack storage formats
//!
//! - `index`: the sorted `.idx` side file (versions 1 and 2)
//! - `index_writer`: producing `.idx` files for known entries
//! - `pack_file`: reading and inflating `.pack` entries, including deltas
//! - `checksum`: SHA-1 trailers shared by both file kinds

pub mod checksum;
pub mod index;
pub mod index_writer;
pub mod pack_file;
