//! Git object types and operations
//!
//! Git stores all content as objects identified by SHA-1 hashes. Only the pieces
//! the object store and the revision walk need are modelled here:
//!
//! - **ObjectId**: 20-byte identity key, plus abbreviated prefixes
//! - **ObjectType**: commit, tree, blob or tag
//! - **Commit**: parsed commit headers (parents, author, committer, message)

pub mod commit;
pub mod object_id;
pub mod object_type;

/// Length of a SHA-1 hash in bytes
pub const OBJECT_ID_LENGTH: usize = 20;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_HEX_LENGTH: usize = 40;
