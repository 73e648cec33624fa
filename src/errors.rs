//! Error types for the object store and the revision walk
//!
//! Lookup misses are ordinary values (`Option` or `StoreError::NotFound`);
//! corruption and broken ancestry are structural failures that propagate to
//! the caller untouched. Nothing in this crate retries.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use thiserror::Error;

/// Errors raised by pack indexes, pack files and the object database
#[derive(Debug, Error)]
pub enum StoreError {
    /// bad magic, unsupported version, truncated data or trailer checksum mismatch
    #[error("corrupt pack index: {detail}")]
    CorruptIndex { detail: String },

    /// the pack data itself is malformed
    #[error("corrupt pack file: {detail}")]
    CorruptPack { detail: String },

    /// a capability the index format does not have, e.g. CRC32 on a version 1 index
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// the id is not present in the searched index or packs
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("object {oid} is a {found}, expected a {expected}")]
    UnexpectedType {
        oid: ObjectId,
        expected: ObjectType,
        found: ObjectType,
    },

    /// the object exists but its content could not be decoded
    #[error("invalid object {oid}: {source}")]
    InvalidObject {
        oid: ObjectId,
        #[source]
        source: anyhow::Error,
    },

    /// the same id was given twice to the index writer
    #[error("duplicate index entry: {0}")]
    DuplicateEntry(ObjectId),

    /// a version 2 index needs a CRC32 for every entry
    #[error("index entry {0} has no CRC32")]
    MissingCrc32(ObjectId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn corrupt_index(detail: impl Into<String>) -> Self {
        StoreError::CorruptIndex {
            detail: detail.into(),
        }
    }

    pub(crate) fn corrupt_pack(detail: impl Into<String>) -> Self {
        StoreError::CorruptPack {
            detail: detail.into(),
        }
    }
}

/// Invalid filter composition, raised when the filter is built
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("at least two filters are needed, got {got}")]
    TooFewFilters { got: usize },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors surfaced by a revision walk
#[derive(Debug, Error)]
pub enum WalkError {
    /// a commit reachable in history is absent from every registered pack
    #[error("missing object: {0}")]
    MissingObject(ObjectId),

    /// starts, hidden commits, filter and sort can only change before the first `next()`
    #[error("walk already started")]
    AlreadyStarted,

    #[error(transparent)]
    Store(#[from] StoreError),
}
