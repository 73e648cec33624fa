use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::index::PackIndex;
use crate::artifacts::pack::pack_file::{PackFile, RawObject};
use crate::errors::StoreError;
use std::path::Path;
use std::sync::OnceLock;

/// A pack file paired with its index
///
/// Immutable once opened, so it can be shared between threads and walks.
#[derive(Debug)]
pub struct Pack {
    name: String,
    index: PackIndex,
    file: PackFile,
    /// entry offsets in ascending order, built on first CRC check
    sorted_offsets: OnceLock<Vec<u64>>,
}

impl Pack {
    /// Pair an index with its pack data; both must name the same pack checksum
    pub fn new(name: impl Into<String>, index: PackIndex, file: PackFile) -> Result<Self, StoreError> {
        if index.pack_checksum() != file.checksum() {
            return Err(StoreError::corrupt_pack(
                "pack checksum does not match the one recorded in its index",
            ));
        }

        Ok(Pack {
            name: name.into(),
            index,
            file,
            sorted_offsets: OnceLock::new(),
        })
    }

    /// Open `<name>.idx` and the `<name>.pack` next to it
    pub fn open(index_path: &Path) -> Result<Self, StoreError> {
        let name = index_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let index = PackIndex::open(index_path)?;
        let file = PackFile::open(&index_path.with_extension("pack"))?;

        Self::new(name, index, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Hash the whole pack file against its trailer
    pub fn verify(&self) -> Result<(), StoreError> {
        self.file.verify()
    }

    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.index.find_offset(oid)
    }

    /// Inflate the entry at `offset`; reference-delta bases resolve through this pack's index
    pub fn read_at(&self, offset: u64) -> Result<RawObject, StoreError> {
        self.file
            .read_raw(offset, |base| self.index.find_offset(base))
    }

    /// Recompute the CRC32 of the stored entry and compare it with the index
    pub fn verify_crc32(&self, oid: &ObjectId) -> Result<bool, StoreError> {
        let expected = self.index.find_crc32(oid)?;
        let start = self.find_offset(oid).ok_or(StoreError::NotFound(*oid))?;

        let offsets = self.sorted_offsets.get_or_init(|| {
            let mut offsets: Vec<u64> = self.index.entries().map(|entry| entry.offset).collect();
            offsets.sort_unstable();
            offsets
        });
        let next = offsets.partition_point(|&offset| offset <= start);
        let end = offsets
            .get(next)
            .copied()
            .unwrap_or_else(|| self.file.data_end());

        Ok(self.file.entry_crc32(start, end)? == expected)
    }
}
