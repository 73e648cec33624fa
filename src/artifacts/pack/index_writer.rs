//! Pack index writer for versions 1 and 2
//!
//! Pack *data* is never written here; the writer only produces the sorted
//! `.idx` side file for a pack whose entries (id, offset, CRC32) are known.

use crate::artifacts::pack::checksum::{CHECKSUM_SIZE, Checksum};
use crate::artifacts::pack::index::{INDEX_V2_MAGIC, LARGE_OFFSET_FLAG, PackIndexEntry};
use crate::errors::StoreError;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackIndexWriter {
    version: u32,
}

impl PackIndexWriter {
    pub fn new(version: u32) -> Self {
        PackIndexWriter { version }
    }

    /// Version 1 when every offset fits in 32 bits, version 2 otherwise
    pub fn oldest_possible_format(entries: &[PackIndexEntry]) -> Self {
        let needs_large_offsets = entries
            .iter()
            .any(|entry| entry.offset > u32::MAX as u64);

        Self::new(if needs_large_offsets { 2 } else { 1 })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Sort `entries` by id and write the index, returning its trailing checksum
    pub fn write<W: Write>(
        &self,
        writer: W,
        mut entries: Vec<PackIndexEntry>,
        pack_checksum: [u8; CHECKSUM_SIZE],
    ) -> Result<[u8; CHECKSUM_SIZE], StoreError> {
        entries.sort_by(|a, b| a.oid.cmp(&b.oid));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].oid == pair[1].oid) {
            return Err(StoreError::DuplicateEntry(pair[0].oid));
        }

        let mut out = Checksum::new(writer);
        match self.version {
            1 => Self::write_v1(&mut out, &entries)?,
            2 => Self::write_v2(&mut out, &entries)?,
            _ => {
                return Err(StoreError::UnsupportedOperation(
                    "only pack index versions 1 and 2 can be written",
                ));
            }
        }
        out.write(&pack_checksum)?;

        let (_, index_checksum) = out.write_checksum()?;
        Ok(index_checksum)
    }

    fn write_fanout<W: Write>(
        out: &mut Checksum<W>,
        entries: &[PackIndexEntry],
    ) -> Result<(), StoreError> {
        let mut counts = [0u32; 256];
        for entry in entries {
            counts[entry.oid.first_byte() as usize] += 1;
        }

        let mut cumulative = 0u32;
        for count in counts {
            cumulative += count;
            out.write_u32(cumulative)?;
        }
        Ok(())
    }

    fn write_v1<W: Write>(
        out: &mut Checksum<W>,
        entries: &[PackIndexEntry],
    ) -> Result<(), StoreError> {
        if entries.iter().any(|entry| entry.offset > u32::MAX as u64) {
            return Err(StoreError::UnsupportedOperation(
                "version 1 pack indexes cannot store offsets beyond 4 GiB",
            ));
        }

        Self::write_fanout(out, entries)?;
        for entry in entries {
            out.write_u32(entry.offset as u32)?;
            out.write(entry.oid.as_bytes())?;
        }
        Ok(())
    }

    fn write_v2<W: Write>(
        out: &mut Checksum<W>,
        entries: &[PackIndexEntry],
    ) -> Result<(), StoreError> {
        out.write(&INDEX_V2_MAGIC)?;
        out.write_u32(2)?;
        Self::write_fanout(out, entries)?;

        for entry in entries {
            out.write(entry.oid.as_bytes())?;
        }
        for entry in entries {
            let crc32 = entry.crc32.ok_or(StoreError::MissingCrc32(entry.oid))?;
            out.write_u32(crc32)?;
        }

        let mut large_offsets = Vec::new();
        for entry in entries {
            if entry.offset < LARGE_OFFSET_FLAG as u64 {
                out.write_u32(entry.offset as u32)?;
            } else {
                out.write_u32(LARGE_OFFSET_FLAG | large_offsets.len() as u32)?;
                large_offsets.push(entry.offset);
            }
        }
        for offset in large_offsets {
            out.write(&offset.to_be_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_id::ObjectId;

    fn entry(byte: u8, offset: u64) -> PackIndexEntry {
        PackIndexEntry::new(ObjectId::from_bytes([byte; 20]), offset, Some(byte as u32))
    }

    #[test]
    fn picks_version_one_for_small_packs() {
        let entries = [entry(1, 12), entry(2, u32::MAX as u64)];
        assert_eq!(PackIndexWriter::oldest_possible_format(&entries).version(), 1);
    }

    #[test]
    fn picks_version_two_beyond_four_gib() {
        let entries = [entry(1, 12), entry(2, u32::MAX as u64 + 1)];
        assert_eq!(PackIndexWriter::oldest_possible_format(&entries).version(), 2);
    }

    #[test]
    fn version_one_rejects_large_offsets() {
        let result = PackIndexWriter::new(1).write(
            Vec::new(),
            vec![entry(1, 1 << 33)],
            [0; CHECKSUM_SIZE],
        );
        assert!(matches!(result, Err(StoreError::UnsupportedOperation(_))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = PackIndexWriter::new(2).write(
            Vec::new(),
            vec![entry(7, 12), entry(7, 40)],
            [0; CHECKSUM_SIZE],
        );
        assert!(matches!(result, Err(StoreError::DuplicateEntry(_))));
    }

    #[test]
    fn version_two_requires_crc() {
        let mut without_crc = entry(3, 12);
        without_crc.crc32 = None;

        let result = PackIndexWriter::new(2).write(Vec::new(), vec![without_crc], [0; CHECKSUM_SIZE]);
        assert!(matches!(result, Err(StoreError::MissingCrc32(_))));
    }

    #[test]
    fn writes_expected_sizes() {
        let entries = vec![entry(9, 12), entry(1, 40), entry(5, 1 << 31)];

        let mut v1 = Vec::new();
        PackIndexWriter::new(1)
            .write(&mut v1, entries.clone(), [0; CHECKSUM_SIZE])
            .unwrap();
        assert_eq!(v1.len(), 1024 + 3 * 24 + 40);

        let mut v2 = Vec::new();
        PackIndexWriter::new(2)
            .write(&mut v2, entries, [0; CHECKSUM_SIZE])
            .unwrap();
        assert_eq!(v2.len(), 8 + 1024 + 3 * (20 + 4 + 4) + 8 + 40);
    }
}
