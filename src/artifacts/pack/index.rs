//! Pack index (`.idx`) reader, versions 1 and 2
//!
//! A pack index maps object ids to byte offsets inside the matching `.pack` file.
//! Both layouts start with a 256-entry fan-out table of cumulative counts keyed
//! by the first id byte, so a lookup narrows to one bucket in O(1) and then
//! binary searches inside it.
//!
//! # Layout (v1)
//! ```text
//! +------------------+
//! | Fanout (1024B)   |  256 * u32 BE cumulative counts
//! +------------------+
//! | Entries          |  N * (offset u32 BE + id 20B), sorted by id
//! +------------------+
//! | Pack checksum    |  20B
//! | Index checksum   |  20B, SHA-1 of everything above
//! +------------------+
//! ```
//!
//! # Layout (v2)
//! ```text
//! +------------------+
//! | Magic (4B)       |  0xff 't' 'O' 'c'
//! | Version (4B)     |  u32 BE 2
//! | Fanout (1024B)   |
//! | Ids              |  N * 20B, sorted
//! | CRC32s           |  N * u32 BE
//! | Offsets          |  N * u32 BE, MSB set = position in the 64-bit table
//! | 64-bit offsets   |  M * u64 BE
//! | Pack checksum    |  20B
//! | Index checksum   |  20B
//! +------------------+
//! ```
//!
//! Every structural check happens in `parse`: a `PackIndex` value is always
//! safe to query.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::artifacts::pack::checksum::{self, CHECKSUM_SIZE};
use crate::errors::StoreError;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use derive_new::new;
use std::cmp::Ordering;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Magic bytes opening every index of version 2 or later
pub const INDEX_V2_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const INDEX_V2_HEADER_SIZE: usize = 8;
const FANOUT_ENTRIES: usize = 256;
const FANOUT_SIZE: usize = FANOUT_ENTRIES * 4;
const V1_ENTRY_SIZE: usize = 4 + OBJECT_ID_LENGTH;
const TRAILER_SIZE: usize = 2 * CHECKSUM_SIZE;
/// MSB of a v2 offset: the remaining bits index the 64-bit offset table
pub(crate) const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// One object of a pack index
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct PackIndexEntry {
    pub oid: ObjectId,
    pub offset: u64,
    /// CRC32 of the compressed pack entry; always `None` for version 1
    pub crc32: Option<u32>,
}

/// 256-way first-byte fan-out of cumulative object counts
#[derive(Debug, Clone)]
struct Fanout {
    counts: [u32; FANOUT_ENTRIES],
}

impl Fanout {
    fn parse(table: &[u8]) -> Result<Self, StoreError> {
        let mut counts = [0u32; FANOUT_ENTRIES];
        BigEndian::read_u32_into(table, &mut counts);

        if counts.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(StoreError::corrupt_index("fan-out table is not monotonic"));
        }

        Ok(Fanout { counts })
    }

    fn object_count(&self) -> u32 {
        self.counts[FANOUT_ENTRIES - 1]
    }

    /// Positions of all ids whose first byte is `first_byte`
    fn bucket(&self, first_byte: u8) -> Range<u32> {
        let end = self.counts[first_byte as usize];
        let start = match first_byte {
            0 => 0,
            byte => self.counts[byte as usize - 1],
        };
        start..end
    }
}

#[derive(Debug, Clone)]
pub struct PackIndexV1 {
    data: Bytes,
    fanout: Fanout,
}

impl PackIndexV1 {
    fn parse(data: Bytes) -> Result<Self, StoreError> {
        if data.len() < FANOUT_SIZE + TRAILER_SIZE {
            return Err(StoreError::corrupt_index("file too small for a version 1 index"));
        }

        let fanout = Fanout::parse(&data[..FANOUT_SIZE])?;
        let expected_len = FANOUT_SIZE as u64
            + fanout.object_count() as u64 * V1_ENTRY_SIZE as u64
            + TRAILER_SIZE as u64;
        if data.len() as u64 != expected_len {
            return Err(StoreError::corrupt_index(format!(
                "version 1 index is {} bytes, fan-out implies {expected_len}",
                data.len()
            )));
        }

        Ok(PackIndexV1 { data, fanout })
    }

    fn entry_bytes(&self, position: u32) -> &[u8] {
        let start = FANOUT_SIZE + position as usize * V1_ENTRY_SIZE;
        &self.data[start..start + V1_ENTRY_SIZE]
    }

    fn oid_bytes_at(&self, position: u32) -> &[u8] {
        &self.entry_bytes(position)[4..]
    }

    fn offset_at(&self, position: u32) -> u64 {
        BigEndian::read_u32(&self.entry_bytes(position)[..4]) as u64
    }
}

#[derive(Debug, Clone)]
pub struct PackIndexV2 {
    data: Bytes,
    fanout: Fanout,
    crc_start: usize,
    offsets_start: usize,
    large_offsets_start: usize,
    large_offset_count: u32,
}

impl PackIndexV2 {
    const IDS_START: usize = INDEX_V2_HEADER_SIZE + FANOUT_SIZE;

    fn parse(data: Bytes) -> Result<Self, StoreError> {
        if data.len() < Self::IDS_START + TRAILER_SIZE {
            return Err(StoreError::corrupt_index("file too small for a version 2 index"));
        }

        let fanout = Fanout::parse(&data[INDEX_V2_HEADER_SIZE..Self::IDS_START])?;
        let count = fanout.object_count() as usize;

        let crc_start = Self::IDS_START + count * OBJECT_ID_LENGTH;
        let offsets_start = crc_start + count * 4;
        let large_offsets_start = offsets_start + count * 4;
        let trailer_start = data.len() - TRAILER_SIZE;

        if large_offsets_start > trailer_start {
            return Err(StoreError::corrupt_index(format!(
                "version 2 index truncated: {count} objects need at least {} bytes",
                large_offsets_start + TRAILER_SIZE
            )));
        }

        let large_table_len = trailer_start - large_offsets_start;
        if large_table_len % 8 != 0 {
            return Err(StoreError::corrupt_index(
                "64-bit offset table is not a multiple of 8 bytes",
            ));
        }
        let large_offset_count = u32::try_from(large_table_len / 8)
            .map_err(|_| StoreError::corrupt_index("64-bit offset table too large"))?;

        let index = PackIndexV2 {
            data,
            fanout,
            crc_start,
            offsets_start,
            large_offsets_start,
            large_offset_count,
        };
        index.validate_large_offsets()?;

        Ok(index)
    }

    /// Every flagged offset must point inside the 64-bit table
    fn validate_large_offsets(&self) -> Result<(), StoreError> {
        for position in 0..self.fanout.object_count() {
            let raw = self.raw_offset_at(position);
            if raw & LARGE_OFFSET_FLAG != 0 && raw & !LARGE_OFFSET_FLAG >= self.large_offset_count
            {
                return Err(StoreError::corrupt_index(format!(
                    "64-bit offset slot {} out of bounds ({} slots)",
                    raw & !LARGE_OFFSET_FLAG,
                    self.large_offset_count
                )));
            }
        }
        Ok(())
    }

    fn oid_bytes_at(&self, position: u32) -> &[u8] {
        let start = Self::IDS_START + position as usize * OBJECT_ID_LENGTH;
        &self.data[start..start + OBJECT_ID_LENGTH]
    }

    fn crc32_at(&self, position: u32) -> u32 {
        BigEndian::read_u32(&self.data[self.crc_start + position as usize * 4..])
    }

    fn raw_offset_at(&self, position: u32) -> u32 {
        BigEndian::read_u32(&self.data[self.offsets_start + position as usize * 4..])
    }

    fn offset_at(&self, position: u32) -> u64 {
        let raw = self.raw_offset_at(position);
        if raw & LARGE_OFFSET_FLAG == 0 {
            return raw as u64;
        }

        // the flag is a sentinel, never part of the offset value
        let slot = (raw & !LARGE_OFFSET_FLAG) as usize;
        BigEndian::read_u64(&self.data[self.large_offsets_start + slot * 8..])
    }
}

/// Sorted id → offset map of one pack, in either on-disk layout
#[derive(Debug, Clone)]
pub enum PackIndex {
    V1(PackIndexV1),
    V2(PackIndexV2),
}

impl PackIndex {
    /// Memory-map and parse an index file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: index files are immutable once written; the map is read-only
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let index = Self::parse(Bytes::from_owner(mmap))?;

        debug!(
            path = %path.display(),
            version = index.version(),
            objects = index.object_count(),
            "opened pack index"
        );
        Ok(index)
    }

    /// Parse an index held in memory, validating its layout and trailer checksum
    pub fn parse(data: Bytes) -> Result<Self, StoreError> {
        if data.len() < TRAILER_SIZE || !checksum::verify_trailer(&data) {
            return Err(StoreError::corrupt_index("index checksum mismatch"));
        }

        if data.len() >= INDEX_V2_HEADER_SIZE && data[..4] == INDEX_V2_MAGIC {
            let version = BigEndian::read_u32(&data[4..8]);
            return match version {
                2 => Ok(PackIndex::V2(PackIndexV2::parse(data)?)),
                other => Err(StoreError::corrupt_index(format!(
                    "unsupported index version {other}"
                ))),
            };
        }

        Ok(PackIndex::V1(PackIndexV1::parse(data)?))
    }

    pub fn version(&self) -> u32 {
        match self {
            PackIndex::V1(_) => 1,
            PackIndex::V2(_) => 2,
        }
    }

    fn fanout(&self) -> &Fanout {
        match self {
            PackIndex::V1(index) => &index.fanout,
            PackIndex::V2(index) => &index.fanout,
        }
    }

    fn data(&self) -> &Bytes {
        match self {
            PackIndex::V1(index) => &index.data,
            PackIndex::V2(index) => &index.data,
        }
    }

    fn oid_bytes_at(&self, position: u32) -> &[u8] {
        match self {
            PackIndex::V1(index) => index.oid_bytes_at(position),
            PackIndex::V2(index) => index.oid_bytes_at(position),
        }
    }

    fn oid_at(&self, position: u32) -> ObjectId {
        let mut raw = [0u8; OBJECT_ID_LENGTH];
        raw.copy_from_slice(self.oid_bytes_at(position));
        ObjectId::from_bytes(raw)
    }

    fn offset_at(&self, position: u32) -> u64 {
        match self {
            PackIndex::V1(index) => index.offset_at(position),
            PackIndex::V2(index) => index.offset_at(position),
        }
    }

    pub fn object_count(&self) -> u32 {
        self.fanout().object_count()
    }

    pub fn has_crc32_support(&self) -> bool {
        matches!(self, PackIndex::V2(_))
    }

    /// Number of entries stored through the 64-bit offset table
    pub fn large_offset_count(&self) -> u32 {
        match self {
            PackIndex::V1(_) => 0,
            PackIndex::V2(index) => index.large_offset_count,
        }
    }

    /// Position of `oid` in sorted order
    ///
    /// The fan-out picks the bucket of the first byte; binary search then
    /// compares only the remaining 19 bytes.
    pub fn find_position(&self, oid: &ObjectId) -> Option<u32> {
        let bucket = self.fanout().bucket(oid.first_byte());
        let needle = &oid.as_bytes()[1..];
        let (mut low, mut high) = (bucket.start, bucket.end);

        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid)[1..].cmp(needle) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Some(mid),
            }
        }

        None
    }

    /// Pack offset of `oid`, or `None` when this index does not hold it
    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.find_position(oid)
            .map(|position| self.offset_at(position))
    }

    pub fn has_object(&self, oid: &ObjectId) -> bool {
        self.find_position(oid).is_some()
    }

    /// CRC32 of the compressed pack entry for `oid`
    ///
    /// Version 1 indexes carry no CRC data and always answer `UnsupportedOperation`,
    /// whether or not the id is present.
    pub fn find_crc32(&self, oid: &ObjectId) -> Result<u32, StoreError> {
        match self {
            PackIndex::V1(_) => Err(StoreError::UnsupportedOperation(
                "version 1 pack indexes do not store CRC32 values",
            )),
            PackIndex::V2(index) => self
                .find_position(oid)
                .map(|position| index.crc32_at(position))
                .ok_or(StoreError::NotFound(*oid)),
        }
    }

    /// Entry at a sorted position
    ///
    /// # Panics
    ///
    /// Panics if `position >= object_count()`.
    pub fn entry_at(&self, position: u32) -> PackIndexEntry {
        let crc32 = match self {
            PackIndex::V1(_) => None,
            PackIndex::V2(index) => Some(index.crc32_at(position)),
        };

        PackIndexEntry::new(self.oid_at(position), self.offset_at(position), crc32)
    }

    /// All entries in ascending id order; each call starts from the beginning
    pub fn entries(&self) -> PackIndexEntries<'_> {
        PackIndexEntries {
            index: self,
            range: 0..self.object_count(),
        }
    }

    /// Ids in this index matching an abbreviated id, at most `limit` of them
    pub fn find_by_prefix(&self, prefix: &ObjectIdPrefix, limit: usize) -> Vec<ObjectId> {
        let range = match prefix.first_byte() {
            Some(first_byte) => self.fanout().bucket(first_byte),
            None => 0..self.object_count(),
        };

        // lower bound: first id not ordered before the prefix
        let (mut low, mut high) = (range.start, range.end);
        while low < high {
            let mid = low + (high - low) / 2;
            if prefix.cmp_id(&self.oid_at(mid)) == Ordering::Less {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        (low..range.end)
            .map(|position| self.oid_at(position))
            .take_while(|oid| prefix.matches(oid))
            .take(limit)
            .collect()
    }

    /// Checksum of the pack file this index describes
    pub fn pack_checksum(&self) -> [u8; CHECKSUM_SIZE] {
        let data = self.data();
        let start = data.len() - TRAILER_SIZE;
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&data[start..start + CHECKSUM_SIZE]);
        checksum
    }

    /// Checksum of the index file itself
    pub fn index_checksum(&self) -> [u8; CHECKSUM_SIZE] {
        let data = self.data();
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&data[data.len() - CHECKSUM_SIZE..]);
        checksum
    }
}

/// Restartable, finite iterator over the entries of a `PackIndex`
#[derive(Debug, Clone)]
pub struct PackIndexEntries<'i> {
    index: &'i PackIndex,
    range: Range<u32>,
}

impl Iterator for PackIndexEntries<'_> {
    type Item = PackIndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|position| self.index.entry_at(position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for PackIndexEntries<'_> {}

impl<'i> IntoIterator for &'i PackIndex {
    type Item = PackIndexEntry;
    type IntoIter = PackIndexEntries<'i>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::pack::index_writer::PackIndexWriter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    const PACK_CHECKSUM: [u8; 20] = [0x5a; 20];

    fn oid(byte: u8, tail: u8) -> ObjectId {
        let mut raw = [tail; 20];
        raw[0] = byte;
        ObjectId::from_bytes(raw)
    }

    fn build(version: u32, entries: &[PackIndexEntry]) -> PackIndex {
        let mut bytes = Vec::new();
        PackIndexWriter::new(version)
            .write(&mut bytes, entries.to_vec(), PACK_CHECKSUM)
            .unwrap();
        PackIndex::parse(Bytes::from(bytes)).unwrap()
    }

    fn sample_entries() -> Vec<PackIndexEntry> {
        vec![
            PackIndexEntry::new(oid(0x00, 0x00), 12, Some(0x1111)),
            PackIndexEntry::new(oid(0x4b, 0x01), 300, Some(0x2222)),
            PackIndexEntry::new(oid(0x4b, 0x02), 700, Some(0x3333)),
            PackIndexEntry::new(oid(0xff, 0xff), 900, Some(0x4444)),
        ]
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    fn extreme_ids_resolve_and_gaps_are_absent(#[case] version: u32) {
        let index = build(version, &sample_entries());

        assert_eq!(index.version(), version);
        assert_eq!(index.object_count(), 4);
        assert_eq!(index.find_offset(&oid(0x00, 0x00)), Some(12));
        assert_eq!(index.find_offset(&oid(0xff, 0xff)), Some(900));
        assert_eq!(index.find_offset(&oid(0x80, 0x00)), None);
        assert!(index.has_object(&oid(0x4b, 0x02)));
        assert!(!index.has_object(&oid(0x4b, 0x03)));
    }

    #[test]
    fn version_one_refuses_crc_lookups() {
        let index = build(1, &sample_entries());

        assert!(!index.has_crc32_support());
        for id in [oid(0x00, 0x00), oid(0x80, 0x00)] {
            assert!(matches!(
                index.find_crc32(&id),
                Err(StoreError::UnsupportedOperation(_))
            ));
        }
        assert!(index.entries().all(|entry| entry.crc32.is_none()));
    }

    #[test]
    fn version_two_reports_crc_or_not_found() {
        let index = build(2, &sample_entries());

        assert!(index.has_crc32_support());
        assert_eq!(index.find_crc32(&oid(0x4b, 0x02)).unwrap(), 0x3333);
        assert!(matches!(
            index.find_crc32(&oid(0x80, 0x00)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn large_offsets_go_through_overflow_table() {
        let entries = vec![
            PackIndexEntry::new(oid(0x10, 0x00), 1 << 31, Some(1)),
            PackIndexEntry::new(oid(0x20, 0x00), 0x7fff_ffff, Some(2)),
            PackIndexEntry::new(oid(0x30, 0x00), 0x0000_0012_3456_789a, Some(3)),
        ];
        let index = build(2, &entries);

        assert_eq!(index.large_offset_count(), 2);
        assert_eq!(index.find_offset(&oid(0x10, 0x00)), Some(1 << 31));
        assert_eq!(index.find_offset(&oid(0x20, 0x00)), Some(0x7fff_ffff));
        assert_eq!(
            index.find_offset(&oid(0x30, 0x00)),
            Some(0x0000_0012_3456_789a)
        );
    }

    #[test]
    fn entries_iteration_restarts() {
        let index = build(2, &sample_entries());

        let first: Vec<_> = index.entries().collect();
        let second: Vec<_> = (&index).into_iter().collect();

        assert_eq!(first, sample_entries());
        assert_eq!(first, second);
        assert_eq!(index.entries().len(), 4);
    }

    #[test]
    fn trailer_exposes_both_checksums() {
        let index = build(2, &sample_entries());
        let data = index.data().clone();

        assert_eq!(index.pack_checksum(), PACK_CHECKSUM);
        assert_eq!(index.index_checksum(), checksum::digest(&data[..data.len() - 20]));
    }

    #[test]
    fn prefix_search_returns_all_candidates() {
        let index = build(2, &sample_entries());

        let ambiguous = index.find_by_prefix(&ObjectIdPrefix::try_parse("4b").unwrap(), 10);
        assert_eq!(ambiguous, vec![oid(0x4b, 0x01), oid(0x4b, 0x02)]);

        let unique = index.find_by_prefix(&ObjectIdPrefix::try_parse("4b02").unwrap(), 10);
        assert_eq!(unique, vec![oid(0x4b, 0x02)]);

        let limited = index.find_by_prefix(&ObjectIdPrefix::try_parse("4").unwrap(), 1);
        assert_eq!(limited, vec![oid(0x4b, 0x01)]);

        assert!(index
            .find_by_prefix(&ObjectIdPrefix::try_parse("80").unwrap(), 10)
            .is_empty());
    }

    #[test]
    fn empty_index_is_valid() {
        let index = build(2, &[]);

        assert_eq!(index.object_count(), 0);
        assert_eq!(index.find_offset(&oid(0x00, 0x00)), None);
        assert_eq!(index.entries().count(), 0);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    fn corrupted_byte_fails_checksum(#[case] version: u32) {
        let mut bytes = Vec::new();
        PackIndexWriter::new(version)
            .write(&mut bytes, sample_entries(), PACK_CHECKSUM)
            .unwrap();
        bytes[FANOUT_SIZE / 2] ^= 0x40;

        assert!(matches!(
            PackIndex::parse(Bytes::from(bytes)),
            Err(StoreError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let mut bytes = Vec::new();
        PackIndexWriter::new(2)
            .write(&mut bytes, sample_entries(), PACK_CHECKSUM)
            .unwrap();
        bytes.truncate(bytes.len() / 2);

        assert!(matches!(
            PackIndex::parse(Bytes::from(bytes)),
            Err(StoreError::CorruptIndex { .. })
        ));
    }

    /// Re-seal a hand-edited body so only the structural checks can reject it
    fn with_valid_trailer(mut body: Vec<u8>) -> Bytes {
        body.extend_from_slice(&PACK_CHECKSUM);
        let trailer = checksum::digest(&body);
        body.extend_from_slice(&trailer);
        Bytes::from(body)
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let mut body = INDEX_V2_MAGIC.to_vec();
        body.extend_from_slice(&3u32.to_be_bytes());
        body.extend_from_slice(&[0u8; FANOUT_SIZE]);

        let error = PackIndex::parse(with_valid_trailer(body)).unwrap_err();
        assert!(error.to_string().contains("unsupported index version 3"));
    }

    #[test]
    fn non_monotonic_fanout_is_corrupt() {
        let mut body = vec![0u8; FANOUT_SIZE];
        // bucket 0 claims one object, every later bucket claims zero
        body[3] = 1;
        body.extend_from_slice(&[0u8; V1_ENTRY_SIZE]);

        assert!(matches!(
            PackIndex::parse(with_valid_trailer(body)),
            Err(StoreError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn dangling_large_offset_is_corrupt() {
        let mut body = INDEX_V2_MAGIC.to_vec();
        body.extend_from_slice(&2u32.to_be_bytes());
        let mut fanout = [0u8; FANOUT_SIZE];
        for bucket in 0..FANOUT_ENTRIES {
            fanout[bucket * 4..bucket * 4 + 4].copy_from_slice(&1u32.to_be_bytes());
        }
        body.extend_from_slice(&fanout);
        body.extend_from_slice(&[0u8; 20]);
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&LARGE_OFFSET_FLAG.to_be_bytes());

        let error = PackIndex::parse(with_valid_trailer(body)).unwrap_err();
        assert!(error.to_string().contains("out of bounds"));
    }

    proptest! {
        #[test]
        fn iteration_is_strictly_sorted_and_counted(
            ids in proptest::collection::btree_set(any::<[u8; 20]>(), 0..64),
            version in 1u32..=2,
        ) {
            let entries: Vec<_> = ids
                .iter()
                .enumerate()
                .map(|(i, raw)| PackIndexEntry::new(
                    ObjectId::from_bytes(*raw),
                    12 + i as u64 * 100,
                    (version == 2).then_some(i as u32),
                ))
                .collect();
            let index = build(version, &entries);

            let listed: Vec<ObjectId> = index.entries().map(|entry| entry.oid).collect();
            prop_assert_eq!(listed.len(), index.object_count() as usize);
            prop_assert!(listed.windows(2).all(|pair| pair[0] < pair[1]));

            for entry in &entries {
                prop_assert_eq!(index.find_offset(&entry.oid), Some(entry.offset));
            }
        }
    }
}
