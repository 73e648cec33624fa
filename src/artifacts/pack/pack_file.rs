//! Read-only access to `.pack` data
//!
//! A pack is a 12-byte header (`PACK`, version, object count), a sequence of
//! zlib-compressed entries, and a SHA-1 trailer. Entries are addressed by the
//! byte offsets recorded in the pack index.
//!
//! Entry header: `1TTTSSSS` continuation-encoded size, type `T`:
//! 1 commit, 2 tree, 3 blob, 4 tag, 6 offset delta, 7 reference delta.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::checksum::{self, CHECKSUM_SIZE};
use crate::errors::StoreError;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};

const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const PACK_HEADER_SIZE: usize = 12;
const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;
/// Longest delta chain followed before giving up
const MAX_DELTA_CHAIN: usize = 4096;
/// Upper bound on preallocation per input byte; declared sizes are untrusted
const PREALLOCATE_RATIO: usize = 4;

/// Fully inflated object content, deltas already applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub object_type: ObjectType,
    pub data: Bytes,
}

/// How the body at some offset is encoded
enum EntryKind {
    Base(ObjectType),
    OffsetDelta { base_offset: u64 },
    RefDelta { base: ObjectId },
}

struct EntryHeader {
    kind: EntryKind,
    size: usize,
    /// position of the zlib stream
    data_start: usize,
}

#[derive(Debug, Clone)]
pub struct PackFile {
    data: Bytes,
    version: u32,
    object_count: u32,
}

impl PackFile {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: pack files are never modified in place; the map is read-only
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let pack = Self::parse(Bytes::from_owner(mmap))?;

        debug!(
            path = %path.display(),
            version = pack.version,
            objects = pack.object_count,
            "opened pack file"
        );
        Ok(pack)
    }

    /// Check the header; the trailer is only hashed by [`PackFile::verify`]
    pub fn parse(data: Bytes) -> Result<Self, StoreError> {
        if data.len() < PACK_HEADER_SIZE + CHECKSUM_SIZE {
            return Err(StoreError::corrupt_pack("file too small"));
        }
        if &data[..4] != PACK_SIGNATURE {
            return Err(StoreError::corrupt_pack("missing PACK signature"));
        }

        let version = BigEndian::read_u32(&data[4..8]);
        if version != 2 && version != 3 {
            return Err(StoreError::corrupt_pack(format!(
                "unsupported pack version {version}"
            )));
        }
        let object_count = BigEndian::read_u32(&data[8..12]);
        Ok(PackFile {
            data,
            version,
            object_count,
        })
    }

    /// Hash every byte before the trailer and compare with it
    pub fn verify(&self) -> Result<(), StoreError> {
        if !checksum::verify_trailer(&self.data) {
            return Err(StoreError::corrupt_pack("pack checksum mismatch"));
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Trailing SHA-1, which the matching index repeats as its pack checksum
    pub fn checksum(&self) -> [u8; CHECKSUM_SIZE] {
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&self.data[self.data_end() as usize..]);
        checksum
    }

    /// Offset one past the last entry byte
    pub fn data_end(&self) -> u64 {
        (self.data.len() - CHECKSUM_SIZE) as u64
    }

    /// CRC32 of the raw entry bytes in `start..end` (header plus compressed body)
    pub fn entry_crc32(&self, start: u64, end: u64) -> Result<u32, StoreError> {
        if start < PACK_HEADER_SIZE as u64 || start >= end || end > self.data_end() {
            return Err(StoreError::corrupt_pack(format!(
                "entry range {start}..{end} outside pack data"
            )));
        }
        Ok(crc32fast::hash(&self.data[start as usize..end as usize]))
    }

    /// Inflate the object at `offset`, resolving delta chains
    ///
    /// `locate` maps the base id of a reference delta to its offset in this pack.
    pub fn read_raw<F>(&self, offset: u64, locate: F) -> Result<RawObject, StoreError>
    where
        F: Fn(&ObjectId) -> Option<u64>,
    {
        let mut deltas = Vec::new();
        let mut current = offset;

        let (object_type, mut data) = loop {
            if deltas.len() > MAX_DELTA_CHAIN {
                return Err(StoreError::corrupt_pack(format!(
                    "delta chain at offset {offset} is longer than {MAX_DELTA_CHAIN}"
                )));
            }

            let header = self.read_header(current)?;
            let body = self.inflate(&header)?;
            match header.kind {
                EntryKind::Base(object_type) => break (object_type, body),
                EntryKind::OffsetDelta { base_offset } => {
                    trace!(offset = current, base_offset, "following offset delta");
                    deltas.push(body);
                    current = base_offset;
                }
                EntryKind::RefDelta { base } => {
                    trace!(offset = current, base = %base, "following reference delta");
                    deltas.push(body);
                    current = locate(&base).ok_or_else(|| {
                        StoreError::corrupt_pack(format!("delta base {base} is not in this pack"))
                    })?;
                }
            }
        };

        while let Some(delta) = deltas.pop() {
            data = apply_delta(&data, &delta)?;
        }

        Ok(RawObject {
            object_type,
            data: Bytes::from(data),
        })
    }

    fn byte_at(&self, position: usize) -> Result<u8, StoreError> {
        if position >= self.data_end() as usize {
            return Err(StoreError::corrupt_pack(format!(
                "entry header runs past pack data at {position}"
            )));
        }
        Ok(self.data[position])
    }

    fn read_header(&self, offset: u64) -> Result<EntryHeader, StoreError> {
        if offset < PACK_HEADER_SIZE as u64 || offset >= self.data_end() {
            return Err(StoreError::corrupt_pack(format!(
                "offset {offset} outside pack data"
            )));
        }

        let mut position = offset as usize;
        let mut byte = self.byte_at(position)?;
        position += 1;

        let type_code = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as usize;
        let mut shift = 4;
        while byte & 0x80 != 0 {
            byte = self.byte_at(position)?;
            position += 1;
            if shift > usize::BITS - 7 {
                return Err(StoreError::corrupt_pack("entry size overflows"));
            }
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
        }

        let kind = match type_code {
            OFS_DELTA => {
                byte = self.byte_at(position)?;
                position += 1;
                let mut distance = (byte & 0x7f) as u64;
                while byte & 0x80 != 0 {
                    byte = self.byte_at(position)?;
                    position += 1;
                    distance = distance
                        .checked_add(1)
                        .and_then(|d| d.checked_mul(128))
                        .ok_or_else(|| StoreError::corrupt_pack("delta distance overflows"))?
                        | (byte & 0x7f) as u64;
                }
                let base_offset = offset.checked_sub(distance).filter(|_| distance > 0);
                EntryKind::OffsetDelta {
                    base_offset: base_offset.ok_or_else(|| {
                        StoreError::corrupt_pack(format!(
                            "offset delta at {offset} points outside the pack"
                        ))
                    })?,
                }
            }
            REF_DELTA => {
                let end = position + OBJECT_ID_LENGTH;
                if end > self.data_end() as usize {
                    return Err(StoreError::corrupt_pack("reference delta base truncated"));
                }
                let base = ObjectId::try_from_slice(&self.data[position..end])
                    .map_err(|e| StoreError::corrupt_pack(e.to_string()))?;
                position = end;
                EntryKind::RefDelta { base }
            }
            code => EntryKind::Base(ObjectType::from_pack_code(code).ok_or_else(|| {
                StoreError::corrupt_pack(format!("invalid object type {code} at {offset}"))
            })?),
        };

        Ok(EntryHeader {
            kind,
            size,
            data_start: position,
        })
    }

    fn inflate(&self, header: &EntryHeader) -> Result<Vec<u8>, StoreError> {
        let compressed = &self.data[header.data_start..self.data_end() as usize];
        let mut decoder = flate2::read::ZlibDecoder::new(compressed);
        let mut inflated =
            Vec::with_capacity(header.size.min(compressed.len().saturating_mul(PREALLOCATE_RATIO)));
        decoder
            .by_ref()
            .take((header.size as u64).saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(|e| StoreError::corrupt_pack(format!("unable to inflate entry: {e}")))?;

        if inflated.len() != header.size {
            return Err(StoreError::corrupt_pack(format!(
                "inflated {} bytes, header declares {}",
                inflated.len(),
                header.size
            )));
        }
        Ok(inflated)
    }
}

/// Read a little-endian base-128 size from the head of a delta
fn read_delta_size(delta: &[u8], position: &mut usize) -> Result<usize, StoreError> {
    let mut size = 0usize;
    let mut shift = 0;
    loop {
        let byte = *delta
            .get(*position)
            .ok_or_else(|| StoreError::corrupt_pack("delta header truncated"))?;
        *position += 1;
        if shift > usize::BITS - 7 {
            return Err(StoreError::corrupt_pack("delta size overflows"));
        }
        size |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

/// Rebuild a target from `base` and a Git delta (copy/insert instructions)
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut position = 0;
    let base_size = read_delta_size(delta, &mut position)?;
    let result_size = read_delta_size(delta, &mut position)?;
    if base_size != base.len() {
        return Err(StoreError::corrupt_pack(format!(
            "delta expects a {base_size} byte base, found {}",
            base.len()
        )));
    }

    let truncated = || StoreError::corrupt_pack("delta instructions truncated");
    let limit = (base.len() + delta.len()).saturating_mul(PREALLOCATE_RATIO);
    let mut result = Vec::with_capacity(result_size.min(limit));
    while position < delta.len() {
        if result.len() > result_size {
            return Err(StoreError::corrupt_pack(format!(
                "delta output exceeds its declared {result_size} bytes"
            )));
        }

        let command = delta[position];
        position += 1;

        if command & 0x80 != 0 {
            let mut copy_offset = 0usize;
            let mut copy_size = 0usize;
            for bit in 0..4 {
                if command & (1 << bit) != 0 {
                    copy_offset |= (*delta.get(position).ok_or_else(truncated)? as usize) << (8 * bit);
                    position += 1;
                }
            }
            for bit in 0..3 {
                if command & (0x10 << bit) != 0 {
                    copy_size |= (*delta.get(position).ok_or_else(truncated)? as usize) << (8 * bit);
                    position += 1;
                }
            }
            if copy_size == 0 {
                copy_size = 0x10000;
            }

            let source = base
                .get(copy_offset..copy_offset + copy_size)
                .ok_or_else(|| StoreError::corrupt_pack("delta copies outside its base"))?;
            result.extend_from_slice(source);
        } else if command != 0 {
            let literal = delta
                .get(position..position + command as usize)
                .ok_or_else(truncated)?;
            result.extend_from_slice(literal);
            position += command as usize;
        } else {
            return Err(StoreError::corrupt_pack("delta opcode 0 is reserved"));
        }
    }

    if result.len() != result_size {
        return Err(StoreError::corrupt_pack(format!(
            "delta produced {} bytes, expected {result_size}",
            result.len()
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::pack::checksum::Checksum;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn entry_header(type_code: u8, size: usize) -> Vec<u8> {
        let mut header = Vec::new();
        let mut byte = (type_code << 4) | (size & 0x0f) as u8;
        let mut rest = size >> 4;
        while rest != 0 {
            header.push(byte | 0x80);
            byte = (rest & 0x7f) as u8;
            rest >>= 7;
        }
        header.push(byte);
        header
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn ofs_distance(mut distance: u64) -> Vec<u8> {
        let mut bytes = vec![(distance & 0x7f) as u8];
        distance >>= 7;
        while distance != 0 {
            distance -= 1;
            bytes.push(0x80 | (distance & 0x7f) as u8);
            distance >>= 7;
        }
        bytes.reverse();
        bytes
    }

    /// Pack with a blob at the first offset and an offset delta against it at the second
    fn blob_and_delta_pack(base: &[u8], delta: &[u8]) -> (PackFile, u64, u64) {
        let mut body = Vec::new();
        body.extend_from_slice(b"PACK");
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&2u32.to_be_bytes());

        let base_offset = body.len() as u64;
        body.extend(entry_header(3, base.len()));
        body.extend(deflate(base));

        let delta_offset = body.len() as u64;
        body.extend(entry_header(OFS_DELTA, delta.len()));
        body.extend(ofs_distance(delta_offset - base_offset));
        body.extend(deflate(delta));

        let mut out = Checksum::new(Vec::new());
        out.write(&body).unwrap();
        let (bytes, _) = out.write_checksum().unwrap();

        (PackFile::parse(Bytes::from(bytes)).unwrap(), base_offset, delta_offset)
    }

    #[test]
    fn applies_copy_and_insert_instructions() {
        let base = b"hello delta world";
        // size 17 -> 15: copy "hello " (offset 0, size 6), insert "big ", copy "world" (offset 12, size 5)
        let mut delta = vec![17, 15];
        delta.extend([0x90, 6]);
        delta.extend([4, b'b', b'i', b'g', b' ']);
        delta.extend([0x91, 12, 5]);

        assert_eq!(apply_delta(base, &delta).unwrap(), b"hello big world");
    }

    #[test]
    fn rejects_delta_against_wrong_base() {
        let delta = vec![3, 1, 1, b'x'];
        assert!(apply_delta(b"toolong", &delta).is_err());
    }

    fn delta_size(mut size: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        loop {
            let byte = (size & 0x7f) as u8;
            size >>= 7;
            if size == 0 {
                bytes.push(byte);
                return bytes;
            }
            bytes.push(byte | 0x80);
        }
    }

    #[test]
    fn oversized_entry_header_is_corrupt_not_allocated() {
        let mut body = Vec::new();
        body.extend_from_slice(b"PACK");
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend(entry_header(3, 1 << 53));
        body.extend(deflate(b"abc"));

        let mut out = Checksum::new(Vec::new());
        out.write(&body).unwrap();
        let (bytes, _) = out.write_checksum().unwrap();
        let pack = PackFile::parse(Bytes::from(bytes)).unwrap();

        assert!(matches!(
            pack.read_raw(PACK_HEADER_SIZE as u64, |_| None),
            Err(StoreError::CorruptPack { .. })
        ));
    }

    #[test]
    fn oversized_delta_result_is_corrupt_not_allocated() {
        let mut delta = delta_size(3);
        delta.extend(delta_size(1 << 53));
        delta.extend([0x90, 3]);

        assert!(matches!(
            apply_delta(b"abc", &delta),
            Err(StoreError::CorruptPack { .. })
        ));
    }

    #[test]
    fn delta_writing_past_its_declared_size_stops_early() {
        let mut delta = delta_size(3);
        delta.extend(delta_size(2));
        delta.extend([0x90, 3, 0x90, 3]);

        assert!(matches!(
            apply_delta(b"abc", &delta),
            Err(StoreError::CorruptPack { .. })
        ));
    }

    #[test]
    fn reads_base_and_offset_delta_entries() {
        let base = b"hello delta world";
        let mut delta = vec![17, 11];
        delta.extend([0x90, 6]);
        delta.extend([0x91, 12, 5]);
        let (pack, base_offset, delta_offset) = blob_and_delta_pack(base, &delta);

        let blob = pack.read_raw(base_offset, |_| None).unwrap();
        assert_eq!(blob.object_type, ObjectType::Blob);
        assert_eq!(&blob.data[..], base);

        let patched = pack.read_raw(delta_offset, |_| None).unwrap();
        assert_eq!(patched.object_type, ObjectType::Blob);
        assert_eq!(&patched.data[..], b"hello world");
    }

    #[test]
    fn crc_covers_raw_entry_bytes() {
        let (pack, base_offset, delta_offset) = blob_and_delta_pack(b"abc", &[3, 1, 1, b'x']);
        let raw = &pack.data[base_offset as usize..delta_offset as usize];

        assert_eq!(
            pack.entry_crc32(base_offset, delta_offset).unwrap(),
            crc32fast::hash(raw)
        );
        assert!(pack.entry_crc32(0, delta_offset).is_err());
    }

    #[test]
    fn rejects_offsets_outside_data() {
        let (pack, _, _) = blob_and_delta_pack(b"abc", &[3, 1, 1, b'x']);

        assert!(pack.read_raw(4, |_| None).is_err());
        assert!(pack.read_raw(pack.data_end(), |_| None).is_err());
    }

    #[test]
    fn rejects_bad_signature_and_checksum() {
        let (pack, _, _) = blob_and_delta_pack(b"abc", &[3, 1, 1, b'x']);
        let mut bytes = pack.data.to_vec();
        assert!(pack.verify().is_ok());

        let mut wrong_signature = bytes.clone();
        wrong_signature[0] = b'K';
        assert!(PackFile::parse(Bytes::from(wrong_signature)).is_err());

        bytes[PACK_HEADER_SIZE] ^= 0xff;
        let damaged = PackFile::parse(Bytes::from(bytes)).unwrap();
        assert!(matches!(
            damaged.verify(),
            Err(StoreError::CorruptPack { .. })
        ));
    }
}
