//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20 raw bytes. They uniquely identify all objects in Git and are
//! the key of every pack index entry.
//!
//! ## Format
//!
//! - Binary: 20 bytes, ordered lexicographically as unsigned bytes
//! - Full hex: 40 hex characters (e.g., "abc123...def")
//! - Short: first 7 hex characters (e.g., "abc123d")
//!
//! Hex ordering and byte ordering agree, so sorted indexes can be searched with
//! either representation.

use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::{OBJECT_ID_HEX_LENGTH, OBJECT_ID_LENGTH};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Git object identifier (SHA-1 hash)
///
/// Immutable once constructed; equality and ordering are structural over the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build an id from a slice that must be exactly 20 bytes long
    pub fn try_from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let raw: [u8; OBJECT_ID_LENGTH] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid object ID length: {} bytes", bytes.len()))?;
        Ok(Self(raw))
    }

    /// Parse and validate an object ID from a string
    ///
    /// # Arguments
    ///
    /// * `id` - 40-character hexadecimal string
    ///
    /// # Returns
    ///
    /// Validated ObjectId or error if invalid length/characters
    pub fn try_parse(id: &str) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_HEX_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }

        let mut raw = [0u8; OBJECT_ID_LENGTH];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&id[i * 2..i * 2 + 2], 16)?;
        }

        Ok(Self(raw))
    }

    /// Hash an object body the way Git names it: `<type> <size>\0<content>`
    pub fn hash_object(object_type: ObjectType, content: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(format!("{} {}\0", object_type.as_str(), content.len()).as_bytes());
        hasher.update(content);

        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LENGTH] {
        &self.0
    }

    /// First byte of the id, the fan-out bucket of a pack index
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Get abbreviated form of the object ID
    ///
    /// # Returns
    ///
    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Hex digit (nibble) at the given position, 0..40
    fn nibble(&self, position: usize) -> u8 {
        let byte = self.0[position / 2];
        if position % 2 == 0 { byte >> 4 } else { byte & 0x0f }
    }
}

impl FromStr for ObjectId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

/// Abbreviated object id: the first 1 to 40 hex digits of a full id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectIdPrefix {
    padded: ObjectId,
    nibbles: usize,
}

impl ObjectIdPrefix {
    pub fn try_parse(prefix: &str) -> anyhow::Result<Self> {
        if prefix.is_empty() || prefix.len() > OBJECT_ID_HEX_LENGTH {
            anyhow::bail!("Invalid abbreviated object ID length: {}", prefix.len());
        }
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid abbreviated object ID characters: {}", prefix);
        }

        let mut padded = prefix.to_ascii_lowercase();
        padded.extend(std::iter::repeat_n('0', OBJECT_ID_HEX_LENGTH - prefix.len()));

        Ok(Self {
            padded: ObjectId::try_parse(&padded)?,
            nibbles: prefix.len(),
        })
    }

    /// Number of hex digits in the prefix
    pub fn len(&self) -> usize {
        self.nibbles
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles == 0
    }

    pub fn first_byte(&self) -> Option<u8> {
        (self.nibbles >= 2).then(|| self.padded.first_byte())
    }

    /// Compare a full id against this prefix, looking only at the prefix digits
    pub fn cmp_id(&self, id: &ObjectId) -> Ordering {
        for position in 0..self.nibbles {
            match id.nibble(position).cmp(&self.padded.nibble(position)) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    pub fn matches(&self, id: &ObjectId) -> bool {
        self.cmp_id(id) == Ordering::Equal
    }
}

impl fmt::Display for ObjectIdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.padded.to_hex()[..self.nibbles])
    }
}
