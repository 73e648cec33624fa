use flate2::Compression;
use flate2::write::ZlibEncoder;
use packwalk::artifacts::objects::commit::{Author, Commit};
use packwalk::artifacts::objects::object_id::ObjectId;
use packwalk::artifacts::objects::object_type::ObjectType;
use packwalk::artifacts::pack::checksum::digest;
use packwalk::artifacts::pack::index::PackIndexEntry;
use packwalk::artifacts::pack::index_writer::PackIndexWriter;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Files written for one pack, plus what went into its index
#[derive(Debug, Clone)]
pub struct PackFixture {
    pub name: String,
    pub index_path: PathBuf,
    pub pack_path: PathBuf,
    pub pack_bytes: Vec<u8>,
    /// entries in pack order (not sorted by id)
    pub entries: Vec<PackIndexEntry>,
}

impl PackFixture {
    pub fn entry(&self, oid: &ObjectId) -> PackIndexEntry {
        *self
            .entries
            .iter()
            .find(|entry| entry.oid == *oid)
            .expect("object is not part of this pack")
    }

    /// Raw bytes of the stored entry, header and compressed body included
    pub fn raw_entry(&self, oid: &ObjectId) -> &[u8] {
        let start = self.entry(oid).offset;
        let end = self
            .entries
            .iter()
            .map(|entry| entry.offset)
            .filter(|&offset| offset > start)
            .min()
            .unwrap_or((self.pack_bytes.len() - 20) as u64);

        &self.pack_bytes[start as usize..end as usize]
    }
}

/// Builds pack files from whole (non-delta) objects
#[derive(Debug, Default)]
pub struct PackBuilder {
    objects: Vec<(ObjectId, ObjectType, Vec<u8>)>,
}

impl PackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object_type: ObjectType, content: &[u8]) -> ObjectId {
        let oid = ObjectId::hash_object(object_type, content);
        self.objects.push((oid, object_type, content.to_vec()));
        oid
    }

    pub fn add_blob(&mut self, content: &str) -> ObjectId {
        self.add(ObjectType::Blob, content.as_bytes())
    }

    pub fn add_commit(&mut self, commit: &Commit) -> ObjectId {
        self.add(ObjectType::Commit, &commit.to_bytes())
    }

    /// Write `<pack_dir>/pack-<checksum>.{pack,idx}` with the given index version
    pub fn write(&self, pack_dir: &Path, index_version: u32) -> PackFixture {
        let mut pack_bytes = Vec::new();
        pack_bytes.extend_from_slice(b"PACK");
        pack_bytes.extend_from_slice(&2u32.to_be_bytes());
        pack_bytes.extend_from_slice(&(self.objects.len() as u32).to_be_bytes());

        let mut entries = Vec::new();
        for (oid, object_type, content) in &self.objects {
            let offset = pack_bytes.len();
            pack_bytes.extend(entry_header(object_type.pack_code(), content.len()));
            pack_bytes.extend(deflate(content));

            let crc32 = crc32fast::hash(&pack_bytes[offset..]);
            let crc32 = (index_version >= 2).then_some(crc32);
            entries.push(PackIndexEntry::new(*oid, offset as u64, crc32));
        }

        let pack_checksum = digest(&pack_bytes);
        pack_bytes.extend_from_slice(&pack_checksum);

        let name = format!("pack-{}", hex(&pack_checksum));
        let pack_path = pack_dir.join(format!("{name}.pack"));
        let index_path = pack_dir.join(format!("{name}.idx"));
        std::fs::write(&pack_path, &pack_bytes).expect("Failed to write pack");

        let mut index_bytes = Vec::new();
        PackIndexWriter::new(index_version)
            .write(&mut index_bytes, entries.clone(), pack_checksum)
            .expect("Failed to write index");
        std::fs::write(&index_path, &index_bytes).expect("Failed to write index");

        PackFixture {
            name,
            index_path,
            pack_path,
            pack_bytes,
            entries,
        }
    }
}

/// Commit with a real content id, authored and committed at `time`
pub fn commit(parents: &[ObjectId], time: i64, message: &str) -> Commit {
    let author = Author::at_epoch_seconds("Ada Lovelace", "ada@example.com", time)
        .expect("Failed to build author");
    let committer = Author::at_epoch_seconds("Build Bot", "bot@example.com", time)
        .expect("Failed to build committer");
    let tree = ObjectId::hash_object(ObjectType::Tree, b"");
    let message = format!("{message}\n");

    let draft = Commit::new(
        ObjectId::default(),
        parents.to_vec(),
        tree,
        author.clone(),
        committer.clone(),
        message.clone(),
    );
    Commit::new(draft.computed_oid(), parents.to_vec(), tree, author, committer, message)
}

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
    encoder.write_all(data).expect("Failed to deflate");
    encoder.finish().expect("Failed to deflate")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
