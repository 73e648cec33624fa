use crate::areas::pack::Pack;
use crate::areas::resolver::ObjectResolver;
use crate::artifacts::log::rev_walk::CommitSource;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::pack_file::RawObject;
use crate::errors::StoreError;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Object database backed by pack files
#[derive(Debug, Clone, Default)]
pub struct Database {
    resolver: ObjectResolver,
}

impl Database {
    pub fn new(resolver: ObjectResolver) -> Self {
        Database { resolver }
    }

    /// Database searching `packs` in the given order
    pub fn from_packs(packs: Vec<Arc<Pack>>) -> Self {
        Self::new(ObjectResolver::new(packs))
    }

    /// Open every `pack/*.idx` under an objects directory
    ///
    /// Packs are searched newest first by modification time, ties broken by name.
    pub fn open(objects_path: &Path) -> Result<Self, StoreError> {
        let pack_dir = objects_path.join("pack");
        let mut candidates = Vec::new();

        if pack_dir.is_dir() {
            for entry in std::fs::read_dir(&pack_dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "idx") {
                    let modified = std::fs::metadata(&path)?
                        .modified()
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    candidates.push((modified, path));
                }
            }
        }

        candidates.sort_by(|(a_time, a_path), (b_time, b_path)| {
            b_time.cmp(a_time).then_with(|| a_path.cmp(b_path))
        });

        let packs = candidates
            .into_iter()
            .map(|(_, path)| Pack::open(&path).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            path = %pack_dir.display(),
            packs = packs.len(),
            "opened object database"
        );
        Ok(Self::from_packs(packs))
    }

    pub fn resolver(&self) -> &ObjectResolver {
        &self.resolver
    }

    /// Make a newly received pack the first one searched
    pub fn register(&mut self, pack: Arc<Pack>) {
        self.resolver.register(pack);
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.resolver.contains(oid)
    }

    pub fn load(&self, oid: &ObjectId) -> Result<RawObject, StoreError> {
        let resolved = self.resolver.resolve(oid).ok_or(StoreError::NotFound(*oid))?;
        resolved.pack.read_at(resolved.offset)
    }

    pub fn object_type(&self, oid: &ObjectId) -> Result<ObjectType, StoreError> {
        Ok(self.load(oid)?.object_type)
    }

    /// Load and parse a commit; `None` when no pack holds the id
    pub fn find_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, StoreError> {
        let Some(resolved) = self.resolver.resolve(oid) else {
            return Ok(None);
        };

        let object = resolved.pack.read_at(resolved.offset)?;
        if object.object_type != ObjectType::Commit {
            return Err(StoreError::UnexpectedType {
                oid: *oid,
                expected: ObjectType::Commit,
                found: object.object_type,
            });
        }

        Commit::parse(*oid, &object.data)
            .map(Some)
            .map_err(|source| StoreError::InvalidObject { oid: *oid, source })
    }

    /// Like [`Database::find_commit`], but any other object type reads as `None`
    pub fn parse_object_as_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, StoreError> {
        match self.find_commit(oid) {
            Err(StoreError::UnexpectedType { .. }) => Ok(None),
            other => other,
        }
    }

    /// Find all objects whose id starts with the given abbreviation
    ///
    /// More than one result means the abbreviation is ambiguous.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = ObjectIdPrefix::try_parse(prefix)?;
        Ok(self.resolver.find_by_prefix(&prefix, usize::MAX))
    }
}

impl CommitSource for Database {
    fn find_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, StoreError> {
        Database::find_commit(self, oid)
    }
}
