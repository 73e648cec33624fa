use crate::areas::pack::Pack;
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Where an id was found
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'r> {
    pub pack: &'r Arc<Pack>,
    pub offset: u64,
}

/// Finds the pack holding an id by searching packs in a fixed order
///
/// The order is explicit: position 0 is searched first. Packs registered later
/// are searched before older ones. Lookups only read, so one resolver can serve
/// any number of concurrent walks.
#[derive(Debug, Clone, Default)]
pub struct ObjectResolver {
    packs: Vec<Arc<Pack>>,
}

impl ObjectResolver {
    /// Resolver searching `packs` in the given order
    pub fn new(packs: Vec<Arc<Pack>>) -> Self {
        ObjectResolver { packs }
    }

    /// Add a pack ahead of every pack already registered
    pub fn register(&mut self, pack: Arc<Pack>) {
        self.packs.insert(0, pack);
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// First pack, in search order, whose index holds `oid`
    pub fn resolve(&self, oid: &ObjectId) -> Option<Resolved<'_>> {
        self.packs.iter().find_map(|pack| {
            pack.find_offset(oid)
                .map(|offset| Resolved { pack, offset })
        })
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.resolve(oid).is_some()
    }

    /// Distinct ids across all packs matching an abbreviated id, sorted
    pub fn find_by_prefix(&self, prefix: &ObjectIdPrefix, limit: usize) -> Vec<ObjectId> {
        let matches: BTreeSet<ObjectId> = self
            .packs
            .iter()
            .flat_map(|pack| pack.index().find_by_prefix(prefix, limit))
            .collect();

        matches.into_iter().take(limit).collect()
    }
}
