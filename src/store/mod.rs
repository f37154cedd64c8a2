pub mod memory;

pub use memory::{MemoryStore, SaveHook, StoreStats};

use crate::core::Result;
use crate::entity::{Entity, EntityId, EntityRef};

/// Storage collaborator boundary - allows pluggable backends.
///
/// The persister drives everything through this trait: it never touches
/// rows itself, and it learns about vetoed saves only through the boolean
/// returned by [`EntityStore::save`].
pub trait EntityStore {
    /// Persist one entity's own fields: insert when the identifier is
    /// unset (assigning it), update otherwise. Returns `Ok(false)` when a
    /// registered pre-save hook vetoes the operation.
    fn save(&mut self, entity: &EntityRef) -> Result<bool>;

    /// Whether the entity already has a row in the store.
    fn is_persisted(&self, entity: &Entity) -> bool;

    /// Whether the entity has in-memory changes not yet saved.
    fn is_dirty(&self, entity: &Entity) -> bool;

    /// Upsert a pivot row linking two identifiers; a no-op when the pair
    /// is already linked.
    fn link_pivot(
        &mut self,
        table: &str,
        left_column: &str,
        right_column: &str,
        left: EntityId,
        right: EntityId,
    ) -> Result<bool>;
}
