// ============================================================================
// graphsave Library
// ============================================================================

//! Recursive relationship-graph persister.
//!
//! Given a root entity whose relationship slots reference other entities
//! (belongs-to, has-one, has-many, belongs-to-many, and their polymorphic
//! variants), [`GraphPersister::persist`] saves the whole reachable graph
//! in one logical operation, wiring foreign keys in dependency order and
//! reporting failure as a boolean when any single save is vetoed.
//!
//! This is not an ORM. It assumes an ORM-like substrate behind the
//! [`EntityStore`] trait and adds only the cascading-save algorithm on
//! top; [`MemoryStore`] is a self-contained reference backend.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use graphsave::{Entity, EntitySchema, GraphPersister, MemoryStore, RelationDescriptor};
//!
//! # fn main() -> graphsave::Result<()> {
//! let team_type = Rc::new(EntitySchema::new("team", "teams"));
//! let player_type = Rc::new(
//!     EntitySchema::new("player", "players")
//!         .relation(RelationDescriptor::many_to_one("team", "team", "team_id")),
//! );
//!
//! let team = Entity::new(team_type).into_ref();
//! team.borrow_mut().set_field("name", "Reds");
//!
//! let player = Entity::new(player_type).into_ref();
//! player.borrow_mut().set_field("name", "Ada");
//! player.borrow_mut().set_one("team", team.clone())?;
//!
//! // The team is saved first so the player's foreign key can be wired.
//! let mut persister = GraphPersister::new(MemoryStore::new());
//! assert!(persister.persist(&player)?);
//! assert!(team.borrow().id().is_some());
//! assert_eq!(
//!     player.borrow().field("team_id").and_then(|v| v.as_id()),
//!     team.borrow().id(),
//! );
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod entity;
pub mod persister;
pub mod relation;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{Result, StoreError, Value};
pub use entity::{Entity, EntityId, EntityRef, EntitySchema, RelationValue};
pub use persister::{GraphPersister, PersistConfig};
pub use relation::{
    ForeignKeyOwner, PivotInfo, RelationDescriptor, RelationKey, RelationKind, SavePhase,
};
pub use store::{EntityStore, MemoryStore, SaveHook, StoreStats};
