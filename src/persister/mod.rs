//! The cascading-save algorithm.
//!
//! [`GraphPersister::persist`] saves a root entity and its entire declared,
//! populated relationship graph, depth-first:
//!
//! 1. relations whose foreign key lives on the root itself (belongs-to,
//!    morph-to) are persisted first, and their identifiers written into the
//!    root's own columns;
//! 2. the root is saved (skipped as a trivial success when it is already
//!    persisted and unchanged);
//! 3. relations whose key lives on the related side receive the root's
//!    identifier before their own save; many-to-many relations are
//!    persisted and then linked through their pivot table.
//!
//! A vetoed save anywhere in the graph short-circuits as `Ok(false)`.
//! There is no enclosing transaction: children committed before the veto
//! stay committed. Callers needing atomicity must provide their own
//! transaction boundary around the call.

use crate::core::{Result, StoreError};
use crate::entity::{Entity, EntityId, EntityRef, RelationValue};
use crate::relation::{RelationDescriptor, RelationKey, SavePhase};
use crate::store::EntityStore;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Tuning for one persister instance.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Maximum recursion depth before the walk is aborted with
    /// [`StoreError::DepthExceeded`]. Depth equals graph depth.
    pub max_depth: usize,
}

impl PersistConfig {
    #[must_use]
    pub fn new() -> Self {
        Self { max_depth: 128 }
    }

    /// Set the recursion depth limit.
    #[must_use]
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call partition of a root's populated relationship slots.
///
/// Total and exhaustive: every declared relationship currently holding a
/// value lands in exactly one of the two phases.
struct PersistPlan {
    before_root: Vec<(RelationDescriptor, EntityRef)>,
    after_root: Vec<(RelationDescriptor, Vec<EntityRef>)>,
}

impl PersistPlan {
    fn for_entity(entity: &Entity) -> Result<Self> {
        let mut before_root = Vec::new();
        let mut after_root = Vec::new();

        for descriptor in entity.schema().relations() {
            let Some(value) = entity.relation_value(descriptor.name) else {
                continue;
            };
            if !value.is_populated() {
                continue;
            }
            match descriptor.phase() {
                SavePhase::BeforeRoot => match value {
                    RelationValue::One(parent) => {
                        before_root.push((*descriptor, parent.clone()));
                    }
                    // The key for these kinds lives in a single column on
                    // the root; a collection cannot be wired through it.
                    RelationValue::Many(_) => {
                        return Err(StoreError::RelationShape(descriptor.name.to_string()));
                    }
                },
                SavePhase::AfterRoot => {
                    after_root.push((*descriptor, value.as_slice().to_vec()));
                }
            }
        }

        Ok(Self {
            before_root,
            after_root,
        })
    }
}

/// Saves whole relationship graphs through an [`EntityStore`].
pub struct GraphPersister<S: EntityStore> {
    store: S,
    config: PersistConfig,
}

impl<S: EntityStore> GraphPersister<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, PersistConfig::default())
    }

    #[must_use]
    pub fn with_config(store: S, config: PersistConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Save `root` and its entire populated relationship graph.
    ///
    /// Returns `Ok(true)` iff every save in the graph succeeded and
    /// `Ok(false)` on the first vetoed save, short-circuiting remaining
    /// work. Already-persisted, unchanged entities are skipped, but their
    /// relationships are still walked, so attaching new children to an
    /// existing parent works. A vetoed save is never rolled back: children
    /// committed earlier in the walk stay committed.
    pub fn persist(&mut self, root: &EntityRef) -> Result<bool> {
        let mut in_flight = Vec::new();
        self.persist_node(root, &mut in_flight)
    }

    fn persist_node(
        &mut self,
        entity: &EntityRef,
        in_flight: &mut Vec<*const RefCell<Entity>>,
    ) -> Result<bool> {
        if in_flight.len() >= self.config.max_depth {
            return Err(StoreError::DepthExceeded(self.config.max_depth));
        }
        let ptr = Rc::as_ptr(entity);
        if in_flight.contains(&ptr) {
            let type_name = entity.borrow().type_name();
            warn!(entity = type_name, "relation cycle detected");
            return Err(StoreError::RelationCycle(type_name.to_string()));
        }
        in_flight.push(ptr);
        let outcome = self.persist_steps(entity, in_flight);
        in_flight.pop();
        outcome
    }

    fn persist_steps(
        &mut self,
        entity: &EntityRef,
        in_flight: &mut Vec<*const RefCell<Entity>>,
    ) -> Result<bool> {
        let plan = PersistPlan::for_entity(&entity.borrow())?;

        // Phase 1: relations the root's own row points at. Their ids must
        // exist before the root can be saved.
        for (descriptor, parent) in &plan.before_root {
            check_target(descriptor, parent)?;
            if !self.persist_node(parent, in_flight)? {
                debug!(relation = descriptor.name, "parent save failed, aborting");
                return Ok(false);
            }
            let (parent_id, parent_type) = identity_of(parent)?;
            let mut root = entity.borrow_mut();
            match descriptor.key {
                RelationKey::Column(column) => root.set_foreign_key(column, parent_id),
                RelationKey::Polymorphic {
                    type_column,
                    id_column,
                } => root.set_polymorphic_reference(
                    type_column,
                    id_column,
                    parent_type,
                    parent_id,
                ),
                RelationKey::Pivot(_) => {
                    return Err(StoreError::InvalidDescriptor(descriptor.name.to_string()));
                }
            }
        }

        // Phase 2: the root itself. Persisted and unchanged means the save
        // is a trivial success, but the after-root phase still runs.
        let unchanged = {
            let root = entity.borrow();
            self.store.is_persisted(&root) && !self.store.is_dirty(&root)
        };
        if unchanged {
            debug!(
                entity = entity.borrow().type_name(),
                "already persisted and unchanged, skipping save"
            );
        } else if !self.store.save(entity)? {
            return Ok(false);
        }

        // Phase 3: relations whose rows point back at the root.
        let (root_id, root_type) = identity_of(entity)?;
        for (descriptor, related) in &plan.after_root {
            match descriptor.key {
                RelationKey::Column(column) => {
                    for child in related {
                        check_target(descriptor, child)?;
                        child.borrow_mut().set_foreign_key(column, root_id);
                        if !self.persist_node(child, in_flight)? {
                            return Ok(false);
                        }
                    }
                }
                RelationKey::Polymorphic {
                    type_column,
                    id_column,
                } => {
                    for child in related {
                        child.borrow_mut().set_polymorphic_reference(
                            type_column,
                            id_column,
                            root_type,
                            root_id,
                        );
                        if !self.persist_node(child, in_flight)? {
                            return Ok(false);
                        }
                    }
                }
                // Many-to-many never mutates either side's row: persist
                // the related entity if needed, then link the pair.
                RelationKey::Pivot(pivot) => {
                    for other in related {
                        check_target(descriptor, other)?;
                        if !self.persist_node(other, in_flight)? {
                            return Ok(false);
                        }
                        let (other_id, _) = identity_of(other)?;
                        self.store.link_pivot(
                            pivot.table,
                            pivot.local_column,
                            pivot.remote_column,
                            root_id,
                            other_id,
                        )?;
                    }
                }
            }
        }

        Ok(true)
    }
}

fn identity_of(entity: &EntityRef) -> Result<(EntityId, &'static str)> {
    let entity = entity.borrow();
    let id = entity
        .id()
        .ok_or_else(|| StoreError::MissingIdentifier(entity.type_name().to_string()))?;
    Ok((id, entity.type_name()))
}

fn check_target(descriptor: &RelationDescriptor, related: &EntityRef) -> Result<()> {
    if let Some(expected) = descriptor.related_type {
        let found = related.borrow().type_name();
        if found != expected {
            return Err(StoreError::RelationTarget(
                descriptor.name.to_string(),
                expected.to_string(),
                found.to_string(),
            ));
        }
    }
    Ok(())
}
