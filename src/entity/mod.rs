//! Entity records and per-type schemas.
//!
//! An [`Entity`] is a mutable in-memory record: an optional identifier
//! (assigned by the store on first insert), a dirty flag, a scalar field
//! map, and named relationship slots. Its [`EntitySchema`] declares the
//! relationships once, at type-definition time.
//!
//! The graph is single-threaded and synchronous, so entities are shared as
//! `Rc<RefCell<_>>` ([`EntityRef`]).

use crate::core::{Result, StoreError, Value};
use crate::relation::RelationDescriptor;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Identifier assigned by the store on first successful insert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(Uuid);

impl EntityId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-type declaration: type name, table name, and relationships.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    type_name: &'static str,
    table: &'static str,
    relations: Vec<RelationDescriptor>,
}

impl EntitySchema {
    #[must_use]
    pub fn new(type_name: &'static str, table: &'static str) -> Self {
        Self {
            type_name,
            table,
            relations: Vec::new(),
        }
    }

    /// Declare a relationship on this type. Declaration order is the order
    /// the persister walks relationship slots in.
    #[must_use]
    pub fn relation(mut self, descriptor: RelationDescriptor) -> Self {
        self.relations.push(descriptor);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn table(&self) -> &'static str {
        self.table
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    #[must_use]
    pub fn find_relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// The value held by a relationship slot.
#[derive(Debug, Clone)]
pub enum RelationValue {
    One(EntityRef),
    Many(Vec<EntityRef>),
}

impl RelationValue {
    /// A slot counts as populated when it actually references something;
    /// an empty collection is treated the same as an unset slot.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        match self {
            RelationValue::One(_) => true,
            RelationValue::Many(entities) => !entities.is_empty(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[EntityRef] {
        match self {
            RelationValue::One(entity) => std::slice::from_ref(entity),
            RelationValue::Many(entities) => entities,
        }
    }
}

/// Shared handle to an entity in a relationship graph.
pub type EntityRef = Rc<RefCell<Entity>>;

/// A mutable persistable record.
///
/// Lifecycle: created unset (`id() == None`, dirty); becomes persisted once
/// the store assigns its identifier; stays mutable afterward — updating a
/// field marks it dirty again, and a re-save keeps the identifier.
#[derive(Debug)]
pub struct Entity {
    schema: Rc<EntitySchema>,
    id: Option<EntityId>,
    dirty: bool,
    fields: BTreeMap<String, Value>,
    relations: BTreeMap<String, RelationValue>,
}

impl Entity {
    #[must_use]
    pub fn new(schema: Rc<EntitySchema>) -> Self {
        Self {
            schema,
            id: None,
            dirty: true,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub fn schema(&self) -> &Rc<EntitySchema> {
        &self.schema
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.schema.type_name()
    }

    #[must_use]
    pub fn table(&self) -> &'static str {
        self.schema.table()
    }

    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Set a scalar field, marking the entity dirty.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
        self.dirty = true;
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Set a foreign-key column to reference another entity's identifier.
    pub fn set_foreign_key(&mut self, column: &str, id: EntityId) {
        self.set_field(column, Value::Id(id));
    }

    /// Set a polymorphic reference: the referenced entity's type name into
    /// the discriminator column and its identifier into the id column.
    pub fn set_polymorphic_reference(
        &mut self,
        type_column: &str,
        id_column: &str,
        referenced_type: &str,
        id: EntityId,
    ) {
        self.set_field(type_column, referenced_type);
        self.set_field(id_column, Value::Id(id));
    }

    /// Put a single entity into a declared relationship slot.
    pub fn set_one(&mut self, relation: &str, related: EntityRef) -> Result<()> {
        self.expect_relation(relation)?;
        self.relations
            .insert(relation.to_string(), RelationValue::One(related));
        Ok(())
    }

    /// Put a collection of entities into a declared relationship slot.
    pub fn set_many(&mut self, relation: &str, related: Vec<EntityRef>) -> Result<()> {
        self.expect_relation(relation)?;
        self.relations
            .insert(relation.to_string(), RelationValue::Many(related));
        Ok(())
    }

    /// Append one entity to a collection slot, creating it if unset.
    pub fn push_related(&mut self, relation: &str, related: EntityRef) -> Result<()> {
        self.expect_relation(relation)?;
        match self.relations.get_mut(relation) {
            Some(RelationValue::Many(entities)) => entities.push(related),
            Some(RelationValue::One(_)) => {
                return Err(StoreError::RelationShape(relation.to_string()));
            }
            None => {
                self.relations
                    .insert(relation.to_string(), RelationValue::Many(vec![related]));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn relation_value(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    fn expect_relation(&self, name: &str) -> Result<()> {
        if self.schema.find_relation(name).is_some() {
            Ok(())
        } else {
            Err(StoreError::UnknownRelation(
                name.to_string(),
                self.type_name().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationDescriptor;

    fn player_schema() -> Rc<EntitySchema> {
        Rc::new(
            EntitySchema::new("player", "players")
                .relation(RelationDescriptor::many_to_one("team", "team", "team_id")),
        )
    }

    #[test]
    fn new_entity_is_unset_and_dirty() {
        let entity = Entity::new(player_schema());
        assert!(entity.id().is_none());
        assert!(entity.is_dirty());
    }

    #[test]
    fn set_field_marks_dirty_again_after_clean() {
        let mut entity = Entity::new(player_schema());
        entity.mark_clean();
        assert!(!entity.is_dirty());
        entity.set_field("name", "Ada");
        assert!(entity.is_dirty());
        assert_eq!(entity.field("name"), Some(&Value::Text("Ada".into())));
    }

    #[test]
    fn undeclared_relation_is_rejected() {
        let mut entity = Entity::new(player_schema());
        let other = Entity::new(player_schema()).into_ref();
        let err = entity.set_one("coach", other).unwrap_err();
        assert!(matches!(err, StoreError::UnknownRelation(_, _)));
    }

    #[test]
    fn empty_collection_slot_is_not_populated() {
        let mut entity = Entity::new(Rc::new(
            EntitySchema::new("team", "teams").relation(RelationDescriptor::one_to_many(
                "players",
                "player",
                "team_id",
            )),
        ));
        entity.set_many("players", Vec::new()).unwrap();
        assert!(!entity.relation_value("players").unwrap().is_populated());
    }
}
