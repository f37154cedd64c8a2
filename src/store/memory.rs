//! In-memory reference implementation of [`EntityStore`].

use crate::core::{Result, StoreError, Value};
use crate::entity::{Entity, EntityId, EntityRef};
use crate::store::EntityStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Synchronous pre-save hook; returning `false` vetoes the save.
pub type SaveHook = Box<dyn Fn(&Entity) -> bool>;

/// Counters exposed for observability and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub inserts: u64,
    pub updates: u64,
    pub pivot_links: u64,
    pub vetoes: u64,
}

type Row = BTreeMap<String, Value>;

struct PivotTable {
    left_column: String,
    right_column: String,
    links: BTreeSet<(EntityId, EntityId)>,
}

/// In-memory entity store: one row map per table, one id-pair set per
/// pivot table, plus per-type pre-save hooks.
///
/// Hooks replace a global event dispatcher: they are registered on the
/// store itself and invoked synchronously before each save.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, BTreeMap<EntityId, Row>>,
    pivots: HashMap<String, PivotTable>,
    tables_by_type: HashMap<String, String>,
    hooks: HashMap<String, Vec<SaveHook>>,
    save_log: Vec<(String, EntityId)>,
    stats: StoreStats,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-save hook for one entity type. Hooks run in
    /// registration order; the first `false` vetoes the save.
    pub fn before_save(&mut self, type_name: &str, hook: SaveHook) {
        self.hooks.entry(type_name.to_string()).or_default().push(hook);
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Every successful save, in commit order, as `(type name, id)` pairs.
    #[must_use]
    pub fn save_log(&self) -> &[(String, EntityId)] {
        &self.save_log
    }

    /// Number of successful saves recorded for one entity type.
    #[must_use]
    pub fn saves_of(&self, type_name: &str) -> usize {
        self.save_log.iter().filter(|(t, _)| t == type_name).count()
    }

    #[must_use]
    pub fn row(&self, table: &str, id: EntityId) -> Option<&BTreeMap<String, Value>> {
        self.tables.get(table)?.get(&id)
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn pivot_count(&self, table: &str) -> usize {
        self.pivots.get(table).map_or(0, |p| p.links.len())
    }

    #[must_use]
    pub fn contains_pivot(&self, table: &str, left: EntityId, right: EntityId) -> bool {
        self.pivots
            .get(table)
            .is_some_and(|p| p.links.contains(&(left, right)))
    }

    /// Column names recorded for a pivot table, if any rows were linked.
    #[must_use]
    pub fn pivot_columns(&self, table: &str) -> Option<(&str, &str)> {
        self.pivots
            .get(table)
            .map(|p| (p.left_column.as_str(), p.right_column.as_str()))
    }

    /// Snapshot one table as JSON, keyed by identifier. Empty object for
    /// unknown tables.
    #[must_use]
    pub fn table_json(&self, table: &str) -> serde_json::Value {
        self.tables.get(table).map_or_else(
            || serde_json::json!({}),
            |rows| serde_json::to_value(rows).unwrap_or_default(),
        )
    }

    /// Follow a polymorphic reference stored in `row`: read the type name
    /// from `type_column` and the identifier from `id_column`, then load the
    /// referenced row from whatever table that type was saved into.
    ///
    /// Returns `Ok(None)` when the reference columns are unset or null.
    pub fn resolve_polymorphic(
        &self,
        row: &BTreeMap<String, Value>,
        type_column: &str,
        id_column: &str,
    ) -> Result<Option<&BTreeMap<String, Value>>> {
        let Some(type_name) = row.get(type_column).and_then(Value::as_text) else {
            return Ok(None);
        };
        let Some(id) = row.get(id_column).and_then(Value::as_id) else {
            return Ok(None);
        };
        let table = self
            .tables_by_type
            .get(type_name)
            .ok_or_else(|| StoreError::UnknownEntityType(type_name.to_string()))?;
        Ok(self.row(table, id))
    }
}

impl EntityStore for MemoryStore {
    fn save(&mut self, entity: &EntityRef) -> Result<bool> {
        let mut entity = entity.borrow_mut();

        if let Some(hooks) = self.hooks.get(entity.type_name()) {
            for hook in hooks {
                if !hook(&entity) {
                    self.stats.vetoes += 1;
                    debug!(entity = entity.type_name(), "save vetoed by hook");
                    return Ok(false);
                }
            }
        }

        let id = match entity.id() {
            Some(id) => {
                self.stats.updates += 1;
                id
            }
            None => {
                let id = EntityId::generate();
                entity.assign_id(id);
                self.stats.inserts += 1;
                id
            }
        };

        self.tables_by_type
            .entry(entity.type_name().to_string())
            .or_insert_with(|| entity.table().to_string());
        self.tables
            .entry(entity.table().to_string())
            .or_default()
            .insert(id, entity.fields().clone());
        entity.mark_clean();
        self.save_log.push((entity.type_name().to_string(), id));
        debug!(entity = entity.type_name(), %id, "saved");
        Ok(true)
    }

    fn is_persisted(&self, entity: &Entity) -> bool {
        entity.id().is_some_and(|id| {
            self.tables
                .get(entity.table())
                .is_some_and(|rows| rows.contains_key(&id))
        })
    }

    fn is_dirty(&self, entity: &Entity) -> bool {
        entity.is_dirty()
    }

    fn link_pivot(
        &mut self,
        table: &str,
        left_column: &str,
        right_column: &str,
        left: EntityId,
        right: EntityId,
    ) -> Result<bool> {
        let pivot = self
            .pivots
            .entry(table.to_string())
            .or_insert_with(|| PivotTable {
                left_column: left_column.to_string(),
                right_column: right_column.to_string(),
                links: BTreeSet::new(),
            });
        if pivot.links.insert((left, right)) {
            self.stats.pivot_links += 1;
            debug!(table, %left, %right, "pivot linked");
        }
        Ok(true)
    }
}
