//! Relationship metadata.
//!
//! Relationships are declared per entity type as static metadata
//! ([`RelationDescriptor`]), resolved when the schema is defined rather
//! than when a field is touched. The classification of each kind — which
//! side owns the foreign key, and whether the related entity must be saved
//! before or after its root — is a closed table over [`RelationKind`], so
//! adding a kind is a compile-time-checked change.

/// The shape of an association between two entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Has-one: the related row carries the foreign key.
    OneToOne,
    /// Has-many: each related row carries the foreign key.
    OneToMany,
    /// Belongs-to: this side carries the foreign key.
    ManyToOne,
    /// Belongs-to-many: a pivot table carries both keys.
    ManyToMany,
    /// Morph-one: has-one with a type discriminator on the related row.
    PolymorphicOne,
    /// Morph-many: has-many with a type discriminator on the related rows.
    PolymorphicMany,
    /// Morph-to: belongs-to whose target type is stored in a discriminator
    /// column on this side.
    PolymorphicTo,
}

/// Which side of a relationship stores the column referencing the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyOwner {
    /// The declaring entity's own row holds the key.
    OnSelf,
    /// The related entity's row holds the key.
    OnRelated,
    /// Neither row is touched; a pivot table records the link.
    Pivot,
}

/// When the related entities must be saved relative to the declaring root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// The related entity must be durable before the root can be saved,
    /// because the root's row needs its identifier.
    BeforeRoot,
    /// The related entities need the root's identifier, so they are saved
    /// (or linked) only after the root save succeeds.
    AfterRoot,
}

impl RelationKind {
    /// Classification: which side owns the foreign key for this kind.
    #[must_use]
    pub const fn foreign_key_owner(self) -> ForeignKeyOwner {
        match self {
            Self::ManyToOne | Self::PolymorphicTo => ForeignKeyOwner::OnSelf,
            Self::OneToOne | Self::OneToMany | Self::PolymorphicOne | Self::PolymorphicMany => {
                ForeignKeyOwner::OnRelated
            }
            Self::ManyToMany => ForeignKeyOwner::Pivot,
        }
    }

    /// Classification: save ordering implied by the foreign-key owner.
    #[must_use]
    pub const fn save_phase(self) -> SavePhase {
        match self.foreign_key_owner() {
            ForeignKeyOwner::OnSelf => SavePhase::BeforeRoot,
            ForeignKeyOwner::OnRelated | ForeignKeyOwner::Pivot => SavePhase::AfterRoot,
        }
    }

    #[must_use]
    pub const fn is_polymorphic(self) -> bool {
        matches!(
            self,
            Self::PolymorphicOne | Self::PolymorphicMany | Self::PolymorphicTo
        )
    }
}

/// Pivot table metadata for a many-to-many relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotInfo {
    /// The pivot table name (e.g. `"post_tags"`).
    pub table: &'static str,
    /// Column pointing at the declaring side (e.g. `"post_id"`).
    pub local_column: &'static str,
    /// Column pointing at the related side (e.g. `"tag_id"`).
    pub remote_column: &'static str,
}

impl PivotInfo {
    #[must_use]
    pub const fn new(
        table: &'static str,
        local_column: &'static str,
        remote_column: &'static str,
    ) -> Self {
        Self {
            table,
            local_column,
            remote_column,
        }
    }
}

/// Where a relationship's key columns live.
///
/// Each [`RelationKind`] pairs with exactly one variant; the per-kind
/// constructors on [`RelationDescriptor`] keep the two consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKey {
    /// A plain foreign-key column on whichever side the kind assigns.
    Column(&'static str),
    /// A type-discriminator column plus an id column, for polymorphic kinds.
    Polymorphic {
        type_column: &'static str,
        id_column: &'static str,
    },
    /// A pivot table, for many-to-many.
    Pivot(PivotInfo),
}

/// Immutable metadata for one declared relationship on an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Name of the relationship slot.
    pub name: &'static str,
    /// Kind of relationship.
    pub kind: RelationKind,
    /// Expected related entity type, when it is fixed at declaration time.
    /// Polymorphic kinds resolve the type at runtime and leave this `None`.
    pub related_type: Option<&'static str>,
    /// Where the key columns live.
    pub key: RelationKey,
}

impl RelationDescriptor {
    /// Belongs-to: `foreign_key` is a column on the declaring entity.
    #[must_use]
    pub const fn many_to_one(
        name: &'static str,
        related_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::ManyToOne,
            related_type: Some(related_type),
            key: RelationKey::Column(foreign_key),
        }
    }

    /// Has-one: `foreign_key` is a column on the related entity.
    #[must_use]
    pub const fn one_to_one(
        name: &'static str,
        related_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::OneToOne,
            related_type: Some(related_type),
            key: RelationKey::Column(foreign_key),
        }
    }

    /// Has-many: `foreign_key` is a column on each related entity.
    #[must_use]
    pub const fn one_to_many(
        name: &'static str,
        related_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::OneToMany,
            related_type: Some(related_type),
            key: RelationKey::Column(foreign_key),
        }
    }

    /// Belongs-to-many via a pivot table; neither side's row is mutated.
    #[must_use]
    pub const fn many_to_many(
        name: &'static str,
        related_type: &'static str,
        pivot: PivotInfo,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::ManyToMany,
            related_type: Some(related_type),
            key: RelationKey::Pivot(pivot),
        }
    }

    /// Morph-one: discriminator and id columns live on the related entity.
    #[must_use]
    pub const fn polymorphic_one(
        name: &'static str,
        type_column: &'static str,
        id_column: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::PolymorphicOne,
            related_type: None,
            key: RelationKey::Polymorphic {
                type_column,
                id_column,
            },
        }
    }

    /// Morph-many: discriminator and id columns live on each related entity.
    #[must_use]
    pub const fn polymorphic_many(
        name: &'static str,
        type_column: &'static str,
        id_column: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::PolymorphicMany,
            related_type: None,
            key: RelationKey::Polymorphic {
                type_column,
                id_column,
            },
        }
    }

    /// Morph-to: discriminator and id columns live on the declaring entity.
    #[must_use]
    pub const fn polymorphic_to(
        name: &'static str,
        type_column: &'static str,
        id_column: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::PolymorphicTo,
            related_type: None,
            key: RelationKey::Polymorphic {
                type_column,
                id_column,
            },
        }
    }

    #[must_use]
    pub const fn owner(&self) -> ForeignKeyOwner {
        self.kind.foreign_key_owner()
    }

    #[must_use]
    pub const fn phase(&self) -> SavePhase {
        self.kind.save_phase()
    }
}
