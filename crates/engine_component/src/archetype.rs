//! Archetype grouping index.
//!
//! An archetype is the exact composition mask shared by a group of entities.
//! The [`ArchetypeIndex`] maps each mask that has ever been seen to the set of
//! live entities that currently have exactly that mask, so a query can visit
//! only the groups whose mask is a superset of what it requires instead of
//! scanning every entity.
//!
//! The index is derived data. The entity table's masks are canonical, and the
//! owning store moves entities between archetypes on every structural
//! mutation so the two never disagree.

use std::collections::HashMap;

use crate::entity::Entity;
use crate::mask::ComponentMask;

/// The entities sharing one exact composition.
#[derive(Debug, Clone)]
pub struct Archetype {
    mask: ComponentMask,
    /// Member entities in insertion order (modulo swap-removes).
    entities: Vec<Entity>,
    /// Row of each entity in `entities`.
    rows: HashMap<Entity, usize>,
}

impl Archetype {
    /// Create an empty archetype for `mask`.
    #[must_use]
    pub fn new(mask: ComponentMask) -> Self {
        Self {
            mask,
            entities: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// The composition shared by every member.
    #[must_use]
    pub fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.rows.contains_key(&entity) {
            return false;
        }
        self.rows.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Remove a member with a swap-remove. Returns `false` if it was absent.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let Some(row) = self.rows.remove(&entity) else {
            return false;
        };
        self.entities.swap_remove(row);
        if let Some(&moved) = self.entities.get(row) {
            self.rows.insert(moved, row);
        }
        true
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Current members. Order is unspecified.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` if `(self.mask & required) == required`.
    #[must_use]
    pub fn matches(&self, required: ComponentMask) -> bool {
        self.mask.contains_all(required)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the archetype has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Index of archetypes keyed by exact mask.
///
/// Emptied archetypes are kept so entities toggling a component back and
/// forth do not churn allocations.
#[derive(Debug, Default)]
pub struct ArchetypeIndex {
    archetypes: HashMap<ComponentMask, Archetype>,
}

impl ArchetypeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The archetype for exactly `mask`, created empty if missing.
    pub fn get_or_create(&mut self, mask: ComponentMask) -> &mut Archetype {
        self.archetypes
            .entry(mask)
            .or_insert_with(|| Archetype::new(mask))
    }

    /// The archetype for exactly `mask`, if one exists.
    #[must_use]
    pub fn get(&self, mask: ComponentMask) -> Option<&Archetype> {
        self.archetypes.get(&mask)
    }

    /// Archetypes whose mask contains every bit of `required`, ordered by mask.
    #[must_use]
    pub fn find_matching(&self, required: ComponentMask) -> Vec<&Archetype> {
        let mut matching: Vec<&Archetype> = self
            .archetypes
            .values()
            .filter(|archetype| archetype.matches(required))
            .collect();
        matching.sort_unstable_by_key(|archetype| archetype.mask);
        matching
    }

    /// Members of every matching archetype, in ascending entity order.
    #[must_use]
    pub fn entities_matching(&self, required: ComponentMask) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .archetypes
            .values()
            .filter(|archetype| archetype.matches(required))
            .flat_map(|archetype| archetype.entities.iter().copied())
            .collect();
        entities.sort_unstable();
        entities
    }

    /// Place a newly tracked entity in the archetype for `mask`.
    pub fn insert(&mut self, entity: Entity, mask: ComponentMask) {
        self.get_or_create(mask).add_entity(entity);
    }

    /// Move an entity from the archetype for `from` to the one for `to`.
    pub fn relocate(&mut self, entity: Entity, from: ComponentMask, to: ComponentMask) {
        if from == to {
            return;
        }
        self.remove(entity, from);
        self.insert(entity, to);
    }

    /// Stop tracking an entity. Returns `false` if it was not in `mask`'s archetype.
    pub fn remove(&mut self, entity: Entity, mask: ComponentMask) -> bool {
        self.archetypes
            .get_mut(&mask)
            .is_some_and(|archetype| archetype.remove_entity(entity))
    }

    /// Iterate all archetypes, including empty ones. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.values()
    }

    /// Number of archetypes, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns `true` if no archetype has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Forget every archetype.
    pub fn clear(&mut self) {
        self.archetypes.clear();
    }
}
