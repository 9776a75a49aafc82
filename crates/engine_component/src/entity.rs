//! Entity handles and the entity table.
//!
//! An [`Entity`] is a generational handle: a slot index plus the generation
//! the slot had when the handle was issued. Destroying an entity bumps its
//! slot's generation, so a handle kept from before the destruction no longer
//! resolves even after the index is recycled.
//!
//! The [`EntityTable`] owns the slots, each live entity's
//! [`ComponentMask`], and the free list of recyclable indices. It is the
//! canonical record of an entity's composition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::ComponentToken;
use crate::error::{EcsError, EcsResult};
use crate::mask::ComponentMask;

/// A generational entity handle.
///
/// Entities are pure identifiers; components are attached to give them
/// meaning. Ordering sorts by slot index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// A handle that never resolves to a live entity.
    pub const DANGLING: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Create a handle from its parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index. May be shared with destroyed entities of earlier generations.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    mask: ComponentMask,
    alive: bool,
}

impl Slot {
    /// Kill the slot and advance its generation. Returns `false` if the
    /// generation is exhausted, in which case the slot must never be reused.
    fn kill(&mut self) -> bool {
        self.alive = false;
        self.mask = ComponentMask::EMPTY;
        match self.generation.checked_add(1) {
            Some(next) => {
                self.generation = next;
                true
            }
            None => false,
        }
    }
}

/// Owns entity slots, composition masks and the index free list.
#[derive(Debug, Default)]
pub struct EntityTable {
    slots: Vec<Slot>,
    /// Indices of dead slots, reused LIFO.
    free: Vec<u32>,
    live: usize,
}

impl EntityTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Allocate an entity with an empty mask.
    ///
    /// Recycles the most recently freed index if there is one (its generation
    /// was already bumped on destruction), otherwise appends a new slot.
    ///
    /// # Panics
    ///
    /// Panics if all `u32::MAX` slot indices are in use or retired. Index
    /// `u32::MAX` is reserved for [`Entity::DANGLING`].
    pub fn create(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            slot.mask = ComponentMask::EMPTY;
            self.live += 1;
            return Entity::new(index, slot.generation);
        }

        let index = match u32::try_from(self.slots.len()) {
            Ok(index) if index != Entity::DANGLING.index => index,
            _ => panic!("entity index space exhausted"),
        };
        self.live += 1;
        self.slots.push(Slot {
            generation: 0,
            mask: ComponentMask::EMPTY,
            alive: true,
        });
        Entity::new(index, 0)
    }

    /// Destroy an entity, returning the mask it had.
    ///
    /// Returns `None` (and does nothing) if the handle is not live. Dropping
    /// the entity's payloads is the caller's job. A slot whose generation
    /// would overflow is retired instead of recycled, so no stale handle can
    /// ever resolve again.
    pub fn destroy(&mut self, entity: Entity) -> Option<ComponentMask> {
        let slot = self.slot_mut(entity)?;
        let mask = slot.mask;
        if slot.kill() {
            self.free.push(entity.index);
        }
        self.live -= 1;
        Some(mask)
    }

    /// Returns `true` if the handle refers to a live entity.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// The entity's composition mask.
    #[must_use]
    pub fn mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.slot(entity).map(|slot| slot.mask)
    }

    /// Set `token`'s bit, returning the new mask.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the handle is not live.
    pub fn set_bit(&mut self, entity: Entity, token: ComponentToken) -> EcsResult<ComponentMask> {
        let slot = self
            .slot_mut(entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        slot.mask.insert(token);
        Ok(slot.mask)
    }

    /// Clear `token`'s bit, returning the new mask.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the handle is not live.
    pub fn clear_bit(&mut self, entity: Entity, token: ComponentToken) -> EcsResult<ComponentMask> {
        let slot = self
            .slot_mut(entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        slot.mask.remove(token);
        Ok(slot.mask)
    }

    /// All live entities, in ascending index order.
    #[must_use]
    pub fn all(&self) -> Vec<Entity> {
        self.iter().map(|(entity, _)| entity).collect()
    }

    /// Live entities whose mask contains every bit of `required`.
    ///
    /// An empty `required` mask matches every live entity.
    #[must_use]
    pub fn with_mask(&self, required: ComponentMask) -> Vec<Entity> {
        self.iter()
            .filter(|(_, mask)| mask.contains_all(required))
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Iterate live entities with their masks.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, ComponentMask)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| (Entity::new(index as u32, slot.generation), slot.mask))
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Destroy every live entity, returning the destroyed handles.
    ///
    /// Generations are bumped as for [`EntityTable::destroy`], so handles from
    /// before the clear stay stale. The free list is rebuilt so the lowest
    /// index is reused first; retired slots stay out of it.
    pub fn clear(&mut self) -> Vec<Entity> {
        let destroyed = self.all();
        let mut recyclable = vec![false; self.slots.len()];
        for &index in &self.free {
            recyclable[index as usize] = true;
        }
        for entity in &destroyed {
            let index = entity.index as usize;
            recyclable[index] = self.slots[index].kill();
        }
        self.free = (0..self.slots.len() as u32)
            .rev()
            .filter(|&index| recyclable[index as usize])
            .collect();
        self.live = 0;
        destroyed
    }

    fn slot(&self, entity: Entity) -> Option<&Slot> {
        self.slots
            .get(entity.index as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation)
    }

    fn slot_mut(&mut self, entity: Entity) -> Option<&mut Slot> {
        self.slots
            .get_mut(entity.index as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation)
    }
}
