//! The queryable entity store.
//!
//! [`EntityStore`] owns the four pieces of ECS state (entity table, component
//! store, type registry and archetype index) and is the only place that
//! mutates them. Every structural operation updates the payload column, the
//! entity's mask and its archetype under one `&mut self` borrow, so no caller
//! can observe a mask bit without its payload or an archetype that disagrees
//! with the table.

use engine_component::{
    AnyComponent, ArchetypeIndex, Component, ComponentMask, ComponentStore, ComponentToken,
    EcsError, EcsResult, Entity, EntityTable, TypeRegistry,
};
use tracing::{debug, info};

use crate::query::Query;

/// Entity table, component storage, registry and archetype index kept in step.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: EntityTable,
    components: ComponentStore,
    registry: TypeRegistry,
    archetypes: ArchetypeIndex,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` entity slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: EntityTable::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Register a component kind ahead of first use.
    ///
    /// Adding a component registers its kind implicitly, so calling this is
    /// only needed to surface token problems early.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeCapacityExceeded`] or [`EcsError::TokenConflict`].
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentToken> {
        self.registry.register::<T>()
    }

    /// Create an entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create();
        self.archetypes.insert(entity, ComponentMask::EMPTY);
        debug!(%entity, "entity created");
        entity
    }

    /// Destroy an entity and drop all of its components.
    ///
    /// Returns `false` if the entity was not alive, in which case nothing
    /// changes.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        let Some(mask) = self.entities.destroy(entity) else {
            return false;
        };
        let dropped = self.components.drop_all_for(entity);
        self.archetypes.remove(entity, mask);
        debug!(%entity, components = dropped, "entity destroyed");
        true
    }

    /// Returns `true` if the handle refers to a live entity.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.entities.exists(entity)
    }

    /// Attach a component to an entity.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not alive.
    /// - [`EcsError::ComponentAlreadyExists`] if it already holds a `T`; the
    ///   existing value is kept.
    /// - [`EcsError::TypeCapacityExceeded`] or [`EcsError::TokenConflict`] if
    ///   `T` cannot be registered.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.add_boxed(entity, Box::new(value))
    }

    /// Attach a type-erased component to an entity.
    ///
    /// # Errors
    ///
    /// Same as [`EntityStore::add_component`].
    pub fn add_boxed(&mut self, entity: Entity, value: Box<dyn AnyComponent>) -> EcsResult<()> {
        let from = self
            .entities
            .mask(entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        let kind = value.component_kind();
        let token = self.registry.register_kind(kind)?;

        self.components.insert_boxed(entity, token, value)?;
        let to = self.entities.set_bit(entity, token)?;
        self.archetypes.relocate(entity, from, to);
        debug!(%entity, component = kind.name, %token, "component added");
        Ok(())
    }

    /// Detach a component and return it.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not alive.
    /// - [`EcsError::ComponentNotFound`] if it holds no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        // Type-check before detaching so a mismatch leaves the payload in place.
        self.get_component::<T>(entity)?;
        let boxed = self.remove_token(entity, T::TOKEN)?;
        boxed
            .into_any()
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| EcsError::InvalidComponent {
                token: T::TOKEN,
                reason: format!("stored payload is not `{}`", T::type_name()),
            })
    }

    /// Detach a component by token and return it type-erased.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not alive.
    /// - [`EcsError::ComponentNotFound`] if nothing is stored under `token`.
    pub fn remove_token(
        &mut self,
        entity: Entity,
        token: ComponentToken,
    ) -> EcsResult<Box<dyn AnyComponent>> {
        let from = self
            .entities
            .mask(entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        let boxed = self.components.remove(entity, token)?;
        let to = self.entities.clear_bit(entity, token)?;
        self.archetypes.relocate(entity, from, to);
        debug!(%entity, %token, "component removed");
        Ok(boxed)
    }

    /// Borrow an entity's component.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity is not alive.
    /// - [`EcsError::ComponentNotFound`] if it holds no `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        if !self.entities.exists(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.components.get::<T>(entity)
    }

    /// Mutably borrow an entity's component.
    ///
    /// # Errors
    ///
    /// Same as [`EntityStore::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        if !self.entities.exists(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.components.get_mut::<T>(entity)
    }

    /// Returns `true` if the entity is alive and holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.has_token(entity, T::TOKEN)
    }

    /// Returns `true` if the entity is alive and its mask has `token` set.
    #[must_use]
    pub fn has_token(&self, entity: Entity, token: ComponentToken) -> bool {
        self.entities
            .mask(entity)
            .is_some_and(|mask| mask.contains(token))
    }

    /// Every component held by the entity, in token order. Empty for dead
    /// entities.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<&dyn AnyComponent> {
        if !self.entities.exists(entity) {
            return Vec::new();
        }
        self.components.all_for(entity)
    }

    /// The entity's composition mask, or `None` if it is not alive.
    #[must_use]
    pub fn mask_of(&self, entity: Entity) -> Option<ComponentMask> {
        self.entities.mask(entity)
    }

    /// All live entities in ascending index order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.all()
    }

    /// Live entities whose mask contains every bit of `required`, answered
    /// from the archetype index. An empty mask matches every live entity.
    #[must_use]
    pub fn entities_with_mask(&self, required: ComponentMask) -> Vec<Entity> {
        self.archetypes.entities_matching(required)
    }

    /// Start a query over this store.
    #[must_use]
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Live entities holding a component under `token`, in ascending order.
    #[must_use]
    pub fn entities_with(&self, token: ComponentToken) -> Vec<Entity> {
        self.components.entities_with(token)
    }

    /// Number of live entities holding a component under `token`.
    #[must_use]
    pub fn component_count(&self, token: ComponentToken) -> usize {
        self.components.count(token)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Destroy every entity and drop every component.
    ///
    /// Registered kinds are kept. Handles issued before the clear are stale
    /// afterwards.
    pub fn clear(&mut self) {
        let destroyed = self.entities.clear();
        self.components.clear();
        self.archetypes.clear();
        info!(entities = destroyed.len(), "store cleared");
    }

    /// The component type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The archetype index.
    #[must_use]
    pub fn archetypes(&self) -> &ArchetypeIndex {
        &self.archetypes
    }

    /// Panics if the table, payload columns and archetype index disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for (entity, mask) in self.entities.iter() {
            let stored: ComponentMask = self
                .components
                .all_for(entity)
                .iter()
                .map(|component| component.token())
                .collect();
            assert_eq!(stored, mask, "payloads of {entity} disagree with its mask");
            let archetype = self
                .archetypes
                .get(mask)
                .unwrap_or_else(|| panic!("no archetype for the mask of {entity}"));
            assert!(archetype.contains(entity), "{entity} missing from its archetype");
        }
        for archetype in self.archetypes.iter() {
            for &entity in archetype.entities() {
                assert_eq!(self.entities.mask(entity), Some(archetype.mask()));
            }
        }
        let tracked: usize = self.archetypes.iter().map(|a| a.len()).sum();
        assert_eq!(tracked, self.entities.len());
        let bits: usize = self.entities.iter().map(|(_, mask)| mask.len() as usize).sum();
        assert_eq!(self.components.len(), bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    engine_component::impl_component!(Position, 0);

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    engine_component::impl_component!(Velocity, 1);

    #[derive(Debug, Clone, PartialEq)]
    struct Tag;
    engine_component::impl_component!(Tag, 2);

    #[derive(Debug)]
    struct Oversized;
    engine_component::impl_component!(Oversized, 64);

    fn mask_of(tokens: &[ComponentToken]) -> ComponentMask {
        tokens.iter().copied().collect()
    }

    #[test]
    fn test_create_then_exists() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        assert!(store.exists(e));
        assert_eq!(store.mask_of(e), Some(ComponentMask::EMPTY));
        assert_eq!(store.entity_count(), 1);
        store.assert_consistent();
    }

    #[test]
    fn test_add_then_has_and_get() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Position { x: 1.0, y: 2.0 }).unwrap();

        assert!(store.has_component::<Position>(e));
        assert!(!store.has_component::<Velocity>(e));
        assert_eq!(store.get_component::<Position>(e).unwrap(), &Position { x: 1.0, y: 2.0 });
        assert_eq!(store.mask_of(e), Some(ComponentMask::of::<Position>()));
        assert!(store.registry().contains::<Position>());
        store.assert_consistent();
    }

    #[test]
    fn test_duplicate_add_keeps_original() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Position { x: 1.0, y: 1.0 }).unwrap();
        let err = store.add_component(e, Position { x: 9.0, y: 9.0 }).unwrap_err();

        assert_eq!(
            err,
            EcsError::ComponentAlreadyExists {
                entity: e,
                token: Position::TOKEN
            }
        );
        assert_eq!(store.get_component::<Position>(e).unwrap().x, 1.0);
        store.assert_consistent();
    }

    #[test]
    fn test_add_to_missing_entity() {
        let mut store = EntityStore::new();
        let ghost = Entity::new(42, 0);
        assert_eq!(
            store.add_component(ghost, Tag).unwrap_err(),
            EcsError::EntityNotFound(ghost)
        );
        assert_eq!(store.component_count(Tag::TOKEN), 0);
    }

    #[test]
    fn test_oversized_token_is_rejected() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        let err = store.add_component(e, Oversized).unwrap_err();
        assert!(matches!(err, EcsError::TypeCapacityExceeded { .. }));
        assert_eq!(store.mask_of(e), Some(ComponentMask::EMPTY));
        store.assert_consistent();
    }

    #[test]
    fn test_remove_then_has_is_false() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Velocity { dx: 3.0, dy: 0.0 }).unwrap();

        let removed = store.remove_component::<Velocity>(e).unwrap();
        assert_eq!(removed, Velocity { dx: 3.0, dy: 0.0 });
        assert!(!store.has_component::<Velocity>(e));
        assert_eq!(
            store.remove_component::<Velocity>(e).unwrap_err(),
            EcsError::ComponentNotFound {
                entity: e,
                token: Velocity::TOKEN
            }
        );
        store.assert_consistent();
    }

    #[test]
    fn test_destroy_cascades_to_components() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        store.add_component(e, Tag).unwrap();

        assert!(store.destroy_entity(e));
        assert!(!store.exists(e));
        assert!(!store.has_component::<Position>(e));
        assert_eq!(store.component_count(Position::TOKEN), 0);
        assert_eq!(store.component_count(Tag::TOKEN), 0);
        assert!(!store.destroy_entity(e), "destroy is idempotent");
        store.assert_consistent();
    }

    #[test]
    fn test_stale_handle_is_rejected_after_recycle() {
        let mut store = EntityStore::new();
        let old = store.create_entity();
        store.destroy_entity(old);
        let new = store.create_entity();
        assert_eq!(new.index(), old.index());

        assert_eq!(
            store.add_component(old, Tag).unwrap_err(),
            EcsError::EntityNotFound(old)
        );
        assert_eq!(
            store.get_component::<Tag>(old).unwrap_err(),
            EcsError::EntityNotFound(old)
        );
        assert!(store.mask_of(new).is_some_and(ComponentMask::is_empty));
    }

    #[test]
    fn test_mask_query_is_and() {
        let mut store = EntityStore::new();
        let e1 = store.create_entity();
        let e2 = store.create_entity();
        let e3 = store.create_entity();
        store.add_component(e1, Position { x: 0.0, y: 0.0 }).unwrap();
        store.add_component(e1, Velocity { dx: 0.0, dy: 0.0 }).unwrap();
        store.add_component(e2, Position { x: 0.0, y: 0.0 }).unwrap();
        store.add_component(e3, Velocity { dx: 0.0, dy: 0.0 }).unwrap();

        let both = mask_of(&[Position::TOKEN, Velocity::TOKEN]);
        assert_eq!(store.entities_with_mask(both), vec![e1]);
        assert_eq!(store.entities_with_mask(ComponentMask::of::<Position>()), vec![e1, e2]);
        assert_eq!(store.entities_with_mask(ComponentMask::EMPTY), vec![e1, e2, e3]);
        assert_eq!(store.entities_with(Velocity::TOKEN), vec![e1, e3]);
    }

    #[test]
    fn test_get_component_mut() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        store.get_component_mut::<Position>(e).unwrap().x = 5.0;
        assert_eq!(store.get_component::<Position>(e).unwrap().x, 5.0);
    }

    #[test]
    fn test_components_of_lists_payloads() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Tag).unwrap();
        store.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();

        let names: Vec<_> = store
            .components_of(e)
            .iter()
            .map(|c| c.component_kind().name)
            .collect();
        assert_eq!(names, vec!["Position", "Tag"]);
        store.destroy_entity(e);
        assert!(store.components_of(e).is_empty());
    }

    #[test]
    fn test_index_agrees_with_scan_after_churn() {
        let mut store = EntityStore::new();
        let mut live = Vec::new();
        for step in 0u32..200 {
            match step % 7 {
                0 | 1 => live.push(store.create_entity()),
                2 => {
                    if let Some(&e) = live.get(step as usize % live.len().max(1)) {
                        let _ = store.add_component(e, Position { x: 0.0, y: 0.0 });
                    }
                }
                3 => {
                    if let Some(&e) = live.last() {
                        let _ = store.add_component(e, Velocity { dx: 1.0, dy: 1.0 });
                        let _ = store.add_component(e, Tag);
                    }
                }
                4 => {
                    if let Some(&e) = live.first() {
                        let _ = store.remove_component::<Position>(e);
                    }
                }
                5 => {
                    if !live.is_empty() {
                        let e = live.remove(step as usize % live.len());
                        store.destroy_entity(e);
                    }
                }
                _ => {
                    if let Some(&e) = live.get(live.len() / 2) {
                        let _ = store.remove_component::<Tag>(e);
                    }
                }
            }
            store.assert_consistent();
        }

        let masks = [
            ComponentMask::EMPTY,
            ComponentMask::of::<Position>(),
            ComponentMask::of::<Velocity>(),
            mask_of(&[Velocity::TOKEN, Tag::TOKEN]),
            mask_of(&[Position::TOKEN, Velocity::TOKEN, Tag::TOKEN]),
        ];
        for required in masks {
            let scanned: Vec<_> = store
                .entities()
                .into_iter()
                .filter(|&e| store.mask_of(e).is_some_and(|m| m.contains_all(required)))
                .collect();
            assert_eq!(store.entities_with_mask(required), scanned);
        }
    }

    #[test]
    fn test_clear_keeps_registry() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, Tag).unwrap();
        store.clear();

        assert_eq!(store.entity_count(), 0);
        assert!(!store.exists(e));
        assert!(store.registry().contains::<Tag>());
        let fresh = store.create_entity();
        assert_eq!(store.entities_with_mask(ComponentMask::EMPTY), vec![fresh]);
        store.assert_consistent();
    }
}
