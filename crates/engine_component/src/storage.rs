//! Type-erased component storage.
//!
//! [`ComponentStore`] keeps one column per [`ComponentToken`], each mapping an
//! [`Entity`] to its boxed payload. It knows nothing about masks; keeping the
//! entity table's mask bits in step with these columns is the job of the
//! owning store.

use std::collections::{BTreeMap, HashMap};

use crate::component::{AnyComponent, Component, ComponentToken};
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};

type Column = HashMap<Entity, Box<dyn AnyComponent>>;

/// Per-token mapping from entity to component payload.
#[derive(Debug, Default)]
pub struct ComponentStore {
    columns: BTreeMap<ComponentToken, Column>,
}

impl ComponentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentAlreadyExists`] if `entity` already holds
    /// a `T`; the stored value is left untouched.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.insert_boxed(entity, T::TOKEN, Box::new(value))
    }

    /// Insert a type-erased payload under `token`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidComponent`] if the payload's own token is not `token`.
    /// - [`EcsError::ComponentAlreadyExists`] if the slot is occupied.
    pub fn insert_boxed(
        &mut self,
        entity: Entity,
        token: ComponentToken,
        value: Box<dyn AnyComponent>,
    ) -> EcsResult<()> {
        let kind = value.component_kind();
        if kind.token != token {
            return Err(EcsError::InvalidComponent {
                token,
                reason: format!("`{}` is declared with {}", kind.name, kind.token),
            });
        }

        let column = self.columns.entry(token).or_default();
        if column.contains_key(&entity) {
            return Err(EcsError::ComponentAlreadyExists { entity, token });
        }
        column.insert(entity, value);
        Ok(())
    }

    /// Remove and return a payload.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if nothing is stored.
    pub fn remove(
        &mut self,
        entity: Entity,
        token: ComponentToken,
    ) -> EcsResult<Box<dyn AnyComponent>> {
        self.columns
            .get_mut(&token)
            .and_then(|column| column.remove(&entity))
            .ok_or(EcsError::ComponentNotFound { entity, token })
    }

    /// Borrow a typed payload.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotFound`] if nothing is stored.
    /// - [`EcsError::InvalidComponent`] if the stored payload is not a `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        let stored = self.get_erased(entity, T::TOKEN)?;
        let name = stored.component_kind().name;
        stored
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(name))
    }

    /// Mutably borrow a typed payload.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentStore::get`].
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        let stored = self
            .columns
            .get_mut(&T::TOKEN)
            .and_then(|column| column.get_mut(&entity))
            .ok_or(EcsError::ComponentNotFound {
                entity,
                token: T::TOKEN,
            })?;
        let name = stored.component_kind().name;
        stored
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch::<T>(name))
    }

    /// Borrow a payload without knowing its type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if nothing is stored.
    pub fn get_erased(
        &self,
        entity: Entity,
        token: ComponentToken,
    ) -> EcsResult<&dyn AnyComponent> {
        self.columns
            .get(&token)
            .and_then(|column| column.get(&entity))
            .map(|boxed| &**boxed)
            .ok_or(EcsError::ComponentNotFound { entity, token })
    }

    /// Returns `true` if a payload is stored for (`entity`, `token`).
    #[must_use]
    pub fn has(&self, entity: Entity, token: ComponentToken) -> bool {
        self.columns
            .get(&token)
            .is_some_and(|column| column.contains_key(&entity))
    }

    /// Every payload held by `entity`, in token order. Intended for
    /// inspection and debugging rather than iteration in systems.
    #[must_use]
    pub fn all_for(&self, entity: Entity) -> Vec<&dyn AnyComponent> {
        self.columns
            .values()
            .filter_map(|column| column.get(&entity))
            .map(|boxed| &**boxed)
            .collect()
    }

    /// Drop every payload held by `entity`, returning how many were dropped.
    pub fn drop_all_for(&mut self, entity: Entity) -> usize {
        self.columns
            .values_mut()
            .filter_map(|column| column.remove(&entity))
            .count()
    }

    /// Number of payloads stored under `token`.
    #[must_use]
    pub fn count(&self, token: ComponentToken) -> usize {
        self.columns.get(&token).map_or(0, HashMap::len)
    }

    /// Entities holding a payload under `token`, in ascending order.
    #[must_use]
    pub fn entities_with(&self, token: ComponentToken) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .columns
            .get(&token)
            .map(|column| column.keys().copied().collect())
            .unwrap_or_default();
        entities.sort_unstable();
        entities
    }

    /// Total number of stored payloads across all tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.values().map(HashMap::len).sum()
    }

    /// Returns `true` if no payload is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every payload. Columns are kept so their allocations are reused.
    pub fn clear(&mut self) {
        for column in self.columns.values_mut() {
            column.clear();
        }
    }
}

fn mismatch<T: Component>(stored: &'static str) -> EcsError {
    EcsError::InvalidComponent {
        token: T::TOKEN,
        reason: format!("stored payload is `{stored}`, not `{}`", T::type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: u32,
        max: u32,
    }
    crate::impl_component!(Health, 0);

    #[derive(Debug, Clone, PartialEq)]
    struct Sprite(&'static str);
    crate::impl_component!(Sprite, 5);

    fn entity(index: u32) -> Entity {
        Entity::new(index, 0)
    }

    #[test]
    fn test_insert_then_get() {
        let mut store = ComponentStore::new();
        let e = entity(1);
        store.insert(e, Health { current: 100, max: 100 }).unwrap();

        assert!(store.has(e, Health::TOKEN));
        assert_eq!(store.get::<Health>(e).unwrap(), &Health { current: 100, max: 100 });
    }

    #[test]
    fn test_duplicate_insert_keeps_first_value() {
        let mut store = ComponentStore::new();
        let e = entity(1);
        store.insert(e, Health { current: 100, max: 100 }).unwrap();
        let err = store.insert(e, Health { current: 1, max: 1 }).unwrap_err();

        assert_eq!(
            err,
            EcsError::ComponentAlreadyExists {
                entity: e,
                token: Health::TOKEN
            }
        );
        assert_eq!(store.get::<Health>(e).unwrap().current, 100);
    }

    #[test]
    fn test_remove_twice_reports_not_found() {
        let mut store = ComponentStore::new();
        let e = entity(2);
        store.insert(e, Sprite("ship.png")).unwrap();

        let removed = store.remove(e, Sprite::TOKEN).unwrap();
        assert_eq!(removed.as_any().downcast_ref::<Sprite>(), Some(&Sprite("ship.png")));
        assert!(!store.has(e, Sprite::TOKEN));
        assert!(matches!(
            store.remove(e, Sprite::TOKEN),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_boxed_insert_with_wrong_token_is_invalid() {
        let mut store = ComponentStore::new();
        let err = store
            .insert_boxed(entity(0), Health::TOKEN, Box::new(Sprite("x")))
            .unwrap_err();
        assert!(matches!(err, EcsError::InvalidComponent { token, .. } if token == Health::TOKEN));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut store = ComponentStore::new();
        let e = entity(3);
        store.insert(e, Health { current: 10, max: 50 }).unwrap();
        store.get_mut::<Health>(e).unwrap().current = 40;
        assert_eq!(store.get::<Health>(e).unwrap().current, 40);
    }

    #[test]
    fn test_get_missing_reports_not_found() {
        let store = ComponentStore::new();
        assert_eq!(
            store.get::<Health>(entity(9)).unwrap_err(),
            EcsError::ComponentNotFound {
                entity: entity(9),
                token: Health::TOKEN
            }
        );
    }

    #[test]
    fn test_all_for_and_drop_all_for() {
        let mut store = ComponentStore::new();
        let e = entity(4);
        let other = entity(5);
        store.insert(e, Sprite("a")).unwrap();
        store.insert(e, Health { current: 1, max: 2 }).unwrap();
        store.insert(other, Sprite("b")).unwrap();

        let tokens: Vec<_> = store.all_for(e).iter().map(|c| c.token()).collect();
        assert_eq!(tokens, vec![Health::TOKEN, Sprite::TOKEN]);

        assert_eq!(store.drop_all_for(e), 2);
        assert!(store.all_for(e).is_empty());
        assert!(store.has(other, Sprite::TOKEN));
    }

    #[test]
    fn test_count_and_entities_with() {
        let mut store = ComponentStore::new();
        store.insert(entity(7), Sprite("a")).unwrap();
        store.insert(entity(3), Sprite("b")).unwrap();
        assert_eq!(store.count(Sprite::TOKEN), 2);
        assert_eq!(store.count(Health::TOKEN), 0);
        assert_eq!(store.entities_with(Sprite::TOKEN), vec![entity(3), entity(7)]);

        store.clear();
        assert_eq!(store.len(), 0);
    }
}
