//! Fluent composition queries.

use engine_component::{Component, ComponentMask, ComponentToken, Entity};

use crate::store::EntityStore;

/// Accumulates a required mask and returns the live entities that hold every
/// listed component.
///
/// ```rust
/// use engine_world::World;
///
/// #[derive(Debug)]
/// struct Health(u32);
/// engine_component::impl_component!(Health, 0);
///
/// let mut world = World::new();
/// let e = world.create_entity();
/// world.add_component(e, Health(10)).unwrap();
///
/// assert_eq!(world.query().with::<Health>().execute(), vec![e]);
/// ```
#[derive(Debug, Clone)]
pub struct Query<'w> {
    store: &'w EntityStore,
    required: ComponentMask,
    /// Set when a token outside the mask width was requested. No entity can
    /// hold such a component, so the query matches nothing.
    unsatisfiable: bool,
}

impl<'w> Query<'w> {
    pub(crate) fn new(store: &'w EntityStore) -> Self {
        Self {
            store,
            required: ComponentMask::EMPTY,
            unsatisfiable: false,
        }
    }

    /// Require component `T`.
    #[must_use]
    pub fn with<T: Component>(self) -> Self {
        self.with_token(T::TOKEN)
    }

    /// Require the component kind with `token`.
    #[must_use]
    pub fn with_token(mut self, token: ComponentToken) -> Self {
        if token.is_representable() {
            self.required.insert(token);
        } else {
            self.unsatisfiable = true;
        }
        self
    }

    /// The accumulated required mask.
    #[must_use]
    pub fn mask(&self) -> ComponentMask {
        self.required
    }

    /// Matching entities in ascending index order. With nothing required,
    /// every live entity matches.
    #[must_use]
    pub fn execute(&self) -> Vec<Entity> {
        if self.unsatisfiable {
            return Vec::new();
        }
        self.store.entities_with_mask(self.required)
    }

    /// Number of matching entities.
    #[must_use]
    pub fn count(&self) -> usize {
        if self.unsatisfiable {
            return 0;
        }
        self.store
            .archetypes()
            .find_matching(self.required)
            .iter()
            .map(|archetype| archetype.len())
            .sum()
    }
}
