//! A [`World`] shared between threads.
//!
//! [`SharedWorld`] puts the whole world behind one `parking_lot::RwLock`.
//! Readers share the lock; every mutation, including multi-step ones such as
//! adding a component (payload, mask bit and archetype move), holds the write
//! lock from start to finish. With a single lock there is no acquisition
//! order to get wrong.
//!
//! Producers that only need to enqueue work should prefer a
//! [`CommandSender`], which never blocks on the world.

use std::sync::Arc;

use engine_component::{Component, EcsResult, Entity};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::command::CommandSender;
use crate::world::{FrameReport, World, WorldState};

/// Cloneable, lock-protected handle to a [`World`].
#[derive(Debug, Clone, Default)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
}

impl SharedWorld {
    /// Wrap a world for shared access.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Acquire shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.inner.read()
    }

    /// Acquire exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.inner.write()
    }

    /// See [`World::create_entity`].
    pub fn create_entity(&self) -> Entity {
        self.write().create_entity()
    }

    /// See [`World::destroy_entity`].
    pub fn destroy_entity(&self, entity: Entity) -> bool {
        self.write().destroy_entity(entity)
    }

    /// See [`World::add_component`].
    ///
    /// # Errors
    ///
    /// See [`World::add_component`].
    pub fn add_component<T: Component>(&self, entity: Entity, value: T) -> EcsResult<()> {
        self.write().add_component(entity, value)
    }

    /// See [`World::has_component`].
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.read().has_component::<T>(entity)
    }

    /// Clone a component out of the world.
    ///
    /// # Errors
    ///
    /// See [`World::get_component`].
    pub fn component<T: Component + Clone>(&self, entity: Entity) -> EcsResult<T> {
        self.read().get_component::<T>(entity).cloned()
    }

    /// See [`World::entity_count`].
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.read().entity_count()
    }

    /// See [`World::state`].
    #[must_use]
    pub fn state(&self) -> WorldState {
        self.read().state()
    }

    /// See [`World::update`]. Holds the write lock for the whole frame.
    pub fn update(&self, dt: f32) -> FrameReport {
        self.write().update(dt)
    }

    /// See [`World::command_sender`].
    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        self.read().command_sender()
    }
}

impl From<World> for SharedWorld {
    fn from(world: World) -> Self {
        Self::new(world)
    }
}
