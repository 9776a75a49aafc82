//! The [`World`]: entity store, system scheduler and command queue under one
//! lifecycle.
//!
//! ```text
//!            start            pause
//!  Created ─────────> Running ──────> Paused
//!                      ^   │  <──────   │
//!               start  │   │  resume    │
//!                      │   v            │
//!                     Stopped <─────────┘
//!                           stop
//! ```
//!
//! Only a running world advances: [`World::update`] drains pending commands
//! and then runs every enabled system once, in priority order.

use std::fmt;

use engine_component::{
    AnyComponent, Component, ComponentMask, ComponentToken, EcsError, EcsResult, Entity,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::{CommandQueue, CommandReport, CommandSender};
use crate::config::WorldConfig;
use crate::query::Query;
use crate::scheduler::{SystemFault, SystemInfo, SystemScheduler};
use crate::store::EntityStore;
use crate::system::{FnSystem, System, SystemId};

/// Lifecycle state of a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldState {
    /// Built but never started.
    Created,
    /// Frames advance.
    Running,
    /// Frames are no-ops until resumed.
    Paused,
    /// Frames are no-ops until started again.
    Stopped,
}

impl WorldState {
    /// Lower-case name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one [`World::update`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Commands drained at the start of the frame.
    pub commands: CommandReport,
    /// Number of systems invoked.
    pub systems_run: usize,
    /// Systems that faulted during the frame.
    pub faults: Vec<SystemFault>,
}

impl FrameReport {
    /// Returns `true` if nothing ran, as for a world that is not running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.systems_run == 0 && self.commands.applied == 0 && self.commands.errors.is_empty()
    }
}

/// An ECS world.
#[derive(Debug)]
pub struct World {
    store: EntityStore,
    scheduler: SystemScheduler,
    commands: CommandQueue,
    state: WorldState,
}

impl World {
    /// Create an empty world in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&WorldConfig::default())
    }

    /// Create an empty world using `config`'s capacity and fault policy.
    #[must_use]
    pub fn with_config(config: &WorldConfig) -> Self {
        Self {
            store: EntityStore::with_capacity(config.entity_capacity),
            scheduler: SystemScheduler::new().with_auto_disable(config.auto_disable_faulty_systems),
            commands: CommandQueue::new(),
            state: WorldState::Created,
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Returns `true` if the world is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == WorldState::Running
    }

    /// Returns `true` if the world is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == WorldState::Paused
    }

    /// `Created` or `Stopped` to `Running`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidTransition`] from any other state.
    pub fn start(&mut self) -> EcsResult<()> {
        self.transition("start", &[WorldState::Created, WorldState::Stopped], WorldState::Running)
    }

    /// `Running` to `Paused`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidTransition`] from any other state.
    pub fn pause(&mut self) -> EcsResult<()> {
        self.transition("pause", &[WorldState::Running], WorldState::Paused)
    }

    /// `Paused` to `Running`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidTransition`] from any other state.
    pub fn resume(&mut self) -> EcsResult<()> {
        self.transition("resume", &[WorldState::Paused], WorldState::Running)
    }

    /// `Running` or `Paused` to `Stopped`. Takes effect from the next update.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidTransition`] from any other state.
    pub fn stop(&mut self) -> EcsResult<()> {
        self.transition("stop", &[WorldState::Running, WorldState::Paused], WorldState::Stopped)
    }

    fn transition(
        &mut self,
        action: &'static str,
        allowed: &[WorldState],
        to: WorldState,
    ) -> EcsResult<()> {
        if !allowed.contains(&self.state) {
            return Err(EcsError::InvalidTransition {
                from: self.state.as_str(),
                action,
            });
        }
        let from = std::mem::replace(&mut self.state, to);
        info!(%from, %to, action, "world state changed");
        Ok(())
    }

    /// Advance one frame.
    ///
    /// Does nothing unless the world is running. Otherwise applies pending
    /// commands, then runs every enabled system in priority order.
    pub fn update(&mut self, dt: f32) -> FrameReport {
        if self.state != WorldState::Running {
            return FrameReport::default();
        }

        let commands = self.commands.apply(&mut self.store);
        let run = self.scheduler.update(dt, &mut self.store);
        debug!(
            dt,
            systems = run.ran,
            faults = run.faults.len(),
            entities = self.store.entity_count(),
            "frame complete"
        );
        FrameReport {
            commands,
            systems_run: run.ran,
            faults: run.faults,
        }
    }

    /// Destroy every entity and component. Systems and state are kept.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Stop the world and drop everything it holds: systems, pending
    /// commands, entities and components.
    pub fn destroy(&mut self) {
        self.state = WorldState::Stopped;
        self.scheduler.clear();
        let discarded = self.commands.discard();
        self.store.clear();
        info!(discarded_commands = discarded, "world destroyed");
    }

    // -- entities and components ---------------------------------------------

    /// Create an entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.store.create_entity()
    }

    /// Destroy an entity and all of its components. Returns `false` if it was
    /// not alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        self.store.destroy_entity(entity)
    }

    /// Returns `true` if the handle refers to a live entity.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.store.exists(entity)
    }

    /// Register a component kind ahead of first use.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::register`].
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentToken> {
        self.store.register::<T>()
    }

    /// Attach a component.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::add_component`].
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.store.add_component(entity, value)
    }

    /// Attach a type-erased component.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::add_component`].
    pub fn add_boxed(&mut self, entity: Entity, value: Box<dyn AnyComponent>) -> EcsResult<()> {
        self.store.add_boxed(entity, value)
    }

    /// Detach and return a component.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::remove_component`].
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        self.store.remove_component(entity)
    }

    /// Borrow a component.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::get_component`].
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.store.get_component(entity)
    }

    /// Mutably borrow a component.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.store.get_component_mut(entity)
    }

    /// Returns `true` if the entity is alive and holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.store.has_component::<T>(entity)
    }

    /// All live entities in ascending index order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.store.entities()
    }

    /// Live entities holding every component in `required`.
    #[must_use]
    pub fn entities_with_mask(&self, required: ComponentMask) -> Vec<Entity> {
        self.store.entities_with_mask(required)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.store.entity_count()
    }

    /// Start a query.
    #[must_use]
    pub fn query(&self) -> Query<'_> {
        self.store.query()
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    // -- systems ------------------------------------------------------------

    /// Schedule a system at `priority` (lower runs first).
    pub fn add_system(&mut self, priority: i32, system: impl System + 'static) -> SystemId {
        self.scheduler.add(priority, system)
    }

    /// Schedule a closure as a system.
    pub fn add_fn_system<F>(&mut self, name: impl Into<String>, priority: i32, run: F) -> SystemId
    where
        F: FnMut(f32, &mut EntityStore) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.scheduler.add(priority, FnSystem::new(name, run))
    }

    /// Unschedule a system, returning it.
    pub fn remove_system(&mut self, id: SystemId) -> Option<Box<dyn System>> {
        self.scheduler.remove(id)
    }

    /// Enable or disable a system. Returns `false` if the id is unknown.
    pub fn set_system_enabled(&mut self, id: SystemId, enabled: bool) -> bool {
        self.scheduler.set_enabled(id, enabled)
    }

    /// Snapshot of all systems in execution order.
    #[must_use]
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.scheduler.list()
    }

    // -- commands -----------------------------------------------------------

    /// A handle other threads can use to submit commands.
    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    /// Number of commands waiting for the next frame.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.pending()
    }

    /// Apply pending commands now, regardless of state.
    pub fn apply_commands(&mut self) -> CommandReport {
        self.commands.apply(&mut self.store)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
