//! Deferred structural commands.
//!
//! Code that does not own the world (a resource loader thread, a network
//! callback) records mutations as [`Command`] values through a cloneable
//! [`CommandSender`]. The world drains its [`CommandQueue`] at a single
//! synchronisation point, the start of each running frame, and applies the
//! commands in the order they were sent.
//!
//! Commands are plain data describing what should change. A command that
//! cannot be applied (its entity is gone, the component already exists) is
//! reported and skipped; it never aborts the rest of the drain.

use crossbeam_channel::{Receiver, SendError, Sender, unbounded};
use engine_component::{AnyComponent, Component, ComponentToken, EcsError, EcsResult, Entity};
use tracing::{debug, warn};

use crate::store::EntityStore;

/// A deferred mutation of the entity store.
#[derive(Debug)]
pub enum Command {
    /// Create an entity carrying the given components. If any component is
    /// rejected the partially built entity is destroyed again.
    Spawn {
        /// Initial components.
        components: Vec<Box<dyn AnyComponent>>,
    },
    /// Destroy an entity.
    Despawn {
        /// The entity to destroy.
        entity: Entity,
    },
    /// Attach a component to an existing entity.
    Insert {
        /// The target entity.
        entity: Entity,
        /// The payload; its kind decides the token.
        component: Box<dyn AnyComponent>,
    },
    /// Detach and drop a component.
    Remove {
        /// The target entity.
        entity: Entity,
        /// The kind to remove.
        token: ComponentToken,
    },
}

/// Cloneable, thread-safe handle for submitting commands.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Submit a command.
    ///
    /// # Errors
    ///
    /// Returns the command back if the owning queue has been dropped.
    pub fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.tx.send(command)
    }

    /// Submit a spawn of an entity with `components`.
    ///
    /// # Errors
    ///
    /// See [`CommandSender::send`].
    pub fn spawn(&self, components: Vec<Box<dyn AnyComponent>>) -> Result<(), SendError<Command>> {
        self.send(Command::Spawn { components })
    }

    /// Submit a despawn.
    ///
    /// # Errors
    ///
    /// See [`CommandSender::send`].
    pub fn despawn(&self, entity: Entity) -> Result<(), SendError<Command>> {
        self.send(Command::Despawn { entity })
    }

    /// Submit a component insertion.
    ///
    /// # Errors
    ///
    /// See [`CommandSender::send`].
    pub fn insert<T: Component>(&self, entity: Entity, value: T) -> Result<(), SendError<Command>> {
        self.send(Command::Insert {
            entity,
            component: Box::new(value),
        })
    }

    /// Submit a component removal.
    ///
    /// # Errors
    ///
    /// See [`CommandSender::send`].
    pub fn remove<T: Component>(&self, entity: Entity) -> Result<(), SendError<Command>> {
        self.send(Command::Remove {
            entity,
            token: T::TOKEN,
        })
    }
}

/// What one drain of the queue did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReport {
    /// Commands applied successfully.
    pub applied: usize,
    /// Entities created by spawn commands, in order.
    pub spawned: Vec<Entity>,
    /// Errors from rejected commands, in order.
    pub errors: Vec<EcsError>,
}

impl CommandReport {
    /// Returns `true` if every drained command was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Multi-producer queue of pending commands, drained by the world.
#[derive(Debug)]
pub struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl CommandQueue {
    /// Create an empty, unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// A new handle for submitting commands.
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Number of commands waiting to be applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Apply every command that was pending when the drain started.
    ///
    /// Commands sent while the drain runs wait for the next one, so a busy
    /// producer cannot stall a frame.
    pub fn apply(&self, store: &mut EntityStore) -> CommandReport {
        let mut report = CommandReport::default();
        let pending = self.rx.len();

        for command in self.rx.try_iter().take(pending) {
            match apply_one(store, command) {
                Ok(Some(entity)) => {
                    report.applied += 1;
                    report.spawned.push(entity);
                }
                Ok(None) => report.applied += 1,
                Err(err) => {
                    warn!(error = %err, "command rejected");
                    report.errors.push(err);
                }
            }
        }

        if pending > 0 {
            debug!(
                applied = report.applied,
                rejected = report.errors.len(),
                "commands applied"
            );
        }
        report
    }

    /// Drop every pending command unapplied, returning how many were dropped.
    pub fn discard(&self) -> usize {
        self.rx.try_iter().count()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_one(store: &mut EntityStore, command: Command) -> EcsResult<Option<Entity>> {
    match command {
        Command::Spawn { components } => {
            let entity = store.create_entity();
            for component in components {
                if let Err(err) = store.add_boxed(entity, component) {
                    store.destroy_entity(entity);
                    return Err(err);
                }
            }
            Ok(Some(entity))
        }
        Command::Despawn { entity } => {
            if store.destroy_entity(entity) {
                Ok(None)
            } else {
                Err(EcsError::EntityNotFound(entity))
            }
        }
        Command::Insert { entity, component } => store.add_boxed(entity, component).map(|()| None),
        Command::Remove { entity, token } => store.remove_token(entity, token).map(|_| None),
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Mesh(&'static str);
    engine_component::impl_component!(Mesh, 0);

    #[derive(Debug, Clone, PartialEq)]
    struct Texture(u32);
    engine_component::impl_component!(Texture, 1);

    #[test]
    fn test_commands_apply_in_submission_order() {
        let queue = CommandQueue::new();
        let mut store = EntityStore::new();
        let e = store.create_entity();
        let sender = queue.sender();

        sender.insert(e, Mesh("crate.obj")).unwrap();
        sender.remove::<Mesh>(e).unwrap();
        sender.insert(e, Texture(3)).unwrap();
        assert_eq!(queue.pending(), 3);

        let report = queue.apply(&mut store);
        assert!(report.is_clean());
        assert_eq!(report.applied, 3);
        assert!(!store.has_component::<Mesh>(e));
        assert_eq!(store.get_component::<Texture>(e).unwrap(), &Texture(3));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_spawn_creates_entity_with_components() {
        let queue = CommandQueue::new();
        let mut store = EntityStore::new();
        queue
            .sender()
            .spawn(vec![Box::new(Mesh("tree.obj")), Box::new(Texture(9))])
            .unwrap();

        let report = queue.apply(&mut store);
        let &[spawned] = report.spawned.as_slice() else {
            panic!("expected one spawned entity, got {:?}", report.spawned);
        };
        assert!(store.has_component::<Mesh>(spawned));
        assert!(store.has_component::<Texture>(spawned));
        store.assert_consistent();
    }

    #[test]
    fn test_failed_spawn_leaves_nothing_behind() {
        let queue = CommandQueue::new();
        let mut store = EntityStore::new();
        queue
            .sender()
            .spawn(vec![Box::new(Mesh("a")), Box::new(Mesh("b"))])
            .unwrap();

        let report = queue.apply(&mut store);
        assert_eq!(report.applied, 0);
        assert!(matches!(report.errors[..], [EcsError::ComponentAlreadyExists { .. }]));
        assert_eq!(store.entity_count(), 0);
        assert_eq!(store.component_count(Mesh::TOKEN), 0);
        store.assert_consistent();
    }

    #[test]
    fn test_rejected_command_does_not_stop_drain() {
        let queue = CommandQueue::new();
        let mut store = EntityStore::new();
        let gone = store.create_entity();
        store.destroy_entity(gone);
        let alive = store.create_entity();

        let sender = queue.sender();
        sender.insert(gone, Texture(1)).unwrap();
        sender.despawn(gone).unwrap();
        sender.insert(alive, Texture(2)).unwrap();

        let report = queue.apply(&mut store);
        assert_eq!(report.applied, 1);
        assert_eq!(
            report.errors,
            vec![EcsError::EntityNotFound(gone), EcsError::EntityNotFound(gone)]
        );
        assert!(store.has_component::<Texture>(alive));
    }

    #[test]
    fn test_concurrent_producers_spawn_unique_entities() {
        let queue = CommandQueue::new();
        let mut store = EntityStore::new();

        thread::scope(|scope| {
            for worker in 0..4u32 {
                let sender = queue.sender();
                scope.spawn(move || {
                    for i in 0..25 {
                        sender.spawn(vec![Box::new(Texture(worker * 100 + i))]).unwrap();
                    }
                });
            }
        });

        let report = queue.apply(&mut store);
        assert_eq!(report.spawned.len(), 100);
        let mut unique = report.spawned.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 100);
        assert_eq!(store.component_count(Texture::TOKEN), 100);
    }

    #[test]
    fn test_discard_drops_pending() {
        let queue = CommandQueue::new();
        queue.sender().despawn(Entity::DANGLING).unwrap();
        assert_eq!(queue.discard(), 1);
        assert_eq!(queue.pending(), 0);
    }
}
