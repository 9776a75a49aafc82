//! System scheduler: priority ordering and per-system fault isolation.
//!
//! Systems are kept in a single vector sorted by priority (lower runs
//! earlier). A new system is inserted after every existing system of equal or
//! lower priority, found by binary search, so the order for equal priorities
//! is insertion order and the list is never re-sorted.
//!
//! Each system call is a fault boundary. An `Err` or a panic from one system
//! becomes a [`SystemFault`]; by default the faulty system is disabled and the
//! remaining systems still run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};

use crate::store::EntityStore;
use crate::system::{System, SystemId};

struct Entry {
    id: SystemId,
    priority: i32,
    enabled: bool,
    system: Box<dyn System>,
}

/// Snapshot of one scheduled system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// The system's id.
    pub id: SystemId,
    /// The system's name.
    pub name: String,
    /// Lower runs earlier.
    pub priority: i32,
    /// Disabled systems keep their place but are skipped.
    pub enabled: bool,
}

/// A system that returned an error or panicked during a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFault {
    /// The faulting system.
    pub id: SystemId,
    /// Its name at the time of the fault.
    pub name: String,
    /// The error chain or panic message.
    pub message: String,
}

impl fmt::Display for SystemFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) faulted: {}", self.name, self.id, self.message)
    }
}

/// Outcome of one scheduler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerRun {
    /// Number of enabled systems invoked.
    pub ran: usize,
    /// Faults raised during the pass, in execution order.
    pub faults: Vec<SystemFault>,
}

/// Ordered collection of systems.
pub struct SystemScheduler {
    entries: Vec<Entry>,
    next_id: u32,
    auto_disable_faulty: bool,
}

impl SystemScheduler {
    /// Create an empty scheduler that disables faulting systems.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            auto_disable_faulty: true,
        }
    }

    /// Choose whether a faulting system is disabled.
    #[must_use]
    pub fn with_auto_disable(mut self, auto_disable_faulty: bool) -> Self {
        self.auto_disable_faulty = auto_disable_faulty;
        self
    }

    /// Add a system at `priority`. Lower priorities run first; equal
    /// priorities run in the order they were added.
    pub fn add(&mut self, priority: i32, system: impl System + 'static) -> SystemId {
        self.add_boxed(priority, Box::new(system))
    }

    /// Add an already boxed system.
    pub fn add_boxed(&mut self, priority: i32, system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;

        let at = self.entries.partition_point(|entry| entry.priority <= priority);
        info!(system = %id, name = system.name(), priority, position = at, "system added");
        self.entries.insert(
            at,
            Entry {
                id,
                priority,
                enabled: true,
                system,
            },
        );
        id
    }

    /// Remove a system, returning it. `None` if the id is unknown.
    pub fn remove(&mut self, id: SystemId) -> Option<Box<dyn System>> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(position);
        info!(system = %id, name = entry.system.name(), "system removed");
        Some(entry.system)
    }

    /// Enable or disable a system. Returns `false` if the id is unknown.
    pub fn set_enabled(&mut self, id: SystemId, enabled: bool) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        if entry.enabled != enabled {
            entry.enabled = enabled;
            info!(system = %id, name = entry.system.name(), enabled, "system toggled");
        }
        true
    }

    /// Whether a system is enabled. `None` if the id is unknown.
    #[must_use]
    pub fn is_enabled(&self, id: SystemId) -> Option<bool> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.enabled)
    }

    /// Run every enabled system once, in order.
    ///
    /// Each system observes the mutations of the systems before it.
    pub fn update(&mut self, dt: f32, store: &mut EntityStore) -> SchedulerRun {
        let mut run = SchedulerRun::default();

        for entry in self.entries.iter_mut().filter(|entry| entry.enabled) {
            run.ran += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.system.update(dt, store)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => panic_message(payload.as_ref()),
            };

            let name = entry.system.name().to_owned();
            error!(system = %entry.id, name = %name, %message, "system faulted");
            if self.auto_disable_faulty {
                entry.enabled = false;
                warn!(system = %entry.id, name = %name, "faulty system disabled");
            }
            run.faults.push(SystemFault {
                id: entry.id,
                name,
                message,
            });
        }

        run
    }

    /// Snapshot of all systems in execution order.
    #[must_use]
    pub fn list(&self) -> Vec<SystemInfo> {
        self.entries
            .iter()
            .map(|entry| SystemInfo {
                id: entry.id,
                name: entry.system.name().to_owned(),
                priority: entry.priority,
                enabled: entry.enabled,
            })
            .collect()
    }

    /// Number of systems, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no system is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every system. Ids are not reused.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        info!(removed, "scheduler cleared");
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemScheduler")
            .field("systems", &self.list())
            .field("auto_disable_faulty", &self.auto_disable_faulty)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_owned()
    }
}
