//! The [`System`] trait and closure-backed systems.
//!
//! A system is a unit of per-frame behaviour. It receives the frame's delta
//! time and exclusive access to the [`EntityStore`], and may query and mutate
//! freely. Returning an error marks the system as faulted for that frame; the
//! scheduler contains the fault and moves on.

use std::fmt;

use crate::store::EntityStore;

/// Stable identity of a system registered with a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) u32);

impl SystemId {
    /// Returns the raw id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System#{}", self.0)
    }
}

/// Per-frame behaviour run by the scheduler.
pub trait System: Send + Sync {
    /// Name used in logs and fault reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// Any error is reported as a fault of this system.
    fn update(&mut self, dt: f32, store: &mut EntityStore) -> anyhow::Result<()>;
}

/// A [`System`] backed by a closure.
pub struct FnSystem<F> {
    name: String,
    run: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(f32, &mut EntityStore) -> anyhow::Result<()> + Send + Sync,
{
    /// Wrap `run` as a system called `name`.
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(f32, &mut EntityStore) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, dt: f32, store: &mut EntityStore) -> anyhow::Result<()> {
        (self.run)(dt, store)
    }
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem").field("name", &self.name).finish_non_exhaustive()
    }
}
