//! # engine_world
//!
//! The behaviour side of the ECS runtime, built on `engine_component`.
//!
//! This crate provides:
//!
//! - [`EntityStore`]: keeps the entity table, component columns, type registry
//!   and archetype index consistent across every mutation.
//! - [`Query`]: fluent composition queries.
//! - [`System`], [`FnSystem`] and [`SystemScheduler`]: priority-ordered
//!   per-frame behaviour with per-system fault isolation.
//! - [`CommandQueue`] and [`CommandSender`]: deferred mutations from other
//!   threads, applied at the start of each frame.
//! - [`World`]: the store, scheduler and queue under a lifecycle.
//! - [`SharedWorld`]: a world behind a single read-write lock.
//! - [`WorldConfig`] and [`TickLoop`]: configuration and a fixed-rate driver.

pub mod command;
pub mod config;
pub mod query;
pub mod scheduler;
pub mod shared;
pub mod store;
pub mod system;
pub mod tick;
pub mod world;

pub use command::{Command, CommandQueue, CommandReport, CommandSender};
pub use config::{ConfigError, WorldConfig};
pub use query::Query;
pub use scheduler::{SchedulerRun, SystemFault, SystemInfo, SystemScheduler};
pub use shared::SharedWorld;
pub use store::EntityStore;
pub use system::{FnSystem, System, SystemId};
pub use tick::TickLoop;
pub use world::{FrameReport, World, WorldState};
