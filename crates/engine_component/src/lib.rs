//! # engine_component
//!
//! Data-side building blocks of the ECS runtime: what a component is, how an
//! entity's composition is recorded, and where payloads live.
//!
//! This crate provides:
//!
//! - [`Component`] trait and [`ComponentToken`]: the contract all ECS data must
//!   satisfy and the static bit each kind occupies.
//! - [`TypeRegistry`]: validates and records which kind owns which token.
//! - [`Entity`] and [`EntityTable`]: generational handles, composition masks
//!   and index recycling.
//! - [`ComponentStore`]: type-erased per-token payload columns.
//! - [`ArchetypeIndex`]: entities grouped by exact mask for fast queries.
//!
//! Keeping these four in agreement is the job of the owning world; see the
//! `engine_world` crate.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod mask;
pub mod registry;
pub mod storage;

pub use archetype::{Archetype, ArchetypeIndex};
pub use component::{AnyComponent, Component, ComponentKind, ComponentToken};
pub use entity::{Entity, EntityTable};
pub use error::{EcsError, EcsResult};
pub use mask::{ComponentMask, MAX_COMPONENT_KINDS};
pub use registry::TypeRegistry;
pub use storage::ComponentStore;
