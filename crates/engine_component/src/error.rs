//! ECS error types.
//!
//! Every fallible ECS operation reports one of these as a value. Nothing in
//! the core panics on a bad entity handle or a missing component.

use crate::component::ComponentToken;
use crate::entity::Entity;

/// Convenience alias used throughout the ECS crates.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors that can occur while mutating or querying ECS state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity handle does not refer to a live entity. This covers ids
    /// that were never allocated as well as stale handles whose slot has
    /// since been recycled.
    #[error("entity not found: {0}")]
    EntityNotFound(Entity),

    /// No payload is stored for this (entity, token) pair.
    #[error("component {token} not found on {entity}")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: Entity,
        /// The component token that was queried.
        token: ComponentToken,
    },

    /// A payload is already stored for this (entity, token) pair.
    #[error("component {token} already exists on {entity}")]
    ComponentAlreadyExists {
        /// The entity that already holds the component.
        entity: Entity,
        /// The component token that was added twice.
        token: ComponentToken,
    },

    /// The supplied payload does not match the kind registered for the token.
    #[error("invalid component for {token}: {reason}")]
    InvalidComponent {
        /// The token the payload was offered under.
        token: ComponentToken,
        /// Why the payload was rejected.
        reason: String,
    },

    /// The component kind declares a token outside the composition mask.
    #[error("component `{name}` uses {token}, but masks hold at most {max} kinds")]
    TypeCapacityExceeded {
        /// The kind's type name.
        name: &'static str,
        /// The offending token.
        token: ComponentToken,
        /// The mask width.
        max: usize,
    },

    /// Two different component kinds declared the same token.
    #[error("{token} is already registered to `{existing}`, cannot register `{requested}`")]
    TokenConflict {
        /// The contested token.
        token: ComponentToken,
        /// The kind that registered the token first.
        existing: &'static str,
        /// The kind that tried to register it again.
        requested: &'static str,
    },

    /// A world lifecycle transition was requested from a state that does not
    /// allow it.
    #[error("cannot {action} a world that is {from}")]
    InvalidTransition {
        /// The current lifecycle state.
        from: &'static str,
        /// The requested transition.
        action: &'static str,
    },
}
