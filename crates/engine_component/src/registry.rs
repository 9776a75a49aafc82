//! Component type registry.
//!
//! Records which component kind owns which token. Tokens are declared
//! statically by each [`Component`] impl; the registry validates them
//! (range, uniqueness) on first use and answers lookups afterwards.
//! Registration is idempotent and append-only: a token stays claimed even
//! when no entity holds that component any more.

use std::any::TypeId;

use crate::component::{Component, ComponentKind, ComponentToken};
use crate::error::{EcsError, EcsResult};
use crate::mask::MAX_COMPONENT_KINDS;

/// Registry of component kinds, indexed by token.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    kinds: Vec<Option<ComponentKind>>,
    len: usize,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: vec![None; MAX_COMPONENT_KINDS],
            len: 0,
        }
    }

    /// Register `T`, returning its token.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_kind`].
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentToken> {
        self.register_kind(T::kind())
    }

    /// Register a kind descriptor, returning its token.
    ///
    /// Registering the same kind again returns the same token.
    ///
    /// # Errors
    ///
    /// - [`EcsError::TypeCapacityExceeded`] if the token does not fit in a mask.
    /// - [`EcsError::TokenConflict`] if another kind already holds the token.
    pub fn register_kind(&mut self, kind: ComponentKind) -> EcsResult<ComponentToken> {
        let token = kind.token;
        if !token.is_representable() {
            return Err(EcsError::TypeCapacityExceeded {
                name: kind.name,
                token,
                max: MAX_COMPONENT_KINDS,
            });
        }

        let slot = token.index() as usize;
        if let Some(existing) = &self.kinds[slot] {
            if existing.rust_type == kind.rust_type {
                return Ok(token);
            }
            return Err(EcsError::TokenConflict {
                token,
                existing: existing.name,
                requested: kind.name,
            });
        }

        self.kinds[slot] = Some(kind);
        self.len += 1;
        Ok(token)
    }

    /// The token registered for `T`, if `T` has been registered.
    #[must_use]
    pub fn token_of<T: Component>(&self) -> Option<ComponentToken> {
        self.token_of_type(TypeId::of::<T>())
    }

    /// The token registered for a Rust type.
    #[must_use]
    pub fn token_of_type(&self, rust_type: TypeId) -> Option<ComponentToken> {
        self.iter()
            .find(|kind| kind.rust_type == rust_type)
            .map(|kind| kind.token)
    }

    /// The token registered under a type name.
    #[must_use]
    pub fn token_of_name(&self, name: &str) -> Option<ComponentToken> {
        self.iter().find(|kind| kind.name == name).map(|kind| kind.token)
    }

    /// The kind registered for `token`.
    #[must_use]
    pub fn kind(&self, token: ComponentToken) -> Option<&ComponentKind> {
        self.kinds.get(token.index() as usize)?.as_ref()
    }

    /// Returns `true` if `T` has been registered.
    #[must_use]
    pub fn contains<T: Component>(&self) -> bool {
        self.kind(T::TOKEN)
            .is_some_and(|kind| kind.rust_type == TypeId::of::<T>())
    }

    /// Registered kinds in token order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentKind> {
        self.kinds.iter().flatten()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
