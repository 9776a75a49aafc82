//! Fixed-width composition masks.
//!
//! Bit *t* of an entity's mask is set iff the entity holds a component whose
//! token is *t*.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentToken};

/// Width of a [`ComponentMask`], and therefore the maximum number of distinct
/// component kinds in one world.
pub const MAX_COMPONENT_KINDS: usize = 64;

/// A 64-bit component composition mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The mask with no bits set. Every mask contains it.
    pub const EMPTY: Self = Self(0);

    /// The mask containing only `T`'s bit.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::EMPTY.with(T::TOKEN)
    }

    /// Returns a copy with `token`'s bit set.
    ///
    /// Tokens outside the mask width have no bit and leave the mask unchanged;
    /// the registry rejects such kinds before they can reach storage.
    #[must_use]
    pub const fn with(self, token: ComponentToken) -> Self {
        match token.bit() {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Returns a copy with `token`'s bit cleared.
    #[must_use]
    pub const fn without(self, token: ComponentToken) -> Self {
        match token.bit() {
            Some(bit) => Self(self.0 & !bit),
            None => self,
        }
    }

    /// Set `token`'s bit in place.
    pub fn insert(&mut self, token: ComponentToken) {
        *self = self.with(token);
    }

    /// Clear `token`'s bit in place.
    pub fn remove(&mut self, token: ComponentToken) {
        *self = self.without(token);
    }

    /// Returns `true` if `token`'s bit is set.
    #[must_use]
    pub const fn contains(self, token: ComponentToken) -> bool {
        match token.bit() {
            Some(bit) => self.0 & bit != 0,
            None => false,
        }
    }

    /// Returns `true` if every bit of `required` is also set here.
    ///
    /// AND semantics: `(self & required) == required`. The empty mask is
    /// contained in every mask.
    #[must_use]
    pub const fn contains_all(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of bits set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the tokens whose bits are set, in ascending order.
    pub fn tokens(self) -> impl Iterator<Item = ComponentToken> {
        (0..MAX_COMPONENT_KINDS as u8)
            .map(ComponentToken::new)
            .filter(move |&token| self.contains(token))
    }
}

impl FromIterator<ComponentToken> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentToken>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#018x})", self.0)
    }
}
