//! Core [`Component`] trait and associated metadata.
//!
//! Every piece of data stored in the ECS must implement [`Component`]. The trait
//! requires `Send + Sync + 'static` so payloads can be handed across threads by
//! the command queue, and `Debug` so stored payloads can be inspected.
//!
//! ## Static tokens
//!
//! Each component kind declares its [`ComponentToken`] at compile time. The
//! token is the kind's bit position in a [`ComponentMask`](crate::ComponentMask)
//! and its storage key, so mask layouts are identical across builds and runs
//! regardless of the order in which kinds are first used.

use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mask::MAX_COMPONENT_KINDS;

/// The small integer assigned to a component kind.
///
/// Used as the bit position in composition masks and as the column key in
/// [`ComponentStore`](crate::ComponentStore). Only tokens below
/// [`MAX_COMPONENT_KINDS`] are representable; registering a kind with a larger
/// token fails with [`EcsError::TypeCapacityExceeded`](crate::EcsError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentToken(u8);

impl ComponentToken {
    /// Create a token from its raw value.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns `true` if this token fits in a composition mask.
    #[must_use]
    pub const fn is_representable(self) -> bool {
        (self.0 as usize) < MAX_COMPONENT_KINDS
    }

    /// The mask bit for this token, or `None` when the token is out of range.
    #[must_use]
    pub const fn bit(self) -> Option<u64> {
        1u64.checked_shl(self.0 as u32)
    }
}

impl fmt::Display for ComponentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

/// Metadata describing one component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentKind {
    /// The kind's declared token.
    pub token: ComponentToken,
    /// The Rust type backing the kind.
    pub rust_type: TypeId,
    /// Human-readable name (e.g. `"Health"`).
    pub name: &'static str,
}

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, ComponentToken};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     const TOKEN: ComponentToken = ComponentToken::new(0);
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
///
/// The [`impl_component!`](crate::impl_component) macro writes the same impl
/// in one line.
pub trait Component: Send + Sync + fmt::Debug + 'static {
    /// The kind's token: its mask bit and storage key.
    const TOKEN: ComponentToken;

    /// A human-readable name for this component type.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentKind`] descriptor for this component type.
    fn kind() -> ComponentKind {
        ComponentKind {
            token: Self::TOKEN,
            rust_type: TypeId::of::<Self>(),
            name: Self::type_name(),
        }
    }
}

/// Object-safe view of a stored component payload.
///
/// Implemented for every [`Component`]; the store keeps payloads as
/// `Box<dyn AnyComponent>` so one column can be keyed by token alone.
pub trait AnyComponent: Any + Send + Sync + fmt::Debug {
    /// The payload's kind.
    fn component_kind(&self) -> ComponentKind;

    /// The payload's token.
    fn token(&self) -> ComponentToken {
        self.component_kind().token
    }

    /// Borrow as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as [`Any`] for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into a boxed [`Any`] for by-value downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> AnyComponent for T {
    fn component_kind(&self) -> ComponentKind {
        <T as Component>::kind()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Implement [`Component`] for a type with an explicit token.
///
/// ```rust
/// #[derive(Debug)]
/// struct Velocity { x: f32, y: f32 }
///
/// engine_component::impl_component!(Velocity, 2);
/// ```
#[macro_export]
macro_rules! impl_component {
    ($ty:ident, $token:expr) => {
        impl $crate::Component for $ty {
            const TOKEN: $crate::ComponentToken = $crate::ComponentToken::new($token);

            fn type_name() -> &'static str {
                stringify!($ty)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        const TOKEN: ComponentToken = ComponentToken::new(0);

        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    crate::impl_component!(Velocity, 1);

    #[test]
    fn test_macro_uses_type_ident_as_name() {
        assert_eq!(Velocity::type_name(), "Velocity");
        assert_eq!(Velocity::TOKEN, ComponentToken::new(1));
    }

    #[test]
    fn test_kind_describes_rust_type() {
        let kind = Health::kind();
        assert_eq!(kind.name, "Health");
        assert_eq!(kind.token, ComponentToken::new(0));
        assert_eq!(kind.rust_type, TypeId::of::<Health>());
    }

    #[test]
    fn test_token_bit_range() {
        assert_eq!(ComponentToken::new(0).bit(), Some(1));
        assert_eq!(ComponentToken::new(63).bit(), Some(1 << 63));
        assert_eq!(ComponentToken::new(64).bit(), None);
        assert!(ComponentToken::new(63).is_representable());
        assert!(!ComponentToken::new(64).is_representable());
    }

    #[test]
    fn test_erased_payload_downcasts() {
        let boxed: Box<dyn AnyComponent> = Box::new(Health {
            current: 80.0,
            max: 100.0,
        });
        assert_eq!(boxed.token(), Health::TOKEN);
        assert!(boxed.as_any().downcast_ref::<Velocity>().is_none());
        let health = boxed.into_any().downcast::<Health>().unwrap();
        assert_eq!(health.current, 80.0);
    }
}
