//! Gameplay components used by the demo.

use engine_component::impl_component;

/// Hit points, regenerated over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Hit points restored per second.
    pub regeneration: f32,
}

impl Health {
    pub fn new(max: f32, regeneration: f32) -> Self {
        Self {
            current: max,
            max,
            regeneration,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Restore up to `amount`, never beyond `max`.
    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl_component!(Health, 0);

/// Mana, regenerated over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Mana {
    pub current: f32,
    pub max: f32,
    pub regeneration: f32,
}

impl_component!(Mana, 1);

/// Damage over time. Removed once `remaining` runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct Poison {
    pub damage_per_second: f32,
    /// Seconds left.
    pub remaining: f32,
}

impl_component!(Poison, 2);

/// Display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Name(pub String);

impl_component!(Name, 3);
