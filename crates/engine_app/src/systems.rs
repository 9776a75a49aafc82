//! Gameplay systems used by the demo.
//!
//! Poison runs before regeneration so a poisoned entity loses health before
//! it regenerates in the same frame; the reaper runs last and removes the
//! dead.

use engine_world::{EntityStore, System};
use tracing::info;

use crate::components::{Health, Mana, Name, Poison};

pub const POISON_PRIORITY: i32 = 5;
pub const REGENERATION_PRIORITY: i32 = 10;
pub const REAPER_PRIORITY: i32 = 100;

/// Restores health and mana of living entities.
#[derive(Debug, Default)]
pub struct RegenerationSystem;

impl System for RegenerationSystem {
    fn name(&self) -> &str {
        "regeneration"
    }

    fn update(&mut self, dt: f32, store: &mut EntityStore) -> anyhow::Result<()> {
        for entity in store.query().with::<Health>().execute() {
            let health = store.get_component_mut::<Health>(entity)?;
            if !health.is_dead() && health.current < health.max && health.regeneration > 0.0 {
                let amount = health.regeneration * dt;
                health.heal(amount);
            }
        }

        for entity in store.query().with::<Mana>().execute() {
            let mana = store.get_component_mut::<Mana>(entity)?;
            if mana.current < mana.max && mana.regeneration > 0.0 {
                mana.current = (mana.current + mana.regeneration * dt).min(mana.max);
            }
        }
        Ok(())
    }
}

/// Applies damage over time and removes expired poison.
#[derive(Debug, Default)]
pub struct PoisonSystem;

impl System for PoisonSystem {
    fn name(&self) -> &str {
        "poison"
    }

    fn update(&mut self, dt: f32, store: &mut EntityStore) -> anyhow::Result<()> {
        for entity in store.query().with::<Health>().with::<Poison>().execute() {
            let poison = store.get_component_mut::<Poison>(entity)?;
            let elapsed = poison.remaining.min(dt);
            poison.remaining -= elapsed;
            let damage = poison.damage_per_second * elapsed;
            let expired = poison.remaining <= 0.0;

            store.get_component_mut::<Health>(entity)?.damage(damage);
            if expired {
                store.remove_component::<Poison>(entity)?;
            }
        }
        Ok(())
    }
}

/// Destroys entities whose health reached zero.
#[derive(Debug, Default)]
pub struct ReaperSystem {
    reaped: usize,
}

impl System for ReaperSystem {
    fn name(&self) -> &str {
        "reaper"
    }

    fn update(&mut self, _dt: f32, store: &mut EntityStore) -> anyhow::Result<()> {
        let dead: Vec<_> = store
            .query()
            .with::<Health>()
            .execute()
            .into_iter()
            .filter(|&entity| {
                store
                    .get_component::<Health>(entity)
                    .is_ok_and(Health::is_dead)
            })
            .collect();

        for entity in dead {
            let name = store
                .get_component::<Name>(entity)
                .map_or_else(|_| entity.to_string(), |name| name.0.clone());
            store.destroy_entity(entity);
            self.reaped += 1;
            info!(%entity, name = %name, total = self.reaped, "entity died");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Component, Entity};

    use super::*;

    fn spawn(store: &mut EntityStore, health: Health) -> Entity {
        let entity = store.create_entity();
        store.add_component(entity, health).unwrap();
        entity
    }

    #[test]
    fn test_regeneration_is_capped() {
        let mut store = EntityStore::new();
        let e = spawn(
            &mut store,
            Health {
                current: 95.0,
                max: 100.0,
                regeneration: 4.0,
            },
        );

        RegenerationSystem.update(1.0, &mut store).unwrap();
        assert_eq!(store.get_component::<Health>(e).unwrap().current, 99.0);
        RegenerationSystem.update(1.0, &mut store).unwrap();
        assert_eq!(store.get_component::<Health>(e).unwrap().current, 100.0);
    }

    #[test]
    fn test_dead_do_not_regenerate() {
        let mut store = EntityStore::new();
        let e = spawn(
            &mut store,
            Health {
                current: 0.0,
                max: 100.0,
                regeneration: 4.0,
            },
        );
        RegenerationSystem.update(1.0, &mut store).unwrap();
        assert!(store.get_component::<Health>(e).unwrap().is_dead());
    }

    #[test]
    fn test_mana_regenerates() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store
            .add_component(
                e,
                Mana {
                    current: 0.0,
                    max: 10.0,
                    regeneration: 2.0,
                },
            )
            .unwrap();
        RegenerationSystem.update(2.0, &mut store).unwrap();
        assert_eq!(store.get_component::<Mana>(e).unwrap().current, 4.0);
    }

    #[test]
    fn test_poison_expires() {
        let mut store = EntityStore::new();
        let e = spawn(&mut store, Health::new(100.0, 0.0));
        store
            .add_component(
                e,
                Poison {
                    damage_per_second: 10.0,
                    remaining: 1.5,
                },
            )
            .unwrap();

        PoisonSystem.update(1.0, &mut store).unwrap();
        assert_eq!(store.get_component::<Health>(e).unwrap().current, 90.0);
        assert!(store.has_component::<Poison>(e));

        PoisonSystem.update(1.0, &mut store).unwrap();
        assert_eq!(store.get_component::<Health>(e).unwrap().current, 85.0);
        assert!(!store.has_component::<Poison>(e));
    }

    #[test]
    fn test_reaper_destroys_dead() {
        let mut store = EntityStore::new();
        let alive = spawn(&mut store, Health::new(10.0, 0.0));
        let dead = spawn(&mut store, Health::new(10.0, 0.0));
        store.get_component_mut::<Health>(dead).unwrap().damage(50.0);
        store.add_component(dead, Name("goblin".to_owned())).unwrap();

        let mut reaper = ReaperSystem::default();
        reaper.update(0.0, &mut store).unwrap();

        assert_eq!(reaper.reaped, 1);
        assert!(store.exists(alive));
        assert!(!store.exists(dead));
        assert_eq!(store.component_count(Name::TOKEN), 0);
    }
}
