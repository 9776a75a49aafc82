//! Fixed-timestep frame loop.
//!
//! Each tick:
//!
//! 1. Advances the tick counter.
//! 2. Calls [`World::update`] with the fixed `dt`, which drains pending
//!    commands and runs the scheduled systems.
//! 3. Sleeps for what is left of the tick budget, or warns on overrun.
//!
//! The loop ends after `max_ticks` ticks, or once the world is stopped.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{ConfigError, WorldConfig};
use crate::world::{FrameReport, World, WorldState};

/// Drives a [`World`] at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    /// Target ticks per second.
    tick_rate: f64,
    /// Wall-clock budget of one tick.
    tick_duration: Duration,
    /// Maximum number of ticks to run (0 = unlimited).
    max_ticks: u64,
    /// The world being driven.
    world: World,
}

impl TickLoop {
    /// Create a loop around `world` using `config`'s rate and tick limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the tick rate is unusable.
    pub fn new(world: World, config: &WorldConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            tick_id: 0,
            tick_rate: config.tick_rate,
            tick_duration: config.tick_duration()?,
            max_ticks: config.max_ticks,
            world,
        })
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns a mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Consume the loop, returning the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run one tick.
    pub fn tick(&mut self, dt: f32) -> FrameReport {
        self.tick_id += 1;
        debug!(tick_id = self.tick_id, dt, "tick start");

        let report = self.world.update(dt);
        for fault in &report.faults {
            warn!(tick_id = self.tick_id, %fault, "system fault during tick");
        }
        report
    }

    /// Run until `max_ticks` is reached or the world stops, returning the
    /// number of ticks run.
    ///
    /// A world that is merely paused keeps the loop alive.
    pub fn run(&mut self) -> u64 {
        let tick_duration = self.tick_duration;
        let dt = tick_duration.as_secs_f32();
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.tick_rate,
            max_ticks = self.max_ticks,
            "starting tick loop"
        );

        loop {
            if self.world.state() == WorldState::Stopped {
                info!(ticks = tick_count, "world stopped, leaving tick loop");
                break;
            }

            let start = Instant::now();
            self.tick(dt);

            tick_count += 1;
            if self.max_ticks > 0 && tick_count >= self.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;

    fn fast_config(max_ticks: u64) -> WorldConfig {
        WorldConfig::default().with_tick_rate(1000.0).with_max_ticks(max_ticks)
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = TickLoop::new(World::new(), &WorldConfig::default()).unwrap();
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let mut world = World::new();
        world.start().unwrap();
        world.add_fn_system("spawn", 0, |_dt, store: &mut EntityStore| {
            store.create_entity();
            Ok(())
        });

        let mut tick_loop = TickLoop::new(world, &fast_config(5)).unwrap();
        assert_eq!(tick_loop.run(), 5);
        assert_eq!(tick_loop.tick_id(), 5);
        assert_eq!(tick_loop.world().entity_count(), 5);
    }

    #[test]
    fn test_run_exits_when_world_is_stopped() {
        let mut world = World::new();
        world.start().unwrap();
        world.stop().unwrap();

        let mut tick_loop = TickLoop::new(world, &fast_config(0)).unwrap();
        assert_eq!(tick_loop.run(), 0);
    }

    #[test]
    fn test_paused_world_ticks_without_running_systems() {
        let mut world = World::new();
        world.start().unwrap();
        world.pause().unwrap();
        world.add_fn_system("spawn", 0, |_dt, store: &mut EntityStore| {
            store.create_entity();
            Ok(())
        });

        let mut tick_loop = TickLoop::new(world, &fast_config(3)).unwrap();
        assert_eq!(tick_loop.run(), 3);
        assert_eq!(tick_loop.into_world().entity_count(), 0);
    }

    #[test]
    fn test_zero_tick_rate_is_rejected_before_running() {
        let mut world = World::new();
        world.start().unwrap();
        let config = WorldConfig::default().with_tick_rate(0.0).with_max_ticks(1);

        let err = TickLoop::new(world, &config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "tick_rate", .. }));
    }
}
