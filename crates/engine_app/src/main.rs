//! # engine_app: demo frame driver
//!
//! Builds a world with a few gameplay systems and drives it with the
//! fixed-timestep tick loop.
//!
//! ## Startup Sequence
//!
//! 1. Initialise structured logging (`RUST_LOG` overrides the defaults).
//! 2. Load [`WorldConfig`] from `ENGINE_CONFIG`, `ENGINE_TICK_RATE` and
//!    `ENGINE_MAX_TICKS`.
//! 3. Register components and systems, then start the world.
//! 4. Spawn a loader thread that streams entities in through the command
//!    queue while the tick loop runs.

mod components;
mod systems;

use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use engine_world::{TickLoop, World, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use components::{Health, Mana, Name, Poison};
use systems::{
    POISON_PRIORITY, PoisonSystem, REAPER_PRIORITY, REGENERATION_PRIORITY, ReaperSystem,
    RegenerationSystem,
};

/// Ticks to run when the configuration leaves the loop unbounded.
const DEMO_TICKS: u64 = 240;

/// (name, max health, regeneration, poison damage per second, poison seconds)
const ROSTER: &[(&str, f32, f32, f32, f32)] = &[
    ("knight", 120.0, 2.0, 0.0, 0.0),
    ("mage", 60.0, 1.0, 8.0, 2.0),
    ("goblin", 30.0, 0.0, 25.0, 3.0),
    ("troll", 200.0, 10.0, 40.0, 1.0),
];

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("engine_app=info".parse()?)
                .add_directive("engine_world=info".parse()?),
        )
        .init();

    info!("engine demo starting");

    let mut config = WorldConfig::from_env()?;
    if config.max_ticks == 0 {
        config = config.with_max_ticks(DEMO_TICKS);
    }

    let mut world = World::with_config(&config);
    world.register_component::<Health>()?;
    world.register_component::<Mana>()?;
    world.register_component::<Poison>()?;
    world.register_component::<Name>()?;
    world.add_system(POISON_PRIORITY, PoisonSystem);
    world.add_system(REGENERATION_PRIORITY, RegenerationSystem);
    world.add_system(REAPER_PRIORITY, ReaperSystem::default());
    world.start()?;

    let sender = world.command_sender();
    let mut tick_loop = TickLoop::new(world, &config)?;
    let loader = thread::spawn(move || -> Result<()> {
        for &(name, max, regeneration, dps, seconds) in ROSTER {
            let mut components: Vec<Box<dyn engine_component::AnyComponent>> = vec![
                Box::new(Name(name.to_owned())),
                Box::new(Health::new(max, regeneration)),
                Box::new(Mana {
                    current: 0.0,
                    max: max / 2.0,
                    regeneration,
                }),
            ];
            if seconds > 0.0 {
                components.push(Box::new(Poison {
                    damage_per_second: dps,
                    remaining: seconds,
                }));
            }
            sender.spawn(components)?;
            info!(name, "queued spawn");
            thread::sleep(Duration::from_millis(50));
        }
        Ok(())
    });

    let ticks = tick_loop.run();
    loader
        .join()
        .map_err(|_| anyhow!("loader thread panicked"))??;

    let world = tick_loop.into_world();
    for entity in world.query().with::<Health>().execute() {
        let name = world
            .get_component::<Name>(entity)
            .map_or("unnamed", |name| name.0.as_str());
        let health = world.get_component::<Health>(entity)?;
        info!(%entity, name, current = health.current, max = health.max, "survivor");
    }

    info!(
        ticks,
        survivors = world.entity_count(),
        pending = world.pending_commands(),
        "engine demo shut down"
    );
    Ok(())
}
