mod config;
mod observers;
mod persistence;

use std::time::Duration;

use glam::Vec3;
use mobsim_ai::{ActorDirectory, DamageLog, GameEvent, MobCategory, MobWorld, SpawnOptions};
use mobsim_world::block_registry::WHEAT;
use mobsim_world::flat_generator::FlatLayers;
use mobsim_world::{BlockPos, BlockSink, VoxelGrid, CHUNK_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, trace, warn};

use crate::config::ServerConfig;
use crate::observers::Observers;
use crate::persistence::JsonChunkStore;

/// Mature crop metadata for the fields planted around harvesters.
const RIPE: u8 = 7;

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load("server.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load server.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("mobsim server starting...");
    info!("World: {} (seed {})", config.world.name, config.world.seed);

    let layers = FlatLayers::default();
    let mut grid = VoxelGrid::flat(config.world.radius, &layers);
    let feet_y = layers.surface_y() as f32 + 0.01;
    let half_extent = (config.world.radius * CHUNK_SIZE) as f32;
    info!("Loaded {} flat chunks", grid.chunk_count());

    let mut store = match JsonChunkStore::open(&config.world.save_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", config.world.save_dir);
            std::process::exit(1);
        }
    };

    match store.stored_chunks() {
        Ok(chunks) if !chunks.is_empty() => {
            info!("Found saved mobs for {} chunks in {}", chunks.len(), store.dir().display())
        }
        Ok(_) => {}
        Err(e) => warn!("Could not list {}: {e}", store.dir().display()),
    }

    let mut world = match MobWorld::new(config.ai.clone(), config.world.seed) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("Failed to create mob world: {e}");
            std::process::exit(1);
        }
    };

    let chunks: Vec<_> = grid.loaded_chunks().collect();
    let restored: usize = chunks
        .into_iter()
        .map(|chunk| world.on_chunk_loaded(chunk, &grid, &mut store))
        .sum();
    if restored == 0 {
        populate(&config, &mut world, &mut grid, half_extent, feet_y);
    }
    info!("{} mobs in world ({restored} restored)", world.len());

    let mut observers = Observers::new(
        config.server.observers,
        half_extent,
        feet_y,
        config.server.observer_speed,
        config.world.seed.wrapping_add(1),
    );
    let mut hits = DamageLog::default();

    // Shutdown signal
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let dt = config.tick_secs();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.server.tick_ms));
    let status_every = config
        .server
        .status_interval
        .saturating_mul(1000)
        .checked_div(config.server.tick_ms)
        .unwrap_or(0);
    let mut ticks: u64 = 0;

    info!(
        "Simulating {} observers at {} ms per heartbeat",
        observers.actors().len(),
        config.server.tick_ms
    );

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                observers.wander(dt);
                world.tick(&mut grid, &observers, &mut hits, dt);
                for (actor, amount) in hits.hits.drain(..) {
                    observers.hurt(actor, amount);
                }
                for event in world.drain_events() {
                    log_event(&event);
                }
                if let Some(batch) = world.collect_deltas(&observers) {
                    if !batch.is_empty() {
                        match serde_json::to_string(&batch) {
                            Ok(json) => trace!(target: "mobsim::broadcast", "{json}"),
                            Err(e) => warn!("Failed to encode delta batch: {e}"),
                        }
                        debug!("Broadcast {} deltas", batch.len());
                    }
                }
                ticks += 1;
                if status_every > 0 && ticks % status_every == 0 {
                    info!("t={:.1}s mobs={}", world.now(), world.len());
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Saving mobs before shutdown...");
                    let saved = world.save_all(&mut store);
                    info!("Saved {saved} mobs to {}", store.dir().display());
                    break;
                }
            }
        }
    }

    info!("Server stopped.");
}

/// Spawn the configured starting population at random grounded positions.
fn populate(config: &ServerConfig, world: &mut MobWorld, grid: &mut VoxelGrid, half_extent: f32, feet_y: f32) {
    let mut rng = StdRng::seed_from_u64(config.world.seed);
    for entry in &config.world.initial_mobs {
        for _ in 0..entry.count {
            let position = if half_extent > 0.0 {
                Vec3::new(
                    rng.gen_range(-half_extent..half_extent).floor() + 0.5,
                    feet_y + 2.0,
                    rng.gen_range(-half_extent..half_extent).floor() + 0.5,
                )
            } else {
                Vec3::new(0.5, feet_y + 2.0, 0.5)
            };
            let options = SpawnOptions {
                yaw: rng.gen_range(0.0..360.0),
                ..SpawnOptions::default()
            };
            let id = match world.spawn(&*grid, &entry.type_id, position, options) {
                Ok(id) => id,
                Err(e) => {
                    error!("Initial spawn of {} failed: {e}", entry.type_id);
                    continue;
                }
            };
            let stationary = world
                .get(id)
                .is_some_and(|mob| mob.category() == MobCategory::Stationary);
            if stationary {
                plant_field(grid, position, feet_y);
            }
        }
    }
}

/// Ripe wheat in the ring around a harvester so it has work to do.
fn plant_field(grid: &mut VoxelGrid, center: Vec3, feet_y: f32) {
    let cx = center.x.floor() as i32;
    let cz = center.z.floor() as i32;
    let y = feet_y.floor() as i32;
    for dz in -2..=2 {
        for dx in -2..=2 {
            if dx == 0 && dz == 0 {
                continue;
            }
            if let Err(e) = grid.set_block(BlockPos::new(cx + dx, y, cz + dz), WHEAT, RIPE) {
                debug!("Skipping crop at ({}, {}): {e}", cx + dx, cz + dz);
            }
        }
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::MobSpawned { id, type_id, position } => {
            debug!("{id} {type_id} spawned at ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z)
        }
        GameEvent::MobDied { id, type_id, drops, .. } => info!("{id} {type_id} died, dropped {drops:?}"),
        GameEvent::MobAttack { id, target, damage } => debug!("{id} hit {target} for {damage}"),
        GameEvent::MobRemoved { id, persisted } => debug!("{id} removed (persisted: {persisted})"),
        GameEvent::MobHurt { id, health } => debug!("{id} hurt, health {health}"),
        GameEvent::BlockChanged { id, pos, block } => {
            debug!("{id} set ({}, {}, {}) to block {block}", pos.x, pos.y, pos.z)
        }
    }
}
