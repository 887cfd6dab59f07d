//! # Delve
//!
//! Streams a procedurally generated world around a scripted observer and
//! reports what the generator did.
//!
//! Usage: `delve [config.toml]` (defaults to `delve.toml`).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod world;

use anyhow::Result;
use delve_common::{Aabb, Vec3};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE, DEFAULT_LOG_FILTER};
use crate::world::DemoWorld;

fn env_filter(directive: &str) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::from_default_env());
    }
    Ok(EnvFilter::try_new(directive)?)
}

/// Main entry point.
fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());

    // Config loading logs through a temporary subscriber; the config then
    // chooses the filter and format of the global one.
    let bootstrap = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter(DEFAULT_LOG_FILTER)?);
    let config = tracing::subscriber::with_default(bootstrap, || EngineConfig::load_from(&path));

    tracing_subscriber::registry()
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(fmt::layer))
        .with(env_filter(&config.log_filter)?)
        .init();

    info!("Delve starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Seed {}, radius {} chunks, {} steps of {} tiles",
        config.world_seed, config.interest_radius, config.walk_steps, config.walk_stride
    );

    let mut world = DemoWorld::new(&config)?;
    let end = world.walk(&config)?;

    let stats = world.stats();
    info!(
        "Walk finished at {end}: {} regions cached (max {}), {} pipeline runs, {} evicted",
        stats.generated_regions, stats.max_cached_regions, stats.pipeline_runs, stats.evicted_regions
    );
    info!(
        "{} chunks resident, {} active, {} live entities",
        world.realm.chunk_count(),
        stats.active_chunks,
        world.entities.len()
    );

    if config.print_map {
        let r = config.map_radius;
        let view = Aabb::new(
            Vec3::new(end.x - r, end.y - r, end.z),
            Vec3::new(end.x + r, end.y + r, end.z + 1),
        );
        print!("{}", world.render(view));
    }

    info!("Delve shutdown complete");
    Ok(())
}
