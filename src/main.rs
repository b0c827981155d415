//! Emergent Canvas headless runner
//!
//! Drives the engine at a fixed step without a window and logs a JSON
//! snapshot every second of simulated time.
//!
//! Usage: `emergent-canvas [generation.json] [ticks]`

use std::path::Path;

use emergent_canvas::renderer::FrameData;
use emergent_canvas::sim::{Command, Generation, SimEvent, TickInput, tick};
use emergent_canvas::{EngineSettings, World};
use glam::Vec2;

/// Simulated ticks per second
const TICK_RATE: u64 = 60;
/// Default run length
const DEFAULT_TICKS: u64 = 1800;
/// Forced event cadence while idle
const FORCED_EVENT_EVERY: u64 = 600;

fn load_generation(path: &Path) -> Option<Generation> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match Generation::from_json(&text) {
        Ok(generation) => Some(generation),
        Err(e) => {
            log::error!("Rejected generation {}: {}", path.display(), e);
            None
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let generation = args.next().and_then(|p| load_generation(Path::new(&p)));
    let ticks = args
        .next()
        .and_then(|t| t.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICKS);

    let settings = EngineSettings::default();
    log::info!(
        "Emergent Canvas starting: {}x{}, seed {:#x}, {} ticks",
        settings.width,
        settings.height,
        settings.seed,
        ticks
    );

    let mut world = World::new(settings);
    let opening = match generation {
        Some(generation) => Command::Evolve(generation),
        None => Command::Initialize {
            count: 100,
            palettes: world.rules.palettes(),
        },
    };
    let center = world.center();
    let input = TickInput {
        commands: vec![
            opening,
            Command::StructureLine {
                from: center - Vec2::new(120.0, 0.0),
                to: center + Vec2::new(120.0, 0.0),
                color: None,
            },
        ],
    };
    tick(&mut world, &input);

    for _ in 1..ticks {
        let input = if world.frame_count % FORCED_EVENT_EVERY == 0 {
            TickInput::with(Command::ForcedEvent)
        } else {
            TickInput::default()
        };
        tick(&mut world, &input);

        for event in world.drain_events() {
            match event {
                SimEvent::Surprise(kind) => log::info!("Surprise at frame {}: {:?}", world.frame_count, kind),
                other => log::debug!("{:?}", other),
            }
        }

        if world.frame_count % TICK_RATE == 0 {
            match serde_json::to_string(&world.snapshot()) {
                Ok(json) => log::info!("{}", json),
                Err(e) => log::warn!("Snapshot serialization failed: {}", e),
            }
        }
    }

    let frame = FrameData::build(&world);
    log::info!(
        "Final frame: {} particles, {} bond vertices, {} traces ({} instance bytes)",
        frame.particles.len(),
        frame.bonds.len(),
        frame.traces.len(),
        frame.particle_bytes().len()
    );
}
