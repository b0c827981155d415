//! Fixed-step simulation tick
//!
//! One call advances the whole world: clock and entropy, forces,
//! structures, integration, mutations, surprise events and trace decay.
//! External writes are queued as commands and applied before the step so
//! they never interleave with it.

use glam::Vec2;

use super::events::{maybe_trigger_surprise, trigger_forced_event};
use super::forces::apply_forces;
use super::integrator::{integrate, update_population};
use super::mutation::{Mutation, apply_mutations};
use super::rules::{Generation, RuleSet};
use super::state::World;
use super::structure::update_structures;
use crate::consts::*;

/// External write applied at the start of a tick
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the population
    Initialize { count: usize, palettes: Vec<Vec<String>> },
    /// Clear particles, structures and frame count
    Clear,
    /// Record trace memory from the current particles
    CaptureTraces,
    /// Spawn a detonating shape stencil
    ForcedEvent,
    SetRules(RuleSet),
    SetMutations(Vec<Mutation>),
    /// Checkpoint, clear, install and reseed in one step
    Evolve(Generation),
    Paint {
        point: Vec2,
        brush_size: f32,
        intensity: f32,
        color: Option<String>,
    },
    Burst {
        point: Vec2,
        count: usize,
        color: Option<String>,
    },
    Line {
        from: Vec2,
        to: Vec2,
        color: Option<String>,
    },
    StructureLine {
        from: Vec2,
        to: Vec2,
        color: Option<String>,
    },
}

/// Input commands for a single tick, applied in order
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub commands: Vec<Command>,
}

impl TickInput {
    pub fn with(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// Apply one queued command to the world
pub fn apply_command(world: &mut World, command: &Command) {
    match command {
        Command::Initialize { count, palettes } => world.initialize(*count, palettes),
        Command::Clear => world.clear(),
        Command::CaptureTraces => world.capture_trace_checkpoint(),
        Command::ForcedEvent => {
            trigger_forced_event(world);
        }
        Command::SetRules(rules) => world.set_rules(rules.clone()),
        Command::SetMutations(mutations) => world.set_mutations(mutations.clone()),
        Command::Evolve(generation) => world.evolve(generation.clone()),
        Command::Paint {
            point,
            brush_size,
            intensity,
            color,
        } => world.paint(*point, *brush_size, *intensity, color.as_deref()),
        Command::Burst { point, count, color } => world.spawn_burst(*point, *count, color.as_deref()),
        Command::Line { from, to, color } => world.draw_line(*from, *to, color.as_deref()),
        Command::StructureLine { from, to, color } => {
            world.create_structure_from_line(*from, *to, color.as_deref());
        }
    }
}

/// Advance the world by one tick
pub fn tick(world: &mut World, input: &TickInput) {
    for command in &input.commands {
        apply_command(world, command);
    }

    world.frame_count += 1;
    world.entropy = (world.entropy + ENTROPY_STEP).min(1.0);

    let center = world.center();
    apply_forces(
        &mut world.particles,
        &world.rules,
        world.entropy,
        center,
        &mut world.rng,
    );

    update_structures(
        &mut world.structures,
        &mut world.particles,
        &world.rules,
        &mut world.stats,
        &mut world.events,
        &mut world.rng,
    );

    integrate(&mut world.particles, &world.settings, &mut world.rng);
    update_population(&mut world.particles, &world.rules, &world.settings, &mut world.rng);

    apply_mutations(
        &mut world.mutations,
        &mut world.particles,
        center,
        world.settings.height,
    );

    maybe_trigger_surprise(world);

    world.traces.decay();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::mutation::MutationKind;

    #[test]
    fn test_clock_and_entropy() {
        let mut world = World::with_seed(1);
        for _ in 0..10 {
            world.update();
        }
        assert_eq!(world.frame_count, 10);
        assert!((world.entropy - 10.0 * ENTROPY_STEP).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_saturates() {
        let mut world = World::with_seed(1);
        world.entropy = 0.9999;
        world.update();
        assert_eq!(world.entropy, 1.0);
        world.update();
        assert_eq!(world.entropy, 1.0);
    }

    #[test]
    fn test_commands_applied_before_step() {
        let mut world = World::with_seed(2);
        let input = TickInput {
            commands: vec![
                Command::Initialize {
                    count: 12,
                    palettes: vec![vec!["#123456".to_string()]],
                },
                Command::StructureLine {
                    from: Vec2::new(100.0, 100.0),
                    to: Vec2::new(200.0, 100.0),
                    color: None,
                },
            ],
        };
        tick(&mut world, &input);
        assert_eq!(world.frame_count, 1);
        assert_eq!(world.structures.len(), 1);
        assert!(world.particles.len() >= 12);
    }

    #[test]
    fn test_empty_rules_tick() {
        let mut world = World::with_seed(3);
        tick(&mut world, &TickInput::with(Command::SetRules(RuleSet::empty())));
        world.initialize(20, &[]);
        for _ in 0..5 {
            world.update();
        }
        assert!(world.particles.iter().all(|p| p.pos.is_finite() && p.vel.is_finite()));
    }

    #[test]
    fn test_mutations_advance_each_tick() {
        let mut world = World::with_seed(4);
        world.set_mutations(vec![Mutation::new(MutationKind::Wave, 0.5, 100)]);
        for _ in 0..7 {
            world.update();
        }
        assert_eq!(world.mutations[0].progress, 7);
    }

    #[test]
    fn test_forced_event_detonates_within_delay() {
        use crate::sim::SimEvent;

        for seed in 0..8 {
            let mut world = World::with_seed(seed);
            let palettes = world.rules.palettes();
            world.initialize(80, &palettes);
            tick(&mut world, &TickInput::with(Command::ForcedEvent));
            assert_eq!(world.structures.len(), 1, "seed {}", seed);
            for _ in 0..DETONATION_DELAY_TICKS {
                world.update();
            }
            assert!(world.structures.is_empty(), "seed {}", seed);

            let events = world.drain_events();
            let detonated = events
                .iter()
                .position(|e| matches!(e, SimEvent::StructureDetonated { .. }));
            let retired = events
                .iter()
                .position(|e| matches!(e, SimEvent::StructureRetired { .. }));
            assert!(detonated.is_some(), "seed {} never detonated", seed);
            assert!(detonated < retired, "seed {} retired before detonating", seed);
        }
    }

    #[test]
    fn test_determinism() {
        let mut world1 = World::with_seed(99999);
        let mut world2 = World::with_seed(99999);
        let input = TickInput {
            commands: vec![
                Command::Initialize {
                    count: 60,
                    palettes: RuleSet::default().palettes(),
                },
                Command::StructureLine {
                    from: Vec2::new(300.0, 300.0),
                    to: Vec2::new(500.0, 350.0),
                    color: None,
                },
            ],
        };
        tick(&mut world1, &input);
        tick(&mut world2, &input);
        for _ in 0..200 {
            world1.update();
            world2.update();
        }
        assert_eq!(world1.snapshot(), world2.snapshot());
        assert_eq!(world1.particles(), world2.particles());
    }
}
