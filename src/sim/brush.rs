//! Drawing inputs and population seeding
//!
//! Everything a user can put on the canvas: bursts, brush strokes,
//! particle lines and bonded structures drawn from a line.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::rules::Generation;
use super::state::{Particle, SimEvent, World};
use super::structure::structure_from_line;
use crate::consts::*;
use crate::polar_to_cartesian;

/// Particles spawned per point along a drawn particle line
const LINE_BURST: usize = 5;
/// Distance between bursts along a drawn particle line
const LINE_STEP: f32 = 5.0;
/// Particles per scattered burst in a brush stroke
const BRUSH_BURST: usize = 3;

impl World {
    /// Replace the population with `count` particles scattered around center
    pub fn initialize(&mut self, count: usize, palettes: &[Vec<String>]) {
        let colors: Vec<&str> = palettes.iter().flatten().map(String::as_str).collect();
        let center = self.center();
        let spread = self.settings.width.min(self.settings.height) * 0.2;
        let rng = &mut self.rng;

        self.particles.clear();
        for _ in 0..count {
            let angle = rng.random::<f32>() * TAU;
            let distance = rng.random::<f32>() * spread;
            let vel = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5) * 4.0;
            let color = if colors.is_empty() {
                FALLBACK_COLOR
            } else {
                colors[rng.random_range(0..colors.len())]
            };
            let particle = Particle::new(center + polar_to_cartesian(distance, angle), vel)
                .with_mass(1.0 + rng.random::<f32>() * 2.0)
                .with_radius(1.5 + rng.random::<f32>() * 3.0)
                .with_color(color)
                .with_decay(0.995 + rng.random::<f32>() * 0.002);
            self.particles.insert(particle);
        }
        log::info!("Initialized {} particles from {} colors", count, colors.len());
    }

    /// Start a fresh generation: remember the old one as traces, clear,
    /// install the new rules and mutations and reseed the population
    pub fn evolve(&mut self, generation: Generation) {
        self.capture_trace_checkpoint();
        self.clear();
        log::info!("Evolving into theme '{}'", generation.theme);
        let palettes = generation.rules.palettes();
        self.set_rules(generation.rules);
        if !generation.mutations.is_empty() {
            self.set_mutations(generation.mutations);
        }
        let (min, max) = (
            self.settings.initial_population_min,
            self.settings.initial_population_max.max(self.settings.initial_population_min + 1),
        );
        let count = self.rng.random_range(min..max);
        self.initialize(count, &palettes);
    }

    fn resolve_color(&mut self, color: Option<&str>) -> String {
        match color {
            Some(c) => c.to_string(),
            None => self.rules.brush_color(&mut self.rng),
        }
    }

    /// Radial burst of `count` particles from a point
    pub fn spawn_burst(&mut self, point: Vec2, count: usize, color: Option<&str>) {
        let color = self.resolve_color(color);
        for i in 0..count {
            let rng = &mut self.rng;
            let angle = i as f32 / count as f32 * TAU + (rng.random::<f32>() - 0.5) * 0.5;
            let speed = 2.0 + rng.random::<f32>() * 4.0;
            let particle = Particle::new(point, polar_to_cartesian(speed, angle))
                .with_mass(0.8 + rng.random::<f32>() * 1.2)
                .with_radius(2.0 + rng.random::<f32>() * 2.0)
                .with_color(color.as_str())
                .with_decay(0.992 + rng.random::<f32>() * 0.005);
            self.particles.insert(particle);
        }
    }

    /// Brush stroke: `floor(intensity * 10)` small bursts within the brush square
    pub fn paint(&mut self, point: Vec2, brush_size: f32, intensity: f32, color: Option<&str>) {
        let bursts = (intensity.max(0.0) * 10.0).floor() as usize;
        let color = self.resolve_color(color);
        for _ in 0..bursts {
            let offset = Vec2::new(
                (self.rng.random::<f32>() - 0.5) * brush_size,
                (self.rng.random::<f32>() - 0.5) * brush_size,
            );
            self.spawn_burst(point + offset, BRUSH_BURST, Some(&color));
        }
    }

    /// Loose particles every few units along a segment, both ends included
    pub fn draw_line(&mut self, from: Vec2, to: Vec2, color: Option<&str>) {
        let color = self.resolve_color(color);
        let steps = (from.distance(to) / LINE_STEP).ceil() as usize;
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            self.spawn_burst(from.lerp(to, t), LINE_BURST, Some(&color));
        }
    }

    /// Bonded chain along a segment, tuned by the active rules
    pub fn create_structure_from_line(&mut self, from: Vec2, to: Vec2, color: Option<&str>) -> u32 {
        let color = self.resolve_color(color);
        let constants = self.rules.adaptive();
        let id = self.next_structure_id();
        let structure = structure_from_line(
            id,
            &mut self.particles,
            &constants,
            from,
            to,
            &color,
            &mut self.rng,
        );
        let particles = structure.members.len();
        log::info!(
            "Structure {} drawn: {} particles, integrity {:.2}",
            id,
            particles,
            structure.integrity
        );
        self.structures.push(structure);
        self.events.push(SimEvent::StructureCreated {
            structure_id: id,
            particles,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rules::RuleSet;

    #[test]
    fn test_initialize_replaces_population() {
        let mut world = World::with_seed(1);
        world.spawn_burst(Vec2::ZERO, 5, None);
        let palettes = vec![vec!["#111111".to_string(), "#222222".to_string()]];
        world.initialize(40, &palettes);
        assert_eq!(world.particles.len(), 40);
        let center = world.center();
        let spread = 800.0 * 0.2;
        for p in world.particles.iter() {
            assert!(p.pos.distance(center) <= spread + 1e-3);
            assert!(p.color == "#111111" || p.color == "#222222");
            assert!((1.0..3.0).contains(&p.mass));
            assert!(p.vel.x.abs() <= 2.0 && p.vel.y.abs() <= 2.0);
        }
    }

    #[test]
    fn test_initialize_without_palette_uses_fallback() {
        let mut world = World::with_seed(1);
        world.initialize(3, &[]);
        assert!(world.particles.iter().all(|p| p.color == FALLBACK_COLOR));
    }

    #[test]
    fn test_burst_radiates() {
        let mut world = World::with_seed(2);
        world.spawn_burst(Vec2::new(10.0, 10.0), 20, Some("#ffffff"));
        assert_eq!(world.particles.len(), 20);
        for p in world.particles.iter() {
            let speed = p.vel.length();
            assert!((2.0..6.0 + 1e-4).contains(&speed));
            assert_eq!(p.color, "#ffffff");
        }
    }

    #[test]
    fn test_paint_count_follows_intensity() {
        let mut world = World::with_seed(3);
        world.paint(Vec2::new(50.0, 50.0), 30.0, 0.55, None);
        assert_eq!(world.particles.len(), 5 * BRUSH_BURST);
        world.paint(Vec2::new(50.0, 50.0), 30.0, 0.0, None);
        assert_eq!(world.particles.len(), 5 * BRUSH_BURST);
    }

    #[test]
    fn test_draw_line_includes_both_ends() {
        let mut world = World::with_seed(4);
        world.draw_line(Vec2::ZERO, Vec2::new(20.0, 0.0), None);
        // 4 steps -> 5 points of 5 particles
        assert_eq!(world.particles.len(), 25);
        world.draw_line(Vec2::ONE, Vec2::ONE, None);
        assert_eq!(world.particles.len(), 30);
    }

    #[test]
    fn test_structure_from_line_emits_event() {
        let mut world = World::with_seed(5);
        let id = world.create_structure_from_line(Vec2::ZERO, Vec2::new(100.0, 0.0), None);
        assert_eq!(world.structures.len(), 1);
        let s = &world.structures[0];
        assert_eq!(s.members.len(), world.particles.len());
        let events = world.drain_events();
        assert!(matches!(events[0], crate::sim::SimEvent::StructureCreated { structure_id, .. } if structure_id == id));
        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_evolve_keeps_memory() {
        let mut world = World::with_seed(6);
        world.initialize(30, &[]);
        world.entropy = 0.25;
        let generation = Generation {
            rules: RuleSet::empty(),
            mutations: Vec::new(),
            theme: "void".to_string(),
        };
        world.evolve(generation);
        assert_eq!(world.traces.len(), 10);
        assert_eq!(world.entropy, 0.25);
        assert!(world.rules.is_empty());
        let n = world.particles.len();
        assert!((50..150).contains(&n));
    }
}
