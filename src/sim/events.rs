//! Surprise events
//!
//! Ambient events are rare global disruptions gated by a cooldown. The
//! forced event drops a dense shape stencil onto the canvas as one bonded
//! structure that detonates a few ticks later.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rules::RuleSet;
use super::state::{Particle, ParticleStore, SimEvent, World};
use super::structure::Structure;
use crate::consts::*;

/// Ambient disruption kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurpriseKind {
    /// Radial blast from a random particle
    Supernova,
    /// A few particles teleport
    QuantumTunneling,
    /// Every velocity flips and grows
    GravityInversion,
    /// Every particle is repainted from the palette
    ColorShift,
}

impl SurpriseKind {
    pub const ALL: [SurpriseKind; 4] = [
        SurpriseKind::Supernova,
        SurpriseKind::QuantumTunneling,
        SurpriseKind::GravityInversion,
        SurpriseKind::ColorShift,
    ];
}

/// Stencil shapes for forced events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Square,
    Circle,
    Triangle,
    Pentagon,
    Hexagon,
    Star,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Square,
        ShapeKind::Circle,
        ShapeKind::Triangle,
        ShapeKind::Pentagon,
        ShapeKind::Hexagon,
        ShapeKind::Star,
    ];

    /// Dense point cloud for this shape anchored at `origin`
    pub fn stencil<R: Rng>(&self, origin: Vec2, size: f32, rng: &mut R) -> Vec<Vec2> {
        let mut points = Vec::new();
        match self {
            ShapeKind::Square => {
                for i in 0..20 {
                    for j in 0..20 {
                        points.push(origin + Vec2::new(i as f32, j as f32) / 20.0 * size);
                    }
                }
            }
            ShapeKind::Circle => {
                radial_fill(&mut points, origin, size / 2.0, 0.1, |_| 1.0);
            }
            ShapeKind::Triangle => {
                for _ in 0..400 {
                    let (u, v) = (rng.random::<f32>(), rng.random::<f32>());
                    if u + v < 1.0 {
                        points.push(origin + Vec2::new(u, v) * size);
                    }
                }
            }
            ShapeKind::Pentagon => {
                radial_fill(&mut points, origin, size / 2.0, 0.08, |a| polygon_extent(a, 5));
            }
            ShapeKind::Hexagon => {
                radial_fill(&mut points, origin, size / 2.0, 0.08, |a| polygon_extent(a, 6));
            }
            ShapeKind::Star => {
                let sector = TAU / 5.0;
                radial_fill(&mut points, origin, size / 2.0, 0.08, |a| {
                    if (a / sector).floor() as u32 % 2 == 1 { 0.5 } else { 1.0 }
                });
            }
        }
        points
    }
}

/// Spokes of points every 3 units out to `radius * extent(angle)`
fn radial_fill(
    points: &mut Vec<Vec2>,
    origin: Vec2,
    radius: f32,
    angle_step: f32,
    extent: impl Fn(f32) -> f32,
) {
    let mut angle = 0.0f32;
    while angle < TAU {
        let reach = radius * extent(angle);
        let dir = Vec2::new(angle.cos(), angle.sin());
        let mut r = 0.0;
        while r < reach {
            points.push(origin + dir * r);
            r += 3.0;
        }
        angle += angle_step;
    }
}

/// Fraction of the circumradius reached by a regular polygon's edge at `angle`
fn polygon_extent(angle: f32, sides: u32) -> f32 {
    let sector = TAU / sides as f32;
    let local = angle.rem_euclid(sector) - sector / 2.0;
    (sector / 2.0).cos() / local.cos()
}

/// Roll for an ambient event; fires at most once per cooldown window
pub fn maybe_trigger_surprise(world: &mut World) -> Option<SurpriseKind> {
    let roll = world.rng.random::<f32>();
    let cooled_down =
        world.frame_count.saturating_sub(world.last_surprise_frame) > world.settings.event_cooldown_ticks;
    if roll >= SURPRISE_CHANCE || !cooled_down {
        return None;
    }

    let kind = SurpriseKind::ALL[world.rng.random_range(0..SurpriseKind::ALL.len())];
    let (width, height) = (world.settings.width, world.settings.height);
    trigger_surprise(kind, &mut world.particles, &world.rules, width, height, &mut world.rng);
    world.last_surprise_frame = world.frame_count;
    world.events.push(SimEvent::Surprise(kind));
    Some(kind)
}

/// Apply one ambient event to the particle store
pub fn trigger_surprise<R: Rng>(
    kind: SurpriseKind,
    particles: &mut ParticleStore,
    rules: &RuleSet,
    width: f32,
    height: f32,
    rng: &mut R,
) {
    match kind {
        SurpriseKind::Supernova => {
            if particles.is_empty() {
                return;
            }
            let star = particles.as_slice()[rng.random_range(0..particles.len())].pos;
            for p in particles.iter_mut() {
                let offset = p.pos - star;
                let dist = offset.length();
                if dist > 0.0 && dist < SUPERNOVA_RADIUS {
                    p.vel += offset / dist * (SUPERNOVA_FORCE / dist);
                }
            }
            log::info!("Surprise: supernova");
        }
        SurpriseKind::QuantumTunneling => {
            let count = TUNNEL_MAX.min(particles.len() / 10);
            for _ in 0..count {
                let i = rng.random_range(0..particles.len());
                let p = &mut particles.as_mut_slice()[i];
                p.pos = Vec2::new(rng.random::<f32>() * width, rng.random::<f32>() * height);
            }
            log::info!("Surprise: quantum tunneling ({} particles)", count);
        }
        SurpriseKind::GravityInversion => {
            for p in particles.iter_mut() {
                p.vel *= INVERSION_FACTOR;
            }
            log::info!("Surprise: gravity inversion");
        }
        SurpriseKind::ColorShift => {
            let palette = rules.palette();
            if !palette.is_empty() {
                for p in particles.iter_mut() {
                    p.color = palette[rng.random_range(0..palette.len())].to_string();
                }
            }
            log::info!("Surprise: color shift");
        }
    }
}

/// Spawn a random shape stencil as one structure set to detonate shortly
pub fn trigger_forced_event(world: &mut World) -> u32 {
    let rng = &mut world.rng;
    let shape = ShapeKind::ALL[rng.random_range(0..ShapeKind::ALL.len())];
    let origin = Vec2::new(
        rng.random::<f32>() * (world.settings.width - 200.0).max(0.0) + 100.0,
        rng.random::<f32>() * (world.settings.height - 200.0).max(0.0) + 100.0,
    );
    let size = 80.0 + rng.random::<f32>() * 60.0;
    let color = world.rules.random_color(rng, STENCIL_FALLBACK_COLOR);

    let members: Vec<_> = shape
        .stencil(origin, size, rng)
        .into_iter()
        .map(|pos| {
            world.particles.insert(
                Particle::new(pos, Vec2::ZERO)
                    .with_color(color.as_str())
                    .with_decay(STENCIL_DECAY_RATE),
            )
        })
        .collect();
    let count = members.len();

    let id = world.next_structure_id();
    let mut structure = Structure::chain(id, members, &world.particles, STENCIL_STIFFNESS, color);
    structure.schedule_detonation(DETONATION_DELAY_TICKS);
    world.structures.push(structure);
    world.last_surprise_frame = world.frame_count;
    world.events.push(SimEvent::StencilSpawned {
        shape,
        structure_id: id,
        particles: count,
    });

    log::info!(
        "Forced event: {:?} stencil with {} particles at ({:.0}, {:.0})",
        shape,
        count,
        origin.x,
        origin.y
    );
    id
}
