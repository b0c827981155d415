//! Bonded structures and their breakup physics
//!
//! A structure is a chain of particles held by springs. Once a bond is
//! strained past the adaptive threshold it stops acting as a spring and
//! instead drives the scripted physics of the current breaking phase.
//! Integrity drains with every failure until the structure is retired.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rules::{AdaptiveConstants, BreakingPhase, PhasePhysics, RuleSet};
use super::state::{BreakingStats, Particle, ParticleId, ParticleStore, SimEvent};
use crate::consts::*;
use crate::{angle_around, tangent_of};

/// Spring between two members of a structure (indices into `members`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub rest_length: f32,
    pub stiffness: f32,
}

/// A bonded group of particles that can fracture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: u32,
    /// Member particles, in chain order
    pub members: Vec<ParticleId>,
    pub bonds: Vec<Bond>,
    pub color: String,
    /// Health in [0, 1]; only ever decreases after creation
    pub integrity: f32,
    /// Index of the active phase in the breaking sequence
    pub breaking_phase: usize,
    /// Bond failures accumulated since breaking began
    pub breaking_age: u32,
    /// Ticks until a scheduled explosion, if any
    pub detonation: Option<u32>,
}

impl Structure {
    /// Build a structure, discarding bonds that point outside `members`
    pub fn new(
        id: u32,
        members: Vec<ParticleId>,
        bonds: Vec<Bond>,
        color: String,
        integrity: f32,
    ) -> Self {
        let count = members.len();
        let valid: Vec<Bond> = bonds
            .into_iter()
            .filter(|b| b.a < count && b.b < count && b.a != b.b)
            .collect();
        Self {
            id,
            members,
            bonds: valid,
            color,
            integrity: integrity.clamp(0.0, 1.0),
            breaking_phase: 0,
            breaking_age: 0,
            detonation: None,
        }
    }

    /// Chain consecutive members with springs at their current separation
    pub fn chain(
        id: u32,
        members: Vec<ParticleId>,
        particles: &ParticleStore,
        stiffness: f32,
        color: String,
    ) -> Self {
        let bonds = (1..members.len())
            .filter_map(|i| {
                let a = particles.get(members[i - 1])?;
                let b = particles.get(members[i])?;
                Some(Bond {
                    a: i - 1,
                    b: i,
                    rest_length: a.pos.distance(b.pos),
                    stiffness,
                })
            })
            .collect();
        Self::new(id, members, bonds, color, 1.0)
    }

    pub fn schedule_detonation(&mut self, ticks: u32) {
        self.detonation = Some(ticks);
    }

    pub fn is_breaking(&self) -> bool {
        self.integrity < 1.0
    }
}

/// Active phase of a breaking sequence, walked forward as breaking age grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCursor {
    pub index: usize,
    /// Last breaking age covered by the active phase
    ends_at: u32,
}

impl PhaseCursor {
    /// First phase whose cumulative duration reaches `age`; holds the last phase past the end
    pub fn resolve(sequence: &[BreakingPhase], age: u32) -> Self {
        let mut acc = 0u32;
        for (index, phase) in sequence.iter().enumerate() {
            acc = acc.saturating_add(phase.duration);
            if age <= acc {
                return Self { index, ends_at: acc };
            }
        }
        Self {
            index: sequence.len().saturating_sub(1),
            ends_at: u32::MAX,
        }
    }

    /// Move forward to cover `age` without rescanning from the start
    pub fn advance(&mut self, sequence: &[BreakingPhase], age: u32) {
        while age > self.ends_at && self.index + 1 < sequence.len() {
            self.index += 1;
            self.ends_at = self.ends_at.saturating_add(sequence[self.index].duration);
        }
    }

    pub fn physics(&self, sequence: &[BreakingPhase]) -> PhasePhysics {
        sequence.get(self.index).map(|p| p.physics).unwrap_or_default()
    }
}

/// Mean position of the live members
fn centroid(particles: &ParticleStore, slots: &[Option<usize>]) -> Option<Vec2> {
    let ps = particles.as_slice();
    let (sum, count) = slots
        .iter()
        .flatten()
        .fold((Vec2::ZERO, 0usize), |(sum, n), &i| (sum + ps[i].pos, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Bulk translation and spin, applied once per structure per tick
fn apply_structure_motion(
    particles: &mut ParticleStore,
    slots: &[Option<usize>],
    physics: &PhasePhysics,
    center: Vec2,
) {
    if !physics.moves_structure() {
        return;
    }
    let drift = Vec2::new(physics.structure_velocity_x, physics.structure_velocity_y) * 0.1;
    let ps = particles.as_mut_slice();
    for &i in slots.iter().flatten() {
        let p = &mut ps[i];
        p.vel += drift;
        if physics.structure_rotation != 0.0 {
            let dist = p.pos.distance(center);
            p.vel += tangent_of(angle_around(p.pos, center)) * physics.structure_rotation * dist * 0.01;
        }
    }
}

/// Scripted physics for the two ends of a failing bond
fn apply_breakup<R: Rng>(
    pa: &mut Particle,
    pb: &mut Particle,
    physics: &PhasePhysics,
    center: Vec2,
    rng: &mut R,
) {
    for p in [&mut *pa, &mut *pb] {
        p.boost_energy(physics.energy_glow);
        if physics.decay_rate > 0.0 {
            p.decay_rate *= 1.0 - physics.decay_rate;
        }
    }

    // Shared jitter for both ends
    let turbulence = Vec2::new(
        (rng.random::<f32>() - 0.5) * physics.turbulence * 2.0,
        (rng.random::<f32>() - 0.5) * physics.turbulence * 2.0,
    );
    let push = Vec2::new(physics.velocity_x, physics.velocity_y) + turbulence;
    pa.vel += push;
    pb.vel += push;

    if physics.rotation_speed != 0.0 {
        pa.vel += tangent_of(angle_around(pa.pos, center)) * physics.rotation_speed;
        pb.vel += tangent_of(angle_around(pb.pos, center)) * physics.rotation_speed;
    }

    if physics.separation_force > 0.0 {
        let axis = (pb.pos - pa.pos).normalize_or_zero();
        pa.vel -= axis * physics.separation_force;
        pb.vel += axis * physics.separation_force;
    }

    if physics.magnetic_force != 0.0 {
        pa.vel += (center - pa.pos) * physics.magnetic_force * 0.01;
        pb.vel += (center - pb.pos) * physics.magnetic_force * 0.01;
    }
}

/// Hooke spring along the bond axis, scaled by inverse mass
fn apply_spring(pa: &mut Particle, pb: &mut Particle, bond: &Bond) {
    let delta = pb.pos - pa.pos;
    let dist = delta.length();
    let force = (dist - bond.rest_length) * bond.stiffness;
    let f = delta / dist * force;
    pa.vel += f / pa.mass;
    pb.vel -= f / pb.mass;
}

/// Count down a scheduled explosion; returns true if it went off this tick
fn tick_detonation<R: Rng>(
    structure: &mut Structure,
    particles: &mut ParticleStore,
    slots: &[Option<usize>],
    rng: &mut R,
) -> bool {
    let Some(remaining) = structure.detonation else {
        return false;
    };
    if remaining > 0 {
        structure.detonation = Some(remaining - 1);
        return false;
    }

    let ps = particles.as_mut_slice();
    for &i in slots.iter().flatten() {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let speed = 5.0 + rng.random::<f32>() * 10.0;
        ps[i].vel = crate::polar_to_cartesian(speed, angle);
        ps[i].energy = DETONATION_ENERGY;
    }
    structure.integrity = 0.0;
    structure.detonation = None;
    log::debug!("Structure {} detonated", structure.id);
    true
}

/// Advance every structure by one tick and retire the ones that failed
pub fn update_structures<R: Rng>(
    structures: &mut Vec<Structure>,
    particles: &mut ParticleStore,
    rules: &RuleSet,
    stats: &mut BreakingStats,
    events: &mut Vec<SimEvent>,
    rng: &mut R,
) {
    let constants = rules.adaptive();
    let sequence = rules.breaking_sequence();
    let mut orphaned = Vec::new();

    for structure in structures.iter_mut() {
        let slots: Vec<Option<usize>> = structure
            .members
            .iter()
            .map(|&id| particles.index_of(id))
            .collect();
        let Some(center) = centroid(particles, &slots) else {
            orphaned.push(structure.id);
            continue;
        };

        if tick_detonation(structure, particles, &slots, rng) {
            events.push(SimEvent::StructureDetonated {
                structure_id: structure.id,
            });
            continue;
        }

        let mut cursor = PhaseCursor::resolve(sequence, structure.breaking_age);
        if structure.is_breaking() {
            structure.breaking_phase = cursor.index;
            apply_structure_motion(particles, &slots, &cursor.physics(sequence), center);
        }

        resolve_bonds(structure, particles, &slots, &constants, sequence, &mut cursor, center, stats, rng);
        structure.integrity = structure.integrity.clamp(0.0, 1.0);
    }

    // A pending detonation holds the structure until it fires
    let min_integrity = constants.min_integrity;
    structures.retain(|s| {
        let alive = s.integrity > min_integrity || s.detonation.is_some();
        let keep = alive && !orphaned.contains(&s.id);
        if !keep {
            log::debug!(
                "Structure {} retired (integrity {:.3}, floor {:.3})",
                s.id,
                s.integrity,
                min_integrity
            );
            stats.structures_retired += 1;
            events.push(SimEvent::StructureRetired { structure_id: s.id });
        }
        keep
    });
}

/// Spring or break every bond of one structure
#[allow(clippy::too_many_arguments)]
fn resolve_bonds<R: Rng>(
    structure: &mut Structure,
    particles: &mut ParticleStore,
    slots: &[Option<usize>],
    constants: &AdaptiveConstants,
    sequence: &[BreakingPhase],
    cursor: &mut PhaseCursor,
    center: Vec2,
    stats: &mut BreakingStats,
    rng: &mut R,
) {
    for bond in &structure.bonds {
        // Members culled from the store leave dangling bonds; skip them
        let (Some(Some(ia)), Some(Some(ib))) = (slots.get(bond.a), slots.get(bond.b)) else {
            continue;
        };
        if bond.rest_length <= f32::EPSILON {
            continue;
        }
        let Some((pa, pb)) = particles.pair_mut(*ia, *ib) else {
            continue;
        };

        let dist = pa.pos.distance(pb.pos);
        if dist == 0.0 {
            continue;
        }
        let strain = (dist - bond.rest_length).abs() / bond.rest_length;

        if strain > constants.breaking_threshold {
            structure.integrity -= constants.integrity_loss_rate;
            structure.breaking_age += 1;
            cursor.advance(sequence, structure.breaking_age);
            structure.breaking_phase = cursor.index;
            stats.bonds_failed += 1;
            stats.particles_broken += 2;
            apply_breakup(pa, pb, &cursor.physics(sequence), center, rng);
            continue;
        }

        apply_spring(pa, pb, bond);
    }
}

/// Lay a chain of particles along a segment, tuned by the active rules
pub fn structure_from_line<R: Rng>(
    id: u32,
    particles: &mut ParticleStore,
    constants: &AdaptiveConstants,
    from: Vec2,
    to: Vec2,
    color: &str,
    rng: &mut R,
) -> Structure {
    let length = from.distance(to);
    let spacing = constants.bond_spacing();
    let count = ((length / spacing).floor() as usize).max(2);
    let stiffness = constants.bond_stiffness();
    let mass = constants.particle_mass();

    let mut members = Vec::with_capacity(count);
    let mut bonds = Vec::with_capacity(count - 1);
    for i in 0..count {
        let t = i as f32 / (count - 1) as f32;
        let particle = Particle::new(from.lerp(to, t), Vec2::ZERO)
            .with_mass(mass)
            .with_radius(2.5 + rng.random::<f32>())
            .with_color(color)
            .with_decay(0.998 + rng.random::<f32>() * 0.002);
        members.push(particles.insert(particle));
        if i > 0 {
            bonds.push(Bond {
                a: i - 1,
                b: i,
                rest_length: spacing,
                stiffness: stiffness + (rng.random::<f32>() - 0.5) * 0.1,
            });
        }
    }

    Structure::new(id, members, bonds, color.to_string(), constants.initial_integrity())
}
