//! World state and core simulation types
//!
//! Particles live in a single arena addressed by stable `ParticleId`s;
//! structures refer to their members by id, never by copy.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::{ShapeKind, SurpriseKind};
use super::mutation::Mutation;
use super::rules::RuleSet;
use super::structure::Structure;
use crate::consts::*;
use crate::settings::EngineSettings;

/// Stable particle handle. Ids are allocated monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

/// A point mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Recomputed from scratch every tick
    pub acc: Vec2,
    pub mass: f32,
    /// Visual radius
    pub radius: f32,
    /// Palette color, e.g. `#06b6d4`
    pub color: String,
    /// Ticks alive
    pub age: u32,
    /// Glow in [0, 2.5], multiplied by `decay_rate` every tick
    pub energy: f32,
    /// Per-tick energy multiplier in (0, 1)
    pub decay_rate: f32,
}

impl Particle {
    /// A unit-mass particle; id is assigned on insertion into a store
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self {
            id: ParticleId(0),
            pos,
            vel,
            acc: Vec2::ZERO,
            mass: 1.0,
            radius: 2.0,
            color: FALLBACK_COLOR.to_string(),
            age: 0,
            energy: 1.0,
            decay_rate: 0.994,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_decay(mut self, decay_rate: f32) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    /// Color to draw with; anything that isn't a `#` color falls back
    pub fn display_color(&self) -> &str {
        if self.color.starts_with('#') {
            &self.color
        } else {
            FALLBACK_COLOR
        }
    }

    /// Add energy, keeping it within [0, MAX_ENERGY]
    pub fn boost_energy(&mut self, amount: f32) {
        self.energy = (self.energy + amount).clamp(0.0, MAX_ENERGY);
    }
}

/// Flat arena of particles, kept sorted by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    next_id: u32,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a particle, assigning it a fresh id
    pub fn insert(&mut self, mut particle: Particle) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        particle.id = id;
        // Ids only grow, so pushing keeps the arena sorted
        self.particles.push(particle);
        id
    }

    /// Current slot of a particle, if it is still alive
    pub fn index_of(&self, id: ParticleId) -> Option<usize> {
        self.particles.binary_search_by_key(&id, |p| p.id).ok()
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.index_of(id).map(|i| &self.particles[i])
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.index_of(id).map(move |i| &mut self.particles[i])
    }

    /// Two distinct particles by slot
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
        if a == b || a >= self.particles.len() || b >= self.particles.len() {
            return None;
        }
        if a < b {
            let (lo, hi) = self.particles.split_at_mut(b);
            Some((&mut lo[a], &mut hi[0]))
        } else {
            let (lo, hi) = self.particles.split_at_mut(a);
            Some((&mut hi[0], &mut lo[b]))
        }
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn retain<F: FnMut(&Particle) -> bool>(&mut self, f: F) {
        self.particles.retain(f);
    }

    /// Drop every particle. Ids keep counting so stale handles never alias.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Mean energy, zero for an empty store
    pub fn mean_energy(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        self.particles.iter().map(|p| p.energy).sum::<f32>() / self.particles.len() as f32
    }
}

/// A fading ghost of a past particle position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub pos: Vec2,
    pub color: String,
    pub alpha: f32,
}

/// Bounded ring of trace points, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceMemory {
    points: VecDeque<TracePoint>,
}

impl TraceMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every third particle; the oldest points make room
    pub fn capture(&mut self, particles: &ParticleStore) {
        for p in particles.iter().step_by(TRACE_SAMPLE_STRIDE) {
            self.points.push_back(TracePoint {
                pos: p.pos,
                color: p.color.clone(),
                alpha: TRACE_INITIAL_ALPHA,
            });
        }
        while self.points.len() > TRACE_CAPACITY {
            self.points.pop_front();
        }
    }

    /// Fade every point and prune the invisible ones
    pub fn decay(&mut self) {
        for point in self.points.iter_mut() {
            point.alpha *= TRACE_DECAY;
        }
        self.points.retain(|p| p.alpha > TRACE_MIN_ALPHA);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TracePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Fracture counters since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingStats {
    /// Bond failures (each failing bond on each tick counts once)
    pub bonds_failed: u64,
    /// Particles that received breakup physics
    pub particles_broken: u64,
    /// Structures retired after losing integrity
    pub structures_retired: u64,
}

/// Notable things that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// An ambient surprise event fired
    Surprise(SurpriseKind),
    /// A forced event spawned a stencil structure
    StencilSpawned {
        shape: ShapeKind,
        structure_id: u32,
        particles: usize,
    },
    /// A structure was created from a drawn line
    StructureCreated { structure_id: u32, particles: usize },
    /// A scheduled stencil explosion went off
    StructureDetonated { structure_id: u32 },
    /// A structure fell below its survival threshold and was removed
    StructureRetired { structure_id: u32 },
}

/// Aggregate state for external observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub frame_count: u64,
    pub entropy: f32,
    pub particle_count: usize,
    pub average_energy: f32,
    pub structure_count: usize,
    pub trace_count: usize,
    pub breaking: BreakingStats,
}

/// RNG bookkeeping so a run can be recreated from its seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

/// The complete simulation world
#[derive(Debug, Clone)]
pub struct World {
    pub settings: EngineSettings,
    pub rng_state: RngState,
    pub(crate) rng: Pcg32,
    /// Ticks since creation or the last clear
    pub frame_count: u64,
    /// Grows every tick, saturates at 1, survives clears
    pub entropy: f32,
    /// Frame of the most recent surprise or forced event
    pub last_surprise_frame: u64,
    pub particles: ParticleStore,
    pub structures: Vec<Structure>,
    pub rules: RuleSet,
    pub mutations: Vec<Mutation>,
    /// Survives clears
    pub traces: TraceMemory,
    pub stats: BreakingStats,
    pub(crate) events: Vec<SimEvent>,
    next_structure_id: u32,
}

impl World {
    /// Create an empty world running the built-in rules
    pub fn new(settings: EngineSettings) -> Self {
        let rng_state = RngState::new(settings.seed);
        Self {
            rng: rng_state.to_rng(),
            rng_state,
            settings,
            frame_count: 0,
            entropy: 0.0,
            last_surprise_frame: 0,
            particles: ParticleStore::new(),
            structures: Vec::new(),
            rules: RuleSet::default(),
            mutations: Vec::new(),
            traces: TraceMemory::new(),
            stats: BreakingStats::default(),
            events: Vec::new(),
            next_structure_id: 1,
        }
    }

    /// Create a world with default settings and the given seed
    pub fn with_seed(seed: u64) -> Self {
        Self::new(EngineSettings {
            seed,
            ..EngineSettings::default()
        })
    }

    /// Canvas center
    pub fn center(&self) -> Vec2 {
        self.settings.center()
    }

    pub(crate) fn next_structure_id(&mut self) -> u32 {
        let id = self.next_structure_id;
        self.next_structure_id += 1;
        id
    }

    /// Replace the active rule set wholesale
    pub fn set_rules(&mut self, rules: RuleSet) {
        let c = rules.adaptive();
        log::info!(
            "Rule set replaced: {} rules, avg force {:.2}, avg range {:.2}, break threshold {:.2}",
            rules.len(),
            c.avg_force,
            c.avg_range,
            c.breaking_threshold
        );
        self.rules = rules;
    }

    /// Replace the active mutations wholesale; progress restarts at zero
    pub fn set_mutations(&mut self, mutations: Vec<Mutation>) {
        self.mutations = mutations
            .into_iter()
            .map(|mut m| {
                m.progress = 0;
                m
            })
            .collect();
    }

    /// Clear particles, structures and the frame counter.
    /// Entropy, trace memory and rules are kept.
    pub fn clear(&mut self) {
        log::info!(
            "Clearing canvas: {} particles, {} structures (entropy {:.3} kept, {} traces kept)",
            self.particles.len(),
            self.structures.len(),
            self.entropy,
            self.traces.len()
        );
        self.particles.clear();
        self.structures.clear();
        self.frame_count = 0;
        self.last_surprise_frame = 0;
        self.stats = BreakingStats::default();
    }

    /// Snapshot every third particle into trace memory
    pub fn capture_trace_checkpoint(&mut self) {
        self.traces.capture(&self.particles);
        log::debug!("Trace checkpoint: {} points held", self.traces.len());
    }

    /// Aggregate state for observers
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            frame_count: self.frame_count,
            entropy: self.entropy,
            particle_count: self.particles.len(),
            average_energy: self.particles.mean_energy(),
            structure_count: self.structures.len(),
            trace_count: self.traces.len(),
            breaking: self.stats,
        }
    }

    /// Read-only particle view for rendering
    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn traces(&self) -> &TraceMemory {
        &self.traces
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one tick with no external input
    pub fn update(&mut self) {
        super::tick::tick(self, &super::tick::TickInput::default());
    }
}
