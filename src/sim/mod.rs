//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - One tick per call, no wall clock
//! - Seeded RNG only, owned by the world
//! - Stable iteration order (particles sorted by id)
//! - No rendering or platform dependencies

pub mod brush;
pub mod events;
pub mod forces;
pub mod integrator;
pub mod mutation;
pub mod rules;
pub mod state;
pub mod structure;
pub mod tick;

pub use events::{ShapeKind, SurpriseKind, trigger_forced_event};
pub use mutation::{Mutation, MutationKind};
pub use rules::{AdaptiveConstants, BreakingPhase, Generation, PhasePhysics, Rule, RuleError, RuleSet};
pub use state::{
    BreakingStats, Particle, ParticleId, ParticleStore, SimEvent, StateSnapshot, TraceMemory,
    TracePoint, World,
};
pub use structure::{Bond, Structure};
pub use tick::{Command, TickInput, tick};
