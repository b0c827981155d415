//! Emergent Canvas - a real-time particle physics engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (forces, structures, mutations, events)
//! - `renderer`: Flattening particle state into GPU-ready instances
//! - `settings`: Engine configuration

pub mod renderer;
pub mod settings;
pub mod sim;

pub use settings::{EngineSettings, SettingsError};
pub use sim::{StateSnapshot, World, tick};

use glam::Vec2;

/// Engine tuning constants
pub mod consts {
    /// Fallback particle color when no palette is available
    pub const FALLBACK_COLOR: &str = "#06b6d4";
    /// Fallback color for stencil structures when no rule has a palette
    pub const STENCIL_FALLBACK_COLOR: &str = "#ff00ff";

    /// Centering gravity strength (applied at half strength per tick)
    pub const GRAVITY_STRENGTH: f32 = 0.02;
    /// Distances below this are treated as degenerate (no force)
    pub const MIN_FORCE_DISTANCE: f32 = 1.0;
    /// Pairwise interaction reach before range multiplier
    pub const BASE_INTERACTION_RANGE: f32 = 150.0;
    /// Pairwise force numerator before force multiplier
    pub const BASE_INTERACTION_FORCE: f32 = 50.0;
    /// Perturbation scale per unit of entropy
    pub const PERTURBATION_PER_ENTROPY: f32 = 0.1;
    /// Hard cap on per-tick perturbation magnitude
    pub const MAX_PERTURBATION: f32 = 0.5;

    /// Velocity damping applied every tick
    pub const VELOCITY_DAMPING: f32 = 0.98;
    /// Particles wrap once they leave the canvas by this margin
    pub const WRAP_MARGIN: f32 = 50.0;
    /// Maximum particle energy
    pub const MAX_ENERGY: f32 = 2.5;
    /// Particles below this energy may be culled
    pub const CULL_ENERGY: f32 = 0.1;
    /// Per-tick chance the store is filtered for low-energy particles
    pub const CULL_CHANCE: f32 = 0.1;
    /// Per-tick chance a particle is born near center
    pub const BIRTH_CHANCE: f32 = 0.05;
    /// Births land within this radius of center
    pub const BIRTH_RADIUS: f32 = 50.0;
    /// Age after which a particle may self-reset
    pub const RESET_AGE: u32 = 500;
    /// Per-particle chance an aged particle resets
    pub const RESET_CHANCE: f32 = 0.002;

    /// Entropy gained every tick
    pub const ENTROPY_STEP: f32 = 0.0005;

    /// Trace memory hard cap
    pub const TRACE_CAPACITY: usize = 5000;
    /// Alpha of a freshly captured trace point
    pub const TRACE_INITIAL_ALPHA: f32 = 0.3;
    /// Multiplicative alpha decay per tick
    pub const TRACE_DECAY: f32 = 0.99;
    /// Trace points at or below this alpha are dropped
    pub const TRACE_MIN_ALPHA: f32 = 0.01;
    /// Every n-th particle is captured at a checkpoint
    pub const TRACE_SAMPLE_STRIDE: usize = 3;

    /// Per-tick chance of an ambient surprise event
    pub const SURPRISE_CHANCE: f32 = 0.0008;
    /// Supernova reach
    pub const SUPERNOVA_RADIUS: f32 = 200.0;
    /// Supernova impulse numerator (divided by distance)
    pub const SUPERNOVA_FORCE: f32 = 50.0;
    /// Maximum particles teleported by quantum tunneling
    pub const TUNNEL_MAX: usize = 10;
    /// Velocity factor for gravity inversion
    pub const INVERSION_FACTOR: f32 = -1.5;

    /// Ticks between a forced stencil spawn and its detonation (~100ms at 60 Hz)
    pub const DETONATION_DELAY_TICKS: u32 = 6;
    /// Energy given to stencil particles when they detonate
    pub const DETONATION_ENERGY: f32 = 2.0;
    /// Decay rate of stencil particles
    pub const STENCIL_DECAY_RATE: f32 = 0.999;
    /// Stiffness of stencil bonds
    pub const STENCIL_STIFFNESS: f32 = 0.5;

    /// Neutral force multiplier used when no rules are active
    pub const DEFAULT_FORCE_MULTIPLIER: f32 = 0.5;
    /// Neutral range multiplier used when no rules are active
    pub const DEFAULT_RANGE_MULTIPLIER: f32 = 1.0;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector perpendicular (counter-clockwise) to the direction `theta`
#[inline]
pub fn tangent_of(theta: f32) -> Vec2 {
    Vec2::new(-theta.sin(), theta.cos())
}

/// Angle of `pos` around `center`
#[inline]
pub fn angle_around(pos: Vec2, center: Vec2) -> f32 {
    let d = pos - center;
    d.y.atan2(d.x)
}
