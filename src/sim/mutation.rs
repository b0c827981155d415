//! Timed global velocity-field transformations
//!
//! Each mutation loops over its duration with a triangular intensity
//! envelope: silent at the ends, full strength at mid-duration.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;
use super::state::ParticleStore;
use crate::{angle_around, polar_to_cartesian, tangent_of};

/// The closed vocabulary of mutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Tangential swirl around the canvas center
    Spiral,
    /// Vertical ripple phased by particle index
    Wave,
    /// Velocity replaced by a rotating radial field
    Vortex,
    /// Downward push on the upper half of the canvas
    Cascade,
    /// Radial outward push
    Bloom,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Spiral => "spiral",
            MutationKind::Wave => "wave",
            MutationKind::Vortex => "vortex",
            MutationKind::Cascade => "cascade",
            MutationKind::Bloom => "bloom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spiral" => Some(MutationKind::Spiral),
            "wave" => Some(MutationKind::Wave),
            "vortex" => Some(MutationKind::Vortex),
            "cascade" => Some(MutationKind::Cascade),
            "bloom" => Some(MutationKind::Bloom),
            _ => None,
        }
    }
}

/// Mutation as emitted by a generator, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct MutationSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub intensity: f32,
    pub duration: f64,
}

/// An active mutation with its shared envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    /// Peak strength in (0, 1]
    pub intensity: f32,
    /// Loop length in ticks (at least 1)
    pub duration: u32,
    /// Ticks into the current loop
    pub progress: u32,
}

impl Mutation {
    pub fn new(kind: MutationKind, intensity: f32, duration: u32) -> Self {
        Self {
            kind,
            intensity: intensity.clamp(0.0, 1.0),
            duration: duration.max(1),
            progress: 0,
        }
    }

    /// Validate generator output. Unknown kinds are dropped, intensity is clamped.
    pub fn from_specs(specs: Vec<MutationSpec>) -> Result<Vec<Self>, RuleError> {
        let mut mutations = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let Some(kind) = MutationKind::parse(&spec.kind) else {
                log::warn!("Dropping unknown mutation type '{}'", spec.kind);
                continue;
            };
            if !spec.duration.is_finite() || spec.duration.round() < 1.0 {
                return Err(RuleError::ZeroDuration { index });
            }
            if !spec.intensity.is_finite() {
                log::warn!("Mutation #{} has non-finite intensity, dropping", index);
                continue;
            }
            mutations.push(Self::new(kind, spec.intensity, spec.duration.round() as u32));
        }
        Ok(mutations)
    }

    /// Decode a JSON array of mutations
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, RuleError> {
        let specs: Vec<MutationSpec> = serde_json::from_str(json)?;
        Self::from_specs(specs)
    }

    /// Step progress, wrapping to zero once it passes the duration
    pub fn advance(&mut self) {
        self.progress += 1;
        if self.progress > self.duration {
            self.progress = 0;
        }
    }

    /// Fraction of the loop completed
    pub fn phase(&self) -> f32 {
        self.progress as f32 / self.duration as f32
    }

    /// Triangular envelope: 0 at the ends, `intensity` at mid-duration
    pub fn effective_intensity(&self) -> f32 {
        self.intensity * (1.0 - (self.phase() - 0.5).abs() * 2.0)
    }
}

/// Advance every mutation and overlay it on the particles
pub fn apply_mutations(
    mutations: &mut [Mutation],
    particles: &mut ParticleStore,
    center: Vec2,
    canvas_height: f32,
) {
    for mutation in mutations.iter_mut() {
        mutation.advance();
        let intensity = mutation.effective_intensity();
        let phase = mutation.phase();
        let count = particles.len();

        match mutation.kind {
            MutationKind::Spiral => {
                for p in particles.iter_mut() {
                    let angle = angle_around(p.pos, center);
                    p.vel += tangent_of(angle) * intensity * 0.3;
                }
            }
            MutationKind::Wave => {
                for (i, p) in particles.iter_mut().enumerate() {
                    let wave_phase = (i as f32 / count as f32 + phase) * TAU;
                    p.pos.y += wave_phase.sin() * intensity * 2.0;
                }
            }
            MutationKind::Vortex => {
                for p in particles.iter_mut() {
                    let dist = p.pos.distance(center);
                    if dist > 1.0 {
                        let angle = angle_around(p.pos, center);
                        p.vel = polar_to_cartesian(dist * 0.01, angle + intensity * 0.2);
                    }
                }
            }
            MutationKind::Cascade => {
                let midline = canvas_height / 2.0;
                for p in particles.iter_mut().filter(|p| p.pos.y < midline) {
                    p.vel.y += intensity * 0.5;
                }
            }
            MutationKind::Bloom => {
                for p in particles.iter_mut() {
                    let offset = p.pos - center;
                    let dist = offset.length();
                    if dist > 1.0 {
                        p.vel += offset / dist * intensity * 0.5;
                    }
                }
            }
        }
    }
}
