//! Force solver
//!
//! Accelerations are rebuilt from scratch every tick from three sources:
//! centering gravity, rule-sampled pairwise interaction and entropy jitter.
//! The pairwise pass is O(n²) on purpose; populations stay in the hundreds.

use glam::Vec2;
use rand::Rng;

use super::rules::RuleSet;
use super::state::ParticleStore;
use crate::consts::*;

/// Per-axis jitter bound for the given entropy
pub fn perturbation_magnitude(entropy: f32) -> f32 {
    (entropy * PERTURBATION_PER_ENTROPY).min(MAX_PERTURBATION)
}

/// Pairwise force magnitude for a rule at `dist_sq` (positive pushes apart)
#[inline]
pub fn interaction_force(force_multiplier: f32, dist_sq: f32) -> f32 {
    (force_multiplier * BASE_INTERACTION_FORCE) / (dist_sq + 1.0)
}

/// Reset and accumulate every particle's acceleration for this tick
pub fn apply_forces<R: Rng>(
    particles: &mut ParticleStore,
    rules: &RuleSet,
    entropy: f32,
    center: Vec2,
    rng: &mut R,
) {
    let ps = particles.as_mut_slice();

    for p in ps.iter_mut() {
        p.acc = Vec2::ZERO;
        apply_gravity(&mut p.acc, p.pos, center);
    }

    if !rules.is_empty() {
        apply_pairwise(ps, rules, rng);
    }

    let jitter = perturbation_magnitude(entropy);
    for p in ps.iter_mut() {
        p.acc.x += (rng.random::<f32>() - 0.5) * jitter;
        p.acc.y += (rng.random::<f32>() - 0.5) * jitter;
    }
}

/// Constant-magnitude pull toward the canvas center
fn apply_gravity(acc: &mut Vec2, pos: Vec2, center: Vec2) {
    let to_center = center - pos;
    let dist = to_center.length();
    if dist > MIN_FORCE_DISTANCE {
        *acc += to_center / dist * GRAVITY_STRENGTH * 0.5;
    }
}

/// One randomly sampled rule per unordered pair, per tick
fn apply_pairwise<R: Rng>(ps: &mut [super::state::Particle], rules: &RuleSet, rng: &mut R) {
    let n = ps.len();
    for i in 0..n {
        let (head, tail) = ps.split_at_mut(i + 1);
        let p1 = &mut head[i];
        for p2 in tail.iter_mut() {
            let delta = p2.pos - p1.pos;
            let dist_sq = delta.length_squared();
            let dist = dist_sq.sqrt();
            if dist < MIN_FORCE_DISTANCE {
                continue;
            }

            let Some(rule) = rules.sample(rng) else {
                return;
            };
            if dist >= rule.max_range() {
                continue;
            }

            let f = delta / dist * interaction_force(rule.force_multiplier, dist_sq);
            p1.acc -= f / p1.mass;
            p2.acc += f / p2.mass;
        }
    }
}
