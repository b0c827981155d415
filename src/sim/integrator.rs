//! Motion integration and population lifecycle

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::rules::RuleSet;
use super::state::{Particle, ParticleStore};
use crate::consts::*;
use crate::polar_to_cartesian;
use crate::settings::EngineSettings;

/// Wrap a coordinate that left `[-margin, extent + margin]` to the opposite side
#[inline]
fn wrap(v: f32, extent: f32) -> f32 {
    if v < -WRAP_MARGIN {
        extent + WRAP_MARGIN
    } else if v > extent + WRAP_MARGIN {
        -WRAP_MARGIN
    } else {
        v
    }
}

/// Damped Euler step, energy decay, wrapping and occasional self-reset
pub fn integrate<R: Rng>(particles: &mut ParticleStore, settings: &EngineSettings, rng: &mut R) {
    for p in particles.iter_mut() {
        p.vel = (p.vel + p.acc) * VELOCITY_DAMPING;
        p.pos += p.vel;
        p.energy *= p.decay_rate;
        p.age += 1;

        p.pos.x = wrap(p.pos.x, settings.width);
        p.pos.y = wrap(p.pos.y, settings.height);

        if rng.random::<f32>() < RESET_CHANCE && p.age > RESET_AGE {
            p.vel *= 0.3;
            p.energy = rng.random::<f32>() * 0.5 + 0.5;
            p.age = 0;
        }
    }
}

/// Cull faded particles above the floor and occasionally birth one below the ceiling
pub fn update_population<R: Rng>(
    particles: &mut ParticleStore,
    rules: &RuleSet,
    settings: &EngineSettings,
    rng: &mut R,
) {
    if particles.len() > settings.population_floor && rng.random::<f32>() < CULL_CHANCE {
        particles.retain(|p| p.energy > CULL_ENERGY);
    }

    if rng.random::<f32>() < BIRTH_CHANCE && particles.len() < settings.population_ceiling {
        let angle = rng.random::<f32>() * TAU;
        let distance = rng.random::<f32>() * BIRTH_RADIUS;
        let vel = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5);
        let color = rules
            .rules()
            .first()
            .and_then(|r| r.colors.first())
            .map(String::as_str)
            .unwrap_or(FALLBACK_COLOR);
        particles.insert(
            Particle::new(settings.center() + polar_to_cartesian(distance, angle), vel)
                .with_color(color),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn settings() -> EngineSettings {
        EngineSettings::with_canvas(200.0, 100.0)
    }

    #[test]
    fn test_damped_step() {
        let mut particles = ParticleStore::new();
        let mut p = Particle::new(Vec2::new(50.0, 50.0), Vec2::new(1.0, 0.0));
        p.acc = Vec2::new(1.0, 2.0);
        particles.insert(p);
        let mut rng = Pcg32::seed_from_u64(1);
        integrate(&mut particles, &settings(), &mut rng);
        let p = &particles.as_slice()[0];
        assert!((p.vel - Vec2::new(1.96, 1.96)).length() < 1e-5);
        assert!((p.pos - Vec2::new(51.96, 51.96)).length() < 1e-5);
        assert!((p.energy - 0.994).abs() < 1e-6);
        assert_eq!(p.age, 1);
    }

    #[test]
    fn test_wraps_at_margin() {
        assert_eq!(wrap(-51.0, 200.0), 250.0);
        assert_eq!(wrap(251.0, 200.0), -50.0);
        assert_eq!(wrap(-49.0, 200.0), -49.0);
    }

    #[test]
    fn test_no_births_at_ceiling() {
        let settings = EngineSettings {
            population_floor: 0,
            population_ceiling: 3,
            ..settings()
        };
        let mut particles = ParticleStore::new();
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..2000 {
            update_population(&mut particles, &RuleSet::default(), &settings, &mut rng);
        }
        assert_eq!(particles.len(), 3);
    }

    #[test]
    fn test_cull_spares_small_populations() {
        let settings = EngineSettings {
            population_floor: 5,
            population_ceiling: 0,
            ..settings()
        };
        let mut particles = ParticleStore::new();
        for _ in 0..5 {
            let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO);
            p.energy = 0.0;
            particles.insert(p);
        }
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..500 {
            update_population(&mut particles, &RuleSet::default(), &settings, &mut rng);
        }
        assert_eq!(particles.len(), 5);

        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO);
        p.energy = 0.0;
        particles.insert(p);
        for _ in 0..500 {
            update_population(&mut particles, &RuleSet::default(), &settings, &mut rng);
        }
        assert!(particles.is_empty());
    }
}
