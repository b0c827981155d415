//! Interaction rules and the adaptive constants derived from them
//!
//! A rule set arrives from an external generator as JSON (camelCase keys),
//! is sanitized once on entry and then stays immutable until the next set
//! replaces it wholesale.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::mutation::{Mutation, MutationSpec};
use crate::consts::*;

/// Errors raised when decoding or validating external rule input
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("malformed rule json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule `{rule}` has no colors")]
    EmptyPalette { rule: String },
    #[error("rule `{rule}` field `{field}` is not finite")]
    NonFinite { rule: String, field: &'static str },
    #[error("mutation #{index} has zero duration")]
    ZeroDuration { index: usize },
}

/// Scripted physics of a single breaking phase
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhasePhysics {
    /// Bulk velocity nudge applied to the whole structure (scaled by 0.1)
    pub structure_velocity_x: f32,
    pub structure_velocity_y: f32,
    /// Bulk spin about the centroid (scaled by distance * 0.01)
    pub structure_rotation: f32,
    /// Velocity added to both ends of a failing bond
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Tangential kick about the centroid
    pub rotation_speed: f32,
    /// Push apart along the bond axis
    pub separation_force: f32,
    /// Pull toward (positive) or push from (negative) the centroid
    pub magnetic_force: f32,
    /// Random jitter amplitude
    pub turbulence: f32,
    /// Energy added to both ends of a failing bond
    pub energy_glow: f32,
    /// Fraction by which a particle's decay rate is reduced (faster fading)
    pub decay_rate: f32,
}

impl PhasePhysics {
    fn fields(&self) -> [(&'static str, f32); 11] {
        [
            ("structureVelocityX", self.structure_velocity_x),
            ("structureVelocityY", self.structure_velocity_y),
            ("structureRotation", self.structure_rotation),
            ("velocityX", self.velocity_x),
            ("velocityY", self.velocity_y),
            ("rotationSpeed", self.rotation_speed),
            ("separationForce", self.separation_force),
            ("magneticForce", self.magnetic_force),
            ("turbulence", self.turbulence),
            ("energyGlow", self.energy_glow),
            ("decayRate", self.decay_rate),
        ]
    }

    /// True if any structure-wide movement is requested
    pub fn moves_structure(&self) -> bool {
        self.structure_velocity_x != 0.0
            || self.structure_velocity_y != 0.0
            || self.structure_rotation != 0.0
    }
}

/// One phase of a breaking sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingPhase {
    /// Length of the phase in ticks of breaking age
    #[serde(deserialize_with = "ticks_from_number")]
    pub duration: u32,
    pub physics: PhasePhysics,
    #[serde(default)]
    pub description: String,
}

impl BreakingPhase {
    /// Phase used whenever the active rules carry no sequence of their own
    pub fn explosive_scatter() -> Self {
        Self {
            duration: 15,
            physics: PhasePhysics {
                separation_force: 5.0,
                turbulence: 0.5,
                energy_glow: 1.0,
                decay_rate: 0.1,
                ..Default::default()
            },
            description: "explosive scatter".to_string(),
        }
    }
}

/// Generators emit durations as JSON numbers, sometimes fractional
fn ticks_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Ok(1);
    }
    Ok((raw.round() as u32).max(1))
}

/// A named interaction rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sign selects attraction (+) or repulsion (-)
    pub force_multiplier: f32,
    /// Scales the 150-unit base interaction reach
    pub range_multiplier: f32,
    pub colors: Vec<String>,
    #[serde(default)]
    pub breaking_sequence: Vec<BreakingPhase>,
}

impl Rule {
    pub fn new(name: &str, force_multiplier: f32, range_multiplier: f32, colors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            force_multiplier,
            range_multiplier,
            colors: colors.iter().map(|c| c.to_string()).collect(),
            breaking_sequence: Vec::new(),
        }
    }

    pub fn with_sequence(mut self, sequence: Vec<BreakingPhase>) -> Self {
        self.breaking_sequence = sequence;
        self
    }

    /// Maximum distance at which this rule acts
    pub fn max_range(&self) -> f32 {
        BASE_INTERACTION_RANGE * self.range_multiplier
    }

    /// Reject non-finite numbers and empty palettes, clamp everything else
    fn sanitize(mut self) -> Result<Self, RuleError> {
        let non_finite = |field: &'static str| RuleError::NonFinite {
            rule: self.name.clone(),
            field,
        };
        if !self.force_multiplier.is_finite() {
            return Err(non_finite("forceMultiplier"));
        }
        if !self.range_multiplier.is_finite() {
            return Err(non_finite("rangeMultiplier"));
        }
        for phase in &self.breaking_sequence {
            let fields = phase.physics.fields();
            if let Some((field, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
                return Err(non_finite(field));
            }
        }
        self.colors.retain(|c| !c.trim().is_empty());
        if self.colors.is_empty() {
            return Err(RuleError::EmptyPalette { rule: self.name });
        }

        let force = self.force_multiplier.clamp(-1.0, 1.0);
        let range = self.range_multiplier.clamp(0.1, 2.0);
        if force != self.force_multiplier || range != self.range_multiplier {
            log::warn!(
                "Rule '{}' multipliers clamped: force {} -> {}, range {} -> {}",
                self.name,
                self.force_multiplier,
                force,
                self.range_multiplier,
                range
            );
        }
        self.force_multiplier = force;
        self.range_multiplier = range;

        for phase in &mut self.breaking_sequence {
            let p = &mut phase.physics;
            p.turbulence = p.turbulence.max(0.0);
            p.separation_force = p.separation_force.max(0.0);
            p.decay_rate = p.decay_rate.clamp(0.0, 0.99);
            phase.duration = phase.duration.max(1);
        }
        Ok(self)
    }
}

/// Constants derived from the average multipliers of the active rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConstants {
    pub avg_force: f32,
    pub avg_range: f32,
    /// Strain above which a bond fails
    pub breaking_threshold: f32,
    /// Integrity lost per failing bond
    pub integrity_loss_rate: f32,
    /// Structures at or below this integrity are retired
    pub min_integrity: f32,
}

impl AdaptiveConstants {
    pub fn from_averages(avg_force: f32, avg_range: f32) -> Self {
        let min_integrity = if avg_force > 0.0 {
            0.5 - avg_force * 0.5
        } else {
            0.4
        };
        Self {
            avg_force,
            avg_range,
            breaking_threshold: 0.5 + avg_force * 0.7,
            integrity_loss_rate: 0.15 / avg_range.max(0.1),
            min_integrity,
        }
    }

    /// Particle spacing for structures drawn from a line
    pub fn bond_spacing(&self) -> f32 {
        5.0 + self.avg_range * 4.0
    }

    /// Base bond stiffness for structures drawn from a line
    pub fn bond_stiffness(&self) -> f32 {
        0.3 + self.avg_force.abs() * 0.4
    }

    /// Mass of structure particles
    pub fn particle_mass(&self) -> f32 {
        (1.5 + self.avg_force * 0.8).max(0.1)
    }

    /// Starting integrity of a structure drawn from a line
    pub fn initial_integrity(&self) -> f32 {
        (0.8 + (self.avg_force.abs() * 0.2).min(0.2)).min(1.0)
    }
}

/// The active, immutable set of rules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
    #[serde(skip)]
    sequence: Vec<BreakingPhase>,
}

impl Default for RuleSet {
    /// The built-in rules a fresh engine starts with
    fn default() -> Self {
        let rules = vec![
            Rule {
                description: "Particles attract each other".to_string(),
                ..Rule::new("Attraction", 0.8, 1.2, &["#06b6d4", "#0ea5e9"])
            },
            Rule {
                description: "Particles repel each other".to_string(),
                ..Rule::new("Repulsion", -0.6, 0.8, &["#8b5cf6", "#a78bfa"])
            },
            Rule {
                description: "Particles orbit around center".to_string(),
                ..Rule::new("Orbital", 0.5, 1.5, &["#ec4899", "#f472b6"])
            },
        ];
        Self::from_sanitized(rules)
    }
}

impl RuleSet {
    /// Validate and sanitize a rule list into an active set
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let rules = rules
            .into_iter()
            .map(Rule::sanitize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_sanitized(rules))
    }

    /// A set with no rules; pairwise forces become a no-op
    pub fn empty() -> Self {
        Self::from_sanitized(Vec::new())
    }

    fn from_sanitized(rules: Vec<Rule>) -> Self {
        // Structures follow the first rule's script
        let sequence = match rules.first() {
            Some(rule) if !rule.breaking_sequence.is_empty() => rule.breaking_sequence.clone(),
            _ => vec![BreakingPhase::explosive_scatter()],
        };
        Self { rules, sequence }
    }

    /// Decode a JSON array of rules
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Breaking sequence followed by fracturing structures (never empty)
    pub fn breaking_sequence(&self) -> &[BreakingPhase] {
        &self.sequence
    }

    /// Pick a rule uniformly at random
    pub fn sample<'a, R: Rng>(&'a self, rng: &mut R) -> Option<&'a Rule> {
        if self.rules.is_empty() {
            return None;
        }
        Some(&self.rules[rng.random_range(0..self.rules.len())])
    }

    pub fn average_force(&self) -> f32 {
        if self.rules.is_empty() {
            return DEFAULT_FORCE_MULTIPLIER;
        }
        self.rules.iter().map(|r| r.force_multiplier).sum::<f32>() / self.rules.len() as f32
    }

    pub fn average_range(&self) -> f32 {
        if self.rules.is_empty() {
            return DEFAULT_RANGE_MULTIPLIER;
        }
        self.rules.iter().map(|r| r.range_multiplier).sum::<f32>() / self.rules.len() as f32
    }

    pub fn adaptive(&self) -> AdaptiveConstants {
        AdaptiveConstants::from_averages(self.average_force(), self.average_range())
    }

    /// Every palette color across all rules, in rule order
    pub fn palette(&self) -> Vec<&str> {
        self.rules
            .iter()
            .flat_map(|r| r.colors.iter().map(String::as_str))
            .collect()
    }

    /// Per-rule palettes, as handed to particle seeding
    pub fn palettes(&self) -> Vec<Vec<String>> {
        self.rules.iter().map(|r| r.colors.clone()).collect()
    }

    /// First color of a random rule, or the fallback color
    pub fn brush_color<R: Rng>(&self, rng: &mut R) -> String {
        self.sample(rng)
            .and_then(|r| r.colors.first())
            .cloned()
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }

    /// Any palette color at random, or `fallback`
    pub fn random_color<R: Rng>(&self, rng: &mut R, fallback: &str) -> String {
        let palette = self.palette();
        if palette.is_empty() {
            return fallback.to_string();
        }
        palette[rng.random_range(0..palette.len())].to_string()
    }
}

/// Full payload produced by a rule generator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedPayload {
    rules: Vec<Rule>,
    #[serde(default)]
    shape_mutations: Vec<MutationSpec>,
    #[serde(default)]
    emergence_theme: String,
}

/// A decoded generation: rules, mutations and the theme label
#[derive(Debug, Clone)]
pub struct Generation {
    pub rules: RuleSet,
    pub mutations: Vec<Mutation>,
    pub theme: String,
}

impl Generation {
    /// Decode a generator response (`rules`, `shapeMutations`, `emergenceTheme`)
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let payload: GeneratedPayload = serde_json::from_str(json)?;
        let rules = RuleSet::new(payload.rules)?;
        let mutations = Mutation::from_specs(payload.shape_mutations)?;
        Ok(Self {
            rules,
            mutations,
            theme: payload.emergence_theme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_default_rules() {
        let set = RuleSet::default();
        assert_eq!(set.len(), 3);
        assert_eq!(set.breaking_sequence().len(), 1);
        assert_eq!(set.breaking_sequence()[0].duration, 15);
        assert!((set.average_force() - (0.8 - 0.6 + 0.5) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_set_falls_back() {
        let set = RuleSet::empty();
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(set.sample(&mut rng).is_none());
        assert_eq!(set.average_force(), DEFAULT_FORCE_MULTIPLIER);
        assert_eq!(set.average_range(), DEFAULT_RANGE_MULTIPLIER);
        assert_eq!(set.brush_color(&mut rng), FALLBACK_COLOR);
        assert_eq!(set.breaking_sequence()[0].description, "explosive scatter");
    }

    #[test]
    fn test_adaptive_constants_repulsive() {
        let c = AdaptiveConstants::from_averages(-1.0, 1.0);
        assert!((c.breaking_threshold - (-0.2)).abs() < 1e-6);
        assert_eq!(c.min_integrity, 0.4);
        assert!((c.integrity_loss_rate - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_adaptive_constants_attractive() {
        let c = AdaptiveConstants::from_averages(1.0, 0.05);
        assert!((c.breaking_threshold - 1.2).abs() < 1e-6);
        assert!(c.min_integrity.abs() < 1e-6);
        // Range multiplier floors at 0.1
        assert!((c.integrity_loss_rate - 1.5).abs() < 1e-6);
        assert_eq!(c.initial_integrity(), 1.0);
    }

    #[test]
    fn test_sanitize_clamps_multipliers() {
        let set = RuleSet::new(vec![Rule::new("wild", 3.0, 0.0, &["#fff"])]).unwrap();
        assert_eq!(set.rules()[0].force_multiplier, 1.0);
        assert_eq!(set.rules()[0].range_multiplier, 0.1);
    }

    #[test]
    fn test_rejects_empty_palette() {
        let err = RuleSet::new(vec![Rule::new("dull", 0.5, 1.0, &[])]).unwrap_err();
        assert!(matches!(err, RuleError::EmptyPalette { .. }));
    }

    #[test]
    fn test_rejects_nan() {
        let err = RuleSet::new(vec![Rule::new("nan", f32::NAN, 1.0, &["#fff"])]).unwrap_err();
        assert!(matches!(err, RuleError::NonFinite { field: "forceMultiplier", .. }));
    }

    #[test]
    fn test_first_rule_sequence_is_used() {
        let phase = BreakingPhase {
            duration: 4,
            physics: PhasePhysics::default(),
            description: "hold".to_string(),
        };
        let set = RuleSet::new(vec![
            Rule::new("a", 0.1, 1.0, &["#111"]).with_sequence(vec![phase.clone()]),
            Rule::new("b", 0.1, 1.0, &["#222"]),
        ])
        .unwrap();
        assert_eq!(set.breaking_sequence(), &[phase]);
    }

    #[test]
    fn test_generation_from_json() {
        let json = r##"{
            "rules": [{
                "name": "Glass",
                "description": "shatters",
                "forceMultiplier": -0.9,
                "rangeMultiplier": 0.5,
                "colors": ["#ff0000", "#00ff00"],
                "breakingSequence": [{
                    "duration": 7.6,
                    "physics": { "velocityX": 2.0, "separationForce": 8, "turbulence": -1 },
                    "description": "burst"
                }]
            }],
            "shapeMutations": [
                { "type": "vortex", "intensity": 0.5, "duration": 150 },
                { "type": "sparkle", "intensity": 0.5, "duration": 150 }
            ],
            "emergenceTheme": "brittle"
        }"##;
        let generation = Generation::from_json(json).unwrap();
        assert_eq!(generation.theme, "brittle");
        assert_eq!(generation.rules.len(), 1);
        let phase = &generation.rules.breaking_sequence()[0];
        assert_eq!(phase.duration, 8);
        assert_eq!(phase.physics.velocity_x, 2.0);
        assert_eq!(phase.physics.turbulence, 0.0);
        // Unknown mutation kinds are dropped
        assert_eq!(generation.mutations.len(), 1);
    }
}
