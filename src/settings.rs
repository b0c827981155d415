//! Engine settings
//!
//! Canvas geometry, seed and population bounds. Loaded from JSON by hosts
//! that persist them; everything falls back to sensible defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when decoding or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("malformed settings json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canvas dimensions must be positive and finite (got {width}x{height})")]
    InvalidCanvas { width: f32, height: f32 },
    #[error("population floor {floor} exceeds ceiling {ceiling}")]
    InvalidPopulation { floor: usize, ceiling: usize },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Canvas width in world units
    pub width: f32,
    /// Canvas height in world units
    pub height: f32,
    /// Seed for the engine's random source
    pub seed: u64,
    /// Smallest population seeded on a fresh generation
    pub initial_population_min: usize,
    /// Largest population seeded on a fresh generation (exclusive)
    pub initial_population_max: usize,
    /// Culling is only considered above this many particles
    pub population_floor: usize,
    /// Births only happen below this many particles
    pub population_ceiling: usize,
    /// Minimum ticks between ambient surprise events
    pub event_cooldown_ticks: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            seed: 0x5eed,
            initial_population_min: 50,
            initial_population_max: 150,
            population_floor: 50,
            population_ceiling: 200,
            event_cooldown_ticks: 300,
        }
    }
}

impl EngineSettings {
    /// Settings for a canvas of the given size, defaults elsewhere
    pub fn with_canvas(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Decode and validate settings from JSON; missing keys use defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Encode settings as JSON
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let canvas_ok = |v: f32| v.is_finite() && v > 0.0;
        if !canvas_ok(self.width) || !canvas_ok(self.height) {
            return Err(SettingsError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if self.population_floor > self.population_ceiling {
            return Err(SettingsError::InvalidPopulation {
                floor: self.population_floor,
                ceiling: self.population_ceiling,
            });
        }
        Ok(())
    }

    /// Canvas center
    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}
