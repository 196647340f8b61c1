//! Game configuration.

use crate::SimError;
use sd_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Upper bound for `strike_years`.
pub const MAX_STRIKE_YEARS: u32 = 100;

/// Tunables for a Simlandia run. Every field is optional in YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Calendar year shown for the first report.
    pub start_year: i32,
    /// Seed for the event deck.
    pub rng_seed: u64,
    /// Probability in [0, 1] that an event fires in a given year.
    pub event_chance: f64,
    /// Tax rate change applied by a raise or lower policy.
    pub tax_step: f64,
    /// Years a strike keeps pressing on stability (1..=`MAX_STRIKE_YEARS`).
    pub strike_years: u32,
    pub engine: EngineConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_year: 2024,
            rng_seed: 42,
            event_chance: 0.25,
            tax_step: 0.02,
            strike_years: 2,
            engine: EngineConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, SimError> {
        let cfg: GameConfig =
            serde_yaml::from_str(text).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(0.0..=1.0).contains(&self.event_chance) {
            return Err(SimError::InvalidConfig(format!(
                "event_chance must be within [0,1], got {}",
                self.event_chance
            )));
        }
        if !self.tax_step.is_finite() || self.tax_step < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "tax_step must be finite and >= 0, got {}",
                self.tax_step
            )));
        }
        if !(1..=MAX_STRIKE_YEARS).contains(&self.strike_years) {
            return Err(SimError::InvalidConfig(format!(
                "strike_years must be within [1,{MAX_STRIKE_YEARS}], got {}",
                self.strike_years
            )));
        }
        Ok(())
    }
}
