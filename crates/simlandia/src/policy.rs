//! Player tax policy decisions.

use crate::model::vars::TAX_RATE;
use crate::SimError;
use sd_engine::{Engine, EngineError};
use std::str::FromStr;

/// The yearly decision offered to the president.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    RaiseTaxes,
    KeepTaxes,
    LowerTaxes,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::RaiseTaxes, Policy::KeepTaxes, Policy::LowerTaxes];

    /// Menu label; `step` is the tax change as a fraction.
    pub fn label(self, step: f64) -> String {
        match self {
            Policy::RaiseTaxes => format!("Raise Taxes by {:.0}%", step * 100.0),
            Policy::KeepTaxes => "Keep Taxes the same".to_string(),
            Policy::LowerTaxes => format!("Lower Taxes by {:.0}%", step * 100.0),
        }
    }

    pub fn outcome(self) -> &'static str {
        match self {
            Policy::RaiseTaxes => "Taxes have been raised.",
            Policy::KeepTaxes => "Tax rate remains unchanged.",
            Policy::LowerTaxes => "Taxes have been lowered.",
        }
    }

    /// Apply to the engine's tax rate, clamped to [0, 1]. Returns the new rate.
    pub fn apply(self, engine: &mut Engine, step: f64) -> Result<f64, SimError> {
        let current = engine
            .get_value(TAX_RATE)
            .ok_or_else(|| EngineError::NotFound(TAX_RATE.to_string()))?;
        let next = match self {
            Policy::RaiseTaxes => (current + step).min(1.0),
            Policy::KeepTaxes => return Ok(current),
            Policy::LowerTaxes => (current - step).max(0.0),
        };
        engine.set_value(TAX_RATE, next)?;
        Ok(next)
    }
}

impl FromStr for Policy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "raise" => Ok(Policy::RaiseTaxes),
            "2" | "keep" => Ok(Policy::KeepTaxes),
            "3" | "lower" => Ok(Policy::LowerTaxes),
            other => Err(SimError::InvalidChoice(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simlandia_model;
    use proptest::prelude::*;

    fn engine() -> Engine {
        Engine::new(simlandia_model().unwrap())
    }

    #[test]
    fn parses_menu_choices_and_names() {
        assert_eq!("1".parse::<Policy>().unwrap(), Policy::RaiseTaxes);
        assert_eq!(" keep ".parse::<Policy>().unwrap(), Policy::KeepTaxes);
        assert_eq!("LOWER".parse::<Policy>().unwrap(), Policy::LowerTaxes);
        assert_eq!(
            "4".parse::<Policy>(),
            Err(SimError::InvalidChoice("4".into()))
        );
    }

    #[test]
    fn raise_and_lower_move_by_step() {
        let mut eng = engine();
        let r = Policy::RaiseTaxes.apply(&mut eng, 0.02).unwrap();
        assert!((r - 0.27).abs() < 1e-12);
        assert_eq!(Policy::KeepTaxes.apply(&mut eng, 0.02).unwrap(), r);
        let l = Policy::LowerTaxes.apply(&mut eng, 0.02).unwrap();
        assert!((l - 0.25).abs() < 1e-12);
        assert_eq!(eng.get_value(TAX_RATE), Some(l));
    }

    #[test]
    fn missing_tax_rate_is_reported() {
        let mut eng = engine();
        eng.remove_variable(TAX_RATE);
        assert_eq!(
            Policy::RaiseTaxes.apply(&mut eng, 0.02),
            Err(SimError::Engine(EngineError::NotFound(TAX_RATE.into())))
        );
    }

    proptest! {
        #[test]
        fn rate_stays_within_bounds(start in 0.0f64..=1.0, step in 0.0f64..0.5, raise in any::<bool>()) {
            let mut eng = engine();
            eng.set_value(TAX_RATE, start).unwrap();
            let policy = if raise { Policy::RaiseTaxes } else { Policy::LowerTaxes };
            let rate = policy.apply(&mut eng, step).unwrap();
            prop_assert!((0.0..=1.0).contains(&rate));
        }
    }
}
