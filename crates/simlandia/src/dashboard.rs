//! Yearly report shown to the player.

use crate::model::vars::{GDP, POPULATION, STABILITY, TAX_RATE, TREASURY, UNEMPLOYMENT_RATE};
use crate::SimError;
use sd_engine::{group_thousands, Engine, EngineError};
use std::fmt;

/// Headline figures for one year.
#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    pub year: i32,
    pub population: f64,
    /// Percent, nominally 0..=100.
    pub stability: f64,
    /// Fraction.
    pub unemployment_rate: f64,
    /// USD.
    pub treasury: f64,
    /// USD.
    pub gdp: f64,
    /// Fraction.
    pub tax_rate: f64,
}

impl Dashboard {
    pub fn from_engine(engine: &Engine, year: i32) -> Result<Self, SimError> {
        let read = |name: &str| {
            engine
                .get_value(name)
                .ok_or_else(|| SimError::Engine(EngineError::NotFound(name.to_string())))
        };
        Ok(Self {
            year,
            population: read(POPULATION)?,
            stability: read(STABILITY)?,
            unemployment_rate: read(UNEMPLOYMENT_RATE)?,
            treasury: read(TREASURY)?,
            gdp: read(GDP)?,
            tax_rate: read(TAX_RATE)?,
        })
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---== YEAR {} REPORT ==---", self.year)?;
        writeln!(f, "  Population:      {}", group_thousands(self.population, 0))?;
        writeln!(f, "  Stability:       {:.1}%", self.stability)?;
        writeln!(f, "  Unemployment:    {:.2}%", self.unemployment_rate * 100.0)?;
        writeln!(f, "  Treasury:        ${} B", group_thousands(self.treasury / 1e9, 2))?;
        writeln!(f, "  GDP:             ${} B", group_thousands(self.gdp / 1e9, 2))?;
        writeln!(f, "  Income tax:      {:.1}%", self.tax_rate * 100.0)?;
        write!(f, "{}", "-".repeat(25))
    }
}
