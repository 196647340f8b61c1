//! Built-in Simlandia model: parameters, converters, flows and stocks.

use sd_engine::{Model, ModelError, Modifier, VariableDef};

/// Variable names the game layer reads or writes directly.
pub mod vars {
    pub const TAX_RATE: &str = "tax_rate";
    pub const GDP_PER_CAPITA: &str = "gdp_per_capita";
    pub const BASE_BIRTH_RATE: &str = "base_birth_rate";
    pub const BASE_DEATH_RATE: &str = "base_death_rate";
    pub const BASE_SPENDING: &str = "base_spending";
    pub const MIN_UNEMPLOYMENT: &str = "min_unemployment";
    pub const STABILITY_TARGET: &str = "stability_target";

    pub const GDP: &str = "gdp";
    pub const TAX_REVENUE: &str = "tax_revenue";
    pub const UNEMPLOYMENT_FROM_TAXES: &str = "unemployment_from_taxes";
    pub const UNEMPLOYMENT_FROM_STABILITY: &str = "unemployment_from_stability";
    pub const UNEMPLOYMENT_RATE: &str = "unemployment_rate";
    pub const STABILITY_PRESSURE: &str = "stability_pressure_from_unemployment";

    pub const BIRTHS: &str = "births";
    pub const DEATHS: &str = "deaths";
    pub const TREASURY_CHANGE: &str = "treasury_change";
    pub const STABILITY_CHANGE: &str = "stability_change";

    pub const POPULATION: &str = "population";
    pub const TREASURY: &str = "treasury";
    pub const STABILITY: &str = "stability";
}

use vars::*;

/// Stage 1: converters derived from parameters and last year's stocks.
const CONVERTERS: i32 = 1;
/// Stage 2: flows feeding the stocks.
const FLOWS: i32 = 2;
/// Stage 3: stocks accumulating their flows.
const STOCKS: i32 = 3;

/// The Republic of Simlandia.
pub fn simlandia_model() -> Result<Model, ModelError> {
    Model::from_pairs([
        // Parameters carry their value forward and are changed by policy and events.
        (TAX_RATE, VariableDef::parameter(0.25)),
        (GDP_PER_CAPITA, VariableDef::parameter(40_000.0)),
        (BASE_BIRTH_RATE, VariableDef::parameter(0.02)),
        (BASE_DEATH_RATE, VariableDef::parameter(0.01)),
        (BASE_SPENDING, VariableDef::parameter(50e9)),
        (MIN_UNEMPLOYMENT, VariableDef::parameter(0.02)),
        (STABILITY_TARGET, VariableDef::parameter(80.0)),
        (
            GDP,
            VariableDef::derived(CONVERTERS, POPULATION)
                .with_modifier(Modifier::multiply(GDP_PER_CAPITA)),
        ),
        (
            TAX_REVENUE,
            VariableDef::derived(CONVERTERS, GDP).with_modifier(Modifier::multiply(TAX_RATE)),
        ),
        (
            UNEMPLOYMENT_FROM_TAXES,
            VariableDef::derived(CONVERTERS, TAX_RATE).with_modifier(Modifier::multiply(0.5)),
        ),
        (
            UNEMPLOYMENT_FROM_STABILITY,
            VariableDef::derived(CONVERTERS, STABILITY)
                .with_modifier(Modifier::multiply(-0.0005)),
        ),
        (
            UNEMPLOYMENT_RATE,
            VariableDef::derived(CONVERTERS, MIN_UNEMPLOYMENT)
                .with_modifier(Modifier::add(UNEMPLOYMENT_FROM_TAXES))
                .with_modifier(Modifier::add(UNEMPLOYMENT_FROM_STABILITY)),
        ),
        (
            STABILITY_PRESSURE,
            VariableDef::derived(CONVERTERS, UNEMPLOYMENT_RATE)
                .with_modifier(Modifier::multiply(-200.0)),
        ),
        (
            BIRTHS,
            VariableDef::derived(FLOWS, POPULATION)
                .with_modifier(Modifier::multiply(BASE_BIRTH_RATE)),
        ),
        (
            DEATHS,
            VariableDef::derived(FLOWS, POPULATION)
                .with_modifier(Modifier::multiply(BASE_DEATH_RATE)),
        ),
        (
            TREASURY_CHANGE,
            VariableDef::derived(FLOWS, TAX_REVENUE)
                .with_modifier(Modifier::subtract(BASE_SPENDING)),
        ),
        (
            STABILITY_CHANGE,
            VariableDef::derived(FLOWS, STABILITY_TARGET)
                .with_modifier(Modifier::subtract(STABILITY))
                .with_modifier(Modifier::add(STABILITY_PRESSURE))
                .with_modifier(Modifier::multiply(0.2)),
        ),
        (
            POPULATION,
            VariableDef::stock(STOCKS, 10_000_000.0)
                .with_modifier(Modifier::add(BIRTHS))
                .with_modifier(Modifier::subtract(DEATHS)),
        ),
        (
            TREASURY,
            VariableDef::stock(STOCKS, 200e9).with_modifier(Modifier::add(TREASURY_CHANGE)),
        ),
        (
            STABILITY,
            VariableDef::stock(STOCKS, 75.0).with_modifier(Modifier::add(STABILITY_CHANGE)),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_engine::Engine;
    use std::path::PathBuf;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn bundled_yaml_matches_builtin_model() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/models/simlandia.yaml");
        let text = std::fs::read_to_string(path).unwrap();
        let from_yaml = Model::from_yaml_str(&text).unwrap();
        assert_eq!(from_yaml, simlandia_model().unwrap());
    }

    #[test]
    fn model_has_no_dangling_references() {
        let engine = Engine::new(simlandia_model().unwrap());
        assert!(engine.unresolved_references().is_empty());
        assert_eq!(engine.len(), 20);
    }

    #[test]
    fn first_year_follows_the_stage_pipeline() {
        let mut engine = Engine::new(simlandia_model().unwrap());
        engine.advance().unwrap();
        let v = |n: &str| engine.get_value(n).unwrap();
        // Stage 1 reads last year's population.
        assert!(approx(v(GDP), 4e11));
        // Same-stage reference: last year's (zero) GDP.
        assert_eq!(v(TAX_REVENUE), 0.0);
        assert!(approx(v(UNEMPLOYMENT_RATE), 0.02));
        assert!(approx(v(BIRTHS), 200_000.0));
        assert!(approx(v(TREASURY_CHANGE), -50e9));
        assert!(approx(v(STABILITY_CHANGE), 1.0));
        assert!(approx(v(POPULATION), 10_100_000.0));
        assert!(approx(v(TREASURY), 150e9));
        assert!(approx(v(STABILITY), 76.0));

        engine.advance().unwrap();
        let v = |n: &str| engine.get_value(n).unwrap();
        assert!(approx(v(TAX_REVENUE), 1e11));
        assert!(approx(v(TREASURY), 200e9));
    }
}
