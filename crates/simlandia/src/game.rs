//! One presidency: the engine plus the year counter, events and strikes.

use crate::config::GameConfig;
use crate::dashboard::Dashboard;
use crate::events::{Event, EventDeck};
use crate::model::simlandia_model;
use crate::model::vars::{
    GDP_PER_CAPITA, POPULATION, STABILITY, STABILITY_CHANGE, TAX_RATE, TREASURY,
};
use crate::policy::Policy;
use crate::SimError;
use sd_engine::{
    Diagnostic, Engine, EngineError, Model, Modifier, ReferencePolicy, TickReport, VariableDef,
};
use tracing::{debug, info};

const BOOM_GDP_PER_CAPITA: f64 = 5_000.0;
const DISASTER_COST: f64 = 20e9;
const DISASTER_STABILITY: f64 = 5.0;
const SCANDAL_STABILITY: f64 = 10.0;

/// Temporary variable holding the strike's yearly stability pressure.
pub const STRIKE_PRESSURE: &str = "strike_pressure";
/// Id of the modifier wiring the strike into `stability_change`.
pub const STRIKE_MODIFIER: &str = "strike";
const STRIKE_PRESSURE_PER_YEAR: f64 = -3.0;

/// What happened during one `play_turn`.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    /// Year that was simulated.
    pub year: i32,
    pub policy: Policy,
    /// Tax rate in force for the year.
    pub tax_rate: f64,
    pub event: Option<Event>,
    /// A strike ran out before this year was simulated.
    pub strike_ended: bool,
    pub report: TickReport,
}

/// Game state driving the engine one year per turn.
#[derive(Debug)]
pub struct Game {
    engine: Engine,
    deck: EventDeck,
    config: GameConfig,
    year: i32,
    /// First year in which an active strike no longer applies.
    strike_until: Option<i32>,
}

impl Game {
    /// Start a game on the built-in Simlandia model.
    pub fn new(config: GameConfig) -> Result<Self, SimError> {
        Self::with_model(simlandia_model()?, config)
    }

    /// Start a game on a custom model. The model must define every variable
    /// the dashboard, policies and events touch.
    pub fn with_model(model: Model, config: GameConfig) -> Result<Self, SimError> {
        config.validate()?;
        let engine = Engine::with_config(model, config.engine.clone());
        for name in [
            TAX_RATE,
            GDP_PER_CAPITA,
            POPULATION,
            TREASURY,
            STABILITY,
            STABILITY_CHANGE,
        ] {
            if !engine.contains(name) {
                return Err(EngineError::NotFound(name.to_string()).into());
            }
        }
        Dashboard::from_engine(&engine, config.start_year)?;
        if engine.config().reference_policy == ReferencePolicy::Strict {
            if let Some(Diagnostic::UnresolvedReference {
                variable,
                reference,
            }) = engine.unresolved_references().into_iter().next()
            {
                return Err(EngineError::UnresolvedReference {
                    variable,
                    reference,
                }
                .into());
            }
        }
        info!(
            variables = engine.len(),
            seed = config.rng_seed,
            "new presidency"
        );
        Ok(Self {
            deck: EventDeck::new(config.rng_seed, config.event_chance),
            year: config.start_year,
            engine,
            config,
            strike_until: None,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn strike_active(&self) -> bool {
        self.strike_until.is_some()
    }

    pub fn dashboard(&self) -> Result<Dashboard, SimError> {
        Dashboard::from_engine(&self.engine, self.year)
    }

    /// The government falls once stability reaches zero.
    pub fn is_over(&self) -> bool {
        self.engine
            .get_value(STABILITY)
            .map_or(false, |s| s <= 0.0)
    }

    /// Apply `policy`, roll this year's event and simulate the year.
    pub fn play_turn(&mut self, policy: Policy) -> Result<TurnOutcome, SimError> {
        let tax_rate = policy.apply(&mut self.engine, self.config.tax_step)?;
        let strike_ended = self.expire_strike();
        let event = self.deck.draw();
        if let Some(event) = event {
            info!(year = self.year, ?event, "event");
            self.apply_event(event)?;
        }
        let report = self.engine.advance()?;
        for diagnostic in &report.diagnostics {
            debug!(year = self.year, %diagnostic, "engine diagnostic");
        }
        let year = self.year;
        self.year += 1;
        Ok(TurnOutcome {
            year,
            policy,
            tax_rate,
            event,
            strike_ended,
            report,
        })
    }

    /// Apply an event's effects to the engine.
    pub fn apply_event(&mut self, event: Event) -> Result<(), SimError> {
        match event {
            Event::Boom => self
                .engine
                .add_to_value(GDP_PER_CAPITA, BOOM_GDP_PER_CAPITA)?,
            Event::Disaster => {
                self.engine.add_to_value(TREASURY, -DISASTER_COST)?;
                self.engine.add_to_value(STABILITY, -DISASTER_STABILITY)?;
            }
            Event::Scandal => self.engine.add_to_value(STABILITY, -SCANDAL_STABILITY)?,
            Event::Strike => self.start_strike()?,
        }
        Ok(())
    }

    /// A strike adds a pressure variable feeding `stability_change`; a new
    /// strike during an active one only extends it.
    fn start_strike(&mut self) -> Result<(), SimError> {
        if self.strike_until.is_none() {
            self.engine
                .add_variable(STRIKE_PRESSURE, VariableDef::parameter(STRIKE_PRESSURE_PER_YEAR))?;
            self.engine.add_modifier(
                STABILITY_CHANGE,
                Modifier::add(STRIKE_PRESSURE).with_id(STRIKE_MODIFIER),
            )?;
        }
        let years = i32::try_from(self.config.strike_years).unwrap_or(i32::MAX);
        self.strike_until = Some(self.year.saturating_add(years));
        Ok(())
    }

    fn expire_strike(&mut self) -> bool {
        match self.strike_until {
            Some(until) if self.year >= until => {
                self.engine.remove_modifier(STABILITY_CHANGE, STRIKE_MODIFIER);
                self.engine.remove_variable(STRIKE_PRESSURE);
                self.strike_until = None;
                info!(year = self.year, "strike ended");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_engine::EngineConfig;

    fn quiet() -> GameConfig {
        GameConfig {
            event_chance: 0.0,
            ..GameConfig::default()
        }
    }

    fn stability(game: &Game) -> f64 {
        game.engine().get_value(STABILITY).unwrap()
    }

    #[test]
    fn quiet_year_advances_the_model() {
        let mut game = Game::new(quiet()).unwrap();
        let out = game.play_turn(Policy::KeepTaxes).unwrap();
        assert_eq!(out.year, 2024);
        assert_eq!(out.event, None);
        assert_eq!(out.report.tick, 1);
        assert_eq!(game.year(), 2025);
        let d = game.dashboard().unwrap();
        assert!((d.population - 10_100_000.0).abs() < 1e-6);
        assert!((d.treasury - 150e9).abs() < 1e-3);
        assert!((d.stability - 76.0).abs() < 1e-9);
        assert!(!game.is_over());
    }

    #[test]
    fn same_seed_same_history() {
        let cfg = GameConfig {
            event_chance: 0.5,
            rng_seed: 11,
            ..GameConfig::default()
        };
        let mut a = Game::new(cfg.clone()).unwrap();
        let mut b = Game::new(cfg).unwrap();
        let plan = [Policy::RaiseTaxes, Policy::KeepTaxes, Policy::LowerTaxes];
        for policy in plan.iter().cycle().take(12) {
            let oa = a.play_turn(*policy).unwrap();
            let ob = b.play_turn(*policy).unwrap();
            assert_eq!(oa, ob);
        }
        assert_eq!(a.dashboard().unwrap(), b.dashboard().unwrap());
    }

    #[test]
    fn policy_changes_the_tax_rate_before_the_year() {
        let mut game = Game::new(quiet()).unwrap();
        let out = game.play_turn(Policy::RaiseTaxes).unwrap();
        assert!((out.tax_rate - 0.27).abs() < 1e-12);
        assert!((game.dashboard().unwrap().tax_rate - 0.27).abs() < 1e-12);
    }

    #[test]
    fn instant_events_adjust_values() {
        let mut game = Game::new(quiet()).unwrap();
        game.apply_event(Event::Boom).unwrap();
        assert_eq!(game.engine().get_value(GDP_PER_CAPITA), Some(45_000.0));
        game.apply_event(Event::Disaster).unwrap();
        assert_eq!(game.engine().get_value(TREASURY), Some(180e9));
        assert_eq!(stability(&game), 70.0);
        game.apply_event(Event::Scandal).unwrap();
        assert_eq!(stability(&game), 60.0);
    }

    #[test]
    fn strike_presses_on_stability_until_it_expires() {
        let mut calm = Game::new(quiet()).unwrap();
        let mut game = Game::new(quiet()).unwrap();
        game.apply_event(Event::Strike).unwrap();
        assert!(game.strike_active());
        assert_eq!(game.engine().get_value(STRIKE_PRESSURE), Some(-3.0));

        calm.play_turn(Policy::KeepTaxes).unwrap();
        game.play_turn(Policy::KeepTaxes).unwrap();
        assert!((stability(&calm) - stability(&game) - 3.0).abs() < 1e-9);

        let out = game.play_turn(Policy::KeepTaxes).unwrap();
        assert!(!out.strike_ended);
        assert!(game.engine().contains(STRIKE_PRESSURE));

        let out = game.play_turn(Policy::KeepTaxes).unwrap();
        assert!(out.strike_ended);
        assert!(!game.strike_active());
        assert!(!game.engine().contains(STRIKE_PRESSURE));
        assert_eq!(
            game.engine()
                .definition(STABILITY_CHANGE)
                .unwrap()
                .modifiers
                .len(),
            3
        );
    }

    #[test]
    fn overlapping_strikes_extend_instead_of_stacking() {
        let mut game = Game::new(quiet()).unwrap();
        game.apply_event(Event::Strike).unwrap();
        game.play_turn(Policy::KeepTaxes).unwrap();
        game.apply_event(Event::Strike).unwrap();
        let strike_mods = game
            .engine()
            .definition(STABILITY_CHANGE)
            .unwrap()
            .modifiers
            .iter()
            .filter(|m| m.id.as_deref() == Some(STRIKE_MODIFIER))
            .count();
        assert_eq!(strike_mods, 1);
    }

    #[test]
    fn collapse_ends_the_game() {
        let mut game = Game::new(quiet()).unwrap();
        game.engine_mut().set_value(STABILITY, 0.0).unwrap();
        assert!(game.is_over());
    }

    #[test]
    fn long_strikes_outlast_the_next_turn() {
        let mut game = Game::new(GameConfig {
            strike_years: crate::config::MAX_STRIKE_YEARS,
            ..quiet()
        })
        .unwrap();
        game.apply_event(Event::Strike).unwrap();
        let out = game.play_turn(Policy::KeepTaxes).unwrap();
        assert!(!out.strike_ended);
        assert!(game.strike_active());
        assert!(matches!(
            Game::new(GameConfig {
                strike_years: u32::MAX,
                ..quiet()
            }),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn dangling_references_are_rejected_up_front() {
        let mut model = simlandia_model().unwrap();
        model
            .insert("bonus", VariableDef::derived(1, "gdp_per_captia"))
            .unwrap();
        assert_eq!(
            Game::with_model(model.clone(), quiet()).unwrap_err(),
            SimError::Engine(EngineError::UnresolvedReference {
                variable: "bonus".into(),
                reference: "gdp_per_captia".into(),
            })
        );

        let lenient = GameConfig {
            engine: EngineConfig::lenient(),
            ..quiet()
        };
        let mut game = Game::with_model(model, lenient).unwrap();
        let out = game.play_turn(Policy::KeepTaxes).unwrap();
        assert_eq!(out.report.diagnostics.len(), 1);
    }

    #[test]
    fn incomplete_models_are_rejected() {
        let model = Model::from_pairs([(TAX_RATE, VariableDef::parameter(0.1))]).unwrap();
        assert!(matches!(
            Game::with_model(model, quiet()),
            Err(SimError::Engine(EngineError::NotFound(_)))
        ));
    }
}
