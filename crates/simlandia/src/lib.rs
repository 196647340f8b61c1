#![deny(warnings)]

//! The Republic of Simlandia: model content, policies, random events and the
//! yearly game state driving the `sd-engine` evaluator.

pub mod config;
pub mod dashboard;
pub mod events;
pub mod game;
pub mod model;
pub mod policy;

use sd_engine::{EngineError, ModelError};
use thiserror::Error;

pub use config::GameConfig;
pub use dashboard::Dashboard;
pub use events::{Event, EventDeck};
pub use game::{Game, TurnOutcome};
pub use model::simlandia_model;
pub use policy::Policy;

/// Errors produced by the game layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid policy choice: {0}")]
    InvalidChoice(String),
}
