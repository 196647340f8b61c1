//! Random yearly events.
//!
//! The deck only decides *which* event happens; `Game` applies its effects to
//! the engine. Draws are seeded for reproducible runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Something that happens to Simlandia in a given year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// GDP per capita jumps.
    Boom,
    /// Repairs drain the treasury and unsettle the people.
    Disaster,
    /// Public confidence drops.
    Scandal,
    /// Temporary pressure on stability for a few years.
    Strike,
}

impl Event {
    pub const ALL: [Event; 4] = [Event::Boom, Event::Disaster, Event::Scandal, Event::Strike];

    pub fn headline(self) -> &'static str {
        match self {
            Event::Boom => "A global economic boom boosts our GDP per capita!",
            Event::Disaster => {
                "A natural disaster has struck! The treasury will pay for repairs."
            }
            Event::Scandal => "A political scandal erupts, shaking public confidence!",
            Event::Strike => "A general strike paralyses the country!",
        }
    }
}

/// Seeded source of yearly events.
#[derive(Clone, Debug)]
pub struct EventDeck {
    rng: ChaCha8Rng,
    chance: f64,
}

impl EventDeck {
    /// `chance` is the per-year probability that any event fires.
    pub fn new(seed: u64, chance: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            chance,
        }
    }

    /// Roll for this year's event, picked uniformly when one fires.
    pub fn draw(&mut self) -> Option<Event> {
        if self.rng.gen::<f64>() >= self.chance {
            return None;
        }
        let i = self.rng.gen_range(0..Event::ALL.len());
        Some(Event::ALL[i])
    }
}
