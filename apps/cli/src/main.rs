#![deny(warnings)]

//! Text front-end for the Republic of Simlandia.
//!
//! Interactive by default; `--years N` plays N years headless with a fixed
//! `--policy`.

use anyhow::{bail, Context, Result};
use sd_engine::{Model, ReferencePolicy};
use simlandia::{Game, GameConfig, Policy, TurnOutcome};
use std::io::{self, BufRead, Write};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    years: Option<u32>,
    policy: Option<Policy>,
    seed: Option<u64>,
    config: Option<String>,
    model: Option<String>,
    lenient: bool,
    dump: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--years" => {
                let v = it.next().context("--years needs a value")?;
                args.years = Some(v.parse().with_context(|| format!("bad --years: {v}"))?);
            }
            "--policy" => {
                let v = it.next().context("--policy needs a value")?;
                args.policy = Some(v.parse()?);
            }
            "--seed" => {
                let v = it.next().context("--seed needs a value")?;
                args.seed = Some(v.parse().with_context(|| format!("bad --seed: {v}"))?);
            }
            "--config" => args.config = it.next(),
            "--model" => args.model = it.next(),
            "--lenient" => args.lenient = true,
            "--dump" => args.dump = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            GameConfig::from_yaml_str(&text)?
        }
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    if args.lenient {
        config.engine.reference_policy = ReferencePolicy::Lenient;
    }
    Ok(config)
}

fn load_model(args: &Args) -> Result<Model> {
    Ok(match &args.model {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading model {path}"))?;
            Model::from_yaml_str(&text)?
        }
        None => simlandia::simlandia_model()?,
    })
}

fn print_header() {
    println!("{}", "=".repeat(40));
    println!("      THE REPUBLIC OF SIMLANDIA");
    println!("{}", "=".repeat(40));
    println!("You have been elected President. Your goal is to lead Simlandia to prosperity.");
    println!("But beware: if national stability falls to zero, you will be overthrown!");
}

/// Ask for this year's policy. `None` on end of input or `q`.
fn prompt_policy(game: &Game, input: &mut impl BufRead) -> Result<Option<Policy>> {
    let step = game.config().tax_step;
    println!("\n[POLICY DECISION]");
    for (i, policy) in Policy::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, policy.label(step));
    }
    loop {
        print!("Your decision, Mr/Madam President? (1/2/3, q to resign): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<Policy>() {
            Ok(policy) => return Ok(Some(policy)),
            Err(_) => println!("Invalid choice. Please enter 1, 2, or 3."),
        }
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("{}", outcome.policy.outcome());
    if outcome.strike_ended {
        println!("\n>>> The strike is over. Workers return to their posts.");
    }
    if let Some(event) = outcome.event {
        println!("\n>>> EVENT: {}", event.headline());
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    info!(?args, "starting simlandia");

    let config = load_config(&args)?;
    let model = load_model(&args)?;
    let mut game = Game::with_model(model, config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut played = 0u32;

    print_header();
    loop {
        println!("\n{}", game.dashboard()?);
        if game.is_over() {
            println!("\n\nYour government has collapsed due to instability. The people have overthrown you.");
            println!("--- GAME OVER ---");
            break;
        }

        let policy = match args.years {
            Some(years) if played >= years => break,
            Some(_) => args.policy.unwrap_or(Policy::KeepTaxes),
            None => match prompt_policy(&game, &mut input)? {
                Some(policy) => policy,
                None => {
                    println!("You resign from office.");
                    break;
                }
            },
        };

        let outcome = game.play_turn(policy)?;
        played += 1;
        print_outcome(&outcome);
        if args.dump {
            println!("\n{}\n", game.engine().dump());
        }
    }

    info!(years = played, final_year = game.year(), "game finished");
    Ok(())
}
