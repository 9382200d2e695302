use std::path::PathBuf;

use clap::Parser;
use engine::EngineConfig;
use engine::api::{SimConfig, simulate_battle, simulate_battle_many};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simulate-duels")]
#[command(about = "Monte Carlo sim: many automatic duels, reported by turn order")]
struct Args {
    /// Number of duels
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Optional engine config (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override starting HP
    #[arg(long)]
    hp: Option<i32>,

    /// Override attack dice (XdY)
    #[arg(long)]
    attack: Option<String>,

    /// Override defense dice (XdY)
    #[arg(long)]
    defense: Option<String>,

    /// Print the full log of the first duel
    #[arg(long, default_value_t = false)]
    show_log: bool,

    /// Emit the stats as JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut engine = match args.config.as_deref() {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(hp) = args.hp {
        engine.starting_hp = hp;
    }
    if let Some(spec) = args.attack.as_deref() {
        engine.attack_dice = spec.parse()?;
    }
    if let Some(spec) = args.defense.as_deref() {
        engine.defense_dice = spec.parse()?;
    }
    engine.validate()?;

    let cfg = SimConfig {
        seed: args.seed,
        engine,
        ..SimConfig::default()
    };

    if args.show_log {
        for line in simulate_battle(cfg.clone())?.log {
            println!("{}", line);
        }
        println!();
    }

    let rules = cfg.engine.rules();
    let stats = simulate_battle_many(cfg, args.trials)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let pct = |n: u32| {
        if stats.samples == 0 {
            0.0
        } else {
            f64::from(n) * 100.0 / f64::from(stats.samples)
        }
    };
    println!("simulate-duels results");
    println!("----------------------");
    println!("trials:               {}", stats.samples);
    println!(
        "rules:                HP {}, attack {}, defense {}",
        rules.starting_hp, rules.attack_dice, rules.defense_dice
    );
    println!();
    println!("first mover wins:     {:.1}%", pct(stats.first_mover_wins));
    println!("second mover wins:    {:.1}%", pct(stats.second_mover_wins));
    println!("draws:                {:.1}%", pct(stats.draws));
    println!("counters granted:     {:.1}%", pct(stats.final_counters));
    println!("counter comebacks:    {:.1}%", pct(stats.counter_comebacks));
    println!("forced ends:          {}", stats.forced_ends);
    println!("mean rounds:          {:.2}", stats.mean_rounds);

    Ok(())
}
