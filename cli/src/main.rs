mod dispatch;
mod help;

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use encoding_rs::Encoding;
use engine::{ChannelId, CombatEngine, EngineConfig, ledger::MemoryLedger};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::dispatch::Dispatcher;

#[derive(Parser)]
#[command(name = "duel-cli")]
#[command(about = "Line-oriented dispatcher for channel duels (reads commands from stdin)")]
struct Cli {
    /// Engine config (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// RNG seed; overrides the config's dice mode
    #[arg(long)]
    seed: Option<u64>,
    /// Ledger JSON file, loaded at start and rewritten after each change
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Channel used by lines without an @channel prefix
    #[arg(long, default_value = "main")]
    channel: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load_ledger(path: &Path) -> anyhow::Result<MemoryLedger> {
    if !path.exists() {
        info!(target: "duel.cli", path = %path.display(), "ledger file missing; starting empty");
        return Ok(MemoryLedger::new());
    }
    let text = read_text_auto(path)
        .with_context(|| format!("failed to read ledger: {}", path.display()))?;
    let ledger = MemoryLedger::from_json_str(&text)
        .with_context(|| format!("failed to parse ledger: {}", path.display()))?;
    Ok(ledger)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match cli.config.as_deref() {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    let ledger = match cli.ledger.as_deref() {
        Some(path) => load_ledger(path)?,
        None => MemoryLedger::new(),
    };

    let mut dispatcher = Dispatcher::new(
        CombatEngine::new(config),
        ledger,
        cli.ledger,
        ChannelId::from(cli.channel),
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        for out in dispatcher.dispatch(&line)? {
            writeln!(stdout, "{}", out)?;
        }
        stdout.flush()?;
    }
    Ok(())
}
