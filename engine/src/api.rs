use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::combat::{Action, CombatEngine, Event, Response};
use crate::config::EngineConfig;
use crate::dice::DiceMode;
use crate::store::ChannelId;
use crate::verdict::Verdict;

/// Safety cap on attack/defend rounds in an automatic battle.
pub const MAX_ROUNDS: u32 = 200;

const SIM_CHANNEL: &str = "simulation";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimConfig {
    #[serde(default = "default_player_a")]
    pub player_a: String,
    #[serde(default = "default_player_b")]
    pub player_b: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_player_a() -> String {
    "A".to_string()
}

fn default_player_b() -> String {
    "B".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            player_a: default_player_a(),
            player_b: default_player_b(),
            seed: 0,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleResult {
    pub verdict: Verdict,
    pub first_mover: String,
    pub rounds: u32,
    pub hp_a_end: i32,
    pub hp_b_end: i32,
    pub final_counter: bool,
    pub forced: bool,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleStats {
    pub samples: u32,
    pub first_mover_wins: u32,
    pub second_mover_wins: u32,
    pub draws: u32,
    pub final_counters: u32,
    pub counter_comebacks: u32,
    pub forced_ends: u32,
    pub mean_rounds: f64,
}

/// Play one battle to the end by alternating attack and defend.
pub fn simulate_battle(cfg: SimConfig) -> Result<BattleResult> {
    // Scripted dice are already deterministic; anything else is reseeded.
    let scripted = matches!(cfg.engine.dice, DiceMode::Scripted(_));
    let engine_cfg = if scripted {
        cfg.engine
    } else {
        cfg.engine.with_seed(cfg.seed)
    };
    let engine = CombatEngine::new(engine_cfg);
    let channel = ChannelId::from(SIM_CHANNEL);

    let start = engine.start_battle(&channel, &cfg.player_a, &cfg.player_b)?;
    let first_mover = match &start.event {
        Event::Started { first_mover } => first_mover.clone(),
        _ => bail!("battle did not start"),
    };
    let mut log = start.lines;
    let mut final_counter = false;
    let mut rounds = 0u32;

    let mut last: Option<Response> = None;
    for _ in 0..MAX_ROUNDS {
        let attack = engine.act(&channel, Action::Attack)?;
        log.extend(attack.lines);
        let defend = engine.act(&channel, Action::Defend)?;
        rounds += 1;
        final_counter |= defend.final_counter;
        log.extend(defend.lines.iter().cloned());
        if defend.channel_free {
            last = Some(defend);
            break;
        }
    }

    let forced = last.is_none();
    let end = match last {
        Some(response) => response,
        None => {
            let response = engine.act(&channel, Action::ForceEnd)?;
            log.extend(response.lines.iter().cloned());
            response
        }
    };

    let Some(verdict) = end.verdict else {
        bail!("battle ended without a verdict");
    };
    let (hp_a_end, hp_b_end) = match end.hp_bars.as_slice() {
        [a, b] => (a.hp, b.hp),
        _ => bail!("expected two combatants"),
    };

    Ok(BattleResult {
        verdict,
        first_mover,
        rounds,
        hp_a_end,
        hp_b_end,
        final_counter,
        forced,
        log,
    })
}

/// Run `samples` battles; sample `i` uses seed `cfg.seed + i`.
pub fn simulate_battle_many(cfg: SimConfig, samples: u32) -> Result<BattleStats> {
    if matches!(cfg.engine.dice, DiceMode::Scripted(_)) {
        bail!("scripted dice would replay the same battle for every sample");
    }
    let mut stats = BattleStats {
        samples,
        ..Default::default()
    };
    let mut total_rounds = 0u64;
    for i in 0..samples {
        let mut sample = cfg.clone();
        sample.seed = cfg.seed.wrapping_add(u64::from(i));
        let res = simulate_battle(sample)?;
        total_rounds += u64::from(res.rounds);
        if res.final_counter {
            stats.final_counters += 1;
        }
        if res.forced {
            stats.forced_ends += 1;
        }
        match res.verdict.winner() {
            None => stats.draws += 1,
            Some(name) if name == res.first_mover => stats.first_mover_wins += 1,
            Some(_) => {
                stats.second_mover_wins += 1;
                if res.final_counter {
                    stats.counter_comebacks += 1;
                }
            }
        }
    }
    if samples > 0 {
        stats.mean_rounds = total_rounds as f64 / f64::from(samples);
    }
    Ok(stats)
}
