use engine::api::{MAX_ROUNDS, SimConfig, simulate_battle, simulate_battle_many};
use engine::{DiceMode, EngineConfig, Verdict};

fn counter_game() -> Vec<u32> {
    let mut script = vec![1];
    for _ in 0..2 {
        script.extend([6, 6, 6, 6, 1, 1]);
        script.extend([1, 1, 1, 1, 6, 6]);
    }
    script.extend([6, 6, 6, 6, 1, 1]);
    script.extend([6, 6, 6, 6, 1, 1]);
    script
}

#[test]
fn scripted_battle_plays_through_the_counter() {
    let cfg = SimConfig {
        player_a: "P1".into(),
        player_b: "P2".into(),
        seed: 0,
        engine: EngineConfig {
            dice: DiceMode::Scripted(counter_game()),
            ..EngineConfig::default()
        },
    };
    let res = simulate_battle(cfg).unwrap();
    assert_eq!(res.verdict, Verdict::Winner("P1".into()));
    assert_eq!(res.first_mover, "P1");
    assert_eq!(res.rounds, 6);
    assert_eq!((res.hp_a_end, res.hp_b_end), (28, -16));
    assert!(res.final_counter);
    assert!(!res.forced);
    assert!(res.log.iter().any(|l| l.starts_with("[COUNTER][P2]")));
}

#[test]
fn seeded_battle_is_reproducible() {
    let cfg = SimConfig {
        seed: 2025,
        ..SimConfig::default()
    };
    let a = simulate_battle(cfg.clone()).unwrap();
    let b = simulate_battle(cfg).unwrap();
    assert_eq!(a.log, b.log);
    assert!(a.rounds > 0 && a.rounds <= MAX_ROUNDS);
    assert!(a.log.last().unwrap().starts_with("[END]"));
}

#[test]
fn many_battles_summary_makes_sense() {
    let cfg = SimConfig {
        seed: 1,
        ..SimConfig::default()
    };
    let stats = simulate_battle_many(cfg, 200).unwrap();
    assert_eq!(stats.samples, 200);
    assert_eq!(stats.first_mover_wins + stats.second_mover_wins + stats.draws, 200);
    assert!(stats.counter_comebacks <= stats.final_counters);
    assert!(stats.counter_comebacks <= stats.second_mover_wins);
    assert!(stats.mean_rounds > 1.0);
}

#[test]
fn many_battles_refuse_scripted_dice() {
    let cfg = SimConfig {
        engine: EngineConfig {
            dice: DiceMode::Scripted(vec![1]),
            ..EngineConfig::default()
        },
        ..SimConfig::default()
    };
    assert!(simulate_battle_many(cfg, 3).is_err());
}
