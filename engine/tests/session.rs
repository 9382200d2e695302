use engine::{
    Action, BattleRules, BattleSession, ChannelId, CombatError, Dice, Phase, PhaseKind,
    RoundOutcome, Verdict, net_damage,
};
use proptest::prelude::*;

/// P1 moves first, hits for 24 against a defense of 2.
const OPENING: [u32; 7] = [1, 6, 6, 6, 6, 1, 1];

/// Five rounds that leave P2 at -16 (P2's own attacks are fully blocked),
/// then P2's counter round for 22 damage.
const COUNTER_GAME: [u32; 37] = [
    1, // P1 opens
    6, 6, 6, 6, 1, 1, // P1 → P2 28
    1, 1, 1, 1, 6, 6, // P2 → blocked
    6, 6, 6, 6, 1, 1, // P1 → P2 6
    1, 1, 1, 1, 6, 6, // P2 → blocked
    6, 6, 6, 6, 1, 1, // P1 → P2 -16, counter granted
    6, 6, 6, 6, 1, 1, // P2 → P1 28
];

fn session(script: &[u32], starting_hp: i32) -> BattleSession {
    let rules = BattleRules {
        starting_hp,
        ..BattleRules::default()
    };
    BattleSession::start(
        ChannelId::from("arena"),
        "P1",
        "P2",
        Dice::from_scripted(script.to_vec()),
        rules,
    )
    .expect("valid players")
}

fn round(s: &mut BattleSession) -> RoundOutcome {
    s.resolve_attack().expect("attack phase");
    s.resolve_defense().expect("defense phase").round
}

#[test]
fn start_sets_full_hp_and_attack_phase() {
    let s = session(&OPENING, 50);
    assert_eq!(s.hp_of("P1"), Some(50));
    assert_eq!(s.hp_of("P2"), Some(50));
    assert_eq!(s.phase(), Phase::Attack);
    assert_eq!(s.attacker(), "P1");
    assert_eq!(s.defender(), "P2");
    assert_eq!(s.first_mover(), "P1");
    assert_eq!(s.second_mover(), "P2");
    assert!(!s.final_counter_granted());
}

#[test]
fn view_reports_the_same_next_turn_as_the_session() {
    let mut s = session(&OPENING, 50);
    assert_eq!(s.view().next_turn(), ("P1", Action::Attack));
    assert_eq!(s.view().next_turn(), s.next_turn());

    s.resolve_attack().unwrap();
    assert_eq!(s.view().next_turn(), ("P2", Action::Defend));
    assert_eq!(s.view().next_turn(), s.next_turn());

    s.resolve_defense().unwrap();
    assert_eq!(s.view().next_turn(), ("P2", Action::Attack));
}

#[test]
fn d2_of_two_lets_player_b_open() {
    let s = session(&[2], 50);
    assert_eq!(s.first_mover(), "P2");
    assert_eq!(s.attacker(), "P2");
    assert_eq!(s.second_mover(), "P1");
}

#[test]
fn invalid_players_are_rejected() {
    for (a, b) in [("", "P2"), ("  ", "P2"), ("P1", ""), ("P1", "P1"), (" P1 ", "P1")] {
        let res = BattleSession::start(
            ChannelId::from("arena"),
            a,
            b,
            Dice::from_seed(1),
            BattleRules::default(),
        );
        assert!(
            matches!(res, Err(CombatError::InvalidPlayers(_))),
            "{a:?} vs {b:?} should be rejected"
        );
    }
}

#[test]
fn attack_sets_pending_damage_without_touching_hp() {
    let mut s = session(&OPENING, 50);
    let report = s.resolve_attack().unwrap();
    assert_eq!(report.attacker, "P1");
    assert_eq!(report.roll.rolls, vec![6, 6, 6, 6]);
    assert_eq!(report.roll.total, 24);
    assert_eq!(s.phase(), Phase::Defense { pending_damage: 24 });
    assert_eq!(s.hp_of("P2"), Some(50));
}

#[test]
fn opening_round_deals_net_damage_and_swaps_turn() {
    let mut s = session(&OPENING, 50);
    s.resolve_attack().unwrap();
    let report = s.resolve_defense().unwrap();
    assert_eq!(report.roll.total, 2);
    assert_eq!(report.net_damage, 22);
    assert_eq!(report.hp_after, 28);
    assert_eq!(report.round, RoundOutcome::Continue);
    assert_eq!(s.hp_of("P2"), Some(28));
    assert_eq!(s.attacker(), "P2");
    assert_eq!(s.defender(), "P1");
    assert_eq!(s.phase(), Phase::Attack);
    assert_eq!(s.rounds(), 1);
}

#[test]
fn wrong_phase_actions_are_rejected_without_mutation() {
    let mut s = session(&OPENING, 50);
    let before = s.view();
    assert_eq!(
        s.resolve_defense(),
        Err(CombatError::IllegalAction {
            action: Action::Defend,
            phase: PhaseKind::Attack
        })
    );
    assert_eq!(s.view(), before);

    // The rejected defense consumed no dice.
    assert_eq!(s.resolve_attack().unwrap().roll.total, 24);
    let during_defense = s.view();
    assert_eq!(
        s.resolve_attack(),
        Err(CombatError::IllegalAction {
            action: Action::Attack,
            phase: PhaseKind::Defense
        })
    );
    assert_eq!(s.view(), during_defense);
    assert_eq!(s.resolve_defense().unwrap().net_damage, 22);
}

#[test]
fn fully_blocked_attack_deals_nothing() {
    let mut s = session(&[1, 1, 1, 1, 1, 6, 6], 50);
    s.resolve_attack().unwrap();
    let report = s.resolve_defense().unwrap();
    assert_eq!(report.net_damage, 0);
    assert_eq!(s.hp_of("P2"), Some(50));
    assert_eq!(s.attacker(), "P2");
}

#[test]
fn second_mover_gets_one_counter_round_then_hp_decides() {
    let mut s = session(&COUNTER_GAME, 50);
    for _ in 0..4 {
        assert_eq!(round(&mut s), RoundOutcome::Continue);
    }
    assert_eq!(s.hp_of("P2"), Some(6));

    assert_eq!(round(&mut s), RoundOutcome::FinalCounter);
    assert!(s.final_counter_granted());
    assert_eq!(s.hp_of("P2"), Some(-16));
    assert_eq!(s.attacker(), "P2");
    assert_eq!(s.defender(), "P1");
    assert_eq!(s.phase(), Phase::Attack);

    // P1 survives the counter at 28, but the battle still ends on the table.
    assert_eq!(
        round(&mut s),
        RoundOutcome::Finished(Verdict::Winner("P1".into()))
    );
    assert_eq!(s.hp_of("P1"), Some(28));
}

#[test]
fn counter_that_levels_hp_is_a_draw() {
    let mut s = session(&[1, 6, 6, 6, 6, 1, 1, 6, 6, 6, 6, 1, 1], 20);
    assert_eq!(round(&mut s), RoundOutcome::FinalCounter);
    assert_eq!(round(&mut s), RoundOutcome::Finished(Verdict::Draw));
    assert_eq!(s.hp_of("P1"), Some(-2));
    assert_eq!(s.hp_of("P2"), Some(-2));
}

#[test]
fn counter_comeback_wins_when_closer_to_zero() {
    let mut s = session(&[1, 6, 6, 6, 6, 3, 1, 6, 6, 6, 6, 1, 1], 20);
    assert_eq!(round(&mut s), RoundOutcome::FinalCounter);
    assert_eq!(s.hp_of("P2"), Some(0));
    assert_eq!(
        round(&mut s),
        RoundOutcome::Finished(Verdict::Winner("P2".into()))
    );
    assert_eq!(s.hp_of("P1"), Some(-2));
}

#[test]
fn lethal_hit_on_first_mover_ends_immediately() {
    let mut s = session(&[2, 6, 6, 6, 6, 1, 1], 20);
    assert_eq!(s.first_mover(), "P2");
    assert_eq!(
        round(&mut s),
        RoundOutcome::Finished(Verdict::Winner("P2".into()))
    );
    assert_eq!(s.hp_of("P1"), Some(-2));
    assert!(!s.final_counter_granted());
}

#[test]
fn force_end_uses_the_tie_break_table() {
    let mut fresh = session(&OPENING, 50);
    assert_eq!(fresh.force_end(), Verdict::Draw);

    let mut s = session(&OPENING, 50);
    assert_eq!(round(&mut s), RoundOutcome::Continue);
    s.resolve_attack().unwrap();
    assert_eq!(s.force_end(), Verdict::Winner("P1".into()));
}

#[test]
fn first_mover_is_roughly_uniform() {
    let a_first = (0..2000u64)
        .filter(|seed| {
            BattleSession::start(
                ChannelId::from(*seed),
                "A",
                "B",
                Dice::from_seed(*seed),
                BattleRules::default(),
            )
            .unwrap()
            .first_mover()
                == "A"
        })
        .count();
    assert!((900..=1100).contains(&a_first), "A moved first {a_first} times");
}

proptest! {
    #[test]
    fn net_damage_is_bounded(pending in 0u32..1000, defense in 0u32..1000) {
        let net = net_damage(pending, defense);
        prop_assert!(net <= pending);
        prop_assert_eq!(net, pending.saturating_sub(defense));
    }

    #[test]
    fn non_lethal_defense_swaps_roles(seed in any::<u64>()) {
        let mut s = BattleSession::start(
            ChannelId::from("prop"),
            "A",
            "B",
            Dice::from_seed(seed),
            BattleRules::default(),
        ).unwrap();
        let attacker = s.attacker().to_string();
        let defender = s.defender().to_string();
        s.resolve_attack().unwrap();
        let report = s.resolve_defense().unwrap();
        // 4d6 never exceeds 24, so the opening round cannot be lethal at 50 HP.
        prop_assert_eq!(report.round, RoundOutcome::Continue);
        prop_assert_eq!(s.attacker(), defender.as_str());
        prop_assert_eq!(s.defender(), attacker.as_str());
        prop_assert_eq!(s.phase(), Phase::Attack);
    }

    #[test]
    fn counter_is_granted_at_most_once_and_only_to_second_mover(seed in any::<u64>()) {
        let mut s = BattleSession::start(
            ChannelId::from("prop"),
            "A",
            "B",
            Dice::from_seed(seed),
            BattleRules { starting_hp: 30, ..BattleRules::default() },
        ).unwrap();
        let second = s.second_mover().to_string();
        let mut grants = 0;
        for _ in 0..200 {
            s.resolve_attack().unwrap();
            let report = s.resolve_defense().unwrap();
            match report.round {
                RoundOutcome::Continue => {}
                RoundOutcome::FinalCounter => {
                    grants += 1;
                    prop_assert_eq!(&report.defender, &second);
                    prop_assert!(report.hp_after <= 0);
                }
                RoundOutcome::Finished(_) => break,
            }
        }
        prop_assert!(grants <= 1);
    }
}
