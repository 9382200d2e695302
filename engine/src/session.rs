use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::combat::Action;
use crate::dice::{Dice, DiceRoll, DiceSpec};
use crate::error::{CombatError, Result};
use crate::store::ChannelId;
use crate::verdict::{Verdict, resolve};

/// Numbers that govern a single battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BattleRules {
    pub starting_hp: i32,
    pub attack_dice: DiceSpec,
    pub defense_dice: DiceSpec,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self {
            starting_hp: 50,
            attack_dice: DiceSpec::new(4, 6),
            defense_dice: DiceSpec::new(2, 6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    Attack,
    Defense { pending_damage: u32 },
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Attack => PhaseKind::Attack,
            Phase::Defense { .. } => PhaseKind::Defense,
        }
    }

    /// The player expected to act next and the action they owe.
    pub fn next_turn<'a>(&self, attacker: &'a str, defender: &'a str) -> (&'a str, Action) {
        match self {
            Phase::Attack => (attacker, Action::Attack),
            Phase::Defense { .. } => (defender, Action::Defend),
        }
    }
}

/// Phase without its payload, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Attack,
    Defense,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Attack => f.write_str("attack"),
            PhaseKind::Defense => f.write_str("defense"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackReport {
    pub attacker: String,
    pub defender: String,
    pub roll: DiceRoll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Continue,
    /// The second mover was knocked to non-positive HP and gets one more round.
    FinalCounter,
    Finished(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefenseReport {
    pub defender: String,
    pub attacker: String,
    pub roll: DiceRoll,
    pub pending_damage: u32,
    pub net_damage: u32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub round: RoundOutcome,
}

/// Read-only snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub channel: ChannelId,
    pub player_a: String,
    pub player_b: String,
    pub hp: IndexMap<String, i32>,
    pub phase: Phase,
    pub attacker: String,
    pub defender: String,
    pub first_mover: String,
    pub second_mover: String,
    pub final_counter_granted: bool,
    pub rounds: u32,
}

impl SessionView {
    pub fn next_turn(&self) -> (&str, Action) {
        self.phase.next_turn(&self.attacker, &self.defender)
    }
}

/// `max(0, pending - defense)`.
pub fn net_damage(pending_damage: u32, defense_total: u32) -> u32 {
    pending_damage.saturating_sub(defense_total)
}

/// One two-player battle bound to a channel.
#[derive(Debug, Clone)]
pub struct BattleSession {
    channel: ChannelId,
    player_a: String,
    player_b: String,
    hp: IndexMap<String, i32>,
    phase: Phase,
    attacker: Side,
    defender: Side,
    first_mover: Side,
    final_counter_granted: bool,
    rounds: u32,
    rules: BattleRules,
    dice: Dice,
}

impl BattleSession {
    /// Open a battle. The first mover is decided by a d2 (1 = `player_a`).
    pub fn start(
        channel: ChannelId,
        player_a: &str,
        player_b: &str,
        mut dice: Dice,
        rules: BattleRules,
    ) -> Result<Self> {
        let player_a = player_a.trim();
        let player_b = player_b.trim();
        if player_a.is_empty() || player_b.is_empty() {
            return Err(CombatError::InvalidPlayers(
                "player names must not be empty".to_string(),
            ));
        }
        if player_a == player_b {
            return Err(CombatError::InvalidPlayers(format!(
                "'{}' cannot fight themselves",
                player_a
            )));
        }

        let first_mover = if dice.roll(2, 1).total == 1 {
            Side::A
        } else {
            Side::B
        };

        let mut hp = IndexMap::with_capacity(2);
        hp.insert(player_a.to_string(), rules.starting_hp);
        hp.insert(player_b.to_string(), rules.starting_hp);

        let session = Self {
            channel,
            player_a: player_a.to_string(),
            player_b: player_b.to_string(),
            hp,
            phase: Phase::Attack,
            attacker: first_mover,
            defender: first_mover.other(),
            first_mover,
            final_counter_granted: false,
            rounds: 0,
            rules,
            dice,
        };
        info!(
            target: "duel.session",
            channel = %session.channel,
            player_a = %session.player_a,
            player_b = %session.player_b,
            first_mover = %session.first_mover(),
            "battle started"
        );
        Ok(session)
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn player_a(&self) -> &str {
        &self.player_a
    }

    pub fn player_b(&self) -> &str {
        &self.player_b
    }

    pub fn name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.player_a,
            Side::B => &self.player_b,
        }
    }

    pub fn hp(&self, side: Side) -> i32 {
        self.hp.get(self.name(side)).copied().unwrap_or_default()
    }

    pub fn hp_of(&self, name: &str) -> Option<i32> {
        self.hp.get(name).copied()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attacker(&self) -> &str {
        self.name(self.attacker)
    }

    pub fn defender(&self) -> &str {
        self.name(self.defender)
    }

    pub fn first_mover(&self) -> &str {
        self.name(self.first_mover)
    }

    pub fn second_mover(&self) -> &str {
        self.name(self.first_mover.other())
    }

    pub fn final_counter_granted(&self) -> bool {
        self.final_counter_granted
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn rules(&self) -> &BattleRules {
        &self.rules
    }

    /// Who acts next and with what.
    pub fn next_turn(&self) -> (&str, Action) {
        self.phase.next_turn(self.attacker(), self.defender())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            channel: self.channel.clone(),
            player_a: self.player_a.clone(),
            player_b: self.player_b.clone(),
            hp: self.hp.clone(),
            phase: self.phase,
            attacker: self.attacker().to_string(),
            defender: self.defender().to_string(),
            first_mover: self.first_mover().to_string(),
            second_mover: self.second_mover().to_string(),
            final_counter_granted: self.final_counter_granted,
            rounds: self.rounds,
        }
    }

    fn hp_mut(&mut self, side: Side) -> &mut i32 {
        let name = match side {
            Side::A => &self.player_a,
            Side::B => &self.player_b,
        };
        self.hp
            .entry(name.clone())
            .or_insert(self.rules.starting_hp)
    }

    fn swap_roles(&mut self) {
        std::mem::swap(&mut self.attacker, &mut self.defender);
        self.phase = Phase::Attack;
    }

    pub fn resolve_attack(&mut self) -> Result<AttackReport> {
        if self.phase != Phase::Attack {
            return Err(CombatError::IllegalAction {
                action: Action::Attack,
                phase: self.phase.kind(),
            });
        }
        let roll = self.dice.roll_spec(self.rules.attack_dice);
        debug!(
            target: "duel.session",
            channel = %self.channel,
            attacker = %self.attacker(),
            rolls = ?roll.rolls,
            total = roll.total,
            "attack rolled"
        );
        self.phase = Phase::Defense {
            pending_damage: roll.total,
        };
        Ok(AttackReport {
            attacker: self.attacker().to_string(),
            defender: self.defender().to_string(),
            roll,
        })
    }

    pub fn resolve_defense(&mut self) -> Result<DefenseReport> {
        let pending_damage = match self.phase {
            Phase::Defense { pending_damage } => pending_damage,
            Phase::Attack => {
                return Err(CombatError::IllegalAction {
                    action: Action::Defend,
                    phase: PhaseKind::Attack,
                });
            }
        };
        let counter_round = self.final_counter_granted;

        let roll = self.dice.roll_spec(self.rules.defense_dice);
        let net = net_damage(pending_damage, roll.total);
        let defender = self.defender;
        let hp_before = self.hp(defender);
        let hp_after = {
            let hp = self.hp_mut(defender);
            *hp = hp.saturating_sub(i32::try_from(net).unwrap_or(i32::MAX));
            *hp
        };
        self.rounds += 1;
        debug!(
            target: "duel.session",
            channel = %self.channel,
            defender = %self.name(defender),
            rolls = ?roll.rolls,
            net_damage = net,
            hp_after,
            "defense rolled"
        );

        let attacker_name = self.attacker().to_string();
        let defender_name = self.defender().to_string();

        let round = if counter_round {
            // The counter round always closes the battle on the HP table.
            RoundOutcome::Finished(
                resolve(self.hp(Side::A), self.hp(Side::B))
                    .into_verdict(&self.player_a, &self.player_b),
            )
        } else if hp_after > 0 {
            self.swap_roles();
            RoundOutcome::Continue
        } else if defender == self.first_mover.other() {
            self.final_counter_granted = true;
            self.swap_roles();
            info!(
                target: "duel.session",
                channel = %self.channel,
                player = %defender_name,
                hp = hp_after,
                "final counterattack granted"
            );
            RoundOutcome::FinalCounter
        } else {
            RoundOutcome::Finished(Verdict::Winner(attacker_name.clone()))
        };

        if let RoundOutcome::Finished(verdict) = &round {
            info!(
                target: "duel.session",
                channel = %self.channel,
                verdict = %verdict,
                rounds = self.rounds,
                "battle finished"
            );
        }

        Ok(DefenseReport {
            defender: defender_name,
            attacker: attacker_name,
            roll,
            pending_damage,
            net_damage: net,
            hp_before,
            hp_after,
            round,
        })
    }

    /// Close the battle right away, judging on current HP.
    pub fn force_end(&mut self) -> Verdict {
        let verdict =
            resolve(self.hp(Side::A), self.hp(Side::B)).into_verdict(&self.player_a, &self.player_b);
        info!(
            target: "duel.session",
            channel = %self.channel,
            verdict = %verdict,
            phase = %self.phase.kind(),
            "battle force-ended"
        );
        verdict
    }
}
