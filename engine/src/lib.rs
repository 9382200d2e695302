//! Channel-scoped two-player dice duels.

pub mod api;
pub mod combat;
pub mod config;
pub mod dice;
pub mod error;
pub mod gauge;
pub mod ledger;
pub mod session;
pub mod store;
pub mod verdict;

pub use combat::{Action, CombatEngine, Event, HpLine, NextTurn, Response, Trigger};
pub use config::EngineConfig;
pub use dice::{Dice, DiceMode, DiceRoll, DiceSpec, DiceSpecError};
pub use error::CombatError;
pub use gauge::render_hp_bar;
pub use session::{
    AttackReport, BattleRules, BattleSession, DefenseReport, Phase, PhaseKind, RoundOutcome,
    SessionView, Side, net_damage,
};
pub use store::{ChannelId, Disposition, SessionStore};
pub use verdict::{Outcome, Verdict, resolve};
