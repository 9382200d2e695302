use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::gauge::render_hp_bar;
use crate::session::{
    AttackReport, BattleSession, DefenseReport, RoundOutcome, SessionView, Side,
};
use crate::store::{ChannelId, Disposition, SessionStore};
use crate::verdict::Verdict;

/// In-battle actions a player can trigger on a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Attack,
    Defend,
    ForceEnd,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack => f.write_str("attack"),
            Action::Defend => f.write_str("defend"),
            Action::ForceEnd => f.write_str("force-end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Start { player_a: String, player_b: String },
    Act(Action),
}

impl Trigger {
    pub fn start(player_a: impl Into<String>, player_b: impl Into<String>) -> Self {
        Trigger::Start {
            player_a: player_a.into(),
            player_b: player_b.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Event {
    Started { first_mover: String },
    Attacked(AttackReport),
    Defended(DefenseReport),
    ForceEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HpLine {
    pub name: String,
    pub hp: i32,
    pub bar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextTurn {
    pub player: String,
    pub action: Action,
}

/// What the caller gets back for a trigger it delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub channel: ChannelId,
    pub event: Event,
    pub hp_bars: Vec<HpLine>,
    pub next_turn: Option<NextTurn>,
    pub verdict: Option<Verdict>,
    pub final_counter: bool,
    /// The channel accepts a new `Start` again.
    pub channel_free: bool,
    pub lines: Vec<String>,
}

impl Response {
    pub fn is_terminal(&self) -> bool {
        self.channel_free
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct CombatEngine {
    config: EngineConfig,
    store: SessionStore,
    started: AtomicU64,
}

impl CombatEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: SessionStore::new(),
            started: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self, channel: &ChannelId) -> Option<SessionView> {
        self.store.get(channel)
    }

    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.store.active_channels()
    }

    pub fn handle(&self, channel: &ChannelId, trigger: Trigger) -> Result<Response> {
        debug!(target: "duel.combat", channel = %channel, trigger = ?trigger, "trigger received");
        match trigger {
            Trigger::Start { player_a, player_b } => {
                self.start_battle(channel, &player_a, &player_b)
            }
            Trigger::Act(action) => self.act(channel, action),
        }
    }

    pub fn start_battle(
        &self,
        channel: &ChannelId,
        player_a: &str,
        player_b: &str,
    ) -> Result<Response> {
        if self.store.contains(channel) {
            return Err(crate::error::CombatError::SessionAlreadyActive);
        }
        let n = self.started.fetch_add(1, Ordering::Relaxed);
        let dice = self.config.dice.dice_for_session(n);
        let session = BattleSession::start(
            channel.clone(),
            player_a,
            player_b,
            dice,
            self.config.rules(),
        )?;
        let mut lines = vec![format!(
            "[START] {} vs {} (HP {} each)",
            session.player_a(),
            session.player_b(),
            session.rules().starting_hp
        )];
        lines.push(format!(
            "[INIT] {} moves first, {} holds the final counter",
            session.first_mover(),
            session.second_mover()
        ));
        let response = self.live_response(
            &session,
            Event::Started {
                first_mover: session.first_mover().to_string(),
            },
            false,
            lines,
        );
        self.store.create(session)?;
        Ok(response)
    }

    pub fn act(&self, channel: &ChannelId, action: Action) -> Result<Response> {
        self.store.with_session(channel, |session| match action {
            Action::Attack => {
                let report = session.resolve_attack()?;
                let lines = vec![format!("[ATTACK][{}] {}", report.attacker, report.roll)];
                Ok((
                    self.live_response(session, Event::Attacked(report), false, lines),
                    Disposition::Keep,
                ))
            }
            Action::Defend => {
                let report = session.resolve_defense()?;
                let mut lines = vec![
                    format!("[DEFEND][{}] {}", report.defender, report.roll),
                    format!(
                        "[DMG][{}] {} - {} = {} ({} → {})",
                        report.defender,
                        report.pending_damage,
                        report.roll.total,
                        report.net_damage,
                        report.hp_before,
                        report.hp_after
                    ),
                ];
                match report.round.clone() {
                    RoundOutcome::Continue => Ok((
                        self.live_response(session, Event::Defended(report), false, lines),
                        Disposition::Keep,
                    )),
                    RoundOutcome::FinalCounter => {
                        lines.push(format!(
                            "[COUNTER][{}] falls to {} HP but strikes back once",
                            report.defender, report.hp_after
                        ));
                        Ok((
                            self.live_response(session, Event::Defended(report), true, lines),
                            Disposition::Keep,
                        ))
                    }
                    RoundOutcome::Finished(verdict) => Ok((
                        self.final_response(session, Event::Defended(report), verdict, lines),
                        Disposition::Destroy,
                    )),
                }
            }
            Action::ForceEnd => {
                let verdict = session.force_end();
                let lines = vec![format!("[FORCE-END] battle stopped after {} rounds", session.rounds())];
                Ok((
                    self.final_response(session, Event::ForceEnded, verdict, lines),
                    Disposition::Destroy,
                ))
            }
        })
    }

    fn hp_bars(&self, session: &BattleSession) -> Vec<HpLine> {
        let max = session.rules().starting_hp;
        [Side::A, Side::B]
            .into_iter()
            .map(|side| {
                let hp = session.hp(side);
                HpLine {
                    name: session.name(side).to_string(),
                    hp,
                    bar: render_hp_bar(hp, max, self.config.bar_width),
                }
            })
            .collect()
    }

    fn push_bars(lines: &mut Vec<String>, bars: &[HpLine]) {
        for line in bars {
            lines.push(format!("[HP][{}] {}", line.name, line.bar));
        }
    }

    fn live_response(
        &self,
        session: &BattleSession,
        event: Event,
        final_counter: bool,
        mut lines: Vec<String>,
    ) -> Response {
        let hp_bars = self.hp_bars(session);
        Self::push_bars(&mut lines, &hp_bars);
        let (player, action) = session.next_turn();
        lines.push(format!("[NEXT] {} → {}", player, action));
        Response {
            channel: session.channel().clone(),
            event,
            hp_bars,
            next_turn: Some(NextTurn {
                player: player.to_string(),
                action,
            }),
            verdict: None,
            final_counter,
            channel_free: false,
            lines,
        }
    }

    fn final_response(
        &self,
        session: &BattleSession,
        event: Event,
        verdict: Verdict,
        mut lines: Vec<String>,
    ) -> Response {
        let hp_bars = self.hp_bars(session);
        Self::push_bars(&mut lines, &hp_bars);
        lines.push(format!(
            "[END] {} after {} rounds; channel is free",
            verdict,
            session.rounds()
        ));
        info!(target: "duel.combat", channel = %session.channel(), verdict = %verdict, "channel freed");
        Response {
            channel: session.channel().clone(),
            event,
            hp_bars,
            next_turn: None,
            verdict: Some(verdict),
            final_counter: false,
            channel_free: true,
            lines,
        }
    }
}
