use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use engine::ledger::{self, LedgerError, MemoryLedger};
use engine::{Action, ChannelId, CombatEngine, CombatError, Trigger, render_hp_bar};
use tracing::debug;

use crate::help;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Trigger(Trigger),
    Status,
    SheetTest,
    Total,
    Buy { name: String, item: String },
    Use { name: String, item: String },
    Adjust { name: String, amount: String, sign: i64 },
    Help,
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NotACommand,
    Unknown(String),
    Usage(&'static str),
}

/// Split `[@channel] !command args...` into its channel and command.
pub fn parse_line(line: &str) -> std::result::Result<(Option<ChannelId>, Command), ParseError> {
    let mut tokens = line.split_whitespace().peekable();
    let channel = match tokens.peek().copied().and_then(|tok| tok.strip_prefix('@')) {
        Some(id) if !id.is_empty() => {
            tokens.next();
            Some(ChannelId::from(id))
        }
        _ => None,
    };
    let head = tokens.next().ok_or(ParseError::NotACommand)?;
    let name = head.strip_prefix('!').ok_or(ParseError::NotACommand)?;
    let args: Vec<&str> = tokens.collect();

    let usage = |name: &str| {
        help::COMMANDS
            .iter()
            .find(|(cmd, _, _)| *cmd == name)
            .map(|(_, usage, _)| *usage)
            .unwrap_or("!help")
    };

    let command = match (name, args.as_slice()) {
        ("start", [a, b]) => Command::Trigger(Trigger::start(*a, *b)),
        ("attack", []) => Command::Trigger(Trigger::Act(Action::Attack)),
        ("defend", []) => Command::Trigger(Trigger::Act(Action::Defend)),
        ("end", []) => Command::Trigger(Trigger::Act(Action::ForceEnd)),
        ("status", []) => Command::Status,
        ("sheettest", []) => Command::SheetTest,
        ("total", []) => Command::Total,
        ("buy", [who, item @ ..]) if !item.is_empty() => Command::Buy {
            name: who.to_string(),
            item: item.join(" "),
        },
        ("use", [who, item @ ..]) if !item.is_empty() => Command::Use {
            name: who.to_string(),
            item: item.join(" "),
        },
        ("add", [who, amount]) => Command::Adjust {
            name: who.to_string(),
            amount: amount.to_string(),
            sign: 1,
        },
        ("sub", [who, amount]) => Command::Adjust {
            name: who.to_string(),
            amount: amount.to_string(),
            sign: -1,
        },
        ("help", _) => Command::Help,
        ("ping", _) => Command::Ping,
        (
            known @ ("start" | "attack" | "defend" | "end" | "status" | "sheettest" | "total"
            | "buy" | "use" | "add" | "sub"),
            _,
        ) => return Err(ParseError::Usage(usage(known))),
        (other, _) => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok((channel, command))
}

fn reject(err: impl std::fmt::Display) -> Vec<String> {
    vec![format!("[REJECT] {}", err)]
}

pub struct Dispatcher {
    engine: CombatEngine,
    ledger: MemoryLedger,
    ledger_path: Option<PathBuf>,
    default_channel: ChannelId,
}

impl Dispatcher {
    pub fn new(
        engine: CombatEngine,
        ledger: MemoryLedger,
        ledger_path: Option<PathBuf>,
        default_channel: ChannelId,
    ) -> Self {
        Self {
            engine,
            ledger,
            ledger_path,
            default_channel,
        }
    }

    /// Handle one input line. Rejections come back as output lines; only
    /// failures to persist the ledger are errors.
    pub fn dispatch(&mut self, line: &str) -> Result<Vec<String>> {
        let (channel, command) = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(ParseError::NotACommand) => return Ok(Vec::new()),
            Err(ParseError::Unknown(name)) => {
                return Ok(reject(format!("unknown command '!{}' (try !help)", name)));
            }
            Err(ParseError::Usage(usage)) => return Ok(reject(format!("usage: {}", usage))),
        };
        let channel = channel.unwrap_or_else(|| self.default_channel.clone());
        debug!(target: "duel.cli", channel = %channel, command = ?command, "dispatching");

        match command {
            Command::Trigger(trigger) => Ok(self.trigger(&channel, trigger)),
            Command::Status => Ok(self.status(&channel)),
            Command::SheetTest => self.sheet_test(),
            Command::Total => Ok(match ledger::summary(&self.ledger, &self.engine.config().ledger) {
                Ok(cells) => cells
                    .into_iter()
                    .map(|(label, value)| format!("[TOTAL] {}: {}", label, value))
                    .collect(),
                Err(e) => reject(e),
            }),
            Command::Buy { name, item } => {
                let res = ledger::add_item(&mut self.ledger, &self.engine.config().ledger, &name, &item);
                self.inventory_lines(&name, res)
            }
            Command::Use { name, item } => {
                let res = ledger::use_item(&mut self.ledger, &self.engine.config().ledger, &name, &item);
                self.inventory_lines(&name, res)
            }
            Command::Adjust { name, amount, sign } => self.adjust(&name, &amount, sign),
            Command::Help => Ok(help::render()),
            Command::Ping => Ok(vec!["[PONG] dispatcher is running".to_string()]),
        }
    }

    fn trigger(&self, channel: &ChannelId, trigger: Trigger) -> Vec<String> {
        match self.engine.handle(channel, trigger) {
            Ok(response) => response.lines,
            Err(e @ CombatError::LockPoisoned) => {
                tracing::error!(target: "duel.cli", channel = %channel, error = %e, "engine failure");
                reject(e)
            }
            Err(e) => reject(e),
        }
    }

    fn status(&self, channel: &ChannelId) -> Vec<String> {
        let Some(view) = self.engine.session(channel) else {
            return reject(CombatError::NoActiveSession);
        };
        let config = self.engine.config();
        let mut lines = vec![format!(
            "[STATUS] {} vs {}, {} rounds, {} phase{}",
            view.player_a,
            view.player_b,
            view.rounds,
            view.phase.kind(),
            if view.final_counter_granted {
                ", final counter in play"
            } else {
                ""
            }
        )];
        for (name, hp) in &view.hp {
            lines.push(format!(
                "[HP][{}] {}",
                name,
                render_hp_bar(*hp, config.starting_hp, config.bar_width)
            ));
        }
        let (player, action) = view.next_turn();
        lines.push(format!("[NEXT] {} → {}", player, action));
        lines
    }

    fn inventory_lines(
        &self,
        name: &str,
        res: std::result::Result<Vec<String>, LedgerError>,
    ) -> Result<Vec<String>> {
        match res {
            Ok(items) => {
                self.persist()?;
                let shown = if items.is_empty() {
                    "(empty)".to_string()
                } else {
                    items.join(",")
                };
                Ok(vec![format!("[ITEMS][{}] {}", name, shown)])
            }
            Err(e) => Ok(reject(e)),
        }
    }

    fn adjust(&mut self, name: &str, amount: &str, sign: i64) -> Result<Vec<String>> {
        let amount = match ledger::parse_amount(amount) {
            Ok(amount) => i64::from(amount),
            Err(e) => return Ok(reject(e)),
        };
        let layout = self.engine.config().ledger.clone();
        match ledger::adjust_hp(&mut self.ledger, &layout, name, sign * amount) {
            Ok(adj) => {
                self.persist()?;
                Ok(vec![format!(
                    "[HP] {} {} → {:+} = {} (row {})",
                    name,
                    adj.before,
                    sign * amount,
                    adj.after,
                    adj.row
                )])
            }
            Err(e) => Ok(reject(e)),
        }
    }

    fn sheet_test(&mut self) -> Result<Vec<String>> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let layout = self.engine.config().ledger.clone();
        match ledger::check_connection(&mut self.ledger, &layout, &stamp) {
            Ok(value) => {
                self.persist()?;
                Ok(vec![format!("[SHEET] A1 = {}", value)])
            }
            Err(e) => Ok(reject(e)),
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.ledger_path else {
            return Ok(());
        };
        let text = self.ledger.to_json_string()?;
        fs::write(path, text)
            .with_context(|| format!("failed to write ledger: {}", path.display()))?;
        Ok(())
    }
}
